use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;

/// Root configuration, deep-merged from the embedded default YAML, an
/// optional file override, and `SENTRYD__*`-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    pub agent: AgentConfig,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    #[validate(range(min = 0, max = 3))]
    pub action_tier_max: u8,
    #[serde(default)]
    pub maintenance_windows: Vec<MaintenanceWindowConfig>,
    #[serde(default)]
    pub scan_level: String,
    pub scan_frequencies: ScanFrequencies,
    pub collector: CollectorConfig,
    pub detector: DetectorConfig,
    pub notifications: NotificationsConfig,
    pub llm: LlmConfig,
    pub llm_agent: LlmAgentConfig,
    pub audit: AuditConfig,
    pub activity: ActivityConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl Config {
    /// Layered load: embedded default -> file (CLI flag or `SENTRYD_CONFIG`) -> env.
    pub fn load(file_override: Option<&str>) -> Result<Self> {
        let config_path = file_override
            .map(|s| s.to_string())
            .or_else(|| std::env::var("SENTRYD_CONFIG").ok());

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/default.yaml"),
            config::FileFormat::Yaml,
        ));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(&path).required(false));
        }

        let built = builder
            .add_source(
                config::Environment::with_prefix("SENTRYD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(built.try_deserialize()?)
    }

    /// Returns the five effective scheduling intervals (seconds), resolving
    /// `scan_level` to a preset when set, else falling back to the explicit
    /// `collector`/`detector`/`llm_agent` sections.
    pub fn effective_intervals(&self) -> EffectiveIntervals {
        let preset = match self.scan_level.as_str() {
            "quick" => Some(&self.scan_frequencies.quick),
            "standard" => Some(&self.scan_frequencies.standard),
            "deep" => Some(&self.scan_frequencies.deep),
            _ => None,
        };

        match preset {
            Some(p) => EffectiveIntervals {
                host_interval_sec: p.host_interval_sec,
                docker_interval_sec: p.docker_interval_sec,
                drift_interval_sec: p.drift_interval_sec,
                detector_interval_sec: p.detector_interval_sec,
                llm_scan_interval_sec: p.llm_scan_interval_sec,
            },
            None => EffectiveIntervals {
                host_interval_sec: self.collector.host_interval_sec,
                docker_interval_sec: self.collector.docker_interval_sec,
                drift_interval_sec: self.collector.drift_interval_sec,
                detector_interval_sec: self.detector.detector_interval_sec,
                llm_scan_interval_sec: self.llm_agent.run_interval_sec,
            },
        }
    }

    /// Advisory validation: returns human-readable messages, never errors.
    /// The daemon only warns on these; the `validate` CLI command treats a
    /// non-empty result as fatal.
    pub fn validate_messages(&self) -> Vec<String> {
        let mut errs = Vec::new();
        if self.agent.data_dir.is_empty() {
            errs.push("agent.data_dir is required".to_string());
        }
        if self.agent.log_dir.is_empty() {
            errs.push("agent.log_dir is required".to_string());
        }
        if self.action_tier_max > 3 {
            errs.push("action_tier_max must be 0, 1, 2, or 3".to_string());
        }
        if self.llm.enabled && self.llm.api_key.is_empty() {
            errs.push("llm.enabled is true but llm.api_key is empty".to_string());
        }
        if self.notifications.provider == "resend" && self.notifications.resend.api_key.is_empty()
        {
            errs.push("notifications.provider is resend but resend.api_key is empty".to_string());
        }
        errs
    }
}

pub struct EffectiveIntervals {
    pub host_interval_sec: u64,
    pub docker_interval_sec: u64,
    pub drift_interval_sec: u64,
    pub detector_interval_sec: u64,
    pub llm_scan_interval_sec: u64,
}

fn default_environment() -> String {
    "prod".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[validate(length(min = 1))]
    pub data_dir: String,
    #[validate(length(min = 1))]
    pub log_dir: String,
    pub run_dir: String,
}

fn default_agent_name() -> String {
    "sentryd".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindowConfig {
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFrequencies {
    pub quick: ScanFrequencyPreset,
    pub standard: ScanFrequencyPreset,
    pub deep: ScanFrequencyPreset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFrequencyPreset {
    pub host_interval_sec: u64,
    pub docker_interval_sec: u64,
    pub drift_interval_sec: u64,
    pub detector_interval_sec: u64,
    pub llm_scan_interval_sec: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub host_interval_sec: u64,
    pub docker_interval_sec: u64,
    pub drift_interval_sec: u64,
    pub critical_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub detector_interval_sec: u64,
    pub auth_failure_threshold: u32,
    pub auth_failure_window_sec: i64,
    #[serde(default = "default_true")]
    pub auth_failure_enabled: bool,
    pub resource_cpu_percent: f64,
    pub resource_memory_percent: f64,
    #[serde(default = "default_true")]
    pub resource_enabled: bool,
    pub network_mb_per_sec_threshold: f64,
    #[serde(default = "default_true")]
    pub network_enabled: bool,
    pub nginx_config_paths: Vec<String>,
    pub nginx_check_security: bool,
    #[serde(default = "default_true")]
    pub nginx_enabled: bool,
    pub firewall_require_active: bool,
    #[serde(default = "default_true")]
    pub firewall_enabled: bool,
    pub npm_audit_paths: Vec<String>,
    pub npm_audit_max_depth: u32,
    #[serde(default = "default_true")]
    pub npm_audit_enabled: bool,
    pub php_scan_paths: Vec<String>,
    pub php_scan_max_depth: u32,
    pub php_scan_max_files: u32,
    pub php_scan_max_bytes: u64,
    #[serde(default = "default_true")]
    pub php_scan_enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub provider: String,
    pub admin_emails: Vec<String>,
    pub smtp: SmtpConfig,
    pub resend: ResendConfig,
    pub immediate_severities: Vec<String>,
    pub digest: DigestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub user: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub enabled: bool,
    pub hour_utc: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub model_scan: String,
    #[serde(default)]
    pub model_resolve: String,
    #[serde(default)]
    pub base_url: String,
    pub max_tokens: u32,
    pub redact_patterns: Vec<String>,
}

impl LlmConfig {
    pub fn model_for_scan(&self) -> &str {
        if self.model_scan.is_empty() {
            &self.model
        } else {
            &self.model_scan
        }
    }

    pub fn model_for_resolve(&self) -> &str {
        if self.model_resolve.is_empty() {
            &self.model
        } else {
            &self.model_resolve
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAgentConfig {
    pub enabled: bool,
    pub run_on_incident: bool,
    pub run_interval_sec: u64,
    pub agent_max_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub file: String,
    pub max_size_mb: u64,
    pub retain_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    pub enabled: bool,
    pub file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub run_as: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_defaults_with_no_override() {
        let config = Config::load(None).expect("defaults must parse");
        assert_eq!(config.agent.name, "sentryd");
        assert_eq!(config.action_tier_max, 1);
        assert_eq!(config.detector.auth_failure_threshold, 5);
    }

    #[test]
    fn effective_intervals_prefers_scan_level_preset() {
        let mut config = Config::load(None).unwrap();
        config.scan_level = "deep".to_string();
        let intervals = config.effective_intervals();
        assert_eq!(intervals.detector_interval_sec, 45);
    }

    #[test]
    fn effective_intervals_falls_back_to_explicit_sections() {
        let config = Config::load(None).unwrap();
        let intervals = config.effective_intervals();
        assert_eq!(intervals.detector_interval_sec, config.detector.detector_interval_sec);
    }

    #[test]
    fn validate_messages_flags_missing_llm_api_key() {
        let mut config = Config::load(None).unwrap();
        config.llm.enabled = true;
        config.llm.api_key.clear();
        let errs = config.validate_messages();
        assert!(errs.iter().any(|e| e.contains("llm.api_key")));
    }

    #[test]
    fn deep_merge_is_idempotent_when_file_override_reapplies_same_document() {
        let first = Config::load(None).unwrap();
        let second = Config::load(None).unwrap();
        assert_eq!(first.agent.data_dir, second.agent.data_dir);
        assert_eq!(first.detector.auth_failure_threshold, second.detector.auth_failure_threshold);
    }
}
