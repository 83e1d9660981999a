use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::severity::Severity;

/// Closed set of event kinds this pipeline ever produces. Kept as a tagged
/// enum (rather than a free string) so the correlator's recommendation table
/// and the sinks can match exhaustively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ConfigDrift,
    ConfigNewFile,
    ConfigDeleted,
    AuthFailures,
    NewListeningPort,
    NewAdminUser,
    NewContainer,
    HighCpu,
    HighMemory,
    HighNetworkUsage,
    NginxConfigInvalid,
    NginxSecurity,
    FirewallInactive,
    FirewallAudit,
    NpmAuditVulnerabilities,
    PhpMalwareSuspected,
    HostInventory,
    DockerInventory,
}

impl EventType {
    /// True for the two inventory event types the correlator consumes for
    /// snapshot updates but never promotes to an incident.
    pub fn is_inventory(&self) -> bool {
        matches!(self, EventType::HostInventory | EventType::DockerInventory)
    }
}

/// An immutable observation produced by a collector, drift monitor, or detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub source: String,
    pub event_type: EventType,
    pub severity: Severity,
    pub summary: String,
    pub raw: serde_json::Value,
    pub ts: DateTime<Utc>,
    pub asset_ids: Vec<String>,
    pub confidence: f64,
}

impl Event {
    pub fn new(
        source: impl Into<String>,
        event_type: EventType,
        severity: Severity,
        summary: impl Into<String>,
        raw: serde_json::Value,
    ) -> Self {
        Self {
            event_id: format!("{}-{}", event_type, &Uuid::new_v4().simple().to_string()[..12]),
            source: source.into(),
            event_type,
            severity,
            summary: summary.into(),
            raw,
            ts: Utc::now(),
            asset_ids: Vec::new(),
            confidence: clamp_confidence(1.0),
        }
    }

    pub fn with_asset_ids(mut self, asset_ids: Vec<String>) -> Self {
        self.asset_ids = asset_ids;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }
}

fn clamp_confidence(c: f64) -> f64 {
    c.clamp(0.0, 1.0)
}
