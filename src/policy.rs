use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::models::{ActionSpec, ActionTier, EventType, Incident, MaintenanceWindow};

/// Pure decision function: given an incident and the running configuration,
/// returns the list of actions the responder is permitted to attempt. Never
/// performs a side effect itself.
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn allowed_actions(incident: &Incident, config: &Config, now: DateTime<Utc>) -> Vec<ActionSpec> {
        let windows: Vec<MaintenanceWindow> = config
            .maintenance_windows
            .iter()
            .map(|w| MaintenanceWindow { start: w.start, end: w.end })
            .collect();

        if windows.iter().any(|w| w.contains(now)) {
            return vec![ActionSpec::alert_only("maintenance window active")];
        }

        let Ok(tier_max) = ActionTier::try_from(config.action_tier_max) else {
            return vec![ActionSpec::alert_only("invalid action_tier_max configured")];
        };

        let mut actions = vec![ActionSpec::alert_only("always notify on a classified incident")];

        if tier_max >= ActionTier::SoftContainment && incident.severity.is_high() {
            if incident.event_type_matches(EventType::NewContainer) {
                actions.push(ActionSpec::stop_container());
            }
            if incident.event_type_matches(EventType::AuthFailures) {
                actions.push(ActionSpec::block_ip_temporary());
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaintenanceWindowConfig;
    use crate::models::{Event, Severity};
    use chrono::Duration;

    fn sample_incident(event_type: EventType, severity: Severity) -> Incident {
        let event = Event::new("detector", event_type, severity, "x", serde_json::json!({}));
        Incident::new(event, serde_json::json!({}), vec![])
    }

    fn base_config() -> Config {
        Config::load(None).unwrap()
    }

    #[test]
    fn maintenance_window_forces_alert_only() {
        let mut config = base_config();
        let now = Utc::now();
        config.maintenance_windows = vec![MaintenanceWindowConfig {
            start: now - Duration::hours(1),
            end: now + Duration::hours(1),
        }];
        let incident = sample_incident(EventType::NewContainer, Severity::P1);
        let actions = PolicyEngine::allowed_actions(&incident, &config, now);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "alert_only");
    }

    #[test]
    fn tier_zero_never_allows_containment() {
        let mut config = base_config();
        config.action_tier_max = 0;
        let incident = sample_incident(EventType::NewContainer, Severity::P1);
        let actions = PolicyEngine::allowed_actions(&incident, &config, Utc::now());
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn tier_one_allows_stop_container_for_high_severity_new_container_incidents() {
        let mut config = base_config();
        config.action_tier_max = 1;
        let incident = sample_incident(EventType::NewContainer, Severity::P2);
        let actions = PolicyEngine::allowed_actions(&incident, &config, Utc::now());
        assert!(actions.iter().any(|a| a.action == "stop_container"));
    }

    #[test]
    fn new_container_at_its_detector_default_severity_never_gets_stop_container() {
        let mut config = base_config();
        config.action_tier_max = 1;
        let incident = sample_incident(EventType::NewContainer, Severity::P3);
        let actions = PolicyEngine::allowed_actions(&incident, &config, Utc::now());
        assert!(!actions.iter().any(|a| a.action == "stop_container"));
    }

    #[test]
    fn tier_one_allows_block_ip_for_high_severity_incidents() {
        let mut config = base_config();
        config.action_tier_max = 1;
        let incident = sample_incident(EventType::AuthFailures, Severity::P1);
        let actions = PolicyEngine::allowed_actions(&incident, &config, Utc::now());
        assert!(actions.iter().any(|a| a.action == "block_ip_temporary"));
    }

    #[test]
    fn low_severity_never_gets_block_ip() {
        let mut config = base_config();
        config.action_tier_max = 1;
        let incident = sample_incident(EventType::AuthFailures, Severity::P4);
        let actions = PolicyEngine::allowed_actions(&incident, &config, Utc::now());
        assert!(!actions.iter().any(|a| a.action == "block_ip_temporary"));
    }
}
