use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum invasiveness of containment action the responder is permitted to take.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ActionTier {
    AlertOnly = 0,
    SoftContainment = 1,
    StrongContainment = 2,
    Emergency = 3,
}

impl TryFrom<u8> for ActionTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ActionTier::AlertOnly),
            1 => Ok(ActionTier::SoftContainment),
            2 => Ok(ActionTier::StrongContainment),
            3 => Ok(ActionTier::Emergency),
            other => Err(format!("action_tier_max must be 0..=3, got {other}")),
        }
    }
}

/// An absolute UTC window during which the policy engine forces alert-only behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MaintenanceWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// One action the policy engine permits the responder to attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionSpec {
    pub action: String,
    pub reason: Option<String>,
    pub tier: Option<u8>,
    pub timeout_minutes: Option<u32>,
}

impl ActionSpec {
    pub fn alert_only(reason: &str) -> Self {
        Self {
            action: "alert_only".to_string(),
            reason: Some(reason.to_string()),
            tier: None,
            timeout_minutes: None,
        }
    }

    pub fn stop_container() -> Self {
        Self {
            action: "stop_container".to_string(),
            reason: None,
            tier: Some(1),
            timeout_minutes: Some(60),
        }
    }

    pub fn block_ip_temporary() -> Self {
        Self {
            action: "block_ip_temporary".to_string(),
            reason: None,
            tier: Some(1),
            timeout_minutes: Some(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn action_tier_rejects_out_of_range_values() {
        assert!(ActionTier::try_from(4).is_err());
        assert_eq!(ActionTier::try_from(2).unwrap(), ActionTier::StrongContainment);
    }

    #[test]
    fn maintenance_window_is_inclusive_of_both_bounds() {
        let now = Utc::now();
        let window = MaintenanceWindow {
            start: now - Duration::hours(1),
            end: now + Duration::hours(1),
        };
        assert!(window.contains(now));
        assert!(!window.contains(now + Duration::hours(2)));
    }
}
