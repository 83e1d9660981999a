use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::severity::Severity;

/// A persisted, human-readable description of a detected issue and
/// (eventually) the actions taken to resolve it. Re-injected into future
/// LLM contexts as "previous threats and resolutions".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub threat_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub evidence: serde_json::Value,
    pub resolution_actions: Vec<String>,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ThreatRecord {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
