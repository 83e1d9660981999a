use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{Event, EventType};
use super::severity::Severity;

/// A single classified security-relevant event with recommendations and a
/// running list of actions taken. Incidents are never merged across events
/// in this pipeline: one incoming (non-inventory) event produces exactly one
/// incident with one event in its `events` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,
    pub severity: Severity,
    pub title: String,
    pub narrative: String,
    pub events: Vec<Event>,
    pub evidence_summary: serde_json::Value,
    pub recommended_actions: Vec<String>,
    pub actions_taken: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub contained_at: Option<DateTime<Utc>>,
    pub llm_summary: String,
}

const MAX_TITLE_LEN: usize = 200;

impl Incident {
    pub fn new(
        event: Event,
        evidence_summary: serde_json::Value,
        recommended_actions: Vec<String>,
    ) -> Self {
        let mut title: String = event.summary.clone();
        if title.len() > MAX_TITLE_LEN {
            title = title.chars().take(MAX_TITLE_LEN).collect();
        }
        Self {
            incident_id: format!("inc-{}", Uuid::new_v4().simple()),
            severity: event.severity,
            title,
            narrative: event.summary.clone(),
            events: vec![event],
            evidence_summary,
            recommended_actions,
            actions_taken: Vec::new(),
            created_at: Utc::now(),
            contained_at: None,
            llm_summary: String::new(),
        }
    }

    /// True iff any event carried by this incident has the given type.
    pub fn event_type_matches(&self, event_type: EventType) -> bool {
        self.events.iter().any(|e| e.event_type == event_type)
    }

    pub fn record_action(&mut self, action: impl Into<String>) {
        self.actions_taken.push(action.into());
    }

    pub fn mark_contained(&mut self) {
        self.contained_at = Some(Utc::now());
    }

    pub fn append_llm_summary(&mut self, text: &str) {
        if self.llm_summary.is_empty() {
            self.llm_summary = text.to_string();
        } else {
            self.llm_summary.push_str("\n\n");
            self.llm_summary.push_str(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event::new(
            "drift_monitor",
            EventType::ConfigDrift,
            Severity::P2,
            "a".repeat(250),
            serde_json::json!({"path": "/etc/passwd"}),
        )
    }

    #[test]
    fn truncates_title_to_200_chars() {
        let incident = Incident::new(sample_event(), serde_json::json!({}), vec!["do x".into()]);
        assert_eq!(incident.title.chars().count(), 200);
        assert_eq!(incident.narrative.chars().count(), 250);
    }

    #[test]
    fn event_type_matches_checks_all_events() {
        let incident = Incident::new(sample_event(), serde_json::json!({}), vec![]);
        assert!(incident.event_type_matches(EventType::ConfigDrift));
        assert!(!incident.event_type_matches(EventType::NewContainer));
    }

    #[test]
    fn appends_llm_summary_without_clobbering() {
        let mut incident = Incident::new(sample_event(), serde_json::json!({}), vec![]);
        incident.append_llm_summary("first");
        incident.append_llm_summary("second");
        assert_eq!(incident.llm_summary, "first\n\nsecond");
    }
}
