use std::sync::Arc;

use tracing::warn;

use crate::models::{ActionSpec, Incident};
use crate::ports::Docker;
use crate::sinks::{ActivitySink, AuditSink};

const MAX_CONTAINERS_STOPPED: usize = 5;

/// Executes the actions the `PolicyEngine` allowed. Every action is logged
/// to both the audit and activity sinks regardless of outcome; a failure on
/// one action never aborts the remaining ones.
pub struct Responder {
    docker: Arc<dyn Docker>,
}

impl Responder {
    pub fn new(docker: Arc<dyn Docker>) -> Self {
        Self { docker }
    }

    pub async fn apply(
        &self,
        incident: &mut Incident,
        allowed_actions: &[ActionSpec],
        audit: &AuditSink,
        activity: &ActivitySink,
    ) {
        for action in allowed_actions {
            match action.action.as_str() {
                "alert_only" => {
                    let _ = audit.log_action("alert_only", serde_json::json!({"reason": action.reason}), &incident.incident_id).await;
                }
                "stop_container" => self.stop_containers(incident, audit).await,
                "block_ip_temporary" => self.skip_block_ip(incident, action, audit).await,
                other => {
                    warn!(action = other, "policy engine returned an action the responder does not implement");
                }
            }
        }

        let action_names: Vec<String> = allowed_actions.iter().map(|a| a.action.clone()).collect();
        let _ = activity.log_policy_decision(&incident.incident_id, &action_names).await;
    }

    async fn stop_containers(&self, incident: &mut Incident, audit: &AuditSink) {
        let ids: Vec<String> = incident
            .events
            .iter()
            .filter_map(|e| e.raw.get("new_ids"))
            .filter_map(|v| v.as_array())
            .flatten()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .take(MAX_CONTAINERS_STOPPED)
            .collect();

        for id in ids {
            match self.docker.stop_container(&id).await {
                Ok(()) => {
                    incident.record_action(format!("Stopped container {id}"));
                    let _ = audit
                        .log_action("stop_container", serde_json::json!({"container_id": id, "ok": true}), &incident.incident_id)
                        .await;
                }
                Err(e) => {
                    warn!(container_id = %id, error = %e, "failed to stop container");
                    let _ = audit
                        .log_action(
                            "stop_container",
                            serde_json::json!({"container_id": id, "ok": false, "error": e}),
                            &incident.incident_id,
                        )
                        .await;
                }
            }
        }
    }

    /// `block_ip_temporary` is advisory-only: guessing at an iptables/ufw
    /// policy without knowing the host's network topology risks locking out
    /// legitimate traffic, so this action is always recorded as skipped,
    /// never executed.
    async fn skip_block_ip(&self, incident: &Incident, action: &ActionSpec, audit: &AuditSink) {
        let _ = audit
            .log_action(
                "block_ip_temporary_skipped",
                serde_json::json!({"requested_timeout_minutes": action.timeout_minutes}),
                &incident.incident_id,
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionSpec, Event, EventType, Severity};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FakeDocker {
        stop_calls: AtomicUsize,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Docker for FakeDocker {
        async fn stop_container(&self, container_id: &str) -> Result<(), String> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(container_id) {
                return Err("boom".to_string());
            }
            Ok(())
        }
    }

    async fn sinks(dir: &std::path::Path) -> (AuditSink, ActivitySink) {
        let audit = AuditSink::open(dir.join("audit.jsonl").to_str().unwrap()).await.unwrap();
        let activity = ActivitySink::open(dir.join("activity.jsonl").to_str().unwrap(), true).await.unwrap();
        (audit, activity)
    }

    #[tokio::test]
    async fn stop_container_caps_at_five_and_records_actions_taken() {
        let dir = tempdir().unwrap();
        let (audit, activity) = sinks(dir.path()).await;
        let ids: Vec<serde_json::Value> = (0..8).map(|i| serde_json::json!(format!("c{i}"))).collect();
        let event = Event::new(
            "diff_detector",
            EventType::NewContainer,
            Severity::P3,
            "new containers",
            serde_json::json!({"new_ids": ids}),
        );
        let mut incident = Incident::new(event, serde_json::json!({}), vec![]);

        let docker = Arc::new(FakeDocker { stop_calls: AtomicUsize::new(0), fail_on: None });
        let responder = Responder::new(docker.clone());
        responder.apply(&mut incident, &[ActionSpec::stop_container()], &audit, &activity).await;

        assert_eq!(docker.stop_calls.load(Ordering::SeqCst), 5);
        assert_eq!(incident.actions_taken.len(), 5);
    }

    #[tokio::test]
    async fn block_ip_temporary_is_never_executed() {
        let dir = tempdir().unwrap();
        let (audit, activity) = sinks(dir.path()).await;
        let event = Event::new("auth_detector", EventType::AuthFailures, Severity::P1, "x", serde_json::json!({}));
        let mut incident = Incident::new(event, serde_json::json!({}), vec![]);

        let docker = Arc::new(FakeDocker { stop_calls: AtomicUsize::new(0), fail_on: None });
        let responder = Responder::new(docker.clone());
        responder.apply(&mut incident, &[ActionSpec::block_ip_temporary()], &audit, &activity).await;

        assert_eq!(docker.stop_calls.load(Ordering::SeqCst), 0);
        assert!(incident.actions_taken.is_empty());

        let audit_contents = tokio::fs::read_to_string(dir.path().join("audit.jsonl")).await.unwrap();
        assert!(audit_contents.contains("block_ip_temporary_skipped"));
    }

    #[tokio::test]
    async fn a_failed_stop_does_not_abort_the_remaining_containers() {
        let dir = tempdir().unwrap();
        let (audit, activity) = sinks(dir.path()).await;
        let event = Event::new(
            "diff_detector",
            EventType::NewContainer,
            Severity::P3,
            "new containers",
            serde_json::json!({"new_ids": ["c0", "c1"]}),
        );
        let mut incident = Incident::new(event, serde_json::json!({}), vec![]);

        let docker = Arc::new(FakeDocker { stop_calls: AtomicUsize::new(0), fail_on: Some("c0".to_string()) });
        let responder = Responder::new(docker.clone());
        responder.apply(&mut incident, &[ActionSpec::stop_container()], &audit, &activity).await;

        assert_eq!(docker.stop_calls.load(Ordering::SeqCst), 2);
        assert_eq!(incident.actions_taken.len(), 1);
    }
}
