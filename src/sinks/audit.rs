use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::Incident;

/// Append-only, crash-safe audit trail: one JSON line per incident and per
/// action attempted. Never truncated or rewritten by this process; rotation
/// and retention are external (`audit.max_size_mb`/`retain_days` are
/// advisory config, consumed by an external logrotate-style job).
pub struct AuditSink {
    file: Mutex<File>,
}

impl AuditSink {
    pub async fn open(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { file: Mutex::new(file) })
    }

    pub async fn log_incident(&self, incident: &Incident) -> Result<()> {
        let record = serde_json::json!({
            "type": "incident",
            "ts": Utc::now(),
            "payload": incident,
        });
        self.write_line(&record).await
    }

    pub async fn log_action(&self, action: &str, details: serde_json::Value, incident_id: &str) -> Result<()> {
        let record = serde_json::json!({
            "type": "action",
            "ts": Utc::now(),
            "action": action,
            "incident_id": incident_id,
            "details": details,
        });
        self.write_line(&record).await
    }

    async fn write_line(&self, record: &serde_json::Value) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventType, Severity};
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_one_json_line_per_incident() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = AuditSink::open(path.to_str().unwrap()).await.unwrap();

        let event = Event::new("detector", EventType::AuthFailures, Severity::P2, "x", serde_json::json!({}));
        let incident = Incident::new(event, serde_json::json!({}), vec![]);
        sink.log_incident(&incident).await.unwrap();
        sink.log_action("stop_container", serde_json::json!({"id": "abc"}), &incident.incident_id).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().next().unwrap().contains("\"type\":\"incident\""));
    }
}
