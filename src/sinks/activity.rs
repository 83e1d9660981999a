use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;

/// Operational trace of every run cycle, independent of the audit trail:
/// meant for debugging "why didn't this fire" rather than compliance. A
/// disabled sink is a silent no-op on every call, never an error.
pub struct ActivitySink {
    file: Option<Mutex<File>>,
}

impl ActivitySink {
    pub async fn open(path: &str, enabled: bool) -> Result<Self> {
        if !enabled {
            return Ok(Self { file: None });
        }
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { file: Some(Mutex::new(file)) })
    }

    pub async fn log_collector_run(&self, collector: &str, ok: bool, detail: serde_json::Value) -> Result<()> {
        self.write("collector_run", serde_json::json!({"collector": collector, "ok": ok, "detail": detail})).await
    }

    pub async fn log_detector_run(&self, detector: &str, event_count: usize) -> Result<()> {
        self.write("detector_run", serde_json::json!({"detector": detector, "event_count": event_count})).await
    }

    pub async fn log_policy_decision(&self, incident_id: &str, actions: &[String]) -> Result<()> {
        self.write("policy_decision", serde_json::json!({"incident_id": incident_id, "actions": actions})).await
    }

    pub async fn log_command_execution(&self, cmd: &str, exit_code: i32, stdout: &str, stderr: &str) -> Result<()> {
        let stdout_preview: String = stdout.chars().take(2000).collect();
        let stderr_preview: String = stderr.chars().take(500).collect();
        self.write(
            "command_execution",
            serde_json::json!({
                "cmd": cmd,
                "exit_code": exit_code,
                "stdout_preview": stdout_preview,
                "stderr_preview": stderr_preview,
            }),
        )
        .await
    }

    pub async fn log_llm_call(&self, provider: &str, model: &str, ok: bool) -> Result<()> {
        self.write("llm_call", serde_json::json!({"provider": provider, "model": model, "ok": ok})).await
    }

    pub async fn log_agent_iteration(&self, iteration: u32, summary: &str) -> Result<()> {
        let summary_preview: String = summary.chars().take(500).collect();
        self.write("agent_iteration", serde_json::json!({"iteration": iteration, "summary": summary_preview})).await
    }

    async fn write(&self, kind: &str, detail: serde_json::Value) -> Result<()> {
        let Some(file) = &self.file else { return Ok(()) };
        let record = serde_json::json!({"type": kind, "ts": Utc::now(), "detail": detail});
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut guard = file.lock().await;
        guard.write_all(line.as_bytes()).await?;
        guard.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn disabled_sink_never_creates_a_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let sink = ActivitySink::open(path.to_str().unwrap(), false).await.unwrap();
        sink.log_detector_run("auth", 0).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn truncates_long_stdout_and_stderr_previews() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let sink = ActivitySink::open(path.to_str().unwrap(), true).await.unwrap();
        let long_stdout = "x".repeat(3000);
        let long_stderr = "y".repeat(1000);
        sink.log_command_execution("nginx -t", 0, &long_stdout, &long_stderr).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        let stdout_preview = value["detail"]["stdout_preview"].as_str().unwrap();
        let stderr_preview = value["detail"]["stderr_preview"].as_str().unwrap();
        assert_eq!(stdout_preview.chars().count(), 2000);
        assert_eq!(stderr_preview.chars().count(), 500);
    }
}
