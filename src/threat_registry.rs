use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Severity, ThreatRecord};

/// File-backed store of detected threats, one JSON file per record. Content
/// is addressed by a short random id rather than by hashing the evidence,
/// since the same underlying issue can legitimately recur with different
/// evidence each time.
pub struct ThreatRegistry {
    dir: PathBuf,
}

impl ThreatRegistry {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub async fn store(
        &self,
        title: &str,
        description: &str,
        severity: Severity,
        evidence: serde_json::Value,
    ) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let threat_id = format!("thr-{}", &Uuid::new_v4().simple().to_string()[..12]);
        let record = ThreatRecord {
            threat_id: threat_id.clone(),
            title: title.to_string(),
            description: description.to_string(),
            severity,
            evidence,
            resolution_actions: Vec::new(),
            detected_at: chrono::Utc::now(),
            resolved_at: None,
        };

        self.write_atomic(&threat_id, &record).await?;
        Ok(threat_id)
    }

    pub async fn mark_resolved(&self, threat_id: &str, actions_taken: Vec<String>) -> Result<()> {
        let path = self.path_for(threat_id);
        let contents = tokio::fs::read_to_string(&path).await?;
        let mut record: ThreatRecord = serde_json::from_str(&contents)?;
        record.resolution_actions = actions_taken;
        record.resolved_at = Some(chrono::Utc::now());
        self.write_atomic(threat_id, &record).await
    }

    /// Renders the `limit` most recently detected threats as a short
    /// plaintext block, for injection into an LLM system prompt as prior
    /// context. Corrupt files are skipped rather than failing the whole load.
    pub async fn load_recent(&self, limit: usize) -> String {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return String::new();
        };

        let mut files = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(meta) = entry.metadata().await {
                if let Ok(modified) = meta.modified() {
                    files.push((entry.path(), modified));
                }
            }
        }
        files.sort_by(|a, b| b.1.cmp(&a.1));

        let mut rendered = Vec::new();
        for (path, _) in files.into_iter().take(limit) {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => match serde_json::from_str::<ThreatRecord>(&contents) {
                    Ok(record) => rendered.push(format!(
                        "- [{}] {} ({}): {}",
                        record.threat_id,
                        record.title,
                        if record.is_resolved() { "resolved" } else { "open" },
                        record.description,
                    )),
                    Err(e) => debug!(path = %path.display(), error = %e, "skipping corrupt threat record"),
                },
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable threat record"),
            }
        }

        rendered.join("\n")
    }

    fn path_for(&self, threat_id: &str) -> PathBuf {
        self.dir.join(format!("{threat_id}.json"))
    }

    async fn write_atomic(&self, threat_id: &str, record: &ThreatRecord) -> Result<()> {
        let path = self.path_for(threat_id);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn store_then_load_recent_round_trips() {
        let dir = tempdir().unwrap();
        let registry = ThreatRegistry::new(dir.path().to_path_buf());
        let id = registry
            .store("Outdated OpenSSH", "CVE-2023-x", Severity::P2, serde_json::json!({}))
            .await
            .unwrap();
        assert!(id.starts_with("thr-"));

        let rendered = registry.load_recent(5).await;
        assert!(rendered.contains("Outdated OpenSSH"));
        assert!(rendered.contains("open"));
    }

    #[tokio::test]
    async fn mark_resolved_updates_the_stored_record() {
        let dir = tempdir().unwrap();
        let registry = ThreatRegistry::new(dir.path().to_path_buf());
        let id = registry.store("t", "d", Severity::P3, serde_json::json!({})).await.unwrap();
        registry.mark_resolved(&id, vec!["patched".to_string()]).await.unwrap();

        let rendered = registry.load_recent(5).await;
        assert!(rendered.contains("resolved"));
    }

    #[tokio::test]
    async fn corrupt_files_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("thr-bad000000.json"), "{not json").await.unwrap();
        let registry = ThreatRegistry::new(dir.path().to_path_buf());
        let rendered = registry.load_recent(5).await;
        assert!(rendered.is_empty());
    }
}
