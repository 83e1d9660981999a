use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::models::{DriftBaseline, Event, EventType, Severity};

/// Hashes a fixed list of critical paths (files, directories, or glob
/// patterns containing `*`) and diffs against a persisted baseline.
/// The baseline is built once, on first `check()`, and never rewritten
/// automatically afterward.
pub struct DriftMonitor {
    critical_paths: Vec<String>,
    baseline_path: PathBuf,
}

impl DriftMonitor {
    pub fn new(critical_paths: Vec<String>, baseline_path: PathBuf) -> Self {
        Self { critical_paths, baseline_path }
    }

    /// Runs one check cycle. On first run (no baseline file), builds and
    /// persists the baseline and returns no events (bootstrap suppression).
    pub async fn check(&self) -> Result<Vec<Event>> {
        let current = self.hash_all_paths();

        if !self.baseline_path.exists() {
            self.persist_baseline(&current)?;
            return Ok(Vec::new());
        }

        let baseline = self.load_baseline()?;
        Ok(self.diff(&baseline.hashes, &current))
    }

    fn diff(&self, baseline: &BTreeMap<String, String>, current: &BTreeMap<String, String>) -> Vec<Event> {
        let mut events = Vec::new();

        for (path, hash) in current {
            match baseline.get(path) {
                None => events.push(Event::new(
                    "drift_monitor",
                    EventType::ConfigNewFile,
                    Severity::P3,
                    format!("New file appeared since baseline: {path}"),
                    serde_json::json!({"path": path, "hash": hash}),
                )),
                Some(old_hash) if old_hash != hash => events.push(Event::new(
                    "drift_monitor",
                    EventType::ConfigDrift,
                    Severity::P2,
                    format!("Critical file changed: {path}"),
                    serde_json::json!({"path": path, "old_hash": old_hash, "new_hash": hash}),
                )),
                _ => {}
            }
        }

        for path in baseline.keys() {
            if !current.contains_key(path) {
                events.push(Event::new(
                    "drift_monitor",
                    EventType::ConfigDeleted,
                    Severity::P2,
                    format!("Critical file deleted: {path}"),
                    serde_json::json!({"path": path}),
                ));
            }
        }

        events
    }

    fn hash_all_paths(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for entry in &self.critical_paths {
            for path in Self::resolve_entry(entry) {
                if let Some(hash) = Self::hash_file(&path) {
                    out.insert(path.to_string_lossy().to_string(), hash);
                }
            }
        }
        out
    }

    /// Splits a glob entry on its first `*`: the prefix is the search root,
    /// the suffix is the pattern. Plain paths (no `*`) resolve to themselves
    /// (a file) or their immediate children (a directory).
    fn resolve_entry(entry: &str) -> Vec<PathBuf> {
        if let Some(star_idx) = entry.find('*') {
            let root = &entry[..star_idx];
            let pattern = &entry[star_idx..];
            let root_path = Path::new(root);
            let Ok(read_dir) = std::fs::read_dir(root_path) else {
                return Vec::new();
            };
            let suffix = pattern.trim_start_matches('*');
            return read_dir
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    suffix.is_empty()
                        || p.file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| n.ends_with(suffix))
                            .unwrap_or(false)
                })
                .collect();
        }

        let path = Path::new(entry);
        if path.is_dir() {
            std::fs::read_dir(path)
                .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).filter(|p| p.is_file()).collect())
                .unwrap_or_default()
        } else {
            vec![path.to_path_buf()]
        }
    }

    fn hash_file(path: &Path) -> Option<String> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let mut hasher = Sha256::new();
                hasher.update(&bytes);
                Some(format!("{:x}", hasher.finalize()))
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unreadable path skipped during drift hashing");
                None
            }
        }
    }

    fn persist_baseline(&self, hashes: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.baseline_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let baseline = DriftBaseline::new(hashes.clone());
        let json = serde_json::to_string_pretty(&baseline)?;
        let tmp_path = self.baseline_path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.baseline_path)?;
        Ok(())
    }

    fn load_baseline(&self) -> Result<DriftBaseline> {
        let contents = std::fs::read_to_string(&self.baseline_path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn bootstrap_run_persists_baseline_and_returns_no_events() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("cfg");
        std::fs::write(&cfg_path, "a\n").unwrap();
        let baseline_path = dir.path().join("baseline.json");

        let monitor = DriftMonitor::new(vec![cfg_path.to_string_lossy().to_string()], baseline_path.clone());
        let events = monitor.check().await.unwrap();
        assert!(events.is_empty());
        assert!(baseline_path.exists());
    }

    #[tokio::test]
    async fn detects_drift_after_baseline_exists() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("cfg");
        std::fs::write(&cfg_path, "a\n").unwrap();
        let baseline_path = dir.path().join("baseline.json");

        let monitor = DriftMonitor::new(vec![cfg_path.to_string_lossy().to_string()], baseline_path.clone());
        monitor.check().await.unwrap();

        std::fs::write(&cfg_path, "b\n").unwrap();
        let events = monitor.check().await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ConfigDrift);
        assert_eq!(events[0].severity, Severity::P2);
        assert_eq!(events[0].raw["path"], cfg_path.to_string_lossy().to_string());
    }

    #[tokio::test]
    async fn second_run_with_no_changes_is_quiet() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("cfg");
        std::fs::write(&cfg_path, "a\n").unwrap();
        let baseline_path = dir.path().join("baseline.json");
        let monitor = DriftMonitor::new(vec![cfg_path.to_string_lossy().to_string()], baseline_path);

        let first = monitor.check().await.unwrap();
        let second = monitor.check().await.unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn detects_deleted_critical_file() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("cfg");
        std::fs::write(&cfg_path, "a\n").unwrap();
        let baseline_path = dir.path().join("baseline.json");
        let monitor = DriftMonitor::new(vec![cfg_path.to_string_lossy().to_string()], baseline_path);

        monitor.check().await.unwrap();
        std::fs::remove_file(&cfg_path).unwrap();
        let events = monitor.check().await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ConfigDeleted);
    }
}
