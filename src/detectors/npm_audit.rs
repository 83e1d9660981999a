use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::DetectorConfig;
use crate::models::{Event, EventType, Severity};

const MAX_DIRS: usize = 50;

/// Walks configured roots for `package.json`, capped at depth and count,
/// then runs `npm audit --json` in each and classifies by the worst
/// severity bucket present.
pub async fn check(config: &DetectorConfig) -> Vec<Event> {
    if !config.npm_audit_enabled {
        return Vec::new();
    }

    let mut project_dirs = Vec::new();
    for root in &config.npm_audit_paths {
        find_package_json_dirs(Path::new(root), config.npm_audit_max_depth, &mut project_dirs);
        if project_dirs.len() >= MAX_DIRS {
            break;
        }
    }
    project_dirs.truncate(MAX_DIRS);

    let mut events = Vec::new();
    for dir in project_dirs {
        if let Some(event) = audit_one(&dir).await {
            events.push(event);
        }
    }
    events
}

fn find_package_json_dirs(root: &Path, max_depth: u32, out: &mut Vec<PathBuf>) {
    fn walk(dir: &Path, depth: u32, max_depth: u32, out: &mut Vec<PathBuf>) {
        if out.len() >= MAX_DIRS {
            return;
        }
        if dir.join("package.json").is_file() {
            out.push(dir.to_path_buf());
        }
        if depth >= max_depth {
            return;
        }
        let Ok(entries) = std::fs::read_dir(dir) else { return };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() && path.file_name().and_then(|n| n.to_str()) != Some("node_modules") {
                walk(&path, depth + 1, max_depth, out);
                if out.len() >= MAX_DIRS {
                    return;
                }
            }
        }
    }
    walk(root, 0, max_depth, out);
}

async fn audit_one(dir: &Path) -> Option<Event> {
    let mut cmd = Command::new("npm");
    cmd.args(["audit", "--json"]).current_dir(dir);
    let output = match timeout(Duration::from_secs(60), cmd.output()).await {
        Ok(Ok(o)) => o,
        _ => return None,
    };

    let code = output.status.code().unwrap_or(-1);
    if code != 0 && code != 1 {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).ok()?;
    let vulns = report.get("metadata").and_then(|m| m.get("vulnerabilities"))?;

    let critical = vulns.get("critical").and_then(|v| v.as_u64()).unwrap_or(0);
    let high = vulns.get("high").and_then(|v| v.as_u64()).unwrap_or(0);

    let severity = if critical > 0 {
        Severity::P1
    } else if high > 0 {
        Severity::P2
    } else {
        return None;
    };

    Some(Event::new(
        "npm_audit_detector",
        EventType::NpmAuditVulnerabilities,
        severity,
        format!("npm audit found {critical} critical, {high} high vulnerabilities in {}", dir.display()),
        serde_json::json!({"path": dir.display().to_string(), "vulnerabilities": vulns}),
    ))
}
