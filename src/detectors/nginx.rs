use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::DetectorConfig;
use crate::models::{Event, EventType, Severity};

/// Validates nginx's configuration with `nginx -t`, then (only if valid)
/// checks the first readable configured path for a `server_tokens on`
/// directive that would leak the server version in responses.
pub async fn check(config: &DetectorConfig) -> Option<Event> {
    if !config.nginx_enabled {
        return None;
    }

    let config_path = config.nginx_config_paths.iter().find(|p| std::path::Path::new(p).exists());

    let mut cmd = Command::new("nginx");
    cmd.arg("-t");
    if let Some(path) = config_path {
        cmd.args(["-c", path]);
    }

    match timeout(Duration::from_secs(10), cmd.output()).await {
        Ok(Ok(output)) if !output.status.success() => {
            return Some(Event::new(
                "nginx_detector",
                EventType::NginxConfigInvalid,
                Severity::P2,
                "nginx configuration failed validation".to_string(),
                serde_json::json!({"stderr": String::from_utf8_lossy(&output.stderr)}),
            ));
        }
        Ok(Ok(_)) => {}
        _ => return None,
    }

    if !config.nginx_check_security {
        return None;
    }

    let path = config_path?;
    let contents = std::fs::read_to_string(path).ok()?;
    if has_server_tokens_on(&contents) {
        return Some(Event::new(
            "nginx_detector",
            EventType::NginxSecurity,
            Severity::P4,
            format!("nginx config at {path} has server_tokens on"),
            serde_json::json!({"path": path}),
        ));
    }

    None
}

fn has_server_tokens_on(contents: &str) -> bool {
    contents
        .lines()
        .map(|l| l.trim())
        .any(|l| l.starts_with("server_tokens") && l.contains("on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_server_tokens_on_directive() {
        assert!(has_server_tokens_on("http {\n  server_tokens on;\n}\n"));
        assert!(!has_server_tokens_on("http {\n  server_tokens off;\n}\n"));
        assert!(!has_server_tokens_on("http {\n}\n"));
    }

    #[tokio::test]
    async fn disabled_detector_produces_no_event() {
        let mut cfg = crate::config::Config::load(None).unwrap().detector;
        cfg.nginx_enabled = false;
        assert!(check(&cfg).await.is_none());
    }
}
