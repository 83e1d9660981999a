use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::DetectorConfig;
use crate::models::{Event, EventType, Severity};

/// Prefers `ufw status`; when `ufw` is unavailable, falls back to an
/// audit-only check of `iptables -L -n` since a missing `ufw` binary does
/// not by itself mean the host is unprotected.
pub async fn check(config: &DetectorConfig) -> Option<Event> {
    if !config.firewall_enabled {
        return None;
    }

    match run(&["ufw", "status"], 5).await {
        Some((0, stdout)) => {
            let active = stdout.to_lowercase().contains("status: active");
            if config.firewall_require_active && !active {
                return Some(Event::new(
                    "firewall_detector",
                    EventType::FirewallInactive,
                    Severity::P2,
                    "ufw is installed but not active".to_string(),
                    serde_json::json!({"stdout": stdout}),
                ));
            }
            None
        }
        _ => match run(&["iptables", "-L", "-n"], 5).await {
            Some((0, stdout)) if !stdout.lines().any(|l| l.starts_with("Chain")) => Some(Event::new(
                "firewall_detector",
                EventType::FirewallAudit,
                Severity::P3,
                "no firewall tool detected and iptables has no chains".to_string(),
                serde_json::json!({}),
            )),
            _ => None,
        },
    }
}

async fn run(args: &[&str], secs: u64) -> Option<(i32, String)> {
    let mut cmd = Command::new(args[0]);
    cmd.args(&args[1..]);
    match timeout(Duration::from_secs(secs), cmd.output()).await {
        Ok(Ok(output)) => Some((output.status.code().unwrap_or(-1), String::from_utf8_lossy(&output.stdout).to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_detector_produces_no_event() {
        let mut cfg = crate::config::Config::load(None).unwrap().detector;
        cfg.firewall_enabled = false;
        assert!(check(&cfg).await.is_none());
    }
}
