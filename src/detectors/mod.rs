pub mod auth;
pub mod diff;
pub mod firewall;
pub mod network;
pub mod nginx;
pub mod npm_audit;
pub mod php_scan;
pub mod resources;

use crate::config::DetectorConfig;
use crate::models::Event;

/// Runs every probe detector (the ones with no prior-state dependency) in
/// sequence and collects whatever events they produce. Diff detectors are
/// driven separately by the orchestrator since they need the running
/// `Snapshot`.
pub async fn run_probe_detectors(config: &DetectorConfig) -> Vec<Event> {
    let mut events = Vec::new();

    if let Some(event) = auth::check(config) {
        events.push(event);
    }
    events.extend(resources::check(config).await);
    if let Some(event) = network::check(config).await {
        events.push(event);
    }
    if let Some(event) = nginx::check(config).await {
        events.push(event);
    }
    if let Some(event) = firewall::check(config).await {
        events.push(event);
    }
    events.extend(npm_audit::check(config).await);
    events.extend(php_scan::check(config));

    events
}
