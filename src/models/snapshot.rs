use std::collections::HashSet;

use serde_json::Value;

/// Inventory state the orchestrator owns and single-writes; detectors and
/// the LLM agent read it through `tokio::sync::RwLock`. Starts empty so the
/// first diff-detector run is always a no-op (bootstrap suppression).
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub last_host_inventory: Option<Value>,
    pub last_docker_inventory: Option<Value>,
    pub last_ports: HashSet<String>,
    pub last_containers: HashSet<String>,
    pub last_sudo_users: HashSet<String>,
}
