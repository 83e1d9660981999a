use std::collections::HashSet;

use crate::models::{Event, EventType, Severity, Snapshot};
use crate::ports::{DockerInventory, HostInventory};

/// Set-comparison detectors driven by the orchestrator's running `Snapshot`.
/// Each returns at most one event, and stays silent entirely on the first
/// run for a given set (an empty baseline means "not yet observed", not
/// "nothing present").

pub fn new_listening_ports(snapshot: &Snapshot, inventory: &HostInventory) -> (Option<Event>, HashSet<String>) {
    let current: HashSet<String> = inventory.listening_ports.iter().map(|p| p.port.clone()).collect();

    if snapshot.last_ports.is_empty() {
        return (None, current);
    }

    let new_ports: Vec<&String> = current.difference(&snapshot.last_ports).collect();
    if new_ports.is_empty() {
        return (None, current);
    }

    let event = Event::new(
        "diff_detector",
        EventType::NewListeningPort,
        Severity::P3,
        format!("New listening port(s) observed: {}", join(&new_ports)),
        serde_json::json!({"new_ports": new_ports}),
    );
    (Some(event), current)
}

pub fn new_containers(snapshot: &Snapshot, inventory: &DockerInventory) -> (Option<Event>, HashSet<String>) {
    let current: HashSet<String> = inventory
        .containers
        .iter()
        .filter(|c| c.running)
        .map(|c| c.id.clone())
        .collect();

    if snapshot.last_containers.is_empty() {
        return (None, current);
    }

    let new_ids: Vec<&String> = current.difference(&snapshot.last_containers).collect();
    if new_ids.is_empty() {
        return (None, current);
    }

    let event = Event::new(
        "diff_detector",
        EventType::NewContainer,
        Severity::P3,
        format!("New running container(s) observed: {}", join(&new_ids)),
        serde_json::json!({"new_ids": new_ids}),
    );
    (Some(event), current)
}

pub fn new_admin_users(snapshot: &Snapshot, inventory: &HostInventory) -> (Option<Event>, HashSet<String>) {
    let current: HashSet<String> = inventory.users_with_sudo.iter().cloned().collect();

    if snapshot.last_sudo_users.is_empty() {
        return (None, current);
    }

    let new_users: Vec<&String> = current.difference(&snapshot.last_sudo_users).collect();
    if new_users.is_empty() {
        return (None, current);
    }

    let event = Event::new(
        "diff_detector",
        EventType::NewAdminUser,
        Severity::P2,
        format!("New sudo-capable user(s): {}", join(&new_users)),
        serde_json::json!({"new_users": new_users}),
    );
    (Some(event), current)
}

fn join(items: &[&String]) -> String {
    items.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ContainerInfo, ListeningPort};

    #[test]
    fn bootstraps_without_emitting_on_first_run() {
        let snapshot = Snapshot::default();
        let inventory = HostInventory {
            listening_ports: vec![ListeningPort { port: "22".into(), address: "0.0.0.0:22".into() }],
            ..Default::default()
        };
        let (event, current) = new_listening_ports(&snapshot, &inventory);
        assert!(event.is_none());
        assert_eq!(current.len(), 1);
    }

    #[test]
    fn detects_a_newly_opened_port() {
        let mut snapshot = Snapshot::default();
        snapshot.last_ports.insert("22".to_string());
        let inventory = HostInventory {
            listening_ports: vec![
                ListeningPort { port: "22".into(), address: "0.0.0.0:22".into() },
                ListeningPort { port: "4444".into(), address: "0.0.0.0:4444".into() },
            ],
            ..Default::default()
        };
        let (event, _) = new_listening_ports(&snapshot, &inventory);
        let event = event.expect("expected new port event");
        assert_eq!(event.event_type, EventType::NewListeningPort);
        assert_eq!(event.severity, Severity::P3);
    }

    #[test]
    fn detects_a_new_running_container_ignoring_stopped_ones() {
        let mut snapshot = Snapshot::default();
        snapshot.last_containers.insert("abc123".to_string());
        let inventory = DockerInventory {
            available: true,
            containers: vec![
                ContainerInfo { id: "abc123".into(), name: "a".into(), image: "i".into(), status: "Up".into(), running: true },
                ContainerInfo { id: "def456".into(), name: "b".into(), image: "i".into(), status: "Up".into(), running: true },
                ContainerInfo { id: "zzz999".into(), name: "c".into(), image: "i".into(), status: "Exited".into(), running: false },
            ],
            images: Vec::new(),
        };
        let (event, current) = new_containers(&snapshot, &inventory);
        let event = event.expect("expected new container event");
        assert_eq!(event.event_type, EventType::NewContainer);
        assert!(current.contains("def456"));
        assert!(!current.contains("zzz999"));
    }

    #[test]
    fn detects_a_new_sudo_user() {
        let mut snapshot = Snapshot::default();
        snapshot.last_sudo_users.insert("alice".to_string());
        let inventory = HostInventory {
            users_with_sudo: vec!["alice".to_string(), "mallory".to_string()],
            ..Default::default()
        };
        let (event, _) = new_admin_users(&snapshot, &inventory);
        let event = event.expect("expected new admin event");
        assert_eq!(event.event_type, EventType::NewAdminUser);
        assert_eq!(event.severity, Severity::P2);
    }
}
