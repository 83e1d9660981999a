use crate::models::{Event, EventType, Severity};
use crate::ports::{DockerInventory, HostInventory};

/// Wraps raw inventory snapshots into events the correlator can route. Both
/// inventory event types are consumed by the correlator purely to update
/// the running snapshot and are never promoted to an incident.
pub fn host_inventory_to_event(inventory: &HostInventory) -> Event {
    Event::new(
        "host_collector",
        EventType::HostInventory,
        Severity::P4,
        format!("Host inventory: {}", inventory.hostname),
        serde_json::to_value(inventory).unwrap_or(serde_json::Value::Null),
    )
    .with_asset_ids(vec!["host".to_string()])
}

/// Returns no event when the daemon is unavailable, matching the daemon's
/// own "absence is not an error" contract.
pub fn docker_inventory_to_event(inventory: &DockerInventory) -> Option<Event> {
    if !inventory.available {
        return None;
    }

    let mut asset_ids = vec!["host".to_string()];
    asset_ids.extend(inventory.containers.iter().take(20).map(|c| c.id.clone()));

    Some(
        Event::new(
            "docker_collector",
            EventType::DockerInventory,
            Severity::P4,
            format!("Docker: {} containers, {} images", inventory.containers.len(), inventory.images.len()),
            serde_json::to_value(inventory).unwrap_or(serde_json::Value::Null),
        )
        .with_asset_ids(asset_ids),
    )
}
