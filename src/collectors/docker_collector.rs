use std::sync::Arc;

use crate::ports::{DockerInventory, Inspector};

/// Pure probe: missing daemon/client degrades to `available: false`, never
/// an error, per `Inspector::docker_inventory`'s own contract.
pub struct DockerCollector {
    inspector: Arc<dyn Inspector>,
}

impl DockerCollector {
    pub fn new(inspector: Arc<dyn Inspector>) -> Self {
        Self { inspector }
    }

    pub async fn collect(&self) -> DockerInventory {
        self.inspector.docker_inventory().await
    }
}
