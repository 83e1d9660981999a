use std::sync::Arc;

use crate::ports::{HostInventory, Inspector};

/// Pure probe: holds no state between calls, delegates the actual
/// subprocess work to the injected `Inspector` port.
pub struct HostCollector {
    inspector: Arc<dyn Inspector>,
}

impl HostCollector {
    pub fn new(inspector: Arc<dyn Inspector>) -> Self {
        Self { inspector }
    }

    pub async fn collect(&self) -> HostInventory {
        self.inspector.host_inventory().await
    }
}
