use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

/// Containment actions the responder takes against Docker. Kept separate
/// from `Inspector` because it is a write-capable port (it stops
/// containers), not a read-only probe.
#[async_trait]
pub trait Docker: Send + Sync {
    /// Stop a single container by id. Returns `Ok(())` on a zero exit code.
    async fn stop_container(&self, container_id: &str) -> Result<(), String>;
}

pub struct ProcessDocker;

impl ProcessDocker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessDocker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Docker for ProcessDocker {
    async fn stop_container(&self, container_id: &str) -> Result<(), String> {
        let fut = Command::new("docker").args(["stop", container_id]).output();
        match timeout(Duration::from_secs(10), fut).await {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => Err(String::from_utf8_lossy(&output.stderr).to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("docker stop timed out".to_string()),
        }
    }
}
