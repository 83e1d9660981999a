//! Trait boundaries separating core pipeline logic from external
//! collaborators: raw host/container inspection, the LLM wire protocol,
//! email transport, and PDF rendering. Each has one concrete implementation
//! good enough to run for real, but tests exercise the core against fakes.

pub mod chat;
pub mod docker;
pub mod email;
pub mod inspector;
pub mod pdf;

pub use chat::{Chat, ChatMessage, ChatRole};
pub use docker::Docker;
pub use email::EmailTransport;
pub use inspector::{HostInventory, DockerInventory, Inspector};
pub use pdf::PdfRenderer;
