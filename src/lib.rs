pub mod collectors;
pub mod config;
pub mod correlator;
pub mod daemon;
pub mod detectors;
pub mod drift;
pub mod error;
pub mod llm_agent;
pub mod models;
pub mod normalizer;
pub mod policy;
pub mod ports;
pub mod reporter;
pub mod responder;
pub mod sinks;
pub mod threat_registry;

pub use error::{AppError, Result};
