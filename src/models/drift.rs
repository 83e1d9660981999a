use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping of absolute path -> SHA-256 hex digest, persisted as a single
/// atomic file. Every key was readable at baseline time; the baseline is
/// never rewritten automatically (see the rebaseline Open Question).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DriftBaseline {
    pub hashes: BTreeMap<String, String>,
}

impl DriftBaseline {
    pub fn new(hashes: BTreeMap<String, String>) -> Self {
        Self { hashes }
    }
}
