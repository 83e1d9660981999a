use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Incident/event severity, ordered from most (`P1`) to least (`P4`) urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
pub enum Severity {
    P1,
    P2,
    P3,
    P4,
}

impl Severity {
    /// Lower rank means more urgent; usable for sorting and threshold comparisons.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::P1 => 1,
            Severity::P2 => 2,
            Severity::P3 => 3,
            Severity::P4 => 4,
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Severity::P1 | Severity::P2)
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Lower rank sorts first so P1 < P2 < P3 < P4 in ascending "most urgent first" order.
        self.rank().cmp(&other.rank())
    }
}
