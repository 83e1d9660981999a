use std::time::Duration;

use sysinfo::System;
// sysinfo >= 0.30 exposes all accessors as inherent methods; no `...Ext`
// trait imports are needed.

use crate::config::DetectorConfig;
use crate::models::{Event, EventType, Severity};

const SAMPLE_WINDOW_SECS: u64 = 2;

/// Sums bytes sent+received across all interfaces over a short sampling
/// window and converts to an MB/s rate.
pub async fn check(config: &DetectorConfig) -> Option<Event> {
    if !config.network_enabled {
        return None;
    }

    let mut sys = System::new_all();
    sys.refresh_networks();
    let before: u64 = sys.networks().iter().map(|(_, n)| n.total_received() + n.total_transmitted()).sum();

    tokio::time::sleep(Duration::from_secs(SAMPLE_WINDOW_SECS)).await;

    sys.refresh_networks();
    let after: u64 = sys.networks().iter().map(|(_, n)| n.total_received() + n.total_transmitted()).sum();

    let delta_bytes = after.saturating_sub(before);
    let mb_per_sec = (delta_bytes as f64 / 1_048_576.0) / SAMPLE_WINDOW_SECS as f64;

    if mb_per_sec < config.network_mb_per_sec_threshold {
        return None;
    }

    Some(Event::new(
        "network_detector",
        EventType::HighNetworkUsage,
        Severity::P3,
        format!("Network throughput at {mb_per_sec:.1} MB/s, threshold {} MB/s", config.network_mb_per_sec_threshold),
        serde_json::json!({"mb_per_sec": mb_per_sec}),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_detector_produces_no_event() {
        let mut cfg = crate::config::Config::load(None).unwrap().detector;
        cfg.network_enabled = false;
        assert!(check(&cfg).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_threshold_produces_no_event() {
        let mut cfg = crate::config::Config::load(None).unwrap().detector;
        cfg.network_mb_per_sec_threshold = 1_000_000.0;
        assert!(check(&cfg).await.is_none());
    }
}
