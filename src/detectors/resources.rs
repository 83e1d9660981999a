use std::time::Duration;

use sysinfo::{CpuRefreshKind, ProcessRefreshKind, RefreshKind, System};
// sysinfo >= 0.30 exposes all accessors as inherent methods on `System`;
// no `...Ext` trait imports are needed.

use crate::config::DetectorConfig;
use crate::models::{Event, EventType, Severity};

/// Samples CPU and memory over a short window via `sysinfo`. Two
/// independent thresholds, each producing its own event.
pub async fn check(config: &DetectorConfig) -> Vec<Event> {
    if !config.resource_enabled {
        return Vec::new();
    }

    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_cpu(CpuRefreshKind::everything()).with_processes(ProcessRefreshKind::everything()),
    );
    sys.refresh_cpu();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    sys.refresh_cpu();
    sys.refresh_processes();

    let mut events = Vec::new();

    let cpu_percent = sys.global_cpu_info().cpu_usage() as f64;
    if cpu_percent >= config.resource_cpu_percent {
        let mut procs: Vec<_> = sys.processes().values().collect();
        procs.sort_by(|a, b| b.cpu_usage().partial_cmp(&a.cpu_usage()).unwrap_or(std::cmp::Ordering::Equal));
        let top: Vec<_> = procs
            .iter()
            .take(10)
            .map(|p| serde_json::json!({"pid": p.pid().as_u32(), "name": p.name(), "cpu_percent": p.cpu_usage()}))
            .collect();

        events.push(Event::new(
            "resource_detector",
            EventType::HighCpu,
            Severity::P2,
            format!("CPU usage at {cpu_percent:.1}%, threshold {}%", config.resource_cpu_percent),
            serde_json::json!({"cpu_percent": cpu_percent, "top_processes": top}),
        ));
    }

    let total_mem = sys.total_memory() as f64;
    let mem_percent = if total_mem > 0.0 { sys.used_memory() as f64 / total_mem * 100.0 } else { 0.0 };
    if mem_percent >= config.resource_memory_percent {
        events.push(Event::new(
            "resource_detector",
            EventType::HighMemory,
            Severity::P2,
            format!("Memory usage at {mem_percent:.1}%, threshold {}%", config.resource_memory_percent),
            serde_json::json!({"memory_percent": mem_percent}),
        ));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_detector_produces_no_events() {
        let mut cfg = crate::config::Config::load(None).unwrap().detector;
        cfg.resource_enabled = false;
        let events = check(&cfg).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn unreachable_thresholds_produce_no_events() {
        let mut cfg = crate::config::Config::load(None).unwrap().detector;
        cfg.resource_cpu_percent = 1000.0;
        cfg.resource_memory_percent = 1000.0;
        let events = check(&cfg).await;
        assert!(events.is_empty());
    }
}
