use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, TimeZone, Utc};

use crate::config::DetectorConfig;
use crate::models::{Event, EventType, Severity};

const CANDIDATE_LOG_PATHS: &[&str] = &["/var/log/auth.log", "/var/log/secure"];

/// Counts recent authentication failures in the first readable system auth
/// log, within a true time-bounded window (parsed from each line's syslog
/// timestamp), not merely "the last N lines".
pub fn check(config: &DetectorConfig) -> Option<Event> {
    if !config.auth_failure_enabled {
        return None;
    }

    let path = CANDIDATE_LOG_PATHS.iter().find(|p| std::path::Path::new(p).exists())?;
    let contents = std::fs::read_to_string(path).ok()?;
    let window = Duration::seconds(config.auth_failure_window_sec);
    let cutoff = Utc::now() - window;

    let count = contents
        .lines()
        .filter(|line| is_failure_line(line))
        .filter(|line| parse_syslog_timestamp(line).map(|ts| ts >= cutoff).unwrap_or(false))
        .count();

    if count < config.auth_failure_threshold as usize {
        return None;
    }

    let confidence = (count as f64 / (2.0 * config.auth_failure_threshold as f64)).min(1.0);

    Some(
        Event::new(
            "auth_detector",
            EventType::AuthFailures,
            Severity::P2,
            format!("{count} authentication failures in the last {}s", config.auth_failure_window_sec),
            serde_json::json!({"count": count, "window_sec": config.auth_failure_window_sec, "log_path": path}),
        )
        .with_confidence(confidence),
    )
}

fn is_failure_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("failed password") || lower.contains("invalid user") || lower.contains("authentication failure")
}

/// Parses the leading `"Mon DD HH:MM:SS"` syslog timestamp, assuming the
/// current year and local timezone (syslog carries neither).
fn parse_syslog_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let prefix: String = line.splitn(4, ' ').take(3).collect::<Vec<_>>().join(" ");
    let year = Local::now().year();
    let with_year = format!("{year} {prefix}");
    let naive = NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S").ok()?;
    Local.from_local_datetime(&naive).single().map(|dt| dt.with_timezone(&Utc))
}
