use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Timelike, Utc};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::NotificationsConfig;
use crate::models::Incident;
use crate::ports::{EmailTransport, OutboundEmail, PdfRenderer};

/// Owns the pending digest queue and decides whether an incident also
/// warrants an immediate, out-of-band email. The digest itself is flushed
/// by a background task the daemon spawns around `run_digest_loop`.
pub struct Reporter {
    config: NotificationsConfig,
    email: Arc<dyn EmailTransport>,
    pdf: Arc<dyn PdfRenderer>,
    pending_digest: Mutex<Vec<Incident>>,
    reports_dir: PathBuf,
}

impl Reporter {
    pub fn new(
        config: NotificationsConfig,
        email: Arc<dyn EmailTransport>,
        pdf: Arc<dyn PdfRenderer>,
        reports_dir: PathBuf,
    ) -> Self {
        Self { config, email, pdf, pending_digest: Mutex::new(Vec::new()), reports_dir }
    }

    fn can_send(&self) -> bool {
        if self.config.admin_emails.is_empty() {
            return false;
        }
        match self.config.provider.as_str() {
            "resend" => !self.config.resend.api_key.is_empty(),
            _ => !self.config.smtp.host.is_empty(),
        }
    }

    /// Queues the incident for the next digest, and additionally sends an
    /// immediate alert when its severity is in `immediate_severities`.
    pub async fn report_incident(&self, incident: Incident) {
        let severity_str = incident.severity.to_string();
        let immediate = self.config.immediate_severities.iter().any(|s| s == &severity_str);

        if immediate && self.can_send() {
            self.send_immediate_alert(&incident).await;
        }

        self.pending_digest.lock().await.push(incident);
    }

    async fn send_immediate_alert(&self, incident: &Incident) {
        let body = format_incident_body(incident);
        let email = OutboundEmail {
            to: self.config.admin_emails.clone(),
            from: self.from_address(),
            subject: format!("[sentryd] {} incident: {}", incident.severity, incident.title),
            body,
            attachment: None,
        };
        if let Err(e) = self.email.send(email).await {
            warn!(error = %e, incident_id = %incident.incident_id, "failed to send immediate incident alert");
        }
    }

    pub async fn send_vulnerability_alert(&self, threat_id: &str, title: &str, severity: &str, description: &str) {
        if !self.can_send() {
            return;
        }
        let output_path = self.reports_dir.join(format!("{threat_id}.pdf"));
        let rendered = self.pdf.render_vulnerability_report(threat_id, title, severity, description, &output_path);

        let attachment = match rendered {
            Ok(path) => std::fs::read(&path).ok().map(|bytes| (format!("{threat_id}.pdf"), bytes)),
            Err(e) => {
                warn!(error = %e, threat_id, "failed to render vulnerability report");
                None
            }
        };

        let email = OutboundEmail {
            to: self.config.admin_emails.clone(),
            from: self.from_address(),
            subject: format!("[sentryd] Vulnerability found: {title}"),
            body: format!("Threat ID: {threat_id}\nSeverity: {severity}\n\n{description}"),
            attachment,
        };
        if let Err(e) = self.email.send(email).await {
            warn!(error = %e, threat_id, "failed to send vulnerability alert");
        }
    }

    pub async fn send_resolution_notification(&self, incident: &Incident) {
        if !self.can_send() {
            return;
        }
        let email = OutboundEmail {
            to: self.config.admin_emails.clone(),
            from: self.from_address(),
            subject: format!("[sentryd] Resolved: {}", incident.title),
            body: format!(
                "Incident {} was resolved.\n\nActions taken:\n{}",
                incident.incident_id,
                incident.actions_taken.join("\n"),
            ),
            attachment: None,
        };
        if let Err(e) = self.email.send(email).await {
            warn!(error = %e, incident_id = %incident.incident_id, "failed to send resolution notification");
        }
    }

    /// Runs forever: every minute, checks whether it's the configured
    /// digest time; if so, flushes and clears the pending queue, then
    /// sleeps roughly an hour before resuming the minute-granularity poll.
    pub async fn run_digest_loop(self: Arc<Self>) {
        loop {
            if !self.config.digest.enabled {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                continue;
            }

            let now = Utc::now();
            if now.hour() == self.config.digest.hour_utc && now.minute() >= self.config.digest.minute {
                self.flush_digest().await;
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                continue;
            }

            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    }

    async fn flush_digest(&self) {
        let mut pending = self.pending_digest.lock().await;
        if pending.is_empty() || !self.can_send() {
            pending.clear();
            return;
        }

        let top: Vec<&Incident> = pending.iter().take(20).collect();
        let body = top.iter().map(|i| format!("- [{}] {}", i.severity, i.title)).collect::<Vec<_>>().join("\n");

        let email = OutboundEmail {
            to: self.config.admin_emails.clone(),
            from: self.from_address(),
            subject: format!("[sentryd] Daily digest: {} incident(s)", pending.len()),
            body,
            attachment: None,
        };
        if let Err(e) = self.email.send(email).await {
            warn!(error = %e, "failed to send daily digest");
        }
        pending.clear();
    }

    fn from_address(&self) -> String {
        match self.config.provider.as_str() {
            "resend" => self.config.resend.from.clone(),
            _ => self.config.smtp.from.clone(),
        }
    }
}

fn format_incident_body(incident: &Incident) -> String {
    format!(
        "Severity: {}\nIncident: {}\n\n{}\n\nRecommended actions:\n{}\n\nEvidence:\n{}",
        incident.severity,
        incident.title,
        incident.narrative,
        incident.recommended_actions.join("\n"),
        serde_json::to_string_pretty(&incident.evidence_summary).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventType, Severity};
    use crate::ports::PdfRenderer;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf as StdPathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingEmail {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl EmailTransport for CountingEmail {
        async fn send(&self, _email: OutboundEmail) -> crate::error::Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoopPdf;
    impl PdfRenderer for NoopPdf {
        fn render_vulnerability_report(
            &self,
            _threat_id: &str,
            _title: &str,
            _severity: &str,
            _description: &str,
            output_path: &Path,
        ) -> crate::error::Result<StdPathBuf> {
            std::fs::write(output_path, "x")?;
            Ok(output_path.to_path_buf())
        }
    }

    fn notifications_config() -> NotificationsConfig {
        let mut cfg = crate::config::Config::load(None).unwrap().notifications;
        cfg.admin_emails = vec!["ops@example.com".to_string()];
        cfg.smtp.host = "smtp.example.com".to_string();
        cfg
    }

    #[tokio::test]
    async fn immediate_severity_sends_right_away() {
        let email = Arc::new(CountingEmail { sent: AtomicUsize::new(0) });
        let pdf = Arc::new(NoopPdf);
        let dir = tempdir().unwrap();
        let reporter = Reporter::new(notifications_config(), email.clone(), pdf, dir.path().to_path_buf());

        let event = Event::new("detector", EventType::AuthFailures, Severity::P1, "x", serde_json::json!({}));
        let incident = Incident::new(event, serde_json::json!({}), vec![]);
        reporter.report_incident(incident).await;

        assert_eq!(email.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_immediate_severity_only_queues_for_digest() {
        let email = Arc::new(CountingEmail { sent: AtomicUsize::new(0) });
        let pdf = Arc::new(NoopPdf);
        let dir = tempdir().unwrap();
        let reporter = Reporter::new(notifications_config(), email.clone(), pdf, dir.path().to_path_buf());

        let event = Event::new("detector", EventType::ConfigNewFile, Severity::P3, "x", serde_json::json!({}));
        let incident = Incident::new(event, serde_json::json!({}), vec![]);
        reporter.report_incident(incident).await;

        assert_eq!(email.sent.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.pending_digest.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_admin_emails_suppresses_everything() {
        let mut config = notifications_config();
        config.admin_emails.clear();
        let email = Arc::new(CountingEmail { sent: AtomicUsize::new(0) });
        let pdf = Arc::new(NoopPdf);
        let dir = tempdir().unwrap();
        let reporter = Reporter::new(config, email.clone(), pdf, dir.path().to_path_buf());

        let event = Event::new("detector", EventType::AuthFailures, Severity::P1, "x", serde_json::json!({}));
        let incident = Incident::new(event, serde_json::json!({}), vec![]);
        reporter.report_incident(incident).await;

        assert_eq!(email.sent.load(Ordering::SeqCst), 0);
    }
}
