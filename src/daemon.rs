use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::collectors::{DockerCollector, HostCollector};
use crate::config::Config;
use crate::correlator;
use crate::detectors::{self, diff};
use crate::drift::DriftMonitor;
use crate::llm_agent;
use crate::models::{Event, Incident, Snapshot};
use crate::normalizer;
use crate::policy::PolicyEngine;
use crate::ports::{Chat, Docker, Inspector};
use crate::reporter::Reporter;
use crate::responder::Responder;
use crate::sinks::{ActivitySink, AuditSink};
use crate::threat_registry::ThreatRegistry;

/// Top-level orchestrator: owns the running `Snapshot`, wires collectors ->
/// detectors -> correlator -> policy engine -> responder -> reporter, and
/// manages the background task lifecycle.
pub struct Daemon {
    config: Config,
    inspector: Arc<dyn Inspector>,
    docker: Arc<dyn Docker>,
    chat: Option<Arc<dyn Chat>>,
    audit: Arc<AuditSink>,
    activity: Arc<ActivitySink>,
    reporter: Arc<Reporter>,
    threat_registry: Arc<ThreatRegistry>,
    snapshot: Arc<RwLock<Snapshot>>,
}

impl Daemon {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        inspector: Arc<dyn Inspector>,
        docker: Arc<dyn Docker>,
        chat: Option<Arc<dyn Chat>>,
        audit: Arc<AuditSink>,
        activity: Arc<ActivitySink>,
        reporter: Arc<Reporter>,
        threat_registry: Arc<ThreatRegistry>,
    ) -> Self {
        Self {
            config,
            inspector,
            docker,
            chat,
            audit,
            activity,
            reporter,
            threat_registry,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
        }
    }

    /// Spawns every background task and blocks until `shutdown` fires, then
    /// aborts every task in LIFO order.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let intervals = self.config.effective_intervals();
        let (event_tx, mut event_rx) = mpsc::channel::<Event>(256);

        let digest_task = tokio::spawn(self.reporter.clone().run_digest_loop());
        let collector_task = self.clone().spawn_collector_task(event_tx.clone(), &intervals);
        let drift_task = self.clone().spawn_drift_task(event_tx.clone(), intervals.drift_interval_sec);
        let detector_task = self.clone().spawn_detector_task(event_tx.clone(), intervals.detector_interval_sec);
        let llm_task = self.clone().spawn_llm_scan_task(intervals.llm_scan_interval_sec);

        let processor = {
            let daemon = self.clone();
            tokio::spawn(async move {
                loop {
                    match tokio::time::timeout(Duration::from_secs(5), event_rx.recv()).await {
                        Ok(Some(event)) => daemon.handle_event(event).await,
                        Ok(None) => break,
                        Err(_) => continue,
                    }
                }
            })
        };

        let _ = shutdown.changed().await;
        info!("shutdown signal received, stopping background tasks");

        for task in [llm_task, Some(detector_task), Some(drift_task), Some(collector_task)]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
        processor.abort();
        digest_task.abort();
    }

    async fn handle_event(&self, event: Event) {
        if event.event_type.is_inventory() {
            return;
        }

        let incident = correlator::correlate(event);
        if let Err(e) = self.audit.log_incident(&incident).await {
            error!(error = %e, "failed to write incident to audit log");
        }

        let allowed_actions = PolicyEngine::allowed_actions(&incident, &self.config, Utc::now());
        let responder = Responder::new(self.docker.clone());
        let mut incident = incident;
        responder.apply(&mut incident, &allowed_actions, &self.audit, &self.activity).await;

        if incident.severity.is_high() {
            self.resolve_with_agent(&mut incident).await;
        }

        self.reporter.report_incident(incident).await;
    }

    /// Runs the LLM agent in `resolve` mode against a P1/P2 incident. A
    /// threat record is stored before the loop starts and marked resolved
    /// with whatever commands the agent actually executed once it finishes;
    /// this is separate from the `stop_container`/`block_ip_temporary`
    /// actions the policy engine already applied above.
    async fn resolve_with_agent(&self, incident: &mut Incident) {
        if !self.config.llm_agent.enabled || !self.config.llm_agent.run_on_incident {
            return;
        }
        let Some(chat) = self.chat.clone() else {
            return;
        };

        let redacted_narrative = llm_agent::redact::redact(&incident.narrative, &self.config.llm.redact_patterns);
        let threat_id = match self
            .threat_registry
            .store(&incident.title, &redacted_narrative, incident.severity, incident.evidence_summary.clone())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "failed to store threat record before agent resolve run");
                return;
            }
        };

        let threat_context = self.threat_registry.load_recent(15).await;
        let resolve_context = format!("Incident to resolve:\n{redacted_narrative}\n\n{threat_context}");
        let prompt = llm_agent::prompts::get_system_prompt("resolve", &resolve_context, &self.config.llm);

        let result = llm_agent::run(
            chat,
            self.config.llm.model_for_resolve(),
            &self.config.llm,
            &self.config.llm_agent,
            &prompt,
            &self.activity,
        )
        .await;

        for cmd in &result.commands_executed {
            incident.record_action(format!("agent ran: {cmd}"));
        }

        if let Err(e) = self.threat_registry.mark_resolved(&threat_id, result.commands_executed).await {
            error!(error = %e, threat_id, "failed to mark threat resolved after agent run");
        }
        self.reporter.send_resolution_notification(incident).await;
    }

    fn spawn_collector_task(
        self: Arc<Self>,
        event_tx: mpsc::Sender<Event>,
        intervals: &crate::config::EffectiveIntervals,
    ) -> JoinHandle<()> {
        let host_secs = intervals.host_interval_sec.max(1);
        let docker_secs = intervals.docker_interval_sec.max(1);
        tokio::spawn(async move {
            let host_collector = HostCollector::new(self.inspector.clone());
            let docker_collector = DockerCollector::new(self.inspector.clone());
            let mut host_timer = tokio::time::interval(Duration::from_secs(host_secs));
            let mut docker_timer = tokio::time::interval(Duration::from_secs(docker_secs));

            loop {
                tokio::select! {
                    _ = host_timer.tick() => {
                        let inventory = host_collector.collect().await;
                        let _ = self.activity.log_collector_run("host", true, serde_json::json!({})).await;

                        let mut snapshot = self.snapshot.write().await;
                        let (port_event, new_ports) = diff::new_listening_ports(&snapshot, &inventory);
                        let (admin_event, new_admins) = diff::new_admin_users(&snapshot, &inventory);
                        snapshot.last_ports = new_ports;
                        snapshot.last_sudo_users = new_admins;
                        snapshot.last_host_inventory = serde_json::to_value(&inventory).ok();
                        drop(snapshot);

                        let inventory_event = normalizer::host_inventory_to_event(&inventory);
                        let _ = event_tx.send(inventory_event).await;
                        for event in [port_event, admin_event].into_iter().flatten() {
                            let _ = event_tx.send(event).await;
                        }
                    }
                    _ = docker_timer.tick() => {
                        let inventory = docker_collector.collect().await;
                        let _ = self.activity.log_collector_run("docker", inventory.available, serde_json::json!({})).await;

                        let mut snapshot = self.snapshot.write().await;
                        let (container_event, new_containers) = diff::new_containers(&snapshot, &inventory);
                        snapshot.last_containers = new_containers;
                        snapshot.last_docker_inventory = serde_json::to_value(&inventory).ok();
                        drop(snapshot);

                        if let Some(event) = normalizer::docker_inventory_to_event(&inventory) {
                            let _ = event_tx.send(event).await;
                        }
                        if let Some(event) = container_event {
                            let _ = event_tx.send(event).await;
                        }
                    }
                }
            }
        })
    }

    fn spawn_drift_task(self: Arc<Self>, event_tx: mpsc::Sender<Event>, interval_secs: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let baseline_path = std::path::Path::new(&self.config.agent.data_dir).join("drift_baseline.json");
            let monitor = DriftMonitor::new(self.config.collector.critical_files.clone(), baseline_path);
            let mut timer = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                timer.tick().await;
                match monitor.check().await {
                    Ok(events) => {
                        let _ = self.activity.log_detector_run("drift", events.len()).await;
                        for event in events {
                            let _ = event_tx.send(event).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "drift check failed"),
                }
            }
        })
    }

    fn spawn_detector_task(self: Arc<Self>, event_tx: mpsc::Sender<Event>, interval_secs: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                timer.tick().await;
                let events = detectors::run_probe_detectors(&self.config.detector).await;
                let _ = self.activity.log_detector_run("probes", events.len()).await;
                for event in events {
                    let _ = event_tx.send(event).await;
                }
            }
        })
    }

    fn spawn_llm_scan_task(self: Arc<Self>, interval_secs: u64) -> Option<JoinHandle<()>> {
        if !self.config.llm_agent.enabled || interval_secs == 0 {
            return None;
        }
        let Some(chat) = self.chat.clone() else {
            warn!("llm_agent.enabled is true but no chat provider was configured");
            return None;
        };

        Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                timer.tick().await;
                let threat_context = self.threat_registry.load_recent(10).await;
                let prompt = llm_agent::prompts::get_system_prompt("scan", &threat_context, &self.config.llm);
                let result = llm_agent::run(
                    chat.clone(),
                    self.config.llm.model_for_scan(),
                    &self.config.llm,
                    &self.config.llm_agent,
                    &prompt,
                    &self.activity,
                )
                .await;

                if result.vulnerability_found {
                    if let Some(finding) = result.finding {
                        let severity = finding
                            .severity
                            .parse()
                            .unwrap_or(crate::models::Severity::P3);
                        match self
                            .threat_registry
                            .store(&finding.title, &finding.description, severity, serde_json::json!({}))
                            .await
                        {
                            Ok(threat_id) => {
                                self.reporter
                                    .send_vulnerability_alert(&threat_id, &finding.title, &finding.severity, &finding.description)
                                    .await;
                            }
                            Err(e) => error!(error = %e, "failed to persist threat record"),
                        }
                    }
                }
            }
        }))
    }
}
