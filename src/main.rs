use std::sync::Arc;

use clap::Parser;
use sentryd::config::Config;
use sentryd::daemon::Daemon;
use sentryd::ports::{build_chat, build_email_transport, ProcessDocker, ProcessInspector, TextFallbackPdfRenderer};
use sentryd::reporter::Reporter;
use sentryd::sinks::{ActivitySink, AuditSink};
use sentryd::threat_registry::ThreatRegistry;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sentryd", version, about = "Host security monitoring and response daemon")]
struct Args {
    /// Path to a YAML config file overriding the embedded defaults.
    #[arg(short, long, env = "SENTRYD_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "sentryd=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(args.config.as_deref())?;

    let warnings = config.validate_messages();
    for warning in &warnings {
        tracing::warn!(%warning, "configuration issue");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting sentryd");

    for dir in [&config.agent.data_dir, &config.agent.log_dir, &config.agent.run_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::error!(dir = %dir, error = %e, "failed to create required directory, exiting");
            return Err(Box::new(e));
        }
    }

    let inspector = Arc::new(ProcessInspector::new());
    let docker = Arc::new(ProcessDocker::new());
    let chat: Option<Arc<dyn sentryd::ports::Chat>> = if config.llm.enabled {
        Some(Arc::from(build_chat(&config.llm.provider, &config.llm.api_key, &config.llm.base_url)))
    } else {
        None
    };
    let email = Arc::from(build_email_transport(&config.notifications.provider, &config.notifications.smtp, &config.notifications.resend));
    let pdf = Arc::new(TextFallbackPdfRenderer);

    let audit = Arc::new(AuditSink::open(&config.audit.file).await?);
    let activity = Arc::new(ActivitySink::open(&config.activity.file, config.activity.enabled).await?);

    let reports_dir = std::path::Path::new(&config.agent.data_dir).join("reports");
    let reporter = Arc::new(Reporter::new(config.notifications.clone(), email, pdf, reports_dir));
    let threat_registry = Arc::new(ThreatRegistry::new(std::path::Path::new(&config.agent.data_dir).join("threats")));

    let daemon = Arc::new(Daemon::new(config, inspector, docker, chat, audit, activity, reporter, threat_registry));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run_handle = tokio::spawn(daemon.run(shutdown_rx));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    let _ = run_handle.await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
