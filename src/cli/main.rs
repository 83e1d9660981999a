use clap::{Parser, Subcommand};
use sentryd::config::Config;
use std::error::Error;
use std::path::Path;

#[derive(Parser)]
#[command(name = "sentryd-cli")]
#[command(about = "sentryd operator CLI", long_about = None)]
struct Cli {
    /// Path to a YAML config file overriding the embedded defaults.
    #[arg(short, long, env = "SENTRYD_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground (equivalent to invoking `sentryd` directly).
    Run,

    /// Load and validate configuration without starting anything.
    Validate,

    /// Delete the persisted drift baseline so the next daemon cycle rebuilds it.
    Rebaseline,

    /// Print a summary of the current on-disk state (baseline, threats, sinks).
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => {
            eprintln!("sentryd-cli run is a thin wrapper; use the `sentryd` binary to run the daemon itself.");
            let status = tokio::process::Command::new(std::env::current_exe()?.with_file_name("sentryd")).status().await?;
            std::process::exit(status.code().unwrap_or(1));
        }

        Commands::Validate => {
            let warnings = config.validate_messages();
            if warnings.is_empty() {
                println!("configuration is valid");
            } else {
                for warning in &warnings {
                    println!("warning: {warning}");
                }
                std::process::exit(1);
            }
        }

        Commands::Rebaseline => {
            let baseline_path = Path::new(&config.agent.data_dir).join("drift_baseline.json");
            if baseline_path.exists() {
                std::fs::remove_file(&baseline_path)?;
                println!("removed {}; the next drift cycle will rebuild the baseline", baseline_path.display());
            } else {
                println!("no baseline found at {}; nothing to do", baseline_path.display());
            }
        }

        Commands::Status => {
            let data_dir = Path::new(&config.agent.data_dir);
            let baseline_path = data_dir.join("drift_baseline.json");
            let threats_dir = data_dir.join("threats");

            println!("data_dir: {}", data_dir.display());
            println!("drift baseline present: {}", baseline_path.exists());

            let threat_count = std::fs::read_dir(&threats_dir).map(|rd| rd.count()).unwrap_or(0);
            println!("threat records: {threat_count}");

            println!("audit log: {} (exists: {})", config.audit.file, Path::new(&config.audit.file).exists());
            println!(
                "activity log: {} (enabled: {}, exists: {})",
                config.activity.file,
                config.activity.enabled,
                Path::new(&config.activity.file).exists()
            );
        }
    }

    Ok(())
}
