//! DRC Sim run server
//!
//! Interactive console that connects to a Wii U and serves the
//! simulated gamepad.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drc_core::config::{self, DrcConfig};
use drc_core::Region;
use drc_orchestrator::shell::{spawn_stdin_reader, AssumeYes, Console, ConsolePrompt, Prompt};
use drc_orchestrator::{Orchestrator, OrchestratorSettings, ProcessSupervisors, SystemInterfaces};

#[derive(Parser)]
#[command(name = "drc-sim-server")]
#[command(about = "Connects to a Wii U and runs the DRC Sim backend")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Detach the Wii U interface from NetworkManager without asking
    #[arg(short = 'y', long)]
    assume_yes: bool,

    /// Interface connecting to the Wii U; starts immediately with --normal
    #[arg(long, requires = "normal")]
    wii_u: Option<String>,

    /// Interface keeping normal connectivity
    #[arg(long, requires = "wii_u")]
    normal: Option<String>,

    /// Region passed to the backend (NONE, NA)
    #[arg(long, default_value = "NONE")]
    region: Region,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("DRC Sim server starting...");

    let config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                DrcConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            DrcConfig::default()
        }
    };

    let cancel = CancellationToken::new();

    let input = spawn_stdin_reader();
    let prompt: Arc<dyn Prompt> = if args.assume_yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(ConsolePrompt::new(Arc::clone(&input), cancel.clone()))
    };

    let (orchestrator, updates) = Orchestrator::new(
        Arc::new(SystemInterfaces::new(config.network.clone())),
        Arc::new(ProcessSupervisors::new(config.clone())),
        prompt,
        OrchestratorSettings::from(&config),
    );

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    let pump = tokio::spawn(Arc::clone(&orchestrator).run_status_pump(updates, cancel.clone()));

    let mut console = Console::new(
        Arc::clone(&orchestrator),
        input,
        config.credentials_path.clone(),
        args.json,
    );

    let listing = orchestrator.activate().await;
    tracing::info!(
        "{} interfaces, {} Wii U compatible",
        listing.all.len(),
        listing.compatible.len()
    );

    if let (Some(wii_u), Some(normal)) = (args.wii_u, args.normal) {
        console.start(wii_u, normal, args.region).await;
    }

    console.run(cancel.clone()).await;

    orchestrator.deactivate().await;
    cancel.cancel();
    pump.await.context("Status pump panicked")?;

    tracing::info!("DRC Sim server shutdown complete");
    Ok(())
}
