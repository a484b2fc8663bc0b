use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use route_agent::cache::token_cache::TokenCache;
use route_agent::credentials::manager::CredentialManager;
use route_agent::discovery::cloud_run::CloudRunDirectory;
use route_agent::reconciler::{Reconciler, ReconcilerSettings};
use route_agent::server;
use route_agent::sinks::sink_file::FileSink;
use route_agent::utils::channel;
use route_agent::utils::config_loader;
use route_agent::utils::logging;
use route_agent::utils::logging::LogLevel;
use tokio::signal::unix::{signal, SignalKind};
use tokio::select;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "route-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// run a single reconciliation cycle, write the snapshot and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level.to_owned()).await?;

    // -------------------------------
    // 2. Handoff slot and its consumer
    // -------------------------------

    let (tx, rx) = channel::run();
    let sink = FileSink::new(&service_config.output.path);
    let sink_task = tokio::spawn(sink.run(rx));

    // -------------------------------
    // 3. Directory, credentials, reconciler
    // -------------------------------

    let credentials = CredentialManager::from_config(&service_config.credentials, TokenCache::new())?;
    let directory = CloudRunDirectory::from_config(&service_config)?;
    let reconciler = Arc::new(Reconciler::new(
        directory,
        credentials,
        ReconcilerSettings::from_config(&service_config),
    ));

    if args.once {
        reconciler.reconcile_once(&tx).await?;
        drop(tx);
        sink_task.await??;
        info!("single reconciliation finished");
        return Ok(());
    }

    // -------------------------------
    // 4. Start the loop (first cycle inline) and the metrics server
    // -------------------------------

    info!(projects = ?service_config.discovery.project_ids, region = %service_config.discovery.region, "Service starting...");
    let handle = reconciler.start(tx).await?;

    let settings = service_config.settings.clone();
    let http_server = tokio::spawn(async move {
        if let Err(e) = server::server::start(&settings).await {
            error!("http server stopped: {:#}", e);
        }
    });

    // -------------------------------
    // 5. Wait for shutdown
    // -------------------------------

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    select! {
        _ = sigint.recv() => info!("Received SIGINT (Ctrl+C). Initiating graceful shutdown..."),
        _ = sigterm.recv() => info!("Received SIGTERM. Initiating graceful shutdown..."),
    }

    handle.stop();
    handle.join().await?;
    // the loop owned the last sender, so the sink drains and exits
    sink_task.await??;
    http_server.abort();
    info!("Exiting application.");

    Ok(())
}
