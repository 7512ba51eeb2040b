use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_config::{ConfigLoad, ConfigLoader, Config, DetectorConfigSource};
use vigil_server::{create_app, infra::startup};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "vigil-server")]
#[command(about = "Suspicious account detection service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to vigil.toml (overrides VIGIL_CONFIG_PATH)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a .env file
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Delete every stored verdict and exit
    PurgeVerdicts {
        /// Confirm the purge
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Scan the whole account population once and exit
    Scan {
        /// Accounts per batch (defaults to detector.scan_batch_size)
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_runtime_config(&cli.serve)?;

    match cli.command {
        Some(Command::PurgeVerdicts { yes }) => run_purge(config, yes).await,
        Some(Command::Scan { batch_size }) => run_scan(config, batch_size).await,
        None => run_server(config).await,
    }
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Arc<Config>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = args.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vigil=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration loaded from file");
    }
    match &config.metadata.detector_source {
        DetectorConfigSource::Default => info!("detector settings: defaults"),
        DetectorConfigSource::EnvPath(path) => {
            info!(path = %path.display(), "detector settings loaded from env path")
        }
        DetectorConfigSource::EnvInline => {
            info!("detector settings loaded from inline environment json")
        }
        DetectorConfigSource::File(path) => {
            info!(path = %path.display(), "detector settings loaded from file")
        }
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    Ok(Arc::new(config))
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address()))?;
    let state = startup::build_state(Arc::clone(&config)).await?;
    let router = create_app(state);

    info!("Starting Vigil (HTTP) on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Vigil stopped");
    Ok(())
}

async fn run_purge(config: Arc<Config>, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("refusing to purge verdicts without --yes");
    }
    let state = startup::build_state(config).await?;
    let removed = state
        .orchestrator
        .purge_verdicts()
        .await
        .context("failed to purge verdicts")?;
    info!(removed, "verdicts purged");
    Ok(())
}

async fn run_scan(config: Arc<Config>, batch_size: Option<usize>) -> anyhow::Result<()> {
    let batch_size = batch_size.unwrap_or(config.detector.scan_batch_size);
    let state = startup::build_state(config).await?;
    let summary = state
        .scanner
        .run_to_completion(batch_size)
        .await
        .context("scan failed")?;
    info!(
        batches = summary.batches,
        processed = summary.processed,
        flagged = summary.flagged,
        "scan complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
