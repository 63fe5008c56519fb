//! intel-synth - Intelligence Synthesis Service
//!
//! Turns a conversation transcript into search queries, fans the queries out
//! to a search-augmented completion service, and renders the findings as a
//! brief, email, report or podcast on request.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use intel_common::config::{load_toml_config, resolve_config_path};
use intel_synth::config::{build_services, Credentials, ModelSettings};
use intel_synth::AppState;

/// Command-line arguments for intel-synth
#[derive(Parser, Debug)]
#[command(name = "intel-synth")]
#[command(about = "Transcript-to-intelligence synthesis service")]
#[command(version)]
struct Args {
    /// Bootstrap TOML config file
    #[arg(short, long, env = "INTEL_SYNTH_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long, env = "INTEL_SYNTH_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "INTEL_SYNTH_PORT")]
    port: Option<u16>,

    /// Log level (overrides config; RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("intel_synth={level},intel_common={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting intel-synth (Intelligence Synthesis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Git: {} built {}", env!("GIT_HASH"), env!("BUILD_TIMESTAMP"));
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using built-in defaults"),
    }

    let credentials = Credentials::resolve(&config);
    if credentials.completion.is_none() || credentials.search.is_none() {
        warn!("Completion or search API key missing: /pipeline/run will answer 503 until configured");
    }
    if credentials.speech.is_none() {
        warn!("Speech API key missing: podcast rendering disabled");
    }

    let services = build_services(&config, &credentials).context("Failed to build service clients")?;
    let models = ModelSettings::from_config(&config.completion);
    info!(
        extraction = %models.extraction,
        render = %models.render,
        long_form = ?models.long_form,
        "Models configured"
    );

    let state = AppState::new(services, models, config.pipeline.clone());
    let app = intel_synth::build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
