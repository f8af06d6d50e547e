//! Confidant relay entry point.
//!
//! Binary name: `confidant`
//!
//! Loads configuration, opens the flat-file store, wires the
//! orchestration engine to the OpenAI-compatible completion adapter and
//! the logging transport, starts the proactive scheduler, and serves
//! the HTTP surface (health check plus the inbound delivery callback).

mod http;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use confidant_core::chance::RandChance;
use confidant_core::clock::SystemClock;
use confidant_core::proactive::ProactiveScheduler;
use confidant_core::processor::TurnProcessor;
use confidant_infra::config::load_relay_config;
use confidant_infra::engine::OpenAiCompatEngine;
use confidant_infra::store::JsonFileStore;
use confidant_infra::transport::LogTransport;

use state::AppState;

#[derive(Parser)]
#[command(name = "confidant", version, about = "Personal conversational-agent relay")]
struct Cli {
    /// Directory holding config.toml and data.json.
    #[arg(long, default_value = ".confidant")]
    data_dir: PathBuf,

    /// Bind host for the HTTP surface.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Bind port for the HTTP surface.
    #[arg(long, default_value_t = 8686)]
    port: u16,

    /// Completion engine base URL.
    #[arg(long, env = "CONFIDANT_ENGINE_URL", default_value = "https://api.openai.com")]
    engine_url: String,

    /// Completion engine API key.
    #[arg(long, env = "CONFIDANT_ENGINE_KEY", hide_env_values = true)]
    engine_key: String,

    /// Export spans via the OpenTelemetry stdout exporter.
    #[arg(long)]
    otel: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    confidant_observe::tracing_setup::init_tracing(cli.otel)
        .map_err(|err| anyhow::anyhow!("tracing init failed: {err}"))?;

    let config = Arc::new(load_relay_config(&cli.data_dir).await);
    let clock = Arc::new(SystemClock::new(config.utc_offset()));
    let store = Arc::new(JsonFileStore::open(cli.data_dir.join("data.json")).await?);
    let engine = Arc::new(OpenAiCompatEngine::new(
        SecretString::from(cli.engine_key),
        cli.engine_url,
    ));
    let transport = Arc::new(LogTransport);

    let processor = Arc::new(TurnProcessor::new(
        config, clock, store, engine, transport,
    ));
    let scheduler = Arc::new(ProactiveScheduler::new(
        Arc::clone(&processor),
        Arc::new(RandChance),
    ));

    let cancel = CancellationToken::new();
    let scheduler_task = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "confidant relay listening");

    let router = http::router::build_router(AppState { processor });
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    let _ = scheduler_task.await;
    confidant_observe::tracing_setup::shutdown_tracing();
    tracing::info!("confidant relay stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
