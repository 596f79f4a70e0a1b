//! Symbol Stream Binary
//!
//! Starts the resilient market data feed client.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin symbol-stream
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FEED_URL`: Feed WebSocket URL
//! - `FEED_IDENTITY_TOKEN`: Bearer identity token
//! - `FEED_ACCOUNT_ID`: Account identifier
//!
//! ## Optional
//! - `FEED_SYMBOLS`: Comma-separated topics, e.g. "NSE:SBIN-EQ,NSE:RELIANCE-EQ"
//! - `FEED_HEARTBEAT_INTERVAL_SECS`: Probe interval (default: 20)
//! - `FEED_HEARTBEAT_TIMEOUT_SECS`: Probe response timeout (default: 10)
//! - `FEED_RECONNECT_DELAY_INITIAL_MS`: Initial retry delay (default: 5000)
//! - `FEED_RECONNECT_DELAY_MAX_SECS`: Maximum retry delay (default: 5)
//! - `FEED_RECONNECT_DELAY_MULTIPLIER`: Delay multiplier (default: 1.0)
//! - `FEED_RECONNECT_JITTER_FACTOR`: Delay jitter fraction (default: 0.0)
//! - `FEED_MAX_RECONNECT_ATTEMPTS`: Attempt cap, 0 = unlimited (default: 0)
//! - `FEED_DISPATCH_QUEUE_CAPACITY`: Consumer hand-off queue size (default: 4096)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: symbol-stream)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use symbol_stream::infrastructure::telemetry;
use symbol_stream::{
    Consumer, DecodedMessage, Dispatcher, EnvCredentialSource, FeedConfig, FeedSupervisor,
    SupervisorConfig, TopicSet, WsTransport,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting symbol stream client");

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Topic set, replayed in full on every (re)connect
    let topics = Arc::new(TopicSet::with_topics(config.symbols.clone()));

    // Dispatcher and its delivery worker
    let (dispatcher, dispatch_worker) =
        Dispatcher::new(&config.dispatch, shutdown_token.clone());
    dispatcher.register_consumer(Arc::new(LogConsumer));
    tokio::spawn(dispatch_worker.run());

    // Supervisor owning the single live connection
    let supervisor = Arc::new(FeedSupervisor::new(
        SupervisorConfig::from_feed_config(&config),
        Arc::new(WsTransport::new()),
        Arc::new(EnvCredentialSource::new()),
        Arc::clone(&topics),
        dispatcher,
        shutdown_token.clone(),
    ));

    let supervisor_task = Arc::clone(&supervisor);
    let supervisor_handle = tokio::spawn(async move {
        if let Err(e) = supervisor_task.run().await {
            tracing::error!(error = %e, "Feed supervisor error");
        }
    });

    tracing::info!("Feed client ready");

    await_shutdown(shutdown_token).await;
    let _ = supervisor_handle.await;

    tracing::info!("Feed client stopped");
    Ok(())
}

/// Default consumer that logs every decoded message.
struct LogConsumer;

impl Consumer for LogConsumer {
    fn on_message(&self, message: DecodedMessage) {
        tracing::info!(
            kind = ?message.kind,
            symbol = message.symbol(),
            "feed message"
        );
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        url = %config.url,
        symbols = config.symbols.len(),
        heartbeat_interval_secs = config.websocket.heartbeat_interval.as_secs(),
        heartbeat_timeout_secs = config.websocket.heartbeat_timeout.as_secs(),
        reconnect_delay_ms =
            u64::try_from(config.websocket.reconnect_delay_initial.as_millis()).unwrap_or(u64::MAX),
        max_reconnect_attempts = config.websocket.max_reconnect_attempts,
        dispatch_queue_capacity = config.dispatch.queue_capacity,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
