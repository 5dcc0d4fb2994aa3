//! Gatepass server.
//!
//! Serves ticket issuance and door scanning over HTTP.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Installs the Prometheus recorder
//! - Connects the configured ticket store (`memory`, `redis` or `postgres`)
//! - Serves the API until Ctrl+C, then drains in-flight requests
//!
//! # Usage
//!
//! ```bash
//! GATEPASS_STORE=redis REDIS_URL=redis://localhost:6379 cargo run --bin gatepass-server
//! ```

use anyhow::Context as _;
use gatepass_core::SystemClock;
use gatepass_tickets::metrics::describe_metrics;
use gatepass_tickets::providers::{ConsoleNotifier, TicketStore};
use gatepass_tickets::stores::{InMemoryTicketStore, RedisTicketStore};
use gatepass_tickets::{OsTokenGenerator, TicketEnvironment};
use gatepass_web::{AppState, Config, StoreBackend, build_router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gatepass=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gatepass server");

    let config = Config::from_env();
    tracing::info!(
        address = %config.server.bind_address(),
        store = %config.store.backend,
        metrics = config.server.metrics_enabled,
        "Configuration loaded"
    );

    let metrics = if config.server.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install Prometheus recorder")?;
        describe_metrics();
        Some(handle)
    } else {
        None
    };

    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory ticket store; tickets are lost on restart");
            serve(InMemoryTicketStore::new(), &config, metrics).await
        }
        StoreBackend::Redis => {
            let store = RedisTicketStore::new(&config.store.redis_url).await?;
            serve(store, &config, metrics).await
        }
        StoreBackend::Postgres => serve_postgres(&config, metrics).await,
    }
}

#[cfg(feature = "postgres")]
async fn serve_postgres(config: &Config, metrics: Option<PrometheusHandle>) -> anyhow::Result<()> {
    use gatepass_tickets::stores::PostgresTicketStore;
    use sqlx::postgres::PgPoolOptions;

    let pool = PgPoolOptions::new()
        .max_connections(config.store.database_max_connections)
        .acquire_timeout(config.store.database_connect_timeout)
        .connect(&config.store.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    let store = PostgresTicketStore::new(pool);
    store.migrate().await?;
    tracing::info!("Migrations complete");

    serve(store, config, metrics).await
}

#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
async fn serve_postgres(_config: &Config, _metrics: Option<PrometheusHandle>) -> anyhow::Result<()> {
    anyhow::bail!("GATEPASS_STORE=postgres requires the `postgres` feature")
}

async fn serve<S>(store: S, config: &Config, metrics: Option<PrometheusHandle>) -> anyhow::Result<()>
where
    S: TicketStore + Clone + 'static,
{
    let env = TicketEnvironment::new(
        store,
        OsTokenGenerator,
        ConsoleNotifier::new(),
        Arc::new(SystemClock),
    );
    let state = AppState::new(env, config.tickets.clone()).with_metrics(metrics);
    let app = build_router(state);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "Gatepass server listening");

    let shutdown = Arc::new(Notify::new());
    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown({
                let shutdown = Arc::clone(&shutdown);
                async move { shutdown.notified().await }
            })
            .into_future(),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully...");
    shutdown.notify_one();

    match tokio::time::timeout(config.server.shutdown_timeout, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            timeout_secs = config.server.shutdown_timeout.as_secs(),
            "Shutdown timed out with requests still in flight"
        ),
    }

    Ok(())
}
