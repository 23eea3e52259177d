//! HTTP exposition of the simulator.
//!
//! Provides three GET endpoints:
//! - `/health`: liveness, configured farm ids and server time
//! - `/ready`: 200 once the first cycle has been published, 503 before
//! - `/metrics`: Prometheus text exposition of the registry

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use chrono::Utc;
use prometheus::Registry;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::sim::engine::Engine;
use crate::sim::rng::RandomSource;
use crate::sink::PrometheusSink;
use crate::telemetry::shutdown_signal;

pub use types::{HealthResponse, ReadyResponse};

/// State shared across all request handlers.
///
/// Handlers only read the registry; the engine task is its only writer.
pub struct AppState {
    /// Configured farm identifiers, in fleet order.
    pub farm_ids: Vec<String>,
    /// Registry rendered on `/metrics`.
    pub registry: Arc<Registry>,
    ready: AtomicBool,
}

impl AppState {
    pub fn new(farm_ids: Vec<String>, registry: Arc<Registry>) -> Self {
        Self {
            farm_ids,
            registry,
            ready: AtomicBool::new(false),
        }
    }

    /// Flags the service as ready; called once the first cycle is published.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Builds the axum router with all routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/ready", get(handlers::get_ready))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
}

/// Runs the service: initial cycle, periodic ticking, and the HTTP server.
///
/// The first cycle runs before the listener accepts connections. Ticking
/// starts only once the listener is bound, and stops between cycles once a
/// shutdown signal has drained the server.
///
/// # Arguments
///
/// * `engine` - Engine to drive, moved into the ticking task
/// * `sink` - Prometheus sink the engine publishes into
/// * `addr` - Socket address to bind to
///
/// # Errors
///
/// Fails if the listener cannot bind to `addr` or the server errors.
pub async fn serve<R>(
    mut engine: Engine<R>,
    sink: PrometheusSink,
    addr: SocketAddr,
) -> anyhow::Result<()>
where
    R: RandomSource + Send + 'static,
{
    let farm_ids = engine.farms().iter().map(|f| f.id.clone()).collect();
    let state = Arc::new(AppState::new(farm_ids, sink.registry()));
    let interval_secs = engine.config().interval_secs;

    engine.publish_initial(&sink);
    engine.run_cycle(Utc::now(), &sink);
    state.mark_ready();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!(%addr, interval_secs, "metrics server listening");

    let ticking = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately and the initial cycle already ran
        interval.tick().await;
        loop {
            interval.tick().await;
            engine.run_cycle(Utc::now(), &sink);
        }
    });

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error");

    ticking.abort();
    info!("simulator stopped");
    served
}
