use std::any::Any;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::TelemetryError;
use crate::handlers::{self, AppState};

/// Build the metrics router: exact-match dispatch over the scrape surface,
/// with every unmatched path answered by the permissive empty-200 fallback.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics/v1/server", get(handlers::gauges::server))
        .route("/metrics/v1/process", get(handlers::gauges::process))
        .route("/metrics/v1/load", get(handlers::logs::load))
        .route("/metrics/v1/events", get(handlers::logs::events))
        .route("/metrics/v1/players", get(handlers::logs::players))
        .route("/metrics/v1/session/grids", get(handlers::session::grids))
        .route(
            "/metrics/v1/session/asteroids",
            get(handlers::session::asteroids),
        )
        .route(
            "/metrics/v1/session/planets",
            get(handlers::session::planets),
        )
        .route(
            "/metrics/v1/session/floatingObjects",
            get(handlers::session::floating_objects),
        )
        .route(
            "/metrics/v1/session/factions",
            get(handlers::session::factions),
        )
        .fallback(handlers::unknown_path)
        // A faulting handler degrades its own response; the server keeps
        // serving. Degraded conditions never surface as an error status.
        .layer(CatchPanicLayer::custom(handler_panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handler_panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "metrics handler faulted; returning empty body");
    Response::new(Body::empty())
}

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

/// Lifecycle wrapper around the axum listener.
///
/// `start` binds and serves each request as its own task; a handler stuck in
/// a synchronized read never blocks the accept loop. `stop` performs a
/// graceful shutdown bounded by the configured grace period, after which
/// outstanding requests are abandoned. Rebinding to a new port is
/// stop-then-start; a brief window of connection refusal in between is
/// normal.
pub struct MetricsServer {
    grace: Duration,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl MetricsServer {
    pub fn new(config: &Config) -> Self {
        Self {
            grace: Duration::from_millis(config.server.shutdown_grace_ms),
            running: tokio::sync::Mutex::new(None),
        }
    }

    /// Bind `addr` and start serving. On bind failure the error is logged
    /// once, the server stays stopped, and the caller may retry with a
    /// different address. Returns the bound address (useful with port 0).
    pub async fn start(
        &self,
        addr: SocketAddr,
        state: AppState,
    ) -> Result<SocketAddr, TelemetryError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(TelemetryError::AlreadyRunning);
        }

        let listener = TcpListener::bind(addr).await.map_err(|source| {
            error!(%addr, error = %source, "failed to bind metrics listener");
            TelemetryError::Bind { addr, source }
        })?;
        let local_addr = listener.local_addr().map_err(|source| TelemetryError::Bind {
            addr,
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let app = create_router(state);
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(%local_addr, "metrics server listening");
        *running = Some(Running {
            addr: local_addr,
            shutdown: shutdown_tx,
            task,
        });
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests, bounded
    /// by the grace period.
    pub async fn stop(&self) -> Result<(), TelemetryError> {
        let mut running = self
            .running
            .lock()
            .await
            .take()
            .ok_or(TelemetryError::NotRunning)?;

        let _ = running.shutdown.send(());
        match tokio::time::timeout(self.grace, &mut running.task).await {
            Ok(Ok(Ok(()))) => info!(addr = %running.addr, "metrics server stopped"),
            Ok(Ok(Err(err))) => {
                warn!(addr = %running.addr, error = %err, "metrics server stopped after listener error");
            }
            Ok(Err(err)) => {
                warn!(addr = %running.addr, error = %err, "metrics serve task failed");
            }
            Err(_) => {
                warn!(
                    addr = %running.addr,
                    grace_ms = self.grace.as_millis() as u64,
                    "grace period elapsed; abandoning in-flight requests"
                );
                running.task.abort();
            }
        }
        Ok(())
    }

    /// Host reconfiguration: move the listener to a new address.
    pub async fn rebind(
        &self,
        addr: SocketAddr,
        state: AppState,
    ) -> Result<SocketAddr, TelemetryError> {
        if let Err(TelemetryError::NotRunning) = self.stop().await {
            // Rebinding a stopped server is just a start.
        }
        self.start(addr, state).await
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.addr)
    }
}
