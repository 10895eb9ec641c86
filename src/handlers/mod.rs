pub mod gauges;
pub mod logs;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::collector::CollectorCore;
use crate::snapshot::SnapshotProvider;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn SnapshotProvider>,
    pub core: Arc<CollectorCore>,
    pub sync_read_timeout: Duration,
}

/// Fallback for paths outside the metrics surface.
///
/// Scrapers probe endpoints that are not implemented yet; answering 200
/// with an empty body keeps those probes from alarming. Deliberately not a
/// 404.
pub async fn unknown_path() -> impl IntoResponse {
    StatusCode::OK
}
