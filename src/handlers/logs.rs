use axum::extract::State;
use axum::Json;
use chrono::Utc;

use super::AppState;
use crate::record::{EventBody, LoadSampleBody, PlayerEventBody};

/// `GET /metrics/v1/events` — destructive read: drains the event log.
/// Two concurrent scrapes receive disjoint sets.
pub async fn events(State(state): State<AppState>) -> Json<Vec<EventBody>> {
    let now = Utc::now();
    Json(
        state
            .core
            .events
            .drain_all()
            .into_iter()
            .map(|e| e.into_body(now))
            .collect(),
    )
}

/// `GET /metrics/v1/load` — drains the buffered load samples.
pub async fn load(State(state): State<AppState>) -> Json<Vec<LoadSampleBody>> {
    let now = Utc::now();
    Json(
        state
            .core
            .load
            .drain_all()
            .into_iter()
            .map(|s| s.into_body(now))
            .collect(),
    )
}

/// `GET /metrics/v1/players` — drains the buffered player events.
pub async fn players(State(state): State<AppState>) -> Json<Vec<PlayerEventBody>> {
    let now = Utc::now();
    Json(
        state
            .core
            .players
            .drain_all()
            .into_iter()
            .map(|p| p.into_body(now))
            .collect(),
    )
}
