use chrono::{DateTime, Utc};
use serde::Serialize;

/// Generic timestamped event buffered for the `/metrics/v1/events` endpoint.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: String,
    pub message: String,
    pub tags: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            occurred_at: Utc::now(),
        }
    }

    pub fn into_body(self, now: DateTime<Utc>) -> EventBody {
        EventBody {
            kind: self.kind,
            text: self.message,
            tags: self.tags,
            seconds_in_the_past: seconds_in_the_past(self.occurred_at, now),
        }
    }
}

/// Wire shape of an event. Field names and ordering are a scraper
/// compatibility contract; do not rename or reorder.
#[derive(Debug, Serialize)]
pub struct EventBody {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "SecondsInThePast")]
    pub seconds_in_the_past: f64,
}

/// One periodic sample of the host's load gauges.
#[derive(Debug, Clone)]
pub struct LoadSample {
    pub thread_load: f32,
    pub thread_load_smoothed: f32,
    pub cpu_load: f32,
    pub cpu_load_smoothed: f32,
    pub simulation_ratio: f32,
    pub occurred_at: DateTime<Utc>,
}

impl LoadSample {
    pub fn into_body(self, now: DateTime<Utc>) -> LoadSampleBody {
        LoadSampleBody {
            server_thread_load: self.thread_load,
            server_thread_load_smooth: self.thread_load_smoothed,
            server_cpu_load: self.cpu_load,
            server_cpu_load_smooth: self.cpu_load_smoothed,
            server_simulation_ratio: self.simulation_ratio,
            seconds_in_the_past: seconds_in_the_past(self.occurred_at, now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoadSampleBody {
    #[serde(rename = "ServerThreadLoad")]
    pub server_thread_load: f32,
    #[serde(rename = "ServerThreadLoadSmooth")]
    pub server_thread_load_smooth: f32,
    #[serde(rename = "ServerCPULoad")]
    pub server_cpu_load: f32,
    #[serde(rename = "ServerCPULoadSmooth")]
    pub server_cpu_load_smooth: f32,
    #[serde(rename = "ServerSimulationRatio")]
    pub server_simulation_ratio: f32,
    #[serde(rename = "SecondsInThePast")]
    pub seconds_in_the_past: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEventKind {
    Joined,
    Left,
    Banned,
    Unbanned,
    NewIdentity,
}

impl PlayerEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::Left => "left",
            Self::Banned => "banned",
            Self::Unbanned => "unbanned",
            Self::NewIdentity => "new-identity",
        }
    }
}

/// A player lifecycle moment buffered for `/metrics/v1/players`.
#[derive(Debug, Clone)]
pub struct PlayerEvent {
    pub kind: PlayerEventKind,
    pub player_id: u64,
    pub occurred_at: DateTime<Utc>,
}

impl PlayerEvent {
    pub fn new(kind: PlayerEventKind, player_id: u64) -> Self {
        Self {
            kind,
            player_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn into_body(self, now: DateTime<Utc>) -> PlayerEventBody {
        PlayerEventBody {
            kind: self.kind.as_str(),
            player_id: self.player_id,
            seconds_in_the_past: seconds_in_the_past(self.occurred_at, now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlayerEventBody {
    #[serde(rename = "Kind")]
    pub kind: &'static str,
    #[serde(rename = "PlayerId")]
    pub player_id: u64,
    #[serde(rename = "SecondsInThePast")]
    pub seconds_in_the_past: f64,
}

/// Age of a record relative to `now`, clamped to zero so clock skew between
/// producer and render never yields a negative age.
fn seconds_in_the_past(occurred_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - occurred_at).num_milliseconds().max(0) as f64 / 1000.0
}
