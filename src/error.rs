use std::net::SocketAddr;
use std::time::Duration;

/// Errors surfaced by the telemetry core.
///
/// Nothing here ever turns into an HTTP error status: handlers degrade the
/// payload instead. These cover the attach/start lifecycle and synchronized
/// reads, where the caller decides how to degrade.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("telemetry server is already running")]
    AlreadyRunning,

    #[error("telemetry server is not running")]
    NotRunning,

    #[error("synchronized read timed out after {0:?}")]
    SyncReadTimeout(Duration),

    #[error("host update loop is no longer accepting reads")]
    UpdateLoopClosed,

    #[error("invalid configuration: {0}")]
    Config(String),
}
