use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address for the metrics listener.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long `stop` waits for in-flight requests before abandoning them.
    #[serde(default = "default_grace_ms")]
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplerConfig {
    /// Period of the load-gauge sampler.
    #[serde(default = "default_load_period_ms")]
    pub load_period_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotConfig {
    /// Upper bound on a synchronized read marshaled onto the host loop.
    #[serde(default = "default_sync_read_timeout_ms")]
    pub sync_read_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_grace_ms() -> u64 {
    5_000
}

fn default_load_period_ms() -> u64 {
    30_000
}

fn default_sync_read_timeout_ms() -> u64 {
    2_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_ms: default_grace_ms(),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            load_period_ms: default_load_period_ms(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            sync_read_timeout_ms: default_sync_read_timeout_ms(),
        }
    }
}

/// Load configuration from an optional `config.toml` next to the process,
/// overridden by `SIM_METRICS__`-prefixed environment variables
/// (e.g. `SIM_METRICS__SERVER__PORT=9090`).
pub fn load_config() -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("SIM_METRICS").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<(), TelemetryError> {
    if cfg.server.host.is_empty() {
        return Err(TelemetryError::Config("server.host cannot be empty".into()));
    }
    if cfg.sampler.load_period_ms == 0 {
        return Err(TelemetryError::Config(
            "sampler.load_period_ms must be greater than zero".into(),
        ));
    }
    if cfg.snapshot.sync_read_timeout_ms == 0 {
        return Err(TelemetryError::Config(
            "snapshot.sync_read_timeout_ms must be greater than zero".into(),
        ));
    }
    Ok(())
}
