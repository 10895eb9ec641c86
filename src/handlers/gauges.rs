use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;

/// Body of `/metrics/v1/server`. Field names and declaration order are the
/// scraper contract.
#[derive(Debug, Serialize, Default)]
pub struct ServerBody {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "ServerName")]
    pub server_name: String,
    #[serde(rename = "WorldName")]
    pub world_name: String,
    #[serde(rename = "IsReady")]
    pub is_ready: bool,
    #[serde(rename = "SimSpeed")]
    pub sim_speed: f32,
    #[serde(rename = "SimulationCpuLoad")]
    pub simulation_cpu_load: f32,
    #[serde(rename = "TotalTime")]
    pub total_time: u64,
    #[serde(rename = "Players")]
    pub players: u32,
    #[serde(rename = "MaxPlayers")]
    pub max_players: u32,
    #[serde(rename = "UsedPCU")]
    pub used_pcu: u64,
    #[serde(rename = "MaxPCU")]
    pub max_pcu: u64,
    #[serde(rename = "ModCount")]
    pub mod_count: u32,
    #[serde(rename = "PluginCount")]
    pub plugin_count: u32,
    #[serde(rename = "SaveDuration")]
    pub save_duration: u64,
}

/// `GET /metrics/v1/server`
///
/// Before the host reaches ready this renders `IsReady=false` with zeroed
/// gauges. The save-duration counter lives in the core and is reported
/// regardless of readiness; reads never reset it.
pub async fn server(State(state): State<AppState>) -> Json<ServerBody> {
    let save_duration = state.core.save_duration.total_millis();
    let body = match state.provider.server_gauges() {
        Some(g) => ServerBody {
            version: g.version,
            server_name: g.server_name,
            world_name: g.world_name,
            is_ready: true,
            sim_speed: g.sim_speed,
            simulation_cpu_load: g.cpu_load,
            total_time: g.total_time_secs,
            players: g.players,
            max_players: g.max_players,
            used_pcu: g.used_pcu,
            max_pcu: g.max_pcu,
            mod_count: g.mod_count,
            plugin_count: g.plugin_count,
            save_duration,
        },
        None => ServerBody {
            save_duration,
            ..ServerBody::default()
        },
    };
    Json(body)
}

/// Body of `/metrics/v1/process`.
#[derive(Debug, Serialize, Default)]
pub struct ProcessBody {
    #[serde(rename = "PrivateMemorySize")]
    pub private_memory_size: u64,
    #[serde(rename = "PagedMemorySize")]
    pub paged_memory_size: u64,
    #[serde(rename = "VirtualMemorySize")]
    pub virtual_memory_size: u64,
    #[serde(rename = "WorkingSetSize")]
    pub working_set_size: u64,
    #[serde(rename = "Gen0Collections")]
    pub gen0_collections: u64,
    #[serde(rename = "Gen1Collections")]
    pub gen1_collections: u64,
    #[serde(rename = "Gen2Collections")]
    pub gen2_collections: u64,
    #[serde(rename = "ProgrammableBlocks")]
    pub programmable_blocks: u32,
    #[serde(rename = "ProgrammableBlocksEnabled")]
    pub programmable_blocks_enabled: u32,
}

/// `GET /metrics/v1/process`
pub async fn process(State(state): State<AppState>) -> Json<ProcessBody> {
    let (total, enabled) = state.core.blocks.script_block_counts();
    let body = match state.provider.process_counters() {
        Some(c) => ProcessBody {
            private_memory_size: c.private_memory_size,
            paged_memory_size: c.paged_memory_size,
            virtual_memory_size: c.virtual_memory_size,
            working_set_size: c.working_set_size,
            gen0_collections: c.gen0_collections,
            gen1_collections: c.gen1_collections,
            gen2_collections: c.gen2_collections,
            programmable_blocks: total,
            programmable_blocks_enabled: enabled,
        },
        None => ProcessBody {
            programmable_blocks: total,
            programmable_blocks_enabled: enabled,
            ..ProcessBody::default()
        },
    };
    Json(body)
}
