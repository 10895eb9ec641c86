use crate::invoke::UpdateHandle;

/// Scalar server and session gauges for `/metrics/v1/server`.
///
/// `None` from the provider means the host has not finished startup; the
/// handler then renders `IsReady=false` with zeroed gauges instead of an
/// error status.
#[derive(Debug, Clone, Default)]
pub struct ServerGauges {
    pub version: String,
    pub server_name: String,
    pub world_name: String,
    pub sim_speed: f32,
    pub cpu_load: f32,
    pub total_time_secs: u64,
    pub players: u32,
    pub max_players: u32,
    pub used_pcu: u64,
    pub max_pcu: u64,
    pub mod_count: u32,
    pub plugin_count: u32,
}

/// Process memory and garbage-collection counters for `/metrics/v1/process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessCounters {
    pub private_memory_size: u64,
    pub paged_memory_size: u64,
    pub virtual_memory_size: u64,
    pub working_set_size: u64,
    pub gen0_collections: u64,
    pub gen1_collections: u64,
    pub gen2_collections: u64,
}

/// Instantaneous load gauges sampled by the periodic load timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadGauges {
    pub thread_load: f32,
    pub thread_load_smoothed: f32,
    pub cpu_load: f32,
    pub cpu_load_smoothed: f32,
    pub simulation_ratio: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSize {
    Large,
    Small,
}

impl GridSize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Large => "Large",
            Self::Small => "Small",
        }
    }
}

/// Projection of one grid for `/metrics/v1/session/grids`.
///
/// `is_concealed` is a provider-defined heuristic: whether the grid is
/// currently excluded from the host's per-frame update scheduling. Reading
/// the bookkeeping behind it is what forces the grids listing onto the host
/// update loop.
#[derive(Debug, Clone)]
pub struct GridSnapshot {
    pub display_name: String,
    pub entity_id: u64,
    pub grid_size: GridSize,
    pub blocks_count: u32,
    pub mass: f32,
    pub position: Position,
    pub linear_speed: f32,
    pub distance_to_player: f32,
    pub owner_id: u64,
    pub owner_name: String,
    pub is_powered: bool,
    pub is_concealed: bool,
    pub pcu: u32,
    pub conveyor_inventory_blocks: u32,
    pub conveyor_endpoint_blocks: u32,
}

/// Projection of a voxel body (asteroid or planet).
#[derive(Debug, Clone)]
pub struct VoxelSnapshot {
    pub display_name: String,
    pub entity_id: u64,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct FloatingObjectSnapshot {
    pub display_name: String,
    pub entity_id: u64,
    pub kind: String,
    pub mass: f32,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct FactionSnapshot {
    pub faction_id: u64,
    pub tag: String,
    pub name: String,
    pub member_count: u32,
    pub is_npc: bool,
}

/// Read-only seam to the simulation host.
///
/// The core never drives simulation logic through this trait; it only reads.
/// Collection reads are best-effort and may observe brief staleness. Where a
/// provider's backing state is mutated by the host's own update loop it
/// should return an [`UpdateHandle`] from [`update_loop`], and callers will
/// marshal those reads onto the loop instead of reading directly.
///
/// [`update_loop`]: SnapshotProvider::update_loop
pub trait SnapshotProvider: Send + Sync {
    /// `None` until the host has completed startup.
    fn server_gauges(&self) -> Option<ServerGauges>;

    /// `None` until the host has completed startup.
    fn process_counters(&self) -> Option<ProcessCounters>;

    /// Instantaneous load gauges, `None` when the host is not ready.
    fn load_gauges(&self) -> Option<LoadGauges>;

    fn grids(&self) -> Vec<GridSnapshot>;

    fn asteroids(&self) -> Vec<VoxelSnapshot>;

    fn planets(&self) -> Vec<VoxelSnapshot>;

    fn floating_objects(&self) -> Vec<FloatingObjectSnapshot>;

    fn factions(&self) -> Vec<FactionSnapshot>;

    /// Handle for marshaling reads onto the host's update loop. Providers
    /// without a single-threaded loop return `None` and all reads stay
    /// best-effort.
    fn update_loop(&self) -> Option<UpdateHandle> {
        None
    }
}
