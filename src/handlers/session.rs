use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::snapshot::{
    FactionSnapshot, FloatingObjectSnapshot, GridSnapshot, Position, VoxelSnapshot,
};

#[derive(Debug, Serialize)]
pub struct PositionBody {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
}

impl From<Position> for PositionBody {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

#[derive(Debug, Serialize)]
pub struct GridBody {
    #[serde(rename = "DisplayName")]
    pub display_name: String,
    #[serde(rename = "EntityId")]
    pub entity_id: u64,
    #[serde(rename = "GridSize")]
    pub grid_size: &'static str,
    #[serde(rename = "BlocksCount")]
    pub blocks_count: u32,
    #[serde(rename = "Mass")]
    pub mass: f32,
    #[serde(rename = "Position")]
    pub position: PositionBody,
    #[serde(rename = "LinearSpeed")]
    pub linear_speed: f32,
    #[serde(rename = "DistanceToPlayer")]
    pub distance_to_player: f32,
    #[serde(rename = "OwnerSteamId")]
    pub owner_steam_id: u64,
    #[serde(rename = "OwnerDisplayName")]
    pub owner_display_name: String,
    #[serde(rename = "IsPowered")]
    pub is_powered: bool,
    #[serde(rename = "IsConcealed")]
    pub is_concealed: bool,
    #[serde(rename = "PCU")]
    pub pcu: u32,
    #[serde(rename = "ConveyorInventoryBlocks")]
    pub conveyor_inventory_blocks: u32,
    #[serde(rename = "ConveyorEndpointBlocks")]
    pub conveyor_endpoint_blocks: u32,
}

impl From<GridSnapshot> for GridBody {
    fn from(g: GridSnapshot) -> Self {
        Self {
            display_name: g.display_name,
            entity_id: g.entity_id,
            grid_size: g.grid_size.as_str(),
            blocks_count: g.blocks_count,
            mass: g.mass,
            position: g.position.into(),
            linear_speed: g.linear_speed,
            distance_to_player: g.distance_to_player,
            owner_steam_id: g.owner_id,
            owner_display_name: g.owner_name,
            is_powered: g.is_powered,
            is_concealed: g.is_concealed,
            pcu: g.pcu,
            conveyor_inventory_blocks: g.conveyor_inventory_blocks,
            conveyor_endpoint_blocks: g.conveyor_endpoint_blocks,
        }
    }
}

/// `GET /metrics/v1/session/grids`
///
/// The grid projection reads concealment bookkeeping that the host's own
/// update loop mutates, so when the provider exposes an update-loop handle
/// the whole listing is marshaled onto that loop. A timed-out or failed
/// synchronized read degrades to an empty array, never an error status.
pub async fn grids(State(state): State<AppState>) -> Json<Vec<GridBody>> {
    let grids = match state.provider.update_loop() {
        Some(handle) => {
            let provider = state.provider.clone();
            match handle
                .run(move || provider.grids(), state.sync_read_timeout)
                .await
            {
                Ok(grids) => grids,
                Err(err) => {
                    warn!(error = %err, "synchronized grid read degraded to empty");
                    Vec::new()
                }
            }
        }
        None => state.provider.grids(),
    };
    Json(grids.into_iter().map(GridBody::from).collect())
}

#[derive(Debug, Serialize)]
pub struct VoxelBody {
    #[serde(rename = "DisplayName")]
    pub display_name: String,
    #[serde(rename = "EntityId")]
    pub entity_id: u64,
    #[serde(rename = "Position")]
    pub position: PositionBody,
}

impl From<VoxelSnapshot> for VoxelBody {
    fn from(v: VoxelSnapshot) -> Self {
        Self {
            display_name: v.display_name,
            entity_id: v.entity_id,
            position: v.position.into(),
        }
    }
}

/// `GET /metrics/v1/session/asteroids`
pub async fn asteroids(State(state): State<AppState>) -> Json<Vec<VoxelBody>> {
    Json(state.provider.asteroids().into_iter().map(Into::into).collect())
}

/// `GET /metrics/v1/session/planets`
pub async fn planets(State(state): State<AppState>) -> Json<Vec<VoxelBody>> {
    Json(state.provider.planets().into_iter().map(Into::into).collect())
}

#[derive(Debug, Serialize)]
pub struct FloatingObjectBody {
    #[serde(rename = "DisplayName")]
    pub display_name: String,
    #[serde(rename = "EntityId")]
    pub entity_id: u64,
    #[serde(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Mass")]
    pub mass: f32,
    #[serde(rename = "Position")]
    pub position: PositionBody,
}

impl From<FloatingObjectSnapshot> for FloatingObjectBody {
    fn from(o: FloatingObjectSnapshot) -> Self {
        Self {
            display_name: o.display_name,
            entity_id: o.entity_id,
            kind: o.kind,
            mass: o.mass,
            position: o.position.into(),
        }
    }
}

/// `GET /metrics/v1/session/floatingObjects`
pub async fn floating_objects(State(state): State<AppState>) -> Json<Vec<FloatingObjectBody>> {
    Json(
        state
            .provider
            .floating_objects()
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

#[derive(Debug, Serialize)]
pub struct FactionBody {
    #[serde(rename = "FactionId")]
    pub faction_id: u64,
    #[serde(rename = "Tag")]
    pub tag: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MemberCount")]
    pub member_count: u32,
    #[serde(rename = "IsNpc")]
    pub is_npc: bool,
}

impl From<FactionSnapshot> for FactionBody {
    fn from(f: FactionSnapshot) -> Self {
        Self {
            faction_id: f.faction_id,
            tag: f.tag,
            name: f.name,
            member_count: f.member_count,
            is_npc: f.is_npc,
        }
    }
}

/// `GET /metrics/v1/session/factions`
pub async fn factions(State(state): State<AppState>) -> Json<Vec<FactionBody>> {
    Json(state.provider.factions().into_iter().map(Into::into).collect())
}
