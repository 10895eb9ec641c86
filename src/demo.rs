//! Built-in stand-in host so the exporter can run and be scraped without a
//! real simulation attached. The demo loop mutates its session state on a
//! dedicated thread and serves synchronized reads from that same thread,
//! exercising the full seam.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::invoke::{update_channel, UpdateHandle};
use crate::snapshot::{
    FactionSnapshot, FloatingObjectSnapshot, GridSize, GridSnapshot, LoadGauges, Position,
    ProcessCounters, ServerGauges, SnapshotProvider, VoxelSnapshot,
};

const FRAME: Duration = Duration::from_millis(33);
const READY_AFTER_FRAMES: u64 = 30;

struct DemoState {
    frame: u64,
    players: u32,
}

pub struct DemoHost {
    state: Arc<Mutex<DemoState>>,
    handle: UpdateHandle,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl DemoHost {
    /// Spawn the demo update loop and return the host.
    pub fn start() -> Arc<Self> {
        let state = Arc::new(Mutex::new(DemoState { frame: 0, players: 3 }));
        let stop = Arc::new(AtomicBool::new(false));
        let (queue, handle) = update_channel();

        let thread = {
            let state = state.clone();
            let stop = stop.clone();
            std::thread::Builder::new()
                .name("demo-update-loop".into())
                .spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        {
                            let mut s = state.lock().unwrap_or_else(PoisonError::into_inner);
                            s.frame += 1;
                        }
                        // Synchronized reads run here, between frame
                        // mutations, never against a half-updated state.
                        queue.run_pending();
                        std::thread::sleep(FRAME);
                    }
                })
                .expect("failed to spawn demo update loop")
        };

        Arc::new(Self {
            state,
            handle,
            stop,
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            let _ = thread.join();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ready_frame(&self) -> Option<u64> {
        let frame = self.lock().frame;
        (frame >= READY_AFTER_FRAMES).then_some(frame)
    }

    fn wobble(frame: u64, amplitude: f32) -> f32 {
        amplitude * (frame as f32 / 20.0).sin()
    }
}

impl SnapshotProvider for DemoHost {
    fn server_gauges(&self) -> Option<ServerGauges> {
        let frame = self.ready_frame()?;
        let players = self.lock().players;
        Some(ServerGauges {
            version: "1.203.630".into(),
            server_name: "Demo Dedicated".into(),
            world_name: "Demo World".into(),
            sim_speed: 1.0 - Self::wobble(frame, 0.05).abs(),
            cpu_load: 25.0 + Self::wobble(frame, 10.0).abs(),
            total_time_secs: frame * FRAME.as_millis() as u64 / 1000,
            players,
            max_players: 16,
            used_pcu: 18_240,
            max_pcu: 300_000,
            mod_count: 2,
            plugin_count: 1,
        })
    }

    fn process_counters(&self) -> Option<ProcessCounters> {
        let frame = self.ready_frame()?;
        Some(ProcessCounters {
            private_memory_size: 2_400_000_000,
            paged_memory_size: 2_600_000_000,
            virtual_memory_size: 4_100_000_000,
            working_set_size: 2_100_000_000,
            gen0_collections: frame / 40,
            gen1_collections: frame / 400,
            gen2_collections: frame / 4_000,
        })
    }

    fn load_gauges(&self) -> Option<LoadGauges> {
        let frame = self.ready_frame()?;
        let cpu = 25.0 + Self::wobble(frame, 10.0).abs();
        Some(LoadGauges {
            thread_load: 0.4 + Self::wobble(frame, 0.2).abs(),
            thread_load_smoothed: 0.45,
            cpu_load: cpu,
            cpu_load_smoothed: cpu * 0.9,
            simulation_ratio: 1.0 - Self::wobble(frame, 0.05).abs(),
        })
    }

    fn grids(&self) -> Vec<GridSnapshot> {
        let Some(frame) = self.ready_frame() else {
            return Vec::new();
        };
        vec![
            GridSnapshot {
                display_name: "Mining Rig Alpha".into(),
                entity_id: 84_000_001,
                grid_size: GridSize::Large,
                blocks_count: 412,
                mass: 1_250_000.0,
                position: Position { x: 120.5, y: -340.0, z: 8_900.25 },
                linear_speed: 0.0,
                distance_to_player: 850.0,
                owner_id: 76_561_198_000_000_001,
                owner_name: "alpha".into(),
                is_powered: true,
                // Concealment flips as the demo loop cycles its update
                // registrations.
                is_concealed: (frame / 300) % 2 == 1,
                pcu: 9_120,
                conveyor_inventory_blocks: 36,
                conveyor_endpoint_blocks: 54,
            },
            GridSnapshot {
                display_name: "Scout Pod".into(),
                entity_id: 84_000_002,
                grid_size: GridSize::Small,
                blocks_count: 58,
                mass: 8_400.0,
                position: Position { x: -2_000.0, y: 75.0, z: 410.0 },
                linear_speed: 12.5,
                distance_to_player: 35.0,
                owner_id: 76_561_198_000_000_002,
                owner_name: "beta".into(),
                is_powered: true,
                is_concealed: false,
                pcu: 640,
                conveyor_inventory_blocks: 2,
                conveyor_endpoint_blocks: 4,
            },
        ]
    }

    fn asteroids(&self) -> Vec<VoxelSnapshot> {
        if self.ready_frame().is_none() {
            return Vec::new();
        }
        vec![VoxelSnapshot {
            display_name: "Asteroid-3451".into(),
            entity_id: 91_000_001,
            position: Position { x: 5_000.0, y: 5_000.0, z: -1_200.0 },
        }]
    }

    fn planets(&self) -> Vec<VoxelSnapshot> {
        if self.ready_frame().is_none() {
            return Vec::new();
        }
        vec![VoxelSnapshot {
            display_name: "EarthLike".into(),
            entity_id: 92_000_001,
            position: Position { x: 0.0, y: -60_000.0, z: 0.0 },
        }]
    }

    fn floating_objects(&self) -> Vec<FloatingObjectSnapshot> {
        if self.ready_frame().is_none() {
            return Vec::new();
        }
        vec![FloatingObjectSnapshot {
            display_name: "Iron Ingot".into(),
            entity_id: 93_000_001,
            kind: "Ore".into(),
            mass: 37.2,
            position: Position { x: 118.0, y: -338.5, z: 8_899.0 },
        }]
    }

    fn factions(&self) -> Vec<FactionSnapshot> {
        if self.ready_frame().is_none() {
            return Vec::new();
        }
        vec![
            FactionSnapshot {
                faction_id: 1,
                tag: "MINE".into(),
                name: "Deep Core Mining".into(),
                member_count: 2,
                is_npc: false,
            },
            FactionSnapshot {
                faction_id: 2,
                tag: "SPRT".into(),
                name: "Space Pirates".into(),
                member_count: 5,
                is_npc: true,
            },
        ]
    }

    fn update_loop(&self) -> Option<UpdateHandle> {
        Some(self.handle.clone())
    }
}
