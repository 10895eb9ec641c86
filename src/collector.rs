use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::event_log::EventLog;
use crate::gc::{GcNotifier, GcWatcher};
use crate::hooks::HostHooks;
use crate::record::{Event, LoadSample, PlayerEvent};
use crate::snapshot::SnapshotProvider;

/// Monotonically-increasing accumulator of milliseconds spent saving.
/// Reads never reset it.
#[derive(Default)]
pub struct SaveDurationCounter {
    millis: AtomicU64,
}

impl SaveDurationCounter {
    pub fn add(&self, elapsed: Duration) {
        self.millis
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn total_millis(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
struct ScriptBlockState {
    enabled: bool,
}

/// Tracks programmable script blocks by entity id, maintained through the
/// block hooks rather than by walking the entity list on every scrape.
#[derive(Default)]
pub struct BlockTracker {
    scripts: DashMap<u64, ScriptBlockState>,
}

impl BlockTracker {
    pub fn script_block_added(&self, entity_id: u64, enabled: bool) {
        self.scripts.insert(entity_id, ScriptBlockState { enabled });
    }

    pub fn script_block_toggled(&self, entity_id: u64, enabled: bool) {
        if let Some(mut state) = self.scripts.get_mut(&entity_id) {
            state.enabled = enabled;
        }
    }

    pub fn script_block_removed(&self, entity_id: u64) {
        self.scripts.remove(&entity_id);
    }

    /// `(total, enabled)` counts.
    pub fn script_block_counts(&self) -> (u32, u32) {
        let total = self.scripts.len() as u32;
        let enabled = self.scripts.iter().filter(|s| s.enabled).count() as u32;
        (total, enabled)
    }
}

/// A workshop mod currently loaded by the host.
#[derive(Debug, Clone)]
pub struct ModInfo {
    pub id: u64,
    pub name: String,
}

/// A plugin currently loaded by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub id: Uuid,
    pub name: String,
    pub version: String,
}

/// Shared mutable state of the telemetry core: the event logs, the save
/// counter, the block tracker, and the bookkeeping behind the diffing hooks.
/// Everything in here is safe under true parallel access.
pub struct CollectorCore {
    pub events: Arc<EventLog<Event>>,
    pub players: Arc<EventLog<PlayerEvent>>,
    pub load: Arc<EventLog<LoadSample>>,
    pub save_duration: SaveDurationCounter,
    pub blocks: BlockTracker,
    pub(crate) save_started_at: Mutex<Option<Instant>>,
    pub(crate) known_mods: Mutex<HashMap<u64, String>>,
    pub(crate) known_plugins: Mutex<HashMap<Uuid, PluginInfo>>,
    detached: AtomicBool,
}

impl CollectorCore {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(EventLog::new()),
            players: Arc::new(EventLog::new()),
            load: Arc::new(EventLog::new()),
            save_duration: SaveDurationCounter::default(),
            blocks: BlockTracker::default(),
            save_started_at: Mutex::new(None),
            known_mods: Mutex::new(HashMap::new()),
            known_plugins: Mutex::new(HashMap::new()),
            detached: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock_save(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.save_started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_mods(&self) -> std::sync::MutexGuard<'_, HashMap<u64, String>> {
        self.known_mods.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_plugins(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, PluginInfo>> {
        self.known_plugins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.detached.store(true, Ordering::Release);
        self.events.close();
        self.players.close();
        self.load.close();
    }
}

/// Composition root of the telemetry core, created once at attach time.
///
/// Owns the event logs (via [`CollectorCore`]), the periodic load sampler
/// task, and the GC watcher thread. Producers hold [`HostHooks`] or
/// [`GcNotifier`] clones, both of which stay valid (as harmless no-ops)
/// after [`detach`](Collector::detach).
pub struct Collector {
    core: Arc<CollectorCore>,
    provider: Arc<dyn SnapshotProvider>,
    gc: GcWatcher,
    sampler: Option<tokio::task::JoinHandle<()>>,
    sampler_stop: tokio::sync::watch::Sender<bool>,
}

impl Collector {
    /// Build the core and start the background producers. Must be called
    /// from within a tokio runtime (the load sampler is a tokio task).
    pub fn attach(provider: Arc<dyn SnapshotProvider>, config: &Config) -> Self {
        let core = Arc::new(CollectorCore::new());
        let gc = GcWatcher::spawn(core.events.clone());

        let (sampler_stop, stop_rx) = tokio::sync::watch::channel(false);
        let sampler = tokio::spawn(load_sampler_loop(
            core.clone(),
            provider.clone(),
            Duration::from_millis(config.sampler.load_period_ms),
            stop_rx,
        ));

        info!("telemetry collector attached");
        Self {
            core,
            provider,
            gc,
            sampler: Some(sampler),
            sampler_stop,
        }
    }

    pub fn core(&self) -> Arc<CollectorCore> {
        self.core.clone()
    }

    pub fn provider(&self) -> Arc<dyn SnapshotProvider> {
        self.provider.clone()
    }

    /// Handle for the host's instrumentation call-sites.
    pub fn hooks(&self) -> HostHooks {
        HostHooks::new(self.core.clone(), self.gc.notifier())
    }

    /// Sender the host's GC machinery reports phases through.
    pub fn gc_notifier(&self) -> GcNotifier {
        self.gc.notifier()
    }

    /// Stop the producers and close the logs. In-flight producer pushes
    /// after this point are dropped silently.
    pub async fn detach(&mut self) {
        let _ = self.sampler_stop.send(true);
        if let Some(sampler) = self.sampler.take() {
            let _ = sampler.await;
        }
        self.gc.shutdown();
        self.core.close();
        info!("telemetry collector detached");
    }
}

async fn load_sampler_loop(
    core: Arc<CollectorCore>,
    provider: Arc<dyn SnapshotProvider>,
    period: Duration,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // interval fires immediately; skip the zeroth tick so the first sample
    // lands one full period after attach.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                if let Some(gauges) = provider.load_gauges() {
                    core.load.push_front(LoadSample {
                        thread_load: gauges.thread_load,
                        thread_load_smoothed: gauges.thread_load_smoothed,
                        cpu_load: gauges.cpu_load,
                        cpu_load_smoothed: gauges.cpu_load_smoothed,
                        simulation_ratio: gauges.simulation_ratio,
                        occurred_at: Utc::now(),
                    });
                }
            }
        }
    }
}
