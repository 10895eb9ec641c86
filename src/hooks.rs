use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::collector::{CollectorCore, ModInfo, PluginInfo};
use crate::gc::GcNotifier;
use crate::record::{Event, PlayerEvent, PlayerEventKind};

/// Instrumentation call-sites for the host.
///
/// Each method converts one host lifecycle moment into event-log pushes.
/// Every method is best-effort: after detach the underlying logs drop
/// pushes, so a stale handle can never fail a host call-site. Calls from a
/// single producer keep their order; no ordering is promised across
/// producers.
#[derive(Clone)]
pub struct HostHooks {
    core: Arc<CollectorCore>,
    gc: GcNotifier,
}

impl HostHooks {
    pub(crate) fn new(core: Arc<CollectorCore>, gc: GcNotifier) -> Self {
        Self { core, gc }
    }

    pub fn player_joined(&self, player_id: u64) {
        self.player_moment(PlayerEventKind::Joined, player_id, "joined");
    }

    pub fn player_left(&self, player_id: u64) {
        self.player_moment(PlayerEventKind::Left, player_id, "left");
    }

    pub fn player_banned(&self, player_id: u64) {
        self.player_moment(PlayerEventKind::Banned, player_id, "banned");
    }

    pub fn player_unbanned(&self, player_id: u64) {
        self.player_moment(PlayerEventKind::Unbanned, player_id, "unbanned");
    }

    /// A new identity was created for a player (first spawn).
    pub fn identity_created(&self, player_id: u64) {
        self.player_moment(PlayerEventKind::NewIdentity, player_id, "new-identity");
    }

    fn player_moment(&self, kind: PlayerEventKind, player_id: u64, verb: &str) {
        self.core.players.push_front(PlayerEvent::new(kind, player_id));
        self.core.events.push_front(Event::new(
            "session",
            format!("Player {player_id} {verb}"),
            ["player", verb],
        ));
    }

    /// A world save began. Starts the duration timer; an already-running
    /// timer is restarted (the host never overlaps saves).
    pub fn save_started(&self) {
        *self.core.lock_save() = Some(Instant::now());
    }

    /// A world save finished. Accumulates the elapsed time into the
    /// monotonic save-duration counter. Without a matching start this is a
    /// no-op.
    pub fn save_finished(&self) {
        let started = self.core.lock_save().take();
        if let Some(started) = started {
            let elapsed = started.elapsed();
            debug!(elapsed_ms = elapsed.as_millis() as u64, "save finished");
            self.core.save_duration.add(elapsed);
        }
    }

    /// The host reports a GC phase is imminent.
    pub fn gc_approaching(&self) {
        self.gc.approaching();
    }

    /// The host reports a GC phase completed with the given pause.
    pub fn gc_completed(&self, pause: std::time::Duration) {
        self.gc.completed(pause);
    }

    /// The loaded mod set changed. Diffs against the previously seen set
    /// and emits one tagged event per addition and removal.
    pub fn mods_changed(&self, current: &[ModInfo]) {
        let mut known = self.core.lock_mods();

        for m in current {
            if !known.contains_key(&m.id) {
                self.core.events.push_front(Event::new(
                    "session",
                    format!("Mod {} ({}) added", m.name, m.id),
                    ["mod", "added"],
                ));
            }
        }
        let current_ids: std::collections::HashSet<u64> = current.iter().map(|m| m.id).collect();
        for (id, name) in known.iter() {
            if !current_ids.contains(id) {
                self.core.events.push_front(Event::new(
                    "session",
                    format!("Mod {name} ({id}) removed"),
                    ["mod", "removed"],
                ));
            }
        }

        *known = current.iter().map(|m| (m.id, m.name.clone())).collect();
    }

    /// The loaded plugin set changed. Emits one tagged event per addition,
    /// removal, and version change.
    pub fn plugins_changed(&self, current: &[PluginInfo]) {
        let mut known = self.core.lock_plugins();

        for p in current {
            match known.get(&p.id) {
                None => {
                    self.core.events.push_front(Event::new(
                        "session",
                        format!("Plugin {} {} added", p.name, p.version),
                        ["plugin", "added"],
                    ));
                }
                Some(old) if old.version != p.version => {
                    self.core.events.push_front(Event::new(
                        "session",
                        format!("Plugin {} updated {} -> {}", p.name, old.version, p.version),
                        ["plugin", "updated"],
                    ));
                }
                Some(_) => {}
            }
        }
        let current_ids: std::collections::HashSet<uuid::Uuid> =
            current.iter().map(|p| p.id).collect();
        for (id, old) in known.iter() {
            if !current_ids.contains(id) {
                self.core.events.push_front(Event::new(
                    "session",
                    format!("Plugin {} {} removed", old.name, old.version),
                    ["plugin", "removed"],
                ));
            }
        }

        *known = current.iter().map(|p| (p.id, p.clone())).collect();
    }

    pub fn script_block_added(&self, entity_id: u64, enabled: bool) {
        self.core.blocks.script_block_added(entity_id, enabled);
    }

    pub fn script_block_toggled(&self, entity_id: u64, enabled: bool) {
        self.core.blocks.script_block_toggled(entity_id, enabled);
    }

    pub fn script_block_removed(&self, entity_id: u64) {
        self.core.blocks.script_block_removed(entity_id);
    }
}
