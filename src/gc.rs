use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::event_log::EventLog;
use crate::record::Event;

/// Notification pushed by the host around garbage-collection phases.
enum GcSignal {
    Approaching,
    Completed { pause: Duration },
    Cancel,
}

/// Cloneable sender the host uses to report GC phases.
///
/// Best-effort: once the watcher is gone, notifications are dropped.
#[derive(Clone)]
pub struct GcNotifier {
    tx: mpsc::Sender<GcSignal>,
}

impl GcNotifier {
    pub fn approaching(&self) {
        let _ = self.tx.send(GcSignal::Approaching);
    }

    pub fn completed(&self, pause: Duration) {
        let _ = self.tx.send(GcSignal::Completed { pause });
    }
}

/// Dedicated thread that blocks waiting for GC notifications and converts
/// them into events.
///
/// The wait is a true blocking `recv`, not a poll: the thread sleeps until a
/// phase arrives or [`shutdown`](GcWatcher::shutdown) sends the explicit
/// cancel signal. Cancellation is its own message so an empty queue never
/// terminates the watcher.
pub struct GcWatcher {
    tx: mpsc::Sender<GcSignal>,
    thread: Option<JoinHandle<()>>,
}

impl GcWatcher {
    pub fn spawn(events: Arc<EventLog<Event>>) -> Self {
        let (tx, rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("gc-watcher".into())
            .spawn(move || watch_loop(rx, events))
            .expect("failed to spawn gc-watcher thread");
        Self {
            tx,
            thread: Some(thread),
        }
    }

    pub fn notifier(&self) -> GcNotifier {
        GcNotifier {
            tx: self.tx.clone(),
        }
    }

    /// Cancel the watcher and join its thread.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(GcSignal::Cancel);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for GcWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch_loop(rx: mpsc::Receiver<GcSignal>, events: Arc<EventLog<Event>>) {
    info!("gc watcher started");
    while let Ok(signal) = rx.recv() {
        match signal {
            GcSignal::Approaching => {
                events.push_front(Event::new(
                    "gc",
                    "approaching full garbage collection",
                    ["gc", "approach"],
                ));
            }
            GcSignal::Completed { pause } => {
                debug!(pause_ms = pause.as_millis() as u64, "gc completed");
                events.push_front(Event::new(
                    "gc",
                    format!("garbage collection completed in {}ms", pause.as_millis()),
                    ["gc", "complete"],
                ));
            }
            GcSignal::Cancel => break,
        }
    }
    info!("gc watcher stopped");
}
