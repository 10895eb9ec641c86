use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Unbounded, thread-safe, insertion-ordered buffer of telemetry records.
///
/// Producers append with [`push_front`](EventLog::push_front); the HTTP
/// handlers consume with [`drain_all`](EventLog::drain_all), which removes
/// everything buffered at that moment. Every record is delivered to at most
/// one drain pass. There is no backpressure: drains happen on every external
/// scrape, so unbounded growth only occurs when nothing is scraping.
pub struct EventLog<T> {
    records: Mutex<VecDeque<T>>,
    closed: AtomicBool,
}

impl<T> EventLog<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // A poisoned lock only means a producer panicked mid-push; the
        // queue contents are still well-formed records.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record at the front. Silently dropped once the log is closed.
    pub fn push_front(&self, record: T) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.lock().push_front(record);
    }

    /// Remove and return every buffered record, most recently pushed first.
    ///
    /// Safe to call concurrently with pushes and with other drains: each
    /// record ends up in exactly one drain result. Records pushed while a
    /// drain is in flight land in a later pass.
    pub fn drain_all(&self) -> Vec<T> {
        let mut guard = self.lock();
        if guard.is_empty() {
            return Vec::new();
        }
        guard.drain(..).collect()
    }

    /// Cheap, possibly stale emptiness check for fast pre-filtering.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stop accepting new records and discard anything still buffered.
    /// In-flight producers are not waited for; their late pushes are no-ops.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.lock().clear();
    }
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self::new()
    }
}
