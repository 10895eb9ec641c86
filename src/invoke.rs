use std::sync::mpsc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::TelemetryError;

type Job = Box<dyn FnOnce() + Send>;

/// Create a task-and-response channel between request handlers and the
/// host's single-threaded update loop.
///
/// The [`UpdateQueue`] side is owned by the host loop, which calls
/// [`run_pending`](UpdateQueue::run_pending) once per frame. The cloneable
/// [`UpdateHandle`] side lets a request task marshal a read closure onto
/// that loop and await the result, guaranteeing the read observes a state
/// the loop itself produced rather than a half-mutated intermediate.
pub fn update_channel() -> (UpdateQueue, UpdateHandle) {
    let (tx, rx) = mpsc::channel();
    (UpdateQueue { rx }, UpdateHandle { tx })
}

/// Receiving end, owned by the host update loop.
pub struct UpdateQueue {
    rx: mpsc::Receiver<Job>,
}

impl UpdateQueue {
    /// Execute every read queued since the previous call. Never blocks.
    pub fn run_pending(&self) {
        for job in self.rx.try_iter() {
            job();
        }
    }
}

/// Sending end, held by snapshot providers that expose a synchronized read.
#[derive(Clone)]
pub struct UpdateHandle {
    tx: mpsc::Sender<Job>,
}

impl UpdateHandle {
    /// Run `read` on the host update loop and await its result.
    ///
    /// Returns [`TelemetryError::UpdateLoopClosed`] when the queue side is
    /// gone and [`TelemetryError::SyncReadTimeout`] when the loop did not
    /// get to the read within `timeout`. Callers must not hold any lock
    /// across this await; the loop may itself be waiting for that lock.
    pub async fn run<T, F>(&self, read: F, timeout: Duration) -> Result<T, TelemetryError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Box::new(move || {
                // The requester may have timed out and dropped the receiver.
                let _ = reply_tx.send(read());
            }))
            .map_err(|_| TelemetryError::UpdateLoopClosed)?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(TelemetryError::UpdateLoopClosed),
            Err(_) => Err(TelemetryError::SyncReadTimeout(timeout)),
        }
    }
}
