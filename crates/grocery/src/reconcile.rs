use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::domain::GroceryEntry;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::store::GroceryStore;

const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct ReconcileConfig {
    pub queue_capacity: usize,
    /// How long an empty queue keeps the drain task alive.
    pub idle_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Background cleanup of entries whose list no longer exists.
///
/// Candidates go onto a bounded queue. The receiving half sits behind a mutex
/// and whoever wins `try_lock` drains it, so at most one drain task runs at a
/// time. The task exits once the queue has been empty for the idle timeout.
/// Candidates that don't fit in the queue are dropped; the next read of the
/// affected list finds them again.
pub struct ReconcileWorker {
    store: Arc<dyn GroceryStore>,
    sender: mpsc::Sender<GroceryEntry>,
    receiver: Arc<Mutex<mpsc::Receiver<GroceryEntry>>>,
    idle_timeout: Duration,
    drains_started: AtomicUsize,
}

impl ReconcileWorker {
    pub fn new(store: Arc<dyn GroceryStore>, config: ReconcileConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            store,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            idle_timeout: config.idle_timeout,
            drains_started: AtomicUsize::new(0),
        }
    }

    /// Queues orphan candidates and makes sure a drain task is running.
    ///
    /// Never blocks. Must be called from within a tokio runtime. Returns how
    /// many candidates were queued.
    pub fn submit(&self, candidates: Vec<GroceryEntry>) -> usize {
        if candidates.is_empty() {
            return 0;
        }

        let mut queued = 0;
        for candidate in candidates {
            match self.sender.try_send(candidate) {
                Ok(()) => queued += 1,
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    warn!(
                        entry_id = %dropped.id,
                        guild_id = %dropped.guild_id,
                        "reconcile queue full, dropping orphan candidate"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(dropped)) => {
                    error!(entry_id = %dropped.id, "reconcile queue closed");
                }
            }
        }

        self.ensure_draining();
        queued
    }

    pub fn is_draining(&self) -> bool {
        self.receiver.try_lock().is_err()
    }

    /// Number of drain tasks spawned since construction.
    pub fn drains_started(&self) -> usize {
        self.drains_started.load(Ordering::SeqCst)
    }

    fn ensure_draining(&self) {
        let Ok(guard) = Arc::clone(&self.receiver).try_lock_owned() else {
            debug!("reconcile drain already running");
            return;
        };

        self.drains_started.fetch_add(1, Ordering::SeqCst);
        let store = Arc::clone(&self.store);
        let idle_timeout = self.idle_timeout;
        tokio::spawn(drain(store, guard, idle_timeout));
    }
}

async fn drain(
    store: Arc<dyn GroceryStore>,
    mut receiver: OwnedMutexGuard<mpsc::Receiver<GroceryEntry>>,
    idle_timeout: Duration,
) {
    debug!("reconcile drain started");
    let mut deleted = 0usize;

    loop {
        let candidate = match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(candidate)) => candidate,
            // idle long enough, or every sender is gone
            Ok(None) | Err(_) => break,
        };

        if reconcile_one(store.as_ref(), &candidate).await {
            deleted += 1;
        }
    }

    if deleted > 0 {
        info!(deleted, "removed orphaned grocery entries");
    }
    debug!("reconcile drain idle, exiting");
}

/// Returns true when the entry was deleted.
async fn reconcile_one(store: &dyn GroceryStore, candidate: &GroceryEntry) -> bool {
    let Some(list_id) = candidate.list_id else {
        debug!(entry_id = %candidate.id, "skipping listless entry submitted as orphan");
        return false;
    };

    match store.list_exists(list_id).await {
        Ok(true) => {
            warn!(
                entry_id = %candidate.id,
                %list_id,
                "entry submitted as orphan but its list exists, leaving it alone"
            );
            false
        }
        Ok(false) => match store.delete_entry(candidate).await {
            Ok(()) => {
                debug!(entry_id = %candidate.id, %list_id, "deleted orphaned entry");
                true
            }
            Err(error) => {
                error!(entry_id = %candidate.id, ?error, "failed to delete orphaned entry");
                false
            }
        },
        Err(error) => {
            error!(
                entry_id = %candidate.id,
                %list_id,
                ?error,
                "failed to check list existence for orphan candidate"
            );
            false
        }
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
