//! Bounded, persisted FIFO of pending scan transactions.
//!
//! The queue is fully serialized to the state store after every mutation
//! (enqueue, batch removal, failed-batch restore, clear) so a process
//! restart recovers it unchanged. Persistence is best-effort: a corrupt
//! or unreadable blob resets the queue to empty, and a failed write
//! degrades durability without interrupting the scan flow.
//!
//! Callers must keep each mutation and its paired persistence write in a
//! single critical section; [`ScanClient`](crate::client::ScanClient)
//! does this by holding the queue behind one mutex.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::store::{keys, StateStore};
use crate::types::QueuedTransaction;

/// Default maximum number of queued transactions.
pub const DEFAULT_CAPACITY: usize = 100;

/// Maximum number of transactions delivered per batch flush.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Bounded FIFO of not-yet-delivered scans, mirrored to persistent storage.
pub struct OfflineQueue {
    entries: VecDeque<QueuedTransaction>,
    capacity: usize,
    store: Arc<dyn StateStore>,
}

impl OfflineQueue {
    /// Load the queue from the store, falling back to empty on a missing,
    /// corrupt, or unreadable blob.
    pub fn load(store: Arc<dyn StateStore>, capacity: usize) -> Self {
        let entries = match store.get(keys::OFFLINE_QUEUE) {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<QueuedTransaction>>(&blob) {
                Ok(list) => VecDeque::from(list),
                Err(err) => {
                    warn!(error = %err, "corrupt offline queue blob, resetting to empty");
                    VecDeque::new()
                }
            },
            Ok(None) => VecDeque::new(),
            Err(err) => {
                warn!(error = %err, "failed to read offline queue, starting empty");
                VecDeque::new()
            }
        };

        let mut queue = Self {
            entries,
            capacity,
            store,
        };
        // A lowered capacity bound applies to recovered state too.
        while queue.entries.len() > queue.capacity {
            queue.entries.pop_front();
        }
        queue
    }

    /// Append a transaction, evicting the oldest entry first when full.
    pub fn enqueue(&mut self, token_id: &str, team_id: Option<&str>) {
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                warn!(token_id = %evicted.token_id, "queue full, evicting oldest transaction");
            }
        }
        self.entries.push_back(QueuedTransaction {
            token_id: token_id.to_string(),
            team_id: team_id.map(ToString::to_string),
            enqueued_at: Utc::now(),
            retry_count: 0,
        });
        self.persist();
        debug!(queue_length = self.entries.len(), token_id, "transaction enqueued");
    }

    /// Remove up to `max` oldest entries and persist the shortened queue.
    ///
    /// The batch leaves the queue before it is sent, so a transaction can
    /// never ride in two in-flight batches.
    pub fn take_batch(&mut self, max: usize) -> Vec<QueuedTransaction> {
        let count = max.min(self.entries.len());
        let batch: Vec<QueuedTransaction> = self.entries.drain(..count).collect();
        if !batch.is_empty() {
            self.persist();
        }
        batch
    }

    /// Re-insert a failed batch at the front, preserving its original
    /// relative order, and persist.
    ///
    /// Each restored entry's `retry_count` is bumped so persisted blobs
    /// and logs show how often a batch has bounced.
    pub fn restore_batch(&mut self, batch: Vec<QueuedTransaction>) {
        for mut tx in batch.into_iter().rev() {
            tx.retry_count += 1;
            self.entries.push_front(tx);
        }
        // Enqueues that raced the in-flight batch may have refilled the
        // queue; the capacity invariant still sheds oldest-first.
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.persist();
    }

    /// Empty the queue and persist immediately.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    /// Number of queued transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured capacity bound.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ordered copy of the queued transactions, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedTransaction> {
        self.entries.iter().cloned().collect()
    }

    fn persist(&self) {
        let list: Vec<&QueuedTransaction> = self.entries.iter().collect();
        let blob = match serde_json::to_string(&list) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(error = %err, "failed to serialize offline queue");
                return;
            }
        };
        if let Err(err) = self.store.set(keys::OFFLINE_QUEUE, &blob) {
            warn!(error = %err, "failed to persist offline queue, continuing in memory");
        }
    }
}
