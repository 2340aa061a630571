//! Correlation table mapping request identifiers to response payloads.
//!
//! # Responsibilities
//! - `put`: non-blocking store-or-overwrite, waking the waiter if present
//! - `claim`: suspend until a payload arrives, the timeout elapses, or the
//!   table is closed; first consumer wins, the entry is removed on success
//! - `close`: broadcast-cancel every pending claim on shutdown
//!
//! # Design Decisions
//! - Sharded map (DashMap) so puts for distinct identifiers never contend
//! - The wait is a oneshot receive; no map lock is held across the
//!   suspension point
//! - Deliveries nobody is waiting on are buffered FIFO up to a configured
//!   bound; the oldest unclaimed entry is evicted when the bound overflows

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::bridge::types::{RequestId, ResponsePayload};

/// Result of waiting on an identifier.
#[derive(Debug)]
pub enum WaitOutcome {
    /// A payload was delivered for the identifier.
    Delivered(ResponsePayload),
    /// The timeout elapsed with no delivery.
    TimedOut,
    /// The table was closed while waiting.
    Cancelled,
}

enum Slot {
    /// A claim is suspended on this identifier.
    Waiting(oneshot::Sender<ResponsePayload>),
    /// A payload arrived before any claim; buffered until claimed or evicted.
    Ready(ResponsePayload),
}

/// Concurrency-safe store correlating identifiers with pending or available
/// response payloads. Lifecycle follows the listener: `reopen` on start,
/// `close` on stop.
pub struct CorrelationTable {
    entries: DashMap<RequestId, Slot>,
    /// Insertion order of buffered (unclaimed) entries, for eviction.
    /// Claimed identifiers go stale in the queue and are skipped on pop.
    buffered: Mutex<VecDeque<RequestId>>,
    max_buffered: usize,
    closed: watch::Sender<bool>,
}

impl CorrelationTable {
    /// Create an open table retaining at most `max_buffered` unclaimed
    /// deliveries.
    pub fn new(max_buffered: usize) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            entries: DashMap::new(),
            buffered: Mutex::new(VecDeque::new()),
            max_buffered,
            closed,
        }
    }

    /// Store a payload for an identifier. Never blocks.
    ///
    /// Wakes the waiter if one is suspended on the identifier; otherwise the
    /// payload is buffered for a later claim. A second put for a buffered
    /// identifier overwrites it. Puts on a closed table are discarded.
    pub fn put(&self, id: RequestId, payload: ResponsePayload) {
        if *self.closed.borrow() {
            debug!(%id, "delivery after shutdown discarded");
            return;
        }

        let buffered = match self.entries.entry(id) {
            MapEntry::Occupied(mut occupied) => {
                if matches!(occupied.get(), Slot::Waiting(_)) {
                    if let Slot::Waiting(waiter) = occupied.remove() {
                        if waiter.send(payload).is_err() {
                            debug!(%id, "waiter gone before the payload was handed off");
                        }
                    }
                } else {
                    *occupied.get_mut() = Slot::Ready(payload);
                }
                false
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Slot::Ready(payload));
                true
            }
        };

        if buffered {
            self.record_buffered(id);
        }
    }

    /// Wait until a payload is stored for `id`, the timeout elapses, or the
    /// table is closed. The payload is returned exactly once: the entry is
    /// removed on success and a later claim for the same identifier starts
    /// from scratch.
    pub async fn claim(&self, id: RequestId, timeout: Duration) -> WaitOutcome {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return WaitOutcome::Cancelled;
        }

        let (sender, receiver) = oneshot::channel();
        match self.entries.entry(id) {
            MapEntry::Occupied(mut occupied) => {
                match std::mem::replace(occupied.get_mut(), Slot::Waiting(sender)) {
                    Slot::Ready(payload) => {
                        occupied.remove();
                        return WaitOutcome::Delivered(payload);
                    }
                    // An identifier is never claimed twice concurrently in
                    // practice; if it happens, the newer claim supersedes and
                    // the older one resolves as cancelled.
                    Slot::Waiting(_superseded) => {}
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Slot::Waiting(sender));
            }
        }

        tokio::select! {
            delivered = receiver => match delivered {
                Ok(payload) => WaitOutcome::Delivered(payload),
                Err(_) => WaitOutcome::Cancelled,
            },
            _ = closed.changed() => {
                self.entries.remove(&id);
                WaitOutcome::Cancelled
            }
            _ = tokio::time::sleep(timeout) => {
                self.entries.remove(&id);
                WaitOutcome::TimedOut
            }
        }
    }

    /// Close the table: wake every pending claim with `Cancelled`, discard
    /// buffered deliveries, and drop puts until the table is reopened.
    pub fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        // Dropping the senders resolves suspended receivers as cancelled;
        // claims racing the drain observe the watch flip instead.
        self.entries.clear();
        self.lock_buffered().clear();
        debug!("correlation table closed");
    }

    /// Reopen a closed table for a fresh listener run.
    pub fn reopen(&self) {
        self.closed.send_replace(false);
        self.entries.clear();
        self.lock_buffered().clear();
    }

    /// Whether the table currently refuses traffic.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn record_buffered(&self, id: RequestId) {
        let mut buffered = self.lock_buffered();
        buffered.push_back(id);
        while buffered.len() > self.max_buffered {
            let Some(oldest) = buffered.pop_front() else {
                break;
            };
            // Identifiers claimed since buffering are stale here; only a
            // still-buffered payload counts as an eviction.
            if self
                .entries
                .remove_if(&oldest, |_, slot| matches!(slot, Slot::Ready(_)))
                .is_some()
            {
                warn!(id = %oldest, "evicting oldest unclaimed response, buffer full");
            }
        }
    }

    fn lock_buffered(&self) -> MutexGuard<'_, VecDeque<RequestId>> {
        self.buffered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
