//! Shared mutable session state.
//!
//! The store and the pending-fetch waiters sit behind one mutex so that
//! "is this id pending" and "register me as a waiter" happen atomically with
//! ingest clearing the id. The lock is never held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use smsync_core::{apply_batch, ConversationStore, IngestReport, PendingFetches};
use smsync_types::ConversationMessage;
use tokio::sync::oneshot;

/// How a pending fetch ended for one waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// Ingest delivered a batch for the conversation.
    Completed,
    /// The fetch was abandoned (teardown or failed send).
    Released,
}

pub(crate) type Waiter = oneshot::Sender<FetchOutcome>;

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) store: ConversationStore,
    pub(crate) pending: PendingFetches<Waiter>,
    pub(crate) closed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: Mutex<SessionState>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lock the state, recovering from a poisoned mutex.
    ///
    /// Every critical section leaves the state consistent before it can
    /// panic, so the data behind a poisoned lock is still usable.
    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a batch and release everyone waiting on a touched conversation.
    ///
    /// Waiters are woken after the lock is dropped. A closed state ignores
    /// the batch.
    pub(crate) fn ingest(&self, batch: Vec<ConversationMessage>) -> IngestReport {
        let (report, waiters) = {
            let mut state = self.lock();
            if state.closed {
                return IngestReport::default();
            }
            let report = apply_batch(&mut state.store, batch);
            let waiters = state.pending.complete_all(report.touched.iter().copied());
            (report, waiters)
        };
        release(waiters, FetchOutcome::Completed);
        report
    }

    /// Mark the state closed, drop the cache and release every waiter.
    ///
    /// Returns false if it was already closed.
    pub(crate) fn close(&self) -> bool {
        let waiters = {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            state.store.clear();
            state.pending.drain()
        };
        release(waiters, FetchOutcome::Released);
        true
    }
}

/// Wake every waiter with `outcome`.
///
/// Waiters whose receiver is gone (timed out or cancelled) are skipped.
pub(crate) fn release(waiters: Vec<Waiter>, outcome: FetchOutcome) {
    for waiter in waiters {
        let _ = waiter.send(outcome);
    }
}
