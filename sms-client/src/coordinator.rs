//! Fetch coordination.
//!
//! [`SyncCoordinator`] makes sure at most one history request per
//! conversation is outstanding. Callers register a one-shot waiter under
//! the session lock; ingest clears the conversation and wakes every waiter
//! registered for it.
//!
//! ```text
//! caller ──register──► PendingFetches ◄──complete── ingest
//!    │                      │
//!    └─send request─► device ──batch──► handle_packet
//! ```

use std::sync::Arc;
use std::time::Duration;

use smsync_core::Ticket;
use smsync_types::{ConversationId, Packet, RequestConversation};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::ClientError;
use crate::state::{release, FetchOutcome, Shared};
use crate::transport::{send_packet, DeviceTransport};

/// How a call to [`SyncCoordinator::ensure_conversation_loaded`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A batch for the conversation arrived.
    Completed,
    /// The fetch was abandoned because the session shut down (or another
    /// caller's request could not be sent). Not an error.
    Released,
    /// A fetch was already in flight and coalescing is disabled; the call
    /// returned without waiting.
    AlreadyPending,
}

/// Issues history requests and waits for them to be answered.
#[derive(Clone)]
pub struct SyncCoordinator {
    shared: Arc<Shared>,
    transport: Arc<dyn DeviceTransport>,
    page_size: u32,
    coalesce: bool,
}

impl SyncCoordinator {
    pub(crate) fn new(
        shared: Arc<Shared>,
        transport: Arc<dyn DeviceTransport>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            shared,
            transport,
            page_size: config.page_size,
            coalesce: config.coalesce_waiters,
        }
    }

    /// Check if a fetch for `id` is in flight.
    pub fn is_pending(&self, id: ConversationId) -> bool {
        self.shared.lock().pending.is_pending(id)
    }

    /// Make sure a page of `id`'s history has been requested and wait for it.
    ///
    /// The first caller for an id sends one request for the page older than
    /// the oldest cached message. Later callers join that fetch (or return
    /// [`LoadOutcome::AlreadyPending`] when coalescing is off). Dropping the
    /// returned future withdraws the caller; when the last waiter for an id
    /// leaves, a later call issues a fresh request.
    ///
    /// # Errors
    ///
    /// [`ClientError::Timeout`] if nothing arrives within `timeout`, or a
    /// transport error if the request could not be sent.
    pub async fn ensure_conversation_loaded(
        &self,
        id: ConversationId,
        timeout: Duration,
    ) -> Result<LoadOutcome, ClientError> {
        self.load(id, timeout, self.coalesce).await
    }

    /// Like [`ensure_conversation_loaded`](Self::ensure_conversation_loaded)
    /// but always joins a pending fetch. Used by the paging worker, which
    /// needs the page before it can continue.
    pub(crate) async fn wait_loaded(
        &self,
        id: ConversationId,
        timeout: Duration,
    ) -> Result<LoadOutcome, ClientError> {
        self.load(id, timeout, true).await
    }

    async fn load(
        &self,
        id: ConversationId,
        timeout: Duration,
        coalesce: bool,
    ) -> Result<LoadOutcome, ClientError> {
        let (tx, rx) = oneshot::channel();

        let (registration, request) = {
            let mut state = self.shared.lock();
            if state.closed {
                return Ok(LoadOutcome::Released);
            }
            if !coalesce && state.pending.is_pending(id) {
                debug!(conversation_id = %id, "fetch already pending, not waiting");
                return Ok(LoadOutcome::AlreadyPending);
            }

            let registration = state.pending.register(id, tx);
            let request = registration.first.then(|| RequestConversation {
                thread_id: id,
                range_start: state.store.oldest_timestamp(id),
                number_to_request: Some(self.page_size),
            });
            (registration, request)
        };
        let mut guard = WaitGuard::new(&self.shared, id, registration.ticket);

        match request {
            Some(request) => {
                debug!(
                    conversation_id = %id,
                    range_start = ?request.range_start,
                    page_size = self.page_size,
                    "requesting conversation page"
                );
                let packet = Packet::RequestConversation(request);
                if let Err(e) = send_packet(self.transport.as_ref(), &packet).await {
                    guard.disarm();
                    let waiters = self.shared.lock().pending.abandon(id, registration.fetch);
                    release(waiters, FetchOutcome::Released);
                    warn!(conversation_id = %id, error = %e, "failed to request conversation");
                    return Err(e);
                }
            }
            None => debug!(conversation_id = %id, "joining pending fetch"),
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(FetchOutcome::Completed)) => {
                guard.disarm();
                Ok(LoadOutcome::Completed)
            }
            // A dropped sender means the waiter was discarded without a
            // verdict; treat it like teardown.
            Ok(Ok(FetchOutcome::Released)) | Ok(Err(_)) => {
                guard.disarm();
                Ok(LoadOutcome::Released)
            }
            Err(_) => {
                warn!(
                    conversation_id = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "timed out waiting for conversation"
                );
                Err(ClientError::Timeout)
            }
        }
    }
}

/// Withdraws a waiter that leaves before its fetch finished.
struct WaitGuard<'a> {
    shared: &'a Shared,
    id: ConversationId,
    ticket: Ticket,
    armed: bool,
}

impl<'a> WaitGuard<'a> {
    fn new(shared: &'a Shared, id: ConversationId, ticket: Ticket) -> Self {
        Self {
            shared,
            id,
            ticket,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.shared.lock().pending.withdraw(self.id, self.ticket) {
            debug!(conversation_id = %self.id, "last waiter left, fetch abandoned");
        }
    }
}
