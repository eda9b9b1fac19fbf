//! Paged conversation reads.
//!
//! A [`RequestWorker`] walks a range of a conversation, newest first,
//! handing out cached messages and fetching older pages from the device
//! when the cache runs out. Each request gets its own task and its own
//! [`ConversationStream`].

use std::ops::Range;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use smsync_core::ConversationEvent;
use smsync_types::{ConversationId, ConversationMessage, MessageUid};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::coordinator::{LoadOutcome, SyncCoordinator};
use crate::state::Shared;

/// Buffered messages between a worker and its consumer.
const STREAM_BUFFER: usize = 32;

/// Fetches in a row that may be answered only by newer messages before
/// the worker gives up on older history.
const MAX_STALE_WAITS: usize = 3;

/// Messages of one conversation range, newest first.
///
/// Ends when the range is complete or no further history can be obtained.
/// Dropping the stream stops its worker.
#[derive(Debug)]
pub struct ConversationStream {
    rx: mpsc::Receiver<ConversationMessage>,
}

impl ConversationStream {
    /// Receive the next message, or `None` when the stream has ended.
    pub async fn next_message(&mut self) -> Option<ConversationMessage> {
        self.rx.recv().await
    }
}

impl Stream for ConversationStream {
    type Item = ConversationMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Spawns paging tasks for a session.
#[derive(Clone)]
pub struct RequestWorker {
    coordinator: SyncCoordinator,
    shared: Arc<Shared>,
    events: broadcast::Sender<ConversationEvent>,
    fetch_timeout: Duration,
}

impl RequestWorker {
    pub(crate) fn new(
        coordinator: SyncCoordinator,
        shared: Arc<Shared>,
        events: broadcast::Sender<ConversationEvent>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            coordinator,
            shared,
            events,
            fetch_timeout,
        }
    }

    /// Start delivering messages `range` of conversation `id`.
    ///
    /// Index 0 is the head. Must be called inside a tokio runtime.
    pub fn spawn(&self, id: ConversationId, range: Range<usize>) -> ConversationStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let worker = self.clone();
        tokio::spawn(async move { worker.run(id, range, tx).await });
        ConversationStream { rx }
    }

    async fn run(
        self,
        id: ConversationId,
        range: Range<usize>,
        tx: mpsc::Sender<ConversationMessage>,
    ) {
        if range.is_empty() {
            return;
        }

        // The walk is anchored on the head seen at the first step and then
        // follows `message_before`, so messages arriving at the head while
        // we page do not shift positions.
        let mut cursor: Option<MessageUid> = None;
        let mut position = 0usize;
        let mut delivered = 0usize;
        let mut stale_waits = 0usize;

        while position < range.end {
            let (next, stored) = {
                let state = self.shared.lock();
                let next = match cursor {
                    None => state.store.head(id),
                    Some(uid) => state.store.message_before(id, uid),
                };
                (next.cloned(), state.store.len(id))
            };

            if let Some(message) = next {
                stale_waits = 0;
                cursor = Some(message.uid);
                position += 1;
                if position <= range.start {
                    continue;
                }

                // No subscribers is fine.
                let _ = self.events.send(ConversationEvent::Updated(message.clone()));
                if tx.send(message).await.is_err() {
                    debug!(conversation_id = %id, position, "stream dropped, stopping worker");
                    return;
                }
                delivered += 1;
                continue;
            }

            match self.coordinator.wait_loaded(id, self.fetch_timeout).await {
                Ok(LoadOutcome::Completed) => {}
                Ok(outcome) => {
                    debug!(conversation_id = %id, ?outcome, "fetch released, stopping worker");
                    break;
                }
                Err(e) => {
                    warn!(conversation_id = %id, error = %e, "fetch failed, stopping worker");
                    break;
                }
            }

            let (older_available, grown) = {
                let state = self.shared.lock();
                let older = match cursor {
                    None => state.store.head(id).is_some(),
                    Some(uid) => state.store.message_before(id, uid).is_some(),
                };
                (older, state.store.len(id) > stored)
            };
            if older_available {
                continue;
            }
            // Only newer messages arrived; the page we asked for may still
            // be on its way.
            if grown && stale_waits < MAX_STALE_WAITS {
                stale_waits += 1;
                debug!(conversation_id = %id, stale_waits, "fetch completed by newer messages, waiting again");
                continue;
            }
            debug!(conversation_id = %id, stored, "no older history");
            break;
        }

        debug!(conversation_id = %id, delivered, "conversation request finished");
    }
}
