//! Batch ingest for the conversation store.
//!
//! Applies a batch of messages and reports what changed. This is a pure
//! function - the caller publishes the events and releases waiters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smsync_types::{ConversationId, ConversationMessage};

use crate::store::ConversationStore;

/// Change notification produced by ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationEvent {
    /// A previously unknown conversation appeared; carries its head.
    Created(ConversationMessage),
    /// A known conversation has a new head message.
    Updated(ConversationMessage),
}

impl ConversationEvent {
    /// The message carried by this event.
    pub fn message(&self) -> &ConversationMessage {
        match self {
            ConversationEvent::Created(message) | ConversationEvent::Updated(message) => message,
        }
    }

    /// The conversation this event is about.
    pub fn conversation_id(&self) -> ConversationId {
        self.message().conversation_id
    }
}

/// Result of applying one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Every conversation that appeared in the batch, including those
    /// whose messages were all duplicates.
    pub touched: BTreeSet<ConversationId>,
    /// Notifications in batch order.
    pub events: Vec<ConversationEvent>,
    /// Number of messages actually stored.
    pub inserted: usize,
}

/// Apply a batch of messages to the store.
///
/// A conversation is reported as touched even when nothing new was stored:
/// a caller waiting on a fetch must be released by a duplicate-only reply.
pub fn apply_batch<I>(store: &mut ConversationStore, batch: I) -> IngestReport
where
    I: IntoIterator<Item = ConversationMessage>,
{
    let mut report = IngestReport::default();

    for message in batch {
        report.touched.insert(message.conversation_id);

        let outcome = store.upsert(message.clone());
        if !outcome.inserted {
            continue;
        }
        report.inserted += 1;

        if outcome.new_conversation {
            report.events.push(ConversationEvent::Created(message));
        } else if outcome.new_head {
            report.events.push(ConversationEvent::Updated(message));
        }
    }

    report
}
