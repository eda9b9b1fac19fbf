//! In-memory conversation store.
//!
//! Keeps, per conversation:
//! - The messages sorted ascending by timestamp
//! - The set of message uids already stored (dedup)
//!
//! The store only grows; it is discarded as a whole when the owning
//! session is torn down.

use std::collections::{HashMap, HashSet};
use smsync_types::{ConversationId, ConversationMessage, MessageUid};

/// Classification of a single [`ConversationStore::upsert`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// The conversation did not exist before this message.
    pub new_conversation: bool,
    /// The message is now the conversation's head (maximum timestamp).
    pub new_head: bool,
    /// The message was stored (false for an already-known uid).
    pub inserted: bool,
}

#[derive(Debug, Default)]
struct Conversation {
    /// Sorted ascending by timestamp; equal timestamps keep arrival order.
    messages: Vec<ConversationMessage>,
    known: HashSet<MessageUid>,
}

/// Per-device mapping from conversation id to its ordered messages.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, Conversation>,
    /// Conversation ids in the order they were first seen.
    discovery_order: Vec<ConversationId>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, keeping its conversation sorted by timestamp.
    ///
    /// A message whose uid is already known for its conversation is a
    /// no-op and reports `inserted: false`.
    pub fn upsert(&mut self, message: ConversationMessage) -> UpsertOutcome {
        let id = message.conversation_id;
        let new_conversation = !self.conversations.contains_key(&id);

        if !new_conversation && self.conversations[&id].known.contains(&message.uid) {
            return UpsertOutcome::default();
        }

        if new_conversation {
            self.discovery_order.push(id);
        }
        let conversation = self.conversations.entry(id).or_default();

        let position = conversation
            .messages
            .partition_point(|m| m.timestamp <= message.timestamp);
        let new_head = position == conversation.messages.len();

        conversation.known.insert(message.uid);
        conversation.messages.insert(position, message);

        UpsertOutcome {
            new_conversation,
            new_head,
            inserted: true,
        }
    }

    /// All messages of a conversation, oldest first.
    ///
    /// Empty if the conversation is unknown.
    pub fn conversation(&self, id: ConversationId) -> Vec<ConversationMessage> {
        self.conversations
            .get(&id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// The head message of every known conversation.
    ///
    /// Ordered by when each conversation was first seen, not by recency.
    /// Callers that want the most recent conversation first must sort.
    pub fn heads(&self) -> Vec<ConversationMessage> {
        self.discovery_order
            .iter()
            .filter_map(|id| self.head(*id))
            .cloned()
            .collect()
    }

    /// The head (maximum-timestamp) message of a conversation.
    pub fn head(&self, id: ConversationId) -> Option<&ConversationMessage> {
        self.conversations.get(&id)?.messages.last()
    }

    /// The oldest stored message of a conversation.
    pub fn first(&self, id: ConversationId) -> Option<&ConversationMessage> {
        self.conversations.get(&id)?.messages.first()
    }

    /// Message at `index` counting back from the head (0 = head).
    pub fn message_from_head(&self, id: ConversationId, index: usize) -> Option<&ConversationMessage> {
        let messages = &self.conversations.get(&id)?.messages;
        let position = messages.len().checked_sub(index + 1)?;
        messages.get(position)
    }

    /// The message stored just before `uid` (the next older one).
    ///
    /// `None` if `uid` is the oldest stored message or is not stored. Unlike
    /// [`message_from_head`](Self::message_from_head) this does not shift
    /// when a newer message arrives.
    pub fn message_before(&self, id: ConversationId, uid: MessageUid) -> Option<&ConversationMessage> {
        let messages = &self.conversations.get(&id)?.messages;
        let position = messages.iter().rposition(|m| m.uid == uid)?;
        position.checked_sub(1).and_then(|p| messages.get(p))
    }

    /// Timestamp of the oldest stored message, used as a paging bound.
    pub fn oldest_timestamp(&self, id: ConversationId) -> Option<i64> {
        self.first(id).map(|m| m.timestamp)
    }

    /// Number of messages stored for a conversation.
    pub fn len(&self, id: ConversationId) -> usize {
        self.conversations
            .get(&id)
            .map(|c| c.messages.len())
            .unwrap_or(0)
    }

    /// Check whether a conversation is known.
    pub fn contains(&self, id: ConversationId) -> bool {
        self.conversations.contains_key(&id)
    }

    /// Check whether a message uid is already stored for a conversation.
    pub fn is_known(&self, id: ConversationId, uid: MessageUid) -> bool {
        self.conversations
            .get(&id)
            .map(|c| c.known.contains(&uid))
            .unwrap_or(false)
    }

    /// Number of known conversations.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Check if the store holds no conversations.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Drop every conversation.
    pub fn clear(&mut self) {
        self.conversations.clear();
        self.discovery_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(uid: i64, conversation: i64, timestamp: i64, body: &str) -> ConversationMessage {
        ConversationMessage::received(uid, conversation, timestamp, "+15550001", body)
    }

    fn bodies(store: &ConversationStore, id: i64) -> Vec<String> {
        store
            .conversation(ConversationId::new(id))
            .into_iter()
            .map(|m| m.body)
            .collect()
    }

    fn assert_sorted(store: &ConversationStore, id: i64) {
        let messages = store.conversation(ConversationId::new(id));
        for pair in messages.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    // ===========================================
    // Upsert Classification Tests
    // ===========================================

    #[test]
    fn first_message_creates_conversation() {
        let mut store = ConversationStore::new();

        let outcome = store.upsert(msg(1, 10, 100, "Hi"));

        assert_eq!(
            outcome,
            UpsertOutcome {
                new_conversation: true,
                new_head: true,
                inserted: true,
            }
        );
        assert!(store.contains(ConversationId::new(10)));
    }

    #[test]
    fn newer_message_is_new_head() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "Hi"));

        let outcome = store.upsert(msg(2, 10, 200, "Bye"));

        assert!(outcome.inserted);
        assert!(!outcome.new_conversation);
        assert!(outcome.new_head);
        assert_eq!(bodies(&store, 10), vec!["Hi", "Bye"]);
    }

    #[test]
    fn older_message_is_not_new_head() {
        let mut store = ConversationStore::new();
        store.upsert(msg(2, 10, 200, "Bye"));

        let outcome = store.upsert(msg(1, 10, 100, "Hi"));

        assert!(outcome.inserted);
        assert!(!outcome.new_head);
        assert_eq!(bodies(&store, 10), vec!["Hi", "Bye"]);
        assert_eq!(store.head(ConversationId::new(10)).unwrap().body, "Bye");
    }

    #[test]
    fn duplicate_uid_is_no_op() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "Hi"));

        let outcome = store.upsert(msg(1, 10, 100, "Hi"));

        assert_eq!(outcome, UpsertOutcome::default());
        assert_eq!(store.len(ConversationId::new(10)), 1);
    }

    #[test]
    fn duplicate_uid_with_other_content_is_still_ignored() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "Hi"));

        let outcome = store.upsert(msg(1, 10, 999, "Edited"));

        assert!(!outcome.inserted);
        assert_eq!(bodies(&store, 10), vec!["Hi"]);
    }

    #[test]
    fn same_uid_in_other_conversation_is_distinct() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "Hi"));

        let outcome = store.upsert(msg(1, 20, 100, "Hello"));

        assert!(outcome.inserted);
        assert!(outcome.new_conversation);
        assert_eq!(store.conversation_count(), 2);
    }

    #[test]
    fn equal_timestamps_keep_both_messages() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "first"));

        let outcome = store.upsert(msg(2, 10, 100, "second"));

        assert!(outcome.inserted);
        assert!(outcome.new_head);
        assert_eq!(bodies(&store, 10), vec!["first", "second"]);
    }

    // ===========================================
    // Invariant Tests
    // ===========================================

    #[test]
    fn ingesting_twice_equals_ingesting_once() {
        let batch = vec![
            msg(3, 10, 300, "c"),
            msg(1, 10, 100, "a"),
            msg(2, 10, 200, "b"),
        ];

        let mut once = ConversationStore::new();
        for m in batch.clone() {
            once.upsert(m);
        }
        let mut twice = ConversationStore::new();
        for m in batch.iter().chain(batch.iter()).cloned() {
            twice.upsert(m);
        }

        assert_eq!(
            once.conversation(ConversationId::new(10)),
            twice.conversation(ConversationId::new(10))
        );
    }

    #[test]
    fn shuffled_inserts_stay_sorted() {
        let mut store = ConversationStore::new();
        for (uid, ts) in [(1, 500), (2, 100), (3, 900), (4, 300), (5, 300), (6, 0)] {
            store.upsert(msg(uid, 10, ts, "x"));
        }

        assert_sorted(&store, 10);
        assert_eq!(store.len(ConversationId::new(10)), 6);
        assert_eq!(store.oldest_timestamp(ConversationId::new(10)), Some(0));
    }

    #[test]
    fn no_two_stored_messages_share_a_uid() {
        let mut store = ConversationStore::new();
        for (uid, ts) in [(1, 100), (2, 200), (1, 300), (2, 50), (3, 200)] {
            store.upsert(msg(uid, 10, ts, "x"));
        }

        let messages = store.conversation(ConversationId::new(10));
        let uids: HashSet<_> = messages.iter().map(|m| m.uid).collect();
        assert_eq!(uids.len(), messages.len());
        assert!(store.is_known(ConversationId::new(10), MessageUid::new(3)));
    }

    // ===========================================
    // Query Tests
    // ===========================================

    #[test]
    fn unknown_conversation_is_empty() {
        let store = ConversationStore::new();
        assert!(store.conversation(ConversationId::new(99)).is_empty());
        assert_eq!(store.len(ConversationId::new(99)), 0);
        assert!(store.head(ConversationId::new(99)).is_none());
    }

    #[test]
    fn heads_follow_discovery_order() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 20, 500, "twenty"));
        store.upsert(msg(1, 10, 100, "ten"));
        store.upsert(msg(2, 20, 50, "older twenty"));
        store.upsert(msg(2, 10, 900, "ten again"));

        let heads: Vec<_> = store.heads().into_iter().map(|m| m.body).collect();

        assert_eq!(heads, vec!["twenty", "ten again"]);
    }

    #[test]
    fn message_from_head_counts_backwards() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "a"));
        store.upsert(msg(2, 10, 200, "b"));
        store.upsert(msg(3, 10, 300, "c"));
        let id = ConversationId::new(10);

        assert_eq!(store.message_from_head(id, 0).unwrap().body, "c");
        assert_eq!(store.message_from_head(id, 2).unwrap().body, "a");
        assert!(store.message_from_head(id, 3).is_none());
    }

    #[test]
    fn message_before_is_stable_when_head_changes() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "a"));
        store.upsert(msg(2, 10, 200, "b"));
        let id = ConversationId::new(10);

        assert_eq!(store.message_before(id, MessageUid::new(2)).unwrap().body, "a");

        store.upsert(msg(9, 10, 900, "new head"));

        assert_eq!(store.message_before(id, MessageUid::new(2)).unwrap().body, "a");
        assert!(store.message_before(id, MessageUid::new(1)).is_none());
        assert!(store.message_before(id, MessageUid::new(42)).is_none());
        assert!(store.message_before(ConversationId::new(99), MessageUid::new(1)).is_none());
    }

    #[test]
    fn first_is_oldest_message() {
        let mut store = ConversationStore::new();
        store.upsert(msg(2, 10, 200, "b"));
        store.upsert(msg(1, 10, 100, "a"));

        assert_eq!(store.first(ConversationId::new(10)).unwrap().body, "a");
    }

    #[test]
    fn clear_removes_everything() {
        let mut store = ConversationStore::new();
        store.upsert(msg(1, 10, 100, "a"));
        store.upsert(msg(1, 20, 100, "b"));

        store.clear();

        assert!(store.is_empty());
        assert!(store.heads().is_empty());
    }
}
