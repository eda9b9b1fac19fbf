//! Pending fetch tracking.
//!
//! Records which conversations have a remote fetch in flight and who is
//! waiting for each one. A conversation id appears at most once, so a
//! second caller for the same id joins the existing fetch instead of
//! starting another.
//!
//! The waiter type is generic so this module stays free of any runtime;
//! `sms-client` stores one-shot senders here.

use std::collections::HashMap;
use smsync_types::ConversationId;

/// Handle identifying one registered waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Result of [`PendingFetches::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Ticket for withdrawing this waiter later.
    pub ticket: Ticket,
    /// True if this registration started the fetch (the caller must send
    /// the request); false if it joined one already in flight.
    pub first: bool,
    /// Identifies the fetch this waiter joined.
    pub fetch: Ticket,
}

#[derive(Debug)]
struct Fetch<W> {
    /// Ticket of the registration that started this fetch.
    origin: Ticket,
    waiters: Vec<(Ticket, W)>,
}

/// Conversations with an outstanding fetch and their waiters.
#[derive(Debug)]
pub struct PendingFetches<W> {
    entries: HashMap<ConversationId, Fetch<W>>,
    next_ticket: u64,
}

impl<W> Default for PendingFetches<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> PendingFetches<W> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Register a waiter for `id`, marking it pending if it was not.
    pub fn register(&mut self, id: ConversationId, waiter: W) -> Registration {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);

        let fetch = self.entries.entry(id).or_insert_with(|| Fetch {
            origin: ticket,
            waiters: Vec::new(),
        });
        let first = fetch.origin == ticket;
        fetch.waiters.push((ticket, waiter));

        Registration {
            ticket,
            first,
            fetch: fetch.origin,
        }
    }

    /// Check if a fetch for `id` is in flight.
    pub fn is_pending(&self, id: ConversationId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Clear `id` and return its waiters.
    pub fn complete(&mut self, id: ConversationId) -> Vec<W> {
        self.entries
            .remove(&id)
            .map(|fetch| fetch.waiters.into_iter().map(|(_, w)| w).collect())
            .unwrap_or_default()
    }

    /// Clear `id` only if its pending fetch is still `fetch`, returning its
    /// waiters.
    ///
    /// Used when the request for a fetch could not be sent: a newer fetch
    /// for the same id, started after this one completed, is left alone.
    pub fn abandon(&mut self, id: ConversationId, fetch: Ticket) -> Vec<W> {
        match self.entries.get(&id) {
            Some(current) if current.origin == fetch => self.complete(id),
            _ => Vec::new(),
        }
    }

    /// Clear every id in `ids` and return all their waiters.
    pub fn complete_all<I>(&mut self, ids: I) -> Vec<W>
    where
        I: IntoIterator<Item = ConversationId>,
    {
        ids.into_iter().flat_map(|id| self.complete(id)).collect()
    }

    /// Remove one waiter, e.g. after it timed out or was cancelled.
    ///
    /// When the last waiter leaves, the id is no longer pending so a later
    /// caller can issue a fresh fetch. Returns true in that case.
    pub fn withdraw(&mut self, id: ConversationId, ticket: Ticket) -> bool {
        let Some(fetch) = self.entries.get_mut(&id) else {
            return false;
        };
        fetch.waiters.retain(|(t, _)| *t != ticket);
        if fetch.waiters.is_empty() {
            self.entries.remove(&id);
            true
        } else {
            false
        }
    }

    /// Clear everything and return every waiter.
    pub fn drain(&mut self) -> Vec<W> {
        self.entries
            .drain()
            .flat_map(|(_, fetch)| fetch.waiters.into_iter().map(|(_, w)| w))
            .collect()
    }

    /// Number of waiters registered for `id`.
    pub fn waiter_count(&self, id: ConversationId) -> usize {
        self.entries
            .get(&id)
            .map(|fetch| fetch.waiters.len())
            .unwrap_or(0)
    }

    /// Number of conversations with a fetch in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no fetch is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
