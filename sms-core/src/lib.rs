//! # sms-core
//!
//! Pure conversation logic for smsync (no I/O, instant tests).
//!
//! This crate implements the data structures and algorithms of the
//! conversation engine without any network I/O or locking:
//!
//! - [`ConversationStore`] keeps every conversation sorted and deduplicated
//! - [`apply_batch`] ingests a batch and reports what changed
//! - [`PendingFetches`] tracks conversations with a remote fetch in flight
//!
//! `sms-client` owns the mutex around these types and performs the actual
//! transport I/O based on what they report.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ingest;
pub mod pending;
pub mod store;

pub use ingest::{apply_batch, ConversationEvent, IngestReport};
pub use pending::{PendingFetches, Registration, Ticket};
pub use store::{ConversationStore, UpsertOutcome};
