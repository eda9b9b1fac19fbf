//! # sms-client
//!
//! Conversation sessions for smsync.
//!
//! This is the library that applications use to mirror a remote device's
//! text conversations.
//!
//! ## Features
//!
//! - **Ingest**: batches from the device are deduplicated and ordered per conversation
//! - **Fetch Coordination**: one in-flight history fetch per conversation, shared by all waiters
//! - **Paging**: [`ConversationStream`] yields cached messages first, fetching older pages on demand
//! - **Transport Abstraction**: Pluggable device transport (mock included)
//! - **Hot-swap**: [`SessionManager`] replaces a device's session on reconnect
//!
//! ## Example
//!
//! ```ignore
//! use smsync_client::{ClientConfig, MockTransport, SessionManager};
//!
//! let manager = SessionManager::new(ClientConfig::default());
//! let session = manager.open_session("phone".into(), Arc::new(MockTransport::new()));
//! session.start_delivery();
//!
//! session.request_all_conversation_threads().await;
//! let heads = session.active_conversations();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod forward;
pub mod logging;
pub mod manager;
pub mod session;
mod state;
pub mod transport;
pub mod worker;

pub use config::{ClientConfig, ConfigError, EventsConfig, SyncConfig};
pub use coordinator::{LoadOutcome, SyncCoordinator};
pub use error::ClientError;
pub use forward::MessageForwarder;
pub use manager::SessionManager;
pub use session::ConversationSession;
pub use transport::{DeviceTransport, MockTransport, TransportError};
pub use worker::{ConversationStream, RequestWorker};

pub use smsync_core::ConversationEvent;
