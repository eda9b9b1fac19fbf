//! Forwarding of incoming messages to a secondary chat integration.
//!
//! A desktop may bridge received texts into another messaging service.
//! The session offers every text message of each inbound batch to its
//! forwarder before storing the batch.

use smsync_types::ConversationMessage;

/// Receives each incoming text message.
///
/// Implementations must not block; hand the message off to your own task
/// if forwarding involves I/O.
pub trait MessageForwarder: Send + Sync {
    /// Whether the integration can accept messages right now.
    ///
    /// When false, forwarding is skipped for the whole batch.
    fn is_available(&self) -> bool;

    /// Forward one message.
    fn forward(&self, message: &ConversationMessage);
}
