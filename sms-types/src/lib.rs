//! # sms-types
//!
//! Wire format types for smsync conversation synchronization.
//!
//! This crate provides the foundational types used across all smsync crates:
//! - [`ConversationId`], [`MessageUid`], [`DeviceId`] - Identity types
//! - [`ConversationMessage`] - A stored text message, and [`MessageRecord`],
//!   its raw form as delivered by the remote device
//! - [`Packet`] - Packets exchanged with the remote device
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod message;
mod packet;

pub use error::WireError;
pub use ids::{ConversationId, DeviceId, MessageUid};
pub use message::{ConversationMessage, Direction, MessageBox, MessageRecord, EVENT_TEXT_MESSAGE};
pub use packet::{MessagesBatch, Packet, RequestConversation, SendSms};
