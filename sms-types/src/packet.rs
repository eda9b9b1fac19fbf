//! Packets exchanged with the remote device.
//!
//! The device sends [`Packet::Messages`] batches; everything else is
//! issued by this side.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, MessageRecord, WireError};

/// All packets understood by the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Packet {
    /// A batch of message records from the device
    #[serde(rename = "kdeconnect.sms.messages")]
    Messages(MessagesBatch),
    /// Ask the device to send a text message
    #[serde(rename = "kdeconnect.sms.request")]
    SendSms(SendSms),
    /// Ask the device for (more) history of one conversation
    #[serde(rename = "kdeconnect.sms.request_conversation")]
    RequestConversation(RequestConversation),
    /// Ask the device for the newest message of every conversation
    #[serde(rename = "kdeconnect.sms.request_conversations")]
    RequestConversations,
}

impl Packet {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        rmp_serde::to_vec(self).map_err(WireError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.is_empty() {
            return Err(WireError::Empty);
        }
        rmp_serde::from_slice(bytes).map_err(WireError::Deserialization)
    }
}

/// Batch of message records delivered together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesBatch {
    /// Records in device order
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

/// Outbound text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendSms {
    /// Destination address
    pub phone_number: String,
    /// Text to send
    pub message_body: String,
}

/// Request for a page of a conversation's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConversation {
    /// Conversation to fetch
    pub thread_id: ConversationId,
    /// Only return messages older than this timestamp (None = newest)
    pub range_start: Option<i64>,
    /// Maximum number of messages to return (None = device default)
    pub number_to_request: Option<u32>,
}
