//! Conversation messages and their raw wire records.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, MessageUid};

/// Event flag marking a record that carries a plain text body.
pub const EVENT_TEXT_MESSAGE: u32 = 0x1;

/// Android message box a record was filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum MessageBox {
    /// Received from the other party
    Inbox = 1,
    /// Sent by the device owner
    Sent = 2,
    /// Unsent draft
    Draft = 3,
    /// Waiting to be sent
    Outbox = 4,
    /// Sending failed
    Failed = 5,
    /// Queued for later sending
    Queued = 6,
}

impl MessageBox {
    /// Map a raw box code to a known box.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(MessageBox::Inbox),
            2 => Some(MessageBox::Sent),
            3 => Some(MessageBox::Draft),
            4 => Some(MessageBox::Outbox),
            5 => Some(MessageBox::Failed),
            6 => Some(MessageBox::Queued),
            _ => None,
        }
    }

    /// Direction of messages in this box.
    ///
    /// Drafts were never exchanged with anyone and have no direction.
    pub fn direction(self) -> Option<Direction> {
        match self {
            MessageBox::Inbox => Some(Direction::Received),
            MessageBox::Sent | MessageBox::Outbox | MessageBox::Failed | MessageBox::Queued => {
                Some(Direction::Sent)
            }
            MessageBox::Draft => None,
        }
    }
}

/// Whether a message was sent from or received by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Sent by the device owner
    Sent,
    /// Received from the other party
    Received,
}

/// A text message belonging to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Unique id within the conversation
    pub uid: MessageUid,
    /// Conversation this message belongs to
    pub conversation_id: ConversationId,
    /// Sort key (milliseconds since epoch as reported by the device)
    pub timestamp: i64,
    /// Raw address of the other party, e.g. a phone number
    pub address: String,
    /// Text body
    pub body: String,
    /// Sent or received
    pub direction: Direction,
    /// Box the device filed this message under
    pub message_box: MessageBox,
}

impl ConversationMessage {
    /// Create a received text message.
    pub fn received(
        uid: i64,
        conversation_id: i64,
        timestamp: i64,
        address: &str,
        body: &str,
    ) -> Self {
        Self {
            uid: MessageUid::new(uid),
            conversation_id: ConversationId::new(conversation_id),
            timestamp,
            address: address.to_string(),
            body: body.to_string(),
            direction: Direction::Received,
            message_box: MessageBox::Inbox,
        }
    }

    /// Create a sent text message.
    pub fn sent(uid: i64, conversation_id: i64, timestamp: i64, address: &str, body: &str) -> Self {
        Self {
            direction: Direction::Sent,
            message_box: MessageBox::Sent,
            ..Self::received(uid, conversation_id, timestamp, address, body)
        }
    }
}

/// A message as delivered by the remote device.
///
/// Fields the device omitted decode to their defaults; [`MessageRecord::into_message`]
/// decides whether the record is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Device message id
    #[serde(default)]
    pub uid: Option<i64>,
    /// Device thread id
    #[serde(default)]
    pub thread_id: Option<i64>,
    /// Timestamp in milliseconds
    #[serde(default)]
    pub date: i64,
    /// Address of the other party
    #[serde(default)]
    pub address: String,
    /// Text body
    #[serde(default)]
    pub body: String,
    /// Raw Android message box code
    #[serde(default, rename = "type")]
    pub message_box: i32,
    /// Event flags, see [`EVENT_TEXT_MESSAGE`]
    #[serde(default)]
    pub event: u32,
}

impl MessageRecord {
    /// Whether the record carries a plain text body.
    pub fn contains_text_body(&self) -> bool {
        self.event & EVENT_TEXT_MESSAGE != 0
    }

    /// Convert into a stored message.
    ///
    /// Returns `None` for records that must be dropped: missing ids,
    /// non-text content, drafts and unknown box codes.
    pub fn into_message(self) -> Option<ConversationMessage> {
        if !self.contains_text_body() {
            return None;
        }
        let message_box = MessageBox::from_code(self.message_box)?;
        let direction = message_box.direction()?;
        Some(ConversationMessage {
            uid: MessageUid::new(self.uid?),
            conversation_id: ConversationId::new(self.thread_id?),
            timestamp: self.date,
            address: self.address,
            body: self.body,
            direction,
            message_box,
        })
    }
}

impl From<&ConversationMessage> for MessageRecord {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            uid: Some(message.uid.value()),
            thread_id: Some(message.conversation_id.value()),
            date: message.timestamp,
            address: message.address.clone(),
            body: message.body.clone(),
            message_box: message.message_box as i32,
            event: EVENT_TEXT_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_record(uid: i64, thread_id: i64, message_box: i32) -> MessageRecord {
        MessageRecord {
            uid: Some(uid),
            thread_id: Some(thread_id),
            date: 100,
            address: "+15550001".into(),
            body: "Hi".into(),
            message_box,
            event: EVENT_TEXT_MESSAGE,
        }
    }

    #[test]
    fn inbox_record_becomes_received_message() {
        let message = text_record(1, 10, 1).into_message().unwrap();

        assert_eq!(message.uid, MessageUid::new(1));
        assert_eq!(message.conversation_id, ConversationId::new(10));
        assert_eq!(message.direction, Direction::Received);
        assert_eq!(message.body, "Hi");
    }

    #[test]
    fn outgoing_boxes_are_sent() {
        for code in [2, 4, 5, 6] {
            let message = text_record(1, 10, code).into_message().unwrap();
            assert_eq!(message.direction, Direction::Sent, "box {}", code);
        }
    }

    #[test]
    fn drafts_are_dropped() {
        assert!(text_record(1, 10, 3).into_message().is_none());
    }

    #[test]
    fn unknown_box_is_dropped() {
        assert!(text_record(1, 10, 0).into_message().is_none());
        assert!(text_record(1, 10, 42).into_message().is_none());
    }

    #[test]
    fn non_text_event_is_dropped() {
        let mut record = text_record(1, 10, 1);
        record.event = 0x2;
        assert!(!record.contains_text_body());
        assert!(record.into_message().is_none());
    }

    #[test]
    fn missing_ids_are_dropped() {
        let mut record = text_record(1, 10, 1);
        record.uid = None;
        assert!(record.into_message().is_none());

        let mut record = text_record(1, 10, 1);
        record.thread_id = None;
        assert!(record.into_message().is_none());
    }

    #[test]
    fn record_from_message_keeps_fields() {
        let message = ConversationMessage::sent(5, 10, 200, "+15550001", "Bye");
        let record = MessageRecord::from(&message);

        assert_eq!(record.message_box, 2);
        assert!(record.contains_text_body());
        assert_eq!(record.into_message(), Some(message));
    }

    #[test]
    fn record_fields_default_when_absent() {
        let record: MessageRecord = serde_json::from_str(r#"{"uid": 3}"#).unwrap();
        assert_eq!(record.uid, Some(3));
        assert_eq!(record.thread_id, None);
        assert_eq!(record.event, 0);
    }
}
