//! Per-device conversation session.
//!
//! A [`ConversationSession`] owns the cache and pending fetches for one
//! connected device. Inbound packets arrive through [`handle_packet`]
//! (directly, or from the task started by [`start_delivery`]); callers on
//! any task read conversations, page through history, and send replies.
//!
//! [`handle_packet`]: ConversationSession::handle_packet
//! [`start_delivery`]: ConversationSession::start_delivery

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use smsync_core::ConversationEvent;
use smsync_types::{
    ConversationId, ConversationMessage, DeviceId, MessageRecord, Packet, SendSms,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::coordinator::{LoadOutcome, SyncCoordinator};
use crate::error::ClientError;
use crate::forward::MessageForwarder;
use crate::state::Shared;
use crate::transport::{send_packet, DeviceTransport, TransportError};
use crate::worker::{ConversationStream, RequestWorker};

/// Conversation state for one connected device.
pub struct ConversationSession {
    device: DeviceId,
    shared: Arc<Shared>,
    transport: Arc<dyn DeviceTransport>,
    coordinator: SyncCoordinator,
    worker: RequestWorker,
    events: broadcast::Sender<ConversationEvent>,
    forwarder: Option<Arc<dyn MessageForwarder>>,
    fetch_timeout: Duration,
    delivery: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("device", &self.device)
            .field("forwarder", &self.forwarder.is_some())
            .finish_non_exhaustive()
    }
}

impl ConversationSession {
    /// Create a session for `device` talking over `transport`.
    pub fn new(device: DeviceId, transport: Arc<dyn DeviceTransport>, config: &ClientConfig) -> Self {
        let shared = Arc::new(Shared::new());
        let (events, _) = broadcast::channel(config.events.capacity.max(1));
        let coordinator = SyncCoordinator::new(shared.clone(), transport.clone(), &config.sync);
        let worker = RequestWorker::new(
            coordinator.clone(),
            shared.clone(),
            events.clone(),
            config.sync.fetch_timeout(),
        );

        Self {
            device,
            shared,
            transport,
            coordinator,
            worker,
            events,
            forwarder: None,
            fetch_timeout: config.sync.fetch_timeout(),
            delivery: Mutex::new(None),
        }
    }

    /// Offer every inbound text message to `forwarder`.
    pub fn with_forwarder(mut self, forwarder: Arc<dyn MessageForwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// The device this session belongs to.
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Subscribe to conversation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// The fetch coordinator for this session.
    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Check if the session was shut down.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    // ===========================================
    // Queries
    // ===========================================

    /// The newest message of every known conversation.
    ///
    /// Ordered by when each conversation was first seen; sort by timestamp
    /// for a most-recent-first list.
    pub fn active_conversations(&self) -> Vec<ConversationMessage> {
        self.shared.lock().store.heads()
    }

    /// All cached messages of a conversation, oldest first.
    pub fn conversation(&self, id: ConversationId) -> Vec<ConversationMessage> {
        self.shared.lock().store.conversation(id)
    }

    /// Stream messages `start..end` of a conversation, counting back from
    /// the newest (index 0).
    ///
    /// Older pages are fetched from the device as needed. Every delivered
    /// message is also published as [`ConversationEvent::Updated`].
    pub fn request_conversation(&self, id: ConversationId, start: usize, end: usize) -> ConversationStream {
        tracing::debug!(device = %self.device, conversation_id = %id, start, end, "conversation requested");
        self.worker.spawn(id, start..end.max(start))
    }

    /// Request the next page of a conversation and wait for it, using the
    /// configured fetch timeout.
    pub async fn ensure_conversation_loaded(&self, id: ConversationId) -> Result<LoadOutcome, ClientError> {
        self.coordinator.ensure_conversation_loaded(id, self.fetch_timeout).await
    }

    /// [`ensure_conversation_loaded`](Self::ensure_conversation_loaded)
    /// with an explicit timeout.
    pub async fn ensure_conversation_loaded_with_timeout(
        &self,
        id: ConversationId,
        timeout: Duration,
    ) -> Result<LoadOutcome, ClientError> {
        self.coordinator.ensure_conversation_loaded(id, timeout).await
    }

    // ===========================================
    // Outbound
    // ===========================================

    /// Send a text in reply to a conversation.
    ///
    /// The message goes to the address of the conversation's oldest cached
    /// message only; other participants of a group thread are not
    /// addressed. An unknown or empty conversation logs a warning and sends
    /// nothing. Send failures are logged, not returned.
    pub async fn reply_to_conversation(&self, id: ConversationId, text: &str) {
        let address = self.shared.lock().store.first(id).map(|m| m.address.clone());

        let Some(address) = address else {
            tracing::warn!(
                device = %self.device,
                conversation_id = %id,
                "tried to reply to a conversation with no messages"
            );
            return;
        };

        if let Err(e) = self.send_sms(&address, text).await {
            tracing::warn!(
                device = %self.device,
                conversation_id = %id,
                error = %e,
                "failed to send reply"
            );
        }
    }

    /// Ask the device to send a text message.
    ///
    /// # Errors
    ///
    /// [`ClientError::SessionClosed`] after [`shutdown`](Self::shutdown),
    /// or the transport error if the packet could not be sent.
    pub async fn send_sms(&self, phone_number: &str, body: &str) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::SessionClosed);
        }
        tracing::debug!(device = %self.device, "dispatching text message");
        let packet = Packet::SendSms(SendSms {
            phone_number: phone_number.to_string(),
            message_body: body.to_string(),
        });
        send_packet(self.transport.as_ref(), &packet).await
    }

    /// Ask the device for the newest message of every conversation.
    ///
    /// Replies arrive later as ordinary batches. Send failures are logged,
    /// not returned.
    pub async fn request_all_conversation_threads(&self) {
        tracing::debug!(device = %self.device, "requesting all conversation threads");
        if let Err(e) = send_packet(self.transport.as_ref(), &Packet::RequestConversations).await {
            tracing::warn!(device = %self.device, error = %e, "failed to request conversation threads");
        }
    }

    // ===========================================
    // Inbound
    // ===========================================

    /// Process one encoded packet from the device.
    ///
    /// Undecodable packets and packets this side only sends are ignored.
    pub fn handle_packet(&self, bytes: &[u8]) {
        let packet = match Packet::from_bytes(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!(device = %self.device, error = %e, "ignoring undecodable packet");
                return;
            }
        };

        match packet {
            Packet::Messages(batch) => {
                self.handle_records(batch.messages);
            }
            other => {
                tracing::debug!(device = %self.device, packet = ?other, "ignoring unexpected packet");
            }
        }
    }

    fn handle_records(&self, records: Vec<MessageRecord>) -> BTreeSet<ConversationId> {
        let received = records.len();
        let messages: Vec<ConversationMessage> = records
            .into_iter()
            .filter_map(MessageRecord::into_message)
            .collect();
        if messages.len() < received {
            tracing::debug!(
                device = %self.device,
                dropped = received - messages.len(),
                "dropped records without a text body"
            );
        }

        if self.is_closed() {
            tracing::debug!(device = %self.device, "session closed, ignoring batch");
            return BTreeSet::new();
        }

        if let Some(forwarder) = self.forwarder.as_ref().filter(|f| f.is_available()) {
            for message in &messages {
                forwarder.forward(message);
            }
        }

        self.add_messages(messages)
    }

    /// Store a batch of messages, publish notifications and release waiters.
    ///
    /// Returns every conversation the batch touched.
    pub fn add_messages(&self, messages: Vec<ConversationMessage>) -> BTreeSet<ConversationId> {
        let report = self.shared.ingest(messages);

        if !report.touched.is_empty() {
            tracing::debug!(
                device = %self.device,
                conversations = report.touched.len(),
                inserted = report.inserted,
                events = report.events.len(),
                "batch ingested"
            );
        }

        for event in report.events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }

        report.touched
    }

    /// Spawn a task that feeds packets from the transport into
    /// [`handle_packet`](Self::handle_packet) until the connection closes.
    ///
    /// The task holds only a weak reference and stops when the session is
    /// dropped or shut down. Calling this again replaces the previous task.
    pub fn start_delivery(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let transport = self.transport.clone();
        let device = self.device.clone();

        let handle = tokio::spawn(async move {
            loop {
                match transport.recv().await {
                    Ok(bytes) => {
                        let Some(session) = weak.upgrade() else {
                            break;
                        };
                        session.handle_packet(&bytes);
                    }
                    Err(TransportError::ConnectionClosed) => {
                        tracing::info!(device = %device, "device connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(device = %device, error = %e, "delivery stopped");
                        break;
                    }
                }
            }
        });

        let previous = self
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    /// Detach the session from its device.
    ///
    /// Stops delivery, releases every pending caller with
    /// [`LoadOutcome::Released`] and discards the cache. Calls made after
    /// this see an empty, closed session. Idempotent.
    pub fn shutdown(&self) {
        let delivery = self
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(delivery) = delivery {
            delivery.abort();
        }

        if self.shared.close() {
            tracing::info!(device = %self.device, "session shut down");
        }
    }

    /// Shut down and close the transport.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.shutdown();
        self.transport.close().await?;
        Ok(())
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
