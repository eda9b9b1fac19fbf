//! Mock transport for testing.
//!
//! Allows queueing device packets and capturing sent packets for verification.

use super::{DeviceTransport, TransportError};
use async_trait::async_trait;
use smsync_types::Packet;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Starts connected. Clones share state, so a test can keep one clone
/// while a session owns another.
#[derive(Debug)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug)]
struct MockTransportInner {
    connected: bool,
    sent_messages: Vec<Vec<u8>>,
    receive_queue: VecDeque<Vec<u8>>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl Default for MockTransportInner {
    fn default() -> Self {
        Self {
            connected: true,
            sent_messages: Vec::new(),
            receive_queue: VecDeque::new(),
            fail_next_send: None,
            fail_next_recv: None,
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a new, connected mock transport.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner::default())),
        }
    }

    /// Queue raw bytes to be returned by the next `recv()` call.
    pub fn queue_response(&self, data: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(data);
    }

    /// Queue an encoded packet to be returned by the next `recv()` call.
    ///
    /// # Panics
    ///
    /// Panics if the packet cannot be encoded.
    pub fn queue_packet(&self, packet: &Packet) {
        self.queue_response(packet.to_bytes().unwrap());
    }

    /// Get all raw messages that were sent.
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.clone()
    }

    /// Get all sent messages decoded as packets.
    ///
    /// # Panics
    ///
    /// Panics if something other than a packet was sent.
    pub fn sent_packets(&self) -> Vec<Packet> {
        self.sent_messages()
            .iter()
            .map(|bytes| Packet::from_bytes(bytes).unwrap())
            .collect()
    }

    /// Get the last packet that was sent.
    pub fn last_sent(&self) -> Option<Packet> {
        self.sent_packets().pop()
    }

    /// Simulate the device going away.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_recv = Some(error.to_string());
    }

    /// Clear all state (messages, queue, failures) and reconnect.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl DeviceTransport for MockTransport {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_messages.push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_recv.take() {
            return Err(TransportError::ReceiveFailed(error));
        }

        inner
            .receive_queue
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        Ok(())
    }
}
