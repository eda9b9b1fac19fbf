//! Device transport abstraction for smsync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! link to one paired device (the device-connectivity daemon, mock for
//! testing). Connection management and retries belong to the transport;
//! sessions only hand it encoded packets.
//!
//! # Design
//!
//! The transport trait is async and packet-oriented:
//! - `send()` transmits one encoded packet
//! - `recv()` receives one encoded packet
//! - `close()` gracefully terminates
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.send(&Packet::RequestConversations.to_bytes()?).await?;
//! let batch = transport.recv().await?;
//! ```

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use smsync_types::Packet;
use thiserror::Error;

use crate::error::ClientError;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Device is not reachable.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Transport trait for exchanging packets with one remote device.
///
/// Implementations handle the underlying connection mechanism
/// and any retry policy.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Send one encoded packet to the device.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive one encoded packet from the device.
    ///
    /// Blocks until data is available or the connection closes.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if the device is currently reachable.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Encode a packet and hand it to the transport.
pub(crate) async fn send_packet(
    transport: &dyn DeviceTransport,
    packet: &Packet,
) -> Result<(), ClientError> {
    let bytes = packet
        .to_bytes()
        .map_err(|e| ClientError::Serialization(e.to_string()))?;
    transport.send(&bytes).await?;
    Ok(())
}
