//! Session registry.
//!
//! Maps each device to its live [`ConversationSession`]. Replacing or
//! closing a session happens in two phases: the old session is detached
//! from the registry and shut down right away (waiters released, cache
//! discarded), and its memory is freed once the last `Arc` holder, such as
//! a running paging task, lets go.

use std::sync::Arc;

use dashmap::DashMap;
use smsync_types::DeviceId;

use crate::config::ClientConfig;
use crate::forward::MessageForwarder;
use crate::session::ConversationSession;
use crate::transport::DeviceTransport;

/// Owns one session per connected device.
pub struct SessionManager {
    sessions: DashMap<DeviceId, Arc<ConversationSession>>,
    config: ClientConfig,
    forwarder: Option<Arc<dyn MessageForwarder>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
            forwarder: None,
        }
    }

    /// Give every session opened from now on this forwarder.
    pub fn with_forwarder(mut self, forwarder: Arc<dyn MessageForwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open a fresh session for `device`.
    ///
    /// A session already registered for the device is shut down; nothing
    /// from its cache carries over.
    pub fn open_session(
        &self,
        device: DeviceId,
        transport: Arc<dyn DeviceTransport>,
    ) -> Arc<ConversationSession> {
        let mut session = ConversationSession::new(device.clone(), transport, &self.config);
        if let Some(forwarder) = &self.forwarder {
            session = session.with_forwarder(forwarder.clone());
        }
        let session = Arc::new(session);

        match self.sessions.insert(device.clone(), session.clone()) {
            Some(previous) => {
                previous.shutdown();
                tracing::info!(device = %device, "replaced conversation session");
            }
            None => {
                tracing::info!(device = %device, "opened conversation session");
            }
        }

        session
    }

    /// Get the live session for `device`.
    pub fn get(&self, device: &DeviceId) -> Option<Arc<ConversationSession>> {
        self.sessions.get(device).map(|entry| entry.value().clone())
    }

    /// Detach and shut down the session for `device`.
    ///
    /// Returns false if the device had no session.
    pub fn close_session(&self, device: &DeviceId) -> bool {
        match self.sessions.remove(device) {
            Some((_, session)) => {
                session.shutdown();
                tracing::info!(device = %device, "closed conversation session");
                true
            }
            None => false,
        }
    }

    /// Devices with a live session.
    pub fn devices(&self) -> Vec<DeviceId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Detach and shut down every session.
    pub fn shutdown_all(&self) {
        let devices = self.devices();
        for device in &devices {
            self.close_session(device);
        }
        tracing::debug!(count = devices.len(), "all conversation sessions closed");
    }
}
