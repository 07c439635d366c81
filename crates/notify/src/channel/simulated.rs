//! Channel that never leaves the process.

use std::sync::atomic::{AtomicBool, Ordering};

use super::{ChannelError, ChannelState, ChannelStatus, MessageChannel};

/// Logs every message instead of sending it. Connected once `connect` runs.
#[derive(Debug, Default)]
pub struct SimulatedChannel {
    connected: AtomicBool,
}

impl SimulatedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that is already connected.
    pub fn connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
        }
    }
}

#[async_trait::async_trait]
impl MessageChannel for SimulatedChannel {
    async fn connect(&self) -> ChannelStatus {
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!("Simulated WhatsApp channel connected");
        self.status()
    }

    async fn send_message(&self, address: &str, text: &str) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }
        tracing::info!(to = address, content = text, "[SIMULATED] message sent");
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        if self.connected.load(Ordering::SeqCst) {
            ChannelStatus::simulated()
        } else {
            ChannelStatus {
                connected: false,
                state: ChannelState::Disconnected,
                pairing_artifact: None,
                simulated: true,
            }
        }
    }

    async fn test_connection(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn refresh_pairing_artifact(&self) -> Option<String> {
        None
    }

    async fn enable_simulation(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    async fn enable_real(&self) {
        tracing::warn!("Simulated channel has no live transport; staying simulated");
    }

    fn channel_name(&self) -> &str {
        "simulated"
    }
}
