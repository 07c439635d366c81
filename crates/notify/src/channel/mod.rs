//! Message channel abstraction and shared status types.
//!
//! A [`MessageChannel`] is the only way the dispatcher reaches a contact.
//! Two implementations ship here:
//! - [`SimulatedChannel`]: always connected, logs what it would send
//! - [`WhatsAppChannel`]: simulated or live, driving a [`SessionDriver`]

pub mod bridge;
pub mod simulated;
pub mod whatsapp;

use serde::{Deserialize, Serialize};

pub use bridge::BridgeDriver;
pub use simulated::SimulatedChannel;
pub use whatsapp::{normalize_phone, SessionDriver, SessionEvent, WhatsAppChannel};

/// Errors that can occur while talking to a messaging channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("WhatsApp client not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session could not be started: {0}")]
    SessionStart(String),
}

/// Connection lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    WaitingForPairing,
    Connected,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::WaitingForPairing => "waiting_for_pairing",
            ChannelState::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a channel. Always read as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub connected: bool,
    pub state: ChannelState,
    /// Pairing code (QR payload) while waiting for the phone to pair.
    pub pairing_artifact: Option<String>,
    pub simulated: bool,
}

impl ChannelStatus {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            state: ChannelState::Disconnected,
            pairing_artifact: None,
            simulated: false,
        }
    }

    /// Status of a channel running without a real transport.
    pub fn simulated() -> Self {
        Self {
            connected: true,
            state: ChannelState::Connected,
            pairing_artifact: None,
            simulated: true,
        }
    }
}

/// Capability set every messaging channel provides.
#[async_trait::async_trait]
pub trait MessageChannel: Send + Sync {
    /// Bring the channel up. Returns the status reached (which may still be
    /// `connecting` or `waiting_for_pairing` for a live session).
    async fn connect(&self) -> ChannelStatus;

    /// Deliver `text` to `address`. Errors are descriptive and never panic.
    async fn send_message(&self, address: &str, text: &str) -> Result<(), ChannelError>;

    /// Current status snapshot.
    fn status(&self) -> ChannelStatus;

    /// Probe the transport and update the connected flag.
    async fn test_connection(&self) -> bool;

    /// Last-known pairing artifact, if any.
    async fn refresh_pairing_artifact(&self) -> Option<String>;

    /// Drop any live session and run simulated from now on.
    async fn enable_simulation(&self);

    /// Drop any session and switch to live mode; `connect` starts the session.
    async fn enable_real(&self);

    /// Human-readable name for this channel (e.g., "whatsapp").
    fn channel_name(&self) -> &str;
}
