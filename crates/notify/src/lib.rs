//! Message rendering and delivery for birthday notifications.
//!
//! This crate provides:
//! - `TemplateRenderer` for the `[NOME]`-style placeholder templates
//! - `MessageChannel` trait with simulated and WhatsApp implementations
//! - `SessionDriver` abstraction plus an HTTP bridge driver for live sessions
//! - `NotificationDispatcher` that delivers to every contact with retries

pub mod channel;
pub mod dispatcher;
pub mod templating;

pub use channel::{
    BridgeDriver, ChannelError, ChannelState, ChannelStatus, MessageChannel, SessionDriver,
    SessionEvent, SimulatedChannel, WhatsAppChannel,
};
pub use dispatcher::NotificationDispatcher;
pub use templating::TemplateRenderer;
