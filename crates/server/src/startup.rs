//! Startup wiring: storage, WhatsApp channel, dispatcher and scheduler.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use parabens_core::Config;
use parabens_notify::{BridgeDriver, MessageChannel, NotificationDispatcher, WhatsAppChannel};
use parabens_scheduler::ScheduleCoordinator;

use crate::state::AppState;

/// Build every shared component and install the daily triggers.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let storage = parabens_storage::open_storage(&config.database).await?;

    let driver = BridgeDriver::new(
        config.whatsapp.bridge_url.clone(),
        Duration::from_millis(config.whatsapp.poll_interval_ms),
        Duration::from_millis(config.whatsapp.request_timeout_ms),
    );
    let channel: Arc<dyn MessageChannel> =
        Arc::new(WhatsAppChannel::new(Arc::new(driver), config.whatsapp.mode));
    let status = channel.connect().await;
    info!(
        state = %status.state,
        simulated = status.simulated,
        "WhatsApp channel ready"
    );

    let dispatcher = NotificationDispatcher::new(channel.clone(), storage.clone());
    let coordinator = ScheduleCoordinator::new(storage.clone(), dispatcher);
    if let Err(e) = coordinator.initialize().await {
        warn!(error = %e, "Scheduler failed to initialize; save settings to retry");
    }

    Ok(Arc::new(AppState {
        storage,
        channel,
        coordinator,
    }))
}
