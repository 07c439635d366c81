use std::sync::Arc;

use parabens_notify::MessageChannel;
use parabens_scheduler::ScheduleCoordinator;
use parabens_storage::Storage;

/// Shared handles for every HTTP handler.
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub channel: Arc<dyn MessageChannel>,
    pub coordinator: ScheduleCoordinator,
}
