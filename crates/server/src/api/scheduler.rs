use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use parabens_scheduler::NextFireTimes;

use crate::state::AppState;

#[derive(Serialize)]
pub struct SchedulerStatusResponse {
    pub installed_triggers: usize,
    pub next_fire: NextFireTimes,
}

/// GET /api/scheduler
pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatusResponse> {
    Json(SchedulerStatusResponse {
        installed_triggers: state.coordinator.installed_triggers().await,
        next_fire: state.coordinator.next_fire_times().await,
    })
}
