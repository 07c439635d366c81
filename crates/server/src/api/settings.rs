//! Notification settings endpoints. Saving reinstalls the daily triggers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use parabens_core::{NotificationConfig, NotificationConfigInput};

use crate::state::AppState;

use super::{bad_request, internal_error, ApiResult, ErrorResponse};

/// GET /api/settings
pub async fn settings_get(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<NotificationConfig>> {
    state
        .storage
        .get_config()
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Settings not found".into(),
                }),
            )
        })
}

/// POST /api/settings
pub async fn settings_save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NotificationConfigInput>,
) -> ApiResult<Json<NotificationConfig>> {
    let config = req.resolve().map_err(|e| bad_request(e.to_string()))?;
    let saved = state.storage.save_config(config).await.map_err(internal_error)?;

    state
        .coordinator
        .update_schedules()
        .await
        .map_err(internal_error)?;
    tracing::info!(
        reminder_time = %saved.reminder_time,
        birthday_time = %saved.birthday_time,
        weekends_enabled = saved.weekends_enabled,
        "Notification settings saved"
    );
    Ok(Json(saved))
}
