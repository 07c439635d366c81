use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use parabens_core::DeliveryRecord;

use crate::state::AppState;

use super::{internal_error, ApiResult};

/// GET /api/messages -- the delivery audit trail.
pub async fn messages_list(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DeliveryRecord>>> {
    state.storage.list_deliveries().await.map(Json).map_err(internal_error)
}
