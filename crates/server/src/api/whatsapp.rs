//! WhatsApp channel administration endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use parabens_notify::ChannelStatus;

use crate::state::AppState;

use super::{bad_request, internal_error, ApiResult};

#[derive(Serialize)]
pub struct ModeSwitchResponse {
    pub success: bool,
    pub status: ChannelStatus,
}

#[derive(Serialize)]
pub struct PairingResponse {
    pub qr_code: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionTestResponse {
    pub connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendTestRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
pub struct SendTestResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/whatsapp/status
pub async fn whatsapp_status(State(state): State<Arc<AppState>>) -> Json<ChannelStatus> {
    Json(state.channel.status())
}

/// POST /api/whatsapp/connect
pub async fn whatsapp_connect(State(state): State<Arc<AppState>>) -> Json<ChannelStatus> {
    Json(state.channel.connect().await)
}

/// POST /api/whatsapp/refresh-qr
pub async fn whatsapp_refresh_qr(State(state): State<Arc<AppState>>) -> Json<PairingResponse> {
    Json(PairingResponse {
        qr_code: state.channel.refresh_pairing_artifact().await,
    })
}

/// POST /api/whatsapp/enable-simulation
pub async fn whatsapp_enable_simulation(
    State(state): State<Arc<AppState>>,
) -> Json<ModeSwitchResponse> {
    state.channel.enable_simulation().await;
    Json(ModeSwitchResponse {
        success: true,
        status: state.channel.status(),
    })
}

/// POST /api/whatsapp/enable-real
pub async fn whatsapp_enable_real(State(state): State<Arc<AppState>>) -> Json<ModeSwitchResponse> {
    state.channel.enable_real().await;
    Json(ModeSwitchResponse {
        success: true,
        status: state.channel.status(),
    })
}

/// POST /api/whatsapp/test-connection
pub async fn whatsapp_test_connection(
    State(state): State<Arc<AppState>>,
) -> Json<ConnectionTestResponse> {
    Json(ConnectionTestResponse {
        connected: state.channel.test_connection().await,
    })
}

/// POST /api/whatsapp/send-test
pub async fn whatsapp_send_test(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendTestRequest>,
) -> ApiResult<Json<SendTestResponse>> {
    if req.phone_number.trim().is_empty() || req.message.trim().is_empty() {
        return Err(bad_request("phone_number and message are required"));
    }

    state
        .channel
        .send_message(&req.phone_number, &req.message)
        .await
        .map_err(internal_error)?;

    Ok(Json(SendTestResponse {
        success: true,
        message: "Test message sent".to_string(),
    }))
}
