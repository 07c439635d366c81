use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use parabens_notify::ChannelState;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub whatsapp: ChannelState,
    pub simulated: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let channel = state.channel.status();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        whatsapp: channel.state,
        simulated: channel.simulated,
    })
}
