//! HTTP router construction.
//!
//! Assembles all Axum routes and middleware into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api;
use crate::state::AppState;

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Invalid CORS_ORIGIN, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/employees",
            get(api::employees_list).post(api::employees_create),
        )
        .route(
            "/api/employees/{id}",
            get(api::employees_get)
                .put(api::employees_update)
                .delete(api::employees_delete),
        )
        .route(
            "/api/contacts",
            get(api::contacts_list).post(api::contacts_create),
        )
        .route(
            "/api/contacts/{id}",
            get(api::contacts_get)
                .put(api::contacts_update)
                .delete(api::contacts_delete),
        )
        .route("/api/messages", get(api::messages_list))
        .route(
            "/api/settings",
            get(api::settings_get).post(api::settings_save),
        )
        .route("/api/stats", get(api::stats))
        .route("/api/scheduler", get(api::scheduler_status))
        .route("/api/whatsapp/status", get(api::whatsapp_status))
        .route("/api/whatsapp/connect", post(api::whatsapp_connect))
        .route("/api/whatsapp/refresh-qr", post(api::whatsapp_refresh_qr))
        .route(
            "/api/whatsapp/enable-simulation",
            post(api::whatsapp_enable_simulation),
        )
        .route("/api/whatsapp/enable-real", post(api::whatsapp_enable_real))
        .route(
            "/api/whatsapp/test-connection",
            post(api::whatsapp_test_connection),
        )
        .route("/api/whatsapp/send-test", post(api::whatsapp_send_test))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}
