//! HTTP endpoints, one module per resource.
//!
//! Shared error type and helpers live here in mod.rs.

mod contacts;
mod employees;
mod health;
mod messages;
mod scheduler;
mod settings;
mod stats;
mod whatsapp;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

// ── Helpers ──────────────────────────────────────────────────────

pub(crate) fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %e, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub(crate) fn not_found(resource: &str, id: uuid::Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{} not found: {}", resource, id),
        }),
    )
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

/// Reject blank required text fields.
pub(crate) fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        Err(bad_request(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

// ── Re-exports ───────────────────────────────────────────────────

pub use contacts::{contacts_create, contacts_delete, contacts_get, contacts_list, contacts_update};
pub use employees::{
    employees_create, employees_delete, employees_get, employees_list, employees_update,
};
pub use health::health;
pub use messages::messages_list;
pub use scheduler::scheduler_status;
pub use settings::{settings_get, settings_save};
pub use stats::stats;
pub use whatsapp::{
    whatsapp_connect, whatsapp_enable_real, whatsapp_enable_simulation, whatsapp_refresh_qr,
    whatsapp_send_test, whatsapp_status, whatsapp_test_connection,
};
