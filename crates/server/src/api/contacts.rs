//! Management contact CRUD endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use parabens_core::{Contact, ContactPatch, NewContact};

use crate::state::AppState;

use super::{internal_error, not_found, require_non_empty, ApiResult};

/// GET /api/contacts
pub async fn contacts_list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Contact>>> {
    state.storage.list_contacts().await.map(Json).map_err(internal_error)
}

/// GET /api/contacts/{id}
pub async fn contacts_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Contact>> {
    state
        .storage
        .get_contact(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Contact", id))
}

/// POST /api/contacts
pub async fn contacts_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewContact>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    require_non_empty("name", &req.name)?;
    require_non_empty("phone", &req.phone)?;
    require_non_empty("role", &req.role)?;

    let contact = state.storage.create_contact(req).await.map_err(internal_error)?;
    tracing::info!(id = %contact.id, name = %contact.name, "Contact created");
    Ok((StatusCode::CREATED, Json(contact)))
}

/// PUT /api/contacts/{id}
pub async fn contacts_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ContactPatch>,
) -> ApiResult<Json<Contact>> {
    for (field, value) in [("name", &patch.name), ("phone", &patch.phone), ("role", &patch.role)] {
        if let Some(v) = value {
            require_non_empty(field, v)?;
        }
    }

    state
        .storage
        .update_contact(id, patch)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Contact", id))
}

/// DELETE /api/contacts/{id}
pub async fn contacts_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.storage.delete_contact(id).await.map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Contact", id))
    }
}
