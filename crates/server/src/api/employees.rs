//! Employee roster CRUD endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use parabens_core::{Employee, EmployeePatch, NewEmployee};

use crate::state::AppState;

use super::{internal_error, not_found, require_non_empty, ApiResult};

/// GET /api/employees
pub async fn employees_list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Employee>>> {
    state.storage.list_employees().await.map(Json).map_err(internal_error)
}

/// GET /api/employees/{id}
pub async fn employees_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Employee>> {
    state
        .storage
        .get_employee(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Employee", id))
}

/// POST /api/employees
pub async fn employees_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewEmployee>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    require_non_empty("name", &req.name)?;
    require_non_empty("position", &req.position)?;

    let employee = state.storage.create_employee(req).await.map_err(internal_error)?;
    tracing::info!(id = %employee.id, name = %employee.name, "Employee created");
    Ok((StatusCode::CREATED, Json(employee)))
}

/// PUT /api/employees/{id}
pub async fn employees_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<EmployeePatch>,
) -> ApiResult<Json<Employee>> {
    if let Some(ref name) = patch.name {
        require_non_empty("name", name)?;
    }
    if let Some(ref position) = patch.position {
        require_non_empty("position", position)?;
    }

    state
        .storage
        .update_employee(id, patch)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Employee", id))
}

/// DELETE /api/employees/{id}
pub async fn employees_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.storage.delete_employee(id).await.map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Employee", id))
    }
}
