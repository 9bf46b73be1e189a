use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::{record_activity, require_permission};
use crate::server::dto::{CreateCenterRequest, UpdateCenterRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_center_code, validate_display_name};
use crate::types::VocationalCenter;

pub async fn create_center(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCenterRequest>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, "branches_create")?;
    validate_center_code(&req.code)?;
    validate_display_name(&req.name, "Center")?;

    if state
        .store
        .get_center_by_code(&req.code)
        .api_err("Failed to check center")?
        .is_some()
    {
        return Err(ApiError::conflict("Center code already exists"));
    }

    let center = VocationalCenter {
        id: Uuid::new_v4().to_string(),
        code: req.code,
        name: req.name.trim().to_string(),
        is_active: true,
        created_at: Utc::now(),
    };

    state.store.create_center(&center)?;

    record_activity(&state, &auth.user, "create", "center", Some(&center.id), None);
    tracing::info!(center_id = %center.id, code = %center.code, "created center");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(center))))
}

pub async fn list_centers(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, "branches_view")?;

    let centers = state
        .store
        .list_centers(false)
        .api_err("Failed to list centers")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(centers)))
}

/// Activates or deactivates a center. Users of an inactive center lose all
/// data access until it is reactivated.
pub async fn update_center(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCenterRequest>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, "branches_edit")?;

    let mut center = state
        .store
        .get_center(&id)
        .api_err("Failed to get center")?
        .or_not_found("Center not found")?;

    if center.is_active != req.is_active {
        state
            .store
            .set_center_active(&center.id, req.is_active)
            .api_err("Failed to update center")?;
        center.is_active = req.is_active;

        let action = if req.is_active { "activate" } else { "deactivate" };
        record_activity(&state, &auth.user, action, "center", Some(&center.id), None);
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(center)))
}
