use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::{RequestScope, RequireUser};
use crate::permissions::{PermissionChecker, visible_sections};
use crate::server::AppState;
use crate::server::dto::{GrantedPermissionsResponse, MeResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn get_me(auth: RequestScope, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let center = match auth.scope.center_id() {
        Some(id) => state.store.get_center(id).api_err("Failed to get center")?,
        None => None,
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(MeResponse {
        user: auth.user,
        scope: auth.scope,
        center,
    })))
}

pub async fn list_my_permissions(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let checker = PermissionChecker::new(state.store.as_ref(), &state.registry);
    let permissions = checker
        .granted_keys(&auth.user)
        .api_err("Failed to list permissions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(GrantedPermissionsResponse {
        permissions,
    })))
}

pub async fn get_my_menu(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let checker = PermissionChecker::new(state.store.as_ref(), &state.registry);
    let granted = checker
        .granted_keys(&auth.user)
        .api_err("Failed to list permissions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(visible_sections(&granted))))
}
