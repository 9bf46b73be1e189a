use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequestScope;
use crate::permissions::{grant_permission, replace_user_grants};
use crate::server::AppState;
use crate::server::access::{record_activity, require_permission};
use crate::server::dto::{
    CategoryPermissionsResponse, GrantDiffResponse, GrantPermissionResponse,
    PermissionStateResponse, UpdatePermissionsRequest, UserPermissionsResponse,
};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

use super::users::load_managed_user;

const MANAGE: &str = "admin_manage_permissions";

/// Every catalog permission grouped by category, with the user's current
/// allow state (missing rows read as denied).
pub async fn get_user_permissions(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, MANAGE)?;
    let user = load_managed_user(&state, &auth.scope, &id)?;

    let allowed = state
        .store
        .list_allowed_keys(&user.id)
        .api_err("Failed to list grants")?;

    let categories = state
        .registry
        .categories()
        .into_iter()
        .map(|c| CategoryPermissionsResponse {
            category: c.category,
            name: c.name,
            permissions: c
                .permissions
                .into_iter()
                .map(|def| PermissionStateResponse {
                    key: def.key.to_string(),
                    name: def.name,
                    allowed: allowed.contains(def.key),
                })
                .collect(),
        })
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(UserPermissionsResponse {
        user_id: user.id,
        categories,
    })))
}

/// Replaces the user's grant set with the submitted one in one transaction.
pub async fn replace_user_permissions(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePermissionsRequest>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, MANAGE)?;
    let user = load_managed_user(&state, &auth.scope, &id)?;

    let diff = replace_user_grants(
        state.store.as_ref(),
        &state.registry,
        &user.id,
        &req.permissions,
    )?;

    record_activity(
        &state,
        &auth.user,
        "update_permissions",
        "user",
        Some(&user.id),
        Some(diff.summary()),
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(GrantDiffResponse::from(diff))))
}

pub async fn grant_user_permission(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Path((id, key)): Path<(String, String)>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, MANAGE)?;
    let user = load_managed_user(&state, &auth.scope, &id)?;

    let changed = grant_permission(state.store.as_ref(), &state.registry, &user.id, &key)?;

    if changed {
        record_activity(
            &state,
            &auth.user,
            "grant_permission",
            "user",
            Some(&user.id),
            Some(key.clone()),
        );
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(GrantPermissionResponse {
        key,
        allowed: true,
        changed,
    })))
}
