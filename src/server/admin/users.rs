use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequestScope, TokenGenerator, issue_token};
use crate::error::Error;
use crate::permissions::seed_user_grants;
use crate::server::AppState;
use crate::server::access::{record_activity, require_permission};
use crate::server::dto::{CreateUserRequest, CreateUserResponse, PaginationParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, INSUFFICIENT_PRIVILEGE, PaginatedResponse, StoreOptionExt,
    StoreResultExt, paginate,
};
use crate::server::validation::validate_username;
use crate::tenancy::{Scope, assign_center};
use crate::types::{Role, User};

/// Whether a user account falls under the caller's scope.
///
/// Center-bound scopes only manage accounts of their own center; accounts
/// without a center (founders and admins) are managed from the global scope.
pub(super) fn manages(scope: &Scope, user: &User) -> bool {
    match scope {
        Scope::AllTenants => true,
        Scope::SingleTenant(id) => user.center_id.as_deref() == Some(id.as_str()),
        Scope::NoAccess => false,
    }
}

/// Loads a user the caller may manage; anything else is reported as missing.
pub(super) fn load_managed_user(state: &AppState, scope: &Scope, id: &str) -> Result<User, ApiError> {
    state
        .store
        .get_user(id)
        .api_err("Failed to get user")?
        .filter(|user| manages(scope, user))
        .or_not_found("User not found")
}

pub async fn create_user(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, "admin_add_user")?;
    validate_username(&req.username).map_err(ApiError::bad_request)?;

    let center_id = if req.role.spans_all_centers() {
        if !auth.user.role.spans_all_centers() {
            tracing::warn!(
                target: "cfpa_gate::authz",
                user_id = %auth.user.id,
                role = %req.role,
                "center-bound user attempted to create a global account"
            );
            return Err(ApiError::forbidden(INSUFFICIENT_PRIVILEGE));
        }
        if req.role == Role::Founder && auth.user.role != Role::Founder {
            return Err(ApiError::forbidden(INSUFFICIENT_PRIVILEGE));
        }
        if req.center_id.is_some() {
            return Err(ApiError::bad_request(
                "Founders and admins are not bound to a center",
            ));
        }
        None
    } else {
        let center_id = match assign_center(&auth.scope, req.center_id.as_deref()) {
            Ok(center_id) => center_id,
            Err(Error::TenantMismatch) => return Err(ApiError::forbidden(INSUFFICIENT_PRIVILEGE)),
            Err(e) => return Err(ApiError::from(e)),
        };
        let center_id =
            center_id.ok_or_else(|| ApiError::bad_request(format!("Role {} requires a center", req.role)))?;

        let active = state
            .store
            .get_center(&center_id)
            .api_err("Failed to get center")?
            .is_some_and(|c| c.is_active);
        if !active {
            return Err(ApiError::bad_request(format!("Unknown center: {center_id}")));
        }
        Some(center_id)
    };

    if state
        .store
        .get_user_by_username(&req.username)
        .api_err("Failed to check username")?
        .is_some()
    {
        return Err(ApiError::conflict("Username already exists"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        role: req.role,
        center_id,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.store.create_user(&user)?;
    seed_user_grants(state.store.as_ref(), &state.registry, &user)
        .api_err("Failed to seed permissions")?;

    let expires_at = req.expires_in_seconds.map(|secs| now + Duration::seconds(secs));
    let (token, raw_token) = issue_token(
        state.store.as_ref(),
        &TokenGenerator::new(),
        &user.id,
        expires_at,
    )
    .api_err("Failed to create token")?;

    record_activity(&state, &auth.user, "create", "user", Some(&user.id), Some(user.role.to_string()));
    tracing::info!(user_id = %user.id, role = %user.role, "created user");

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateUserResponse {
            user,
            token: raw_token,
            metadata: token.into(),
        })),
    ))
}

pub async fn list_users(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, "admin_view_users")?;
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state
        .store
        .list_users(&auth.scope, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(center_id: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: "u".to_string(),
            username: "u".to_string(),
            role: Role::Worker,
            center_id: center_id.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_manages() {
        let c1 = Scope::SingleTenant("c1".to_string());
        assert!(manages(&c1, &user(Some("c1"))));
        assert!(!manages(&c1, &user(Some("c2"))));
        assert!(!manages(&c1, &user(None)));
        assert!(manages(&Scope::AllTenants, &user(None)));
        assert!(!manages(&Scope::NoAccess, &user(Some("c1"))));
    }
}
