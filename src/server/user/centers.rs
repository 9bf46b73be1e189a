use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::tenancy::TenantResolver;

pub async fn list_accessible_centers(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let centers = TenantResolver::new(state.store.as_ref())
        .accessible_centers(&auth.user)
        .api_err("Failed to list centers")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(centers)))
}
