use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::require_permission;
use crate::server::dto::PaginationParams;
use crate::server::response::{
    ApiError, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};

pub async fn list_activity_logs(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, "admin_view_activity_logs")?;
    let cursor = params.cursor.as_deref().unwrap_or("");

    let entries = state
        .store
        .list_activity(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list activity logs")?;

    let (entries, next_cursor, has_more) =
        paginate(entries, DEFAULT_PAGE_SIZE as usize, |e| e.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(entries, next_cursor, has_more)))
}
