use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::permissions::{CategoryDefinitions, PermissionCategory};
use crate::server::AppState;
use crate::server::dto::CatalogParams;
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_permissions(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<CatalogParams>,
) -> impl IntoResponse {
    let categories: Vec<CategoryDefinitions> = match params.category.as_deref() {
        Some(raw) => {
            let category = PermissionCategory::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown category: {raw}")))?;
            state
                .registry
                .categories()
                .into_iter()
                .filter(|c| c.category == category)
                .collect()
        }
        None => state.registry.categories(),
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(categories)))
}
