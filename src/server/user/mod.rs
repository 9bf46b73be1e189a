mod catalog;
mod centers;
mod items;
mod me;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Permission catalog
        .route("/permissions", get(catalog::list_permissions))
        // Current user
        .route("/me", get(me::get_me))
        .route("/me/permissions", get(me::list_my_permissions))
        .route("/me/menu", get(me::get_my_menu))
        // Centers visible to the caller
        .route("/centers", get(centers::list_accessible_centers))
        // Items (tenant-scoped)
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/{id}",
            patch(items::update_item)
                .get(items::get_item)
                .delete(items::delete_item),
        )
}
