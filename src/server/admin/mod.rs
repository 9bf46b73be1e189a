mod activity;
mod centers;
mod grants;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Center routes
        .route("/centers", post(centers::create_center))
        .route("/centers", get(centers::list_centers))
        .route("/centers/{id}", patch(centers::update_center))
        // User routes
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        // Permission grant routes
        .route(
            "/users/{id}/permissions",
            get(grants::get_user_permissions).put(grants::replace_user_permissions),
        )
        .route(
            "/users/{id}/permissions/{key}",
            post(grants::grant_user_permission),
        )
        // Activity log
        .route("/activity-logs", get(activity::list_activity_logs))
}
