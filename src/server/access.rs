use chrono::Utc;
use uuid::Uuid;

use crate::permissions::PermissionChecker;
use crate::server::AppState;
use crate::server::response::{ApiError, INSUFFICIENT_PRIVILEGE, StoreResultExt};
use crate::types::{ActivityLog, User};

/// Fails with 403 unless the user holds an explicit allow grant for `key`.
pub fn require_permission(state: &AppState, user: &User, key: &str) -> Result<(), ApiError> {
    let checker = PermissionChecker::new(state.store.as_ref(), &state.registry);
    if checker
        .has_permission(user, key)
        .api_err("Failed to check permission")?
    {
        return Ok(());
    }

    tracing::warn!(target: "cfpa_gate::authz", user_id = %user.id, key, "permission denied");
    Err(ApiError::forbidden(INSUFFICIENT_PRIVILEGE))
}

/// Appends an activity log entry. Failures are logged, never surfaced.
pub fn record_activity(
    state: &AppState,
    actor: &User,
    action: &str,
    entity_type: &str,
    entity_id: Option<&str>,
    detail: Option<String>,
) {
    let entry = ActivityLog {
        id: Uuid::new_v4().to_string(),
        actor_id: Some(actor.id.clone()),
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.map(str::to_string),
        detail,
        created_at: Utc::now(),
    };

    if let Err(e) = state.store.record_activity(&entry) {
        tracing::warn!(action, entity_type, "failed to record activity: {e}");
    }
}
