use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequestScope;
use crate::error::Error;
use crate::server::AppState;
use crate::server::access::{record_activity, require_permission};
use crate::server::dto::{CreateItemRequest, PaginationParams, UpdateItemRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, INSUFFICIENT_PRIVILEGE, PaginatedResponse,
    StoreOptionExt, StoreResultExt, paginate,
};
use crate::server::validation::{validate_display_name, validate_quantity, validate_unit};
use crate::tenancy::{Mutation, Scope, TenantScoped, assign_center, authorize_mutation};
use crate::types::{Item, User};

const VIEW: &str = "inventory_view_items";
const ADD: &str = "inventory_add_item";
const EDIT: &str = "inventory_edit_item";
const DELETE: &str = "inventory_delete_item";

/// Loads an item visible under `scope`. Items of other centers are reported
/// as missing.
fn load_scoped_item(state: &AppState, scope: &Scope, id: &str) -> Result<Item, ApiError> {
    state
        .store
        .get_item(id)
        .api_err("Failed to get item")?
        .filter(|item| scope.can_read(item.center_id()))
        .or_not_found("Item not found")
}

/// Loads an item for `mutation` under `scope`.
///
/// Writes to another center's item are refused with 403 and recorded. For
/// center-bound scopes a missing id is refused the same way, so ids of other
/// centers cannot be discovered through the write routes.
fn load_item_for_mutation(
    state: &AppState,
    user: &User,
    scope: &Scope,
    id: &str,
    mutation: Mutation,
) -> Result<Item, ApiError> {
    let Some(item) = state.store.get_item(id).api_err("Failed to get item")? else {
        if matches!(scope, Scope::AllTenants) {
            return Err(ApiError::not_found("Item not found"));
        }
        tracing::warn!(
            target: "cfpa_gate::authz",
            user_id = %user.id,
            entity_id = id,
            action = mutation.as_str(),
            "mutation of unknown item denied"
        );
        return Err(ApiError::forbidden(INSUFFICIENT_PRIVILEGE));
    };

    if !authorize_mutation(scope, &item, mutation) {
        return Err(deny_mutation(state, user, &item, mutation));
    }
    Ok(item)
}

fn deny_mutation(state: &AppState, user: &User, item: &Item, mutation: Mutation) -> ApiError {
    record_activity(
        state,
        user,
        "cross_tenant_denied",
        Item::ENTITY_TYPE,
        Some(&item.id),
        Some(mutation.as_str().to_string()),
    );
    ApiError::forbidden(INSUFFICIENT_PRIVILEGE)
}

pub async fn list_items(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, VIEW)?;
    let cursor = params.cursor.as_deref().unwrap_or("");

    let items = state
        .store
        .list_items(&auth.scope, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list items")?;

    let (items, next_cursor, has_more) =
        paginate(items, DEFAULT_PAGE_SIZE as usize, |i| i.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(items, next_cursor, has_more)))
}

pub async fn get_item(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, VIEW)?;
    let item = load_scoped_item(&state, &auth.scope, &id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(item)))
}

pub async fn create_item(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateItemRequest>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, ADD)?;
    validate_display_name(&req.name, "Item")?;
    validate_quantity(req.quantity)?;
    validate_unit(&req.unit)?;

    let center_id = match assign_center(&auth.scope, req.center_id.as_deref()) {
        Ok(center_id) => center_id,
        Err(Error::TenantMismatch) => {
            record_activity(
                &state,
                &auth.user,
                "cross_tenant_denied",
                Item::ENTITY_TYPE,
                None,
                Some(Mutation::Create.as_str().to_string()),
            );
            return Err(ApiError::forbidden(INSUFFICIENT_PRIVILEGE));
        }
        Err(e) => return Err(ApiError::from(e)),
    };

    if let Some(id) = &center_id {
        let active = state
            .store
            .get_center(id)
            .api_err("Failed to get center")?
            .is_some_and(|c| c.is_active);
        if !active {
            return Err(ApiError::bad_request(format!("Unknown center: {id}")));
        }
    }

    let now = Utc::now();
    let item = Item {
        id: Uuid::new_v4().to_string(),
        center_id,
        name: req.name.trim().to_string(),
        quantity: req.quantity,
        unit: req.unit.trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    if !authorize_mutation(&auth.scope, &item, Mutation::Create) {
        return Err(deny_mutation(&state, &auth.user, &item, Mutation::Create));
    }

    state
        .store
        .create_item(&item)
        .api_err("Failed to create item")?;

    record_activity(&state, &auth.user, "create", Item::ENTITY_TYPE, Some(&item.id), None);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

pub async fn update_item(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, EDIT)?;
    let mut item = load_item_for_mutation(&state, &auth.user, &auth.scope, &id, Mutation::Update)?;

    if let Some(name) = req.name {
        validate_display_name(&name, "Item")?;
        item.name = name.trim().to_string();
    }
    if let Some(quantity) = req.quantity {
        validate_quantity(quantity)?;
        item.quantity = quantity;
    }
    if let Some(unit) = req.unit {
        validate_unit(&unit)?;
        item.unit = unit.trim().to_string();
    }
    item.updated_at = Utc::now();

    state
        .store
        .update_item(&item)
        .api_err("Failed to update item")?;

    record_activity(&state, &auth.user, "update", Item::ENTITY_TYPE, Some(&item.id), None);

    Ok::<_, ApiError>(Json(ApiResponse::success(item)))
}

pub async fn delete_item(
    auth: RequestScope,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_permission(&state, &auth.user, DELETE)?;
    let item = load_item_for_mutation(&state, &auth.user, &auth.scope, &id, Mutation::Delete)?;

    state
        .store
        .delete_item(&item.id)
        .api_err("Failed to delete item")?;

    record_activity(&state, &auth.user, "delete", Item::ENTITY_TYPE, Some(&item.id), None);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
