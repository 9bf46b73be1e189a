use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permissions::{GrantDiff, PermissionCategory};
use crate::tenancy::Scope;
use crate::types::{Role, Token, User, VocationalCenter};

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogParams {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<VocationalCenter>,
}

#[derive(Debug, Serialize)]
pub struct GrantedPermissionsResponse {
    pub permissions: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    pub unit: String,
    /// Only honored for founders and admins browsing all centers.
    #[serde(default)]
    pub center_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCenterRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCenterRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub center_id: Option<String>,
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            created_at: token.created_at,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: User,
    pub token: String,
    pub metadata: TokenResponse,
}

/// Full desired grant set: key -> allowed. Keys left out are removed.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct PermissionStateResponse {
    pub key: String,
    pub name: &'static str,
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct CategoryPermissionsResponse {
    pub category: PermissionCategory,
    pub name: &'static str,
    pub permissions: Vec<PermissionStateResponse>,
}

#[derive(Debug, Serialize)]
pub struct UserPermissionsResponse {
    pub user_id: String,
    pub categories: Vec<CategoryPermissionsResponse>,
}

#[derive(Debug, Serialize)]
pub struct GrantDiffResponse {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl From<GrantDiff> for GrantDiffResponse {
    fn from(diff: GrantDiff) -> Self {
        Self {
            added: diff.added.into_keys().collect(),
            changed: diff.changed.into_keys().collect(),
            removed: diff.removed.into_iter().collect(),
            unchanged: diff.unchanged.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GrantPermissionResponse {
    pub key: String,
    pub allowed: bool,
    /// False when the grant was already in place.
    pub changed: bool,
}
