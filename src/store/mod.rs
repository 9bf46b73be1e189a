mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::permissions::GrantDiff;
use crate::tenancy::Scope;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Center operations
    fn create_center(&self, center: &VocationalCenter) -> Result<()>;
    fn get_center(&self, id: &str) -> Result<Option<VocationalCenter>>;
    fn get_center_by_code(&self, code: &str) -> Result<Option<VocationalCenter>>;
    fn list_centers(&self, active_only: bool) -> Result<Vec<VocationalCenter>>;
    fn set_center_active(&self, id: &str, is_active: bool) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Accounts belonging to `scope`, keyset-paginated by id.
    fn list_users(&self, scope: &Scope, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn has_founder(&self) -> Result<bool>;

    // Permission grant operations
    fn get_permission_grant(&self, user_id: &str, key: &str) -> Result<Option<PermissionGrant>>;
    fn list_user_grants(&self, user_id: &str) -> Result<Vec<PermissionGrant>>;
    fn list_allowed_keys(&self, user_id: &str) -> Result<BTreeSet<String>>;
    fn upsert_permission_grant(&self, grant: &PermissionGrant) -> Result<()>;
    /// Reconciles the stored rows against `desired` and applies the result,
    /// reading and writing in one transaction. With `prune` unset, stored keys
    /// absent from `desired` are kept.
    fn replace_grants(
        &self,
        user_id: &str,
        desired: &BTreeMap<String, bool>,
        prune: bool,
    ) -> Result<GrantDiff>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn set_session_center(&self, token_id: &str, center_id: Option<&str>) -> Result<()>;

    // Item operations
    fn create_item(&self, item: &Item) -> Result<()>;
    fn get_item(&self, id: &str) -> Result<Option<Item>>;
    /// Items visible under `scope`, keyset-paginated by id.
    fn list_items(&self, scope: &Scope, cursor: &str, limit: i32) -> Result<Vec<Item>>;
    fn update_item(&self, item: &Item) -> Result<()>;
    fn delete_item(&self, id: &str) -> Result<bool>;

    // Activity log
    fn record_activity(&self, entry: &ActivityLog) -> Result<()>;
    fn list_activity(&self, cursor: &str, limit: i32) -> Result<Vec<ActivityLog>>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use super::{SqliteStore, Store};
    use crate::permissions::PermissionRegistry;
    use crate::types::{Role, User, VocationalCenter};

    pub fn memory_store() -> (SqliteStore, PermissionRegistry) {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        (store, PermissionRegistry::builtin())
    }

    /// Creates a user, creating its (active) center first if needed.
    pub fn user_in(store: &SqliteStore, username: &str, role: Role, center_id: Option<&str>) -> User {
        let now = Utc::now();
        if let Some(id) = center_id {
            if store.get_center(id).unwrap().is_none() {
                store
                    .create_center(&VocationalCenter {
                        id: id.to_string(),
                        code: id.to_uppercase(),
                        name: format!("Center {id}"),
                        is_active: true,
                        created_at: now,
                    })
                    .unwrap();
            }
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            role,
            center_id: center_id.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap();
        user
    }
}
