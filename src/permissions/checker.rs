use std::collections::BTreeSet;

use super::PermissionRegistry;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::User;

/// Answers "does this user hold an explicit allow grant for this key".
///
/// Default-deny: a missing grant row, a row with `allowed = false`, and a
/// key that is not in the catalog all resolve to `false`.
pub struct PermissionChecker<'a> {
    store: &'a dyn Store,
    registry: &'a PermissionRegistry,
}

impl<'a> PermissionChecker<'a> {
    #[must_use]
    pub fn new(store: &'a dyn Store, registry: &'a PermissionRegistry) -> Self {
        Self { store, registry }
    }

    pub fn has_permission(&self, user: &User, key: &str) -> Result<bool> {
        if !self.registry.contains(key) {
            tracing::warn!(user_id = %user.id, key, "permission check for unknown key");
            return Ok(false);
        }

        let grant = self.store.get_permission_grant(&user.id, key)?;
        Ok(grant.is_some_and(|g| g.allowed))
    }

    /// True if the user holds at least one of `keys`.
    pub fn has_any(&self, user: &User, keys: &[&str]) -> Result<bool> {
        for key in keys {
            if self.has_permission(user, key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Gate for protected actions. `None` means no authenticated user.
    pub fn authorize(&self, user: Option<&User>, key: &str) -> Result<()> {
        let user = user.ok_or(Error::Unauthorized)?;
        if self.has_permission(user, key)? {
            Ok(())
        } else {
            tracing::warn!(target: "cfpa_gate::authz", user_id = %user.id, key, "permission denied");
            Err(Error::PermissionDenied(key.to_string()))
        }
    }

    /// Allowed keys that still exist in the catalog.
    pub fn granted_keys(&self, user: &User) -> Result<BTreeSet<String>> {
        let mut keys = self.store.list_allowed_keys(&user.id)?;
        keys.retain(|key| self.registry.contains(key));
        Ok(keys)
    }
}
