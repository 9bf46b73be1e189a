use std::collections::BTreeMap;

use chrono::Utc;

use super::{GrantDiff, PermissionRegistry, seed_for_role};
use crate::error::Result;
use crate::store::Store;
use crate::types::{PermissionGrant, User};

/// Outcome of [`grant_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantAllReport {
    /// Keys that had no row yet.
    pub added: usize,
    /// Rows flipped from denied to allowed.
    pub updated: usize,
}

/// Writes one grant row per catalog key for a freshly created account.
pub fn seed_user_grants(
    store: &dyn Store,
    registry: &PermissionRegistry,
    user: &User,
) -> Result<GrantDiff> {
    let desired = seed_for_role(registry, user.role);
    replace_user_grants(store, registry, &user.id, &desired)
}

/// Replaces a user's grant set with `desired`, atomically.
///
/// Two concurrent replacements for the same user are last-write-wins: the
/// stored rows are read and rewritten in one transaction, so the survivor is
/// exactly one of the submitted sets.
pub fn replace_user_grants(
    store: &dyn Store,
    registry: &PermissionRegistry,
    user_id: &str,
    desired: &BTreeMap<String, bool>,
) -> Result<GrantDiff> {
    registry.validate_keys(desired.keys().map(String::as_str))?;

    let diff = store.replace_grants(user_id, desired, true)?;

    tracing::info!(user_id, summary = %diff.summary(), "replaced permission grants");
    Ok(diff)
}

/// Allows a single key. Returns `false` when it was already allowed.
pub fn grant_permission(
    store: &dyn Store,
    registry: &PermissionRegistry,
    user_id: &str,
    key: &str,
) -> Result<bool> {
    registry.validate_keys([key])?;

    let existing = store.get_permission_grant(user_id, key)?;
    if existing.as_ref().is_some_and(|g| g.allowed) {
        return Ok(false);
    }

    let now = Utc::now();
    store.upsert_permission_grant(&PermissionGrant {
        user_id: user_id.to_string(),
        permission_key: key.to_string(),
        allowed: true,
        created_at: existing.map_or(now, |g| g.created_at),
        updated_at: now,
    })?;
    Ok(true)
}

/// Allows every catalog key, keeping rows for keys outside the catalog.
pub fn grant_all(
    store: &dyn Store,
    registry: &PermissionRegistry,
    user_id: &str,
) -> Result<GrantAllReport> {
    let desired: BTreeMap<String, bool> =
        registry.keys().map(|key| (key.to_string(), true)).collect();
    let diff = store.replace_grants(user_id, &desired, false)?;

    Ok(GrantAllReport {
        added: diff.added.len(),
        updated: diff.changed.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::test_support::{memory_store, user_in};
    use crate::types::Role;

    #[test]
    fn test_seed_writes_full_catalog() {
        let (store, registry) = memory_store();
        let founder = user_in(&store, "root", Role::Founder, None);
        let worker = user_in(&store, "w1", Role::Worker, Some("c1"));

        seed_user_grants(&store, &registry, &founder).unwrap();
        seed_user_grants(&store, &registry, &worker).unwrap();

        assert_eq!(store.list_user_grants(&founder.id).unwrap().len(), registry.len());
        assert_eq!(store.list_allowed_keys(&founder.id).unwrap().len(), registry.len());
        assert_eq!(store.list_user_grants(&worker.id).unwrap().len(), registry.len());
        assert!(store.list_allowed_keys(&worker.id).unwrap().is_empty());
    }

    #[test]
    fn test_regrant_is_noop() {
        let (store, registry) = memory_store();
        let user = user_in(&store, "w1", Role::Worker, Some("c1"));

        assert!(grant_permission(&store, &registry, &user.id, "kpi_view").unwrap());
        assert!(!grant_permission(&store, &registry, &user.id, "kpi_view").unwrap());

        let grants = store.list_user_grants(&user.id).unwrap();
        assert_eq!(grants.len(), 1);
        assert!(grants[0].allowed);
    }

    #[test]
    fn test_grant_rejects_unknown_key() {
        let (store, registry) = memory_store();
        let user = user_in(&store, "w1", Role::Worker, Some("c1"));

        let err = grant_permission(&store, &registry, &user.id, "bogus_key").unwrap_err();
        assert!(matches!(err, Error::UnknownPermission(_)));
        assert!(store.list_user_grants(&user.id).unwrap().is_empty());
    }

    #[test]
    fn test_replace_forty_with_twenty_five() {
        let (store, registry) = memory_store();
        let user = user_in(&store, "w1", Role::Worker, Some("c1"));
        let keys: Vec<&str> = registry.keys().collect();

        let first: BTreeMap<String, bool> =
            keys[..40].iter().map(|k| (k.to_string(), true)).collect();
        replace_user_grants(&store, &registry, &user.id, &first).unwrap();
        assert_eq!(store.list_user_grants(&user.id).unwrap().len(), 40);

        let second: BTreeMap<String, bool> =
            keys[20..45].iter().map(|k| (k.to_string(), true)).collect();
        let diff = replace_user_grants(&store, &registry, &user.id, &second).unwrap();
        assert_eq!(diff.removed.len(), 20);

        let stored: BTreeMap<String, bool> = store
            .list_user_grants(&user.id)
            .unwrap()
            .into_iter()
            .map(|g| (g.permission_key, g.allowed))
            .collect();
        assert_eq!(stored, second);
    }

    #[test]
    fn test_replace_with_unknown_key_changes_nothing() {
        let (store, registry) = memory_store();
        let user = user_in(&store, "w1", Role::Worker, Some("c1"));
        grant_permission(&store, &registry, &user.id, "kpi_view").unwrap();

        let desired = BTreeMap::from([("bogus_key".to_string(), true)]);
        assert!(replace_user_grants(&store, &registry, &user.id, &desired).is_err());
        assert_eq!(store.list_user_grants(&user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_grant_all_reports_added_and_updated() {
        let (store, registry) = memory_store();
        let user = user_in(&store, "admin", Role::Admin, None);
        let desired = BTreeMap::from([
            ("kpi_view".to_string(), false),
            ("kpi_edit".to_string(), true),
        ]);
        replace_user_grants(&store, &registry, &user.id, &desired).unwrap();

        let report = grant_all(&store, &registry, &user.id).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.added, registry.len() - 2);

        let again = grant_all(&store, &registry, &user.id).unwrap();
        assert_eq!(again, GrantAllReport::default());
    }

    #[test]
    fn test_grant_all_keeps_rows_outside_catalog() {
        let (store, registry) = memory_store();
        let user = user_in(&store, "admin", Role::Admin, None);
        store
            .replace_grants(&user.id, &BTreeMap::from([("retired_key".to_string(), false)]), true)
            .unwrap();

        let report = grant_all(&store, &registry, &user.id).unwrap();
        assert_eq!(report.added, registry.len());

        let grants = store.list_user_grants(&user.id).unwrap();
        assert_eq!(grants.len(), registry.len() + 1);
        assert!(grants.iter().any(|g| g.permission_key == "retired_key" && !g.allowed));
    }

    #[test]
    fn test_later_replacement_wins_whole_set() {
        let (store, registry) = memory_store();
        let user = user_in(&store, "w1", Role::Worker, Some("c1"));
        let first = BTreeMap::from([
            ("kpi_view".to_string(), true),
            ("dashboard_view".to_string(), true),
        ]);
        let second = BTreeMap::from([("kpi_edit".to_string(), true)]);

        replace_user_grants(&store, &registry, &user.id, &first).unwrap();
        replace_user_grants(&store, &registry, &user.id, &second).unwrap();

        let stored: BTreeMap<String, bool> = store
            .list_user_grants(&user.id)
            .unwrap()
            .into_iter()
            .map(|g| (g.permission_key, g.allowed))
            .collect();
        assert_eq!(stored, second);
    }
}
