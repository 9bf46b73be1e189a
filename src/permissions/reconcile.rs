use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::PermissionRegistry;
use crate::types::{PermissionGrant, Role};

/// Difference between a user's stored grants and a submitted grant set.
///
/// Applying the diff leaves exactly the submitted keys stored, each with its
/// submitted `allowed` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantDiff {
    pub added: BTreeMap<String, bool>,
    pub changed: BTreeMap<String, bool>,
    pub removed: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl GrantDiff {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Number of grant rows once the diff is applied.
    #[must_use]
    pub fn resulting_len(&self) -> usize {
        self.added.len() + self.changed.len() + self.unchanged.len()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "added={} changed={} removed={} unchanged={}",
            self.added.len(),
            self.changed.len(),
            self.removed.len(),
            self.unchanged.len()
        )
    }
}

#[must_use]
pub fn reconcile(current: &[PermissionGrant], desired: &BTreeMap<String, bool>) -> GrantDiff {
    let stored: BTreeMap<&str, bool> = current
        .iter()
        .map(|g| (g.permission_key.as_str(), g.allowed))
        .collect();

    let mut diff = GrantDiff::default();

    for (key, allowed) in desired {
        match stored.get(key.as_str()) {
            None => {
                diff.added.insert(key.clone(), *allowed);
            }
            Some(previous) if previous != allowed => {
                diff.changed.insert(key.clone(), *allowed);
            }
            Some(_) => {
                diff.unchanged.insert(key.clone());
            }
        }
    }

    for key in stored.keys() {
        if !desired.contains_key(*key) {
            diff.removed.insert((*key).to_string());
        }
    }

    diff
}

/// Full-catalog grant set for a new account: everything allowed for
/// founders, everything denied otherwise.
#[must_use]
pub fn seed_for_role(registry: &PermissionRegistry, role: Role) -> BTreeMap<String, bool> {
    let allowed = role == Role::Founder;
    registry
        .keys()
        .map(|key| (key.to_string(), allowed))
        .collect()
}
