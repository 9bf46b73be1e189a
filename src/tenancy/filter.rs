use serde::Serialize;

use super::Scope;
use crate::error::{Error, Result};
use crate::types::Item;

/// An entity that belongs to at most one center.
pub trait TenantScoped {
    const ENTITY_TYPE: &'static str;

    fn entity_id(&self) -> &str;

    /// `None` marks shared data.
    fn center_id(&self) -> Option<&str>;
}

impl TenantScoped for Item {
    const ENTITY_TYPE: &'static str = "item";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn center_id(&self) -> Option<&str> {
        self.center_id.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mutation::Create => "create",
            Mutation::Update => "update",
            Mutation::Delete => "delete",
        }
    }
}

/// Keeps the rows visible under `scope`.
pub fn scope_query<T: TenantScoped>(scope: &Scope, rows: impl IntoIterator<Item = T>) -> Vec<T> {
    rows.into_iter()
        .filter(|row| scope.can_read(row.center_id()))
        .collect()
}

/// Whether `mutation` on `entity` is allowed under `scope`.
///
/// A center-scoped user only ever writes rows of their own center. Shared
/// rows are created and maintained from the global scope.
pub fn authorize_mutation<T: TenantScoped>(scope: &Scope, entity: &T, mutation: Mutation) -> bool {
    let allowed = match scope {
        Scope::AllTenants => true,
        Scope::NoAccess => false,
        Scope::SingleTenant(own) => entity.center_id() == Some(own.as_str()),
    };

    if !allowed {
        tracing::warn!(
            target: "cfpa_gate::authz",
            entity_type = T::ENTITY_TYPE,
            entity_id = entity.entity_id(),
            entity_center = entity.center_id().unwrap_or("shared"),
            scope_center = scope.center_id().unwrap_or("none"),
            action = mutation.as_str(),
            "cross-tenant mutation denied"
        );
    }

    allowed
}

pub fn require_mutation<T: TenantScoped>(scope: &Scope, entity: &T, mutation: Mutation) -> Result<()> {
    if authorize_mutation(scope, entity, mutation) {
        Ok(())
    } else {
        Err(Error::TenantMismatch)
    }
}

/// Center to stamp on a new row.
///
/// Single-center scopes always write into their own center; a different
/// explicit request is rejected. The global scope honors the request as-is.
pub fn assign_center(scope: &Scope, requested: Option<&str>) -> Result<Option<String>> {
    match scope {
        Scope::AllTenants => Ok(requested.map(str::to_string)),
        Scope::SingleTenant(own) => match requested {
            None => Ok(Some(own.clone())),
            Some(center) if center == own => Ok(Some(own.clone())),
            Some(center) => {
                tracing::warn!(target: "cfpa_gate::authz", scope_center = %own, requested = center, "cross-tenant create denied");
                Err(Error::TenantMismatch)
            }
        },
        Scope::NoAccess => Err(Error::TenantMismatch),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn item(id: &str, center_id: Option<&str>) -> Item {
        let now = Utc::now();
        Item {
            id: id.to_string(),
            center_id: center_id.map(str::to_string),
            name: format!("item {id}"),
            quantity: 1.0,
            unit: "kg".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn rows() -> Vec<Item> {
        vec![item("a", Some("c1")), item("b", Some("c2")), item("s", None)]
    }

    fn ids(rows: &[Item]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_scope_query() {
        let single = scope_query(&Scope::SingleTenant("c1".to_string()), rows());
        assert_eq!(ids(&single), vec!["a", "s"]);

        let all = scope_query(&Scope::AllTenants, rows());
        assert_eq!(all.len(), 3);

        assert!(scope_query(&Scope::NoAccess, rows()).is_empty());
    }

    #[test]
    fn test_single_tenant_mutations() {
        let scope = Scope::SingleTenant("c1".to_string());
        let own = item("a", Some("c1"));
        let other = item("b", Some("c2"));
        let shared = item("s", None);

        for m in [Mutation::Create, Mutation::Update, Mutation::Delete] {
            assert!(authorize_mutation(&scope, &own, m));
            assert!(!authorize_mutation(&scope, &other, m));
        }

        for m in [Mutation::Create, Mutation::Update, Mutation::Delete] {
            assert!(!authorize_mutation(&scope, &shared, m));
        }
    }

    #[test]
    fn test_single_tenant_cannot_create_shared_row() {
        let scope = Scope::SingleTenant("c1".to_string());
        let shared = item("s", None);

        assert!(!authorize_mutation(&scope, &shared, Mutation::Create));
        assert!(matches!(
            require_mutation(&scope, &shared, Mutation::Create),
            Err(Error::TenantMismatch)
        ));
        assert!(authorize_mutation(&Scope::AllTenants, &shared, Mutation::Create));
    }

    #[test]
    fn test_global_and_no_access_mutations() {
        let other = item("b", Some("c2"));
        assert!(authorize_mutation(&Scope::AllTenants, &other, Mutation::Delete));
        assert!(!authorize_mutation(&Scope::NoAccess, &other, Mutation::Create));
        assert!(matches!(
            require_mutation(&Scope::NoAccess, &other, Mutation::Update),
            Err(Error::TenantMismatch)
        ));
    }

    #[test]
    fn test_assign_center() {
        let scope = Scope::SingleTenant("c1".to_string());
        assert_eq!(assign_center(&scope, None).unwrap().as_deref(), Some("c1"));
        assert_eq!(assign_center(&scope, Some("c1")).unwrap().as_deref(), Some("c1"));
        assert!(matches!(assign_center(&scope, Some("c2")), Err(Error::TenantMismatch)));

        assert_eq!(assign_center(&Scope::AllTenants, None).unwrap(), None);
        assert_eq!(
            assign_center(&Scope::AllTenants, Some("c2")).unwrap().as_deref(),
            Some("c2")
        );
        assert!(assign_center(&Scope::NoAccess, None).is_err());
    }
}
