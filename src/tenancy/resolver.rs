use super::{Scope, SessionState};
use crate::error::Result;
use crate::store::Store;
use crate::types::{User, VocationalCenter};

/// Center lookups needed to resolve a scope.
pub trait CenterDirectory {
    fn find_center(&self, id: &str) -> Result<Option<VocationalCenter>>;
    fn active_centers(&self) -> Result<Vec<VocationalCenter>>;
}

impl<S: Store + ?Sized> CenterDirectory for S {
    fn find_center(&self, id: &str) -> Result<Option<VocationalCenter>> {
        self.get_center(id)
    }

    fn active_centers(&self) -> Result<Vec<VocationalCenter>> {
        self.list_centers(true)
    }
}

/// A center selection carried by the request (`?center_id=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterOverride<'a> {
    /// Drop any session override and browse all centers.
    Clear,
    Center(&'a str),
}

impl<'a> CenterOverride<'a> {
    /// `all` and the empty string clear the override.
    #[must_use]
    pub fn from_param(value: Option<&'a str>) -> Option<Self> {
        match value.map(str::trim) {
            None => None,
            Some("") | Some("all") => Some(CenterOverride::Clear),
            Some(id) => Some(CenterOverride::Center(id)),
        }
    }
}

/// Resolved scope plus the session state to persist for the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub scope: Scope,
    pub session: SessionState,
}

impl Resolution {
    #[must_use]
    pub fn session_changed(&self, previous: &SessionState) -> bool {
        &self.session != previous
    }
}

pub struct TenantResolver<'a, D: CenterDirectory + ?Sized> {
    centers: &'a D,
}

impl<'a, D: CenterDirectory + ?Sized> TenantResolver<'a, D> {
    #[must_use]
    pub fn new(centers: &'a D) -> Self {
        Self { centers }
    }

    /// Computes the request scope from the user, the prior session state and
    /// an optional request override. Never mutates `session`.
    pub fn resolve_scope(
        &self,
        user: &User,
        session: &SessionState,
        requested: Option<CenterOverride<'_>>,
    ) -> Result<Resolution> {
        if user.role.spans_all_centers() {
            self.resolve_global(user, session, requested)
        } else {
            self.resolve_member(user, requested)
        }
    }

    fn resolve_global(
        &self,
        user: &User,
        session: &SessionState,
        requested: Option<CenterOverride<'_>>,
    ) -> Result<Resolution> {
        match requested {
            Some(CenterOverride::Clear) => return Ok(all_tenants()),
            Some(CenterOverride::Center(id)) => {
                if self.is_active(id)? {
                    return Ok(Resolution {
                        scope: Scope::SingleTenant(id.to_string()),
                        session: SessionState::with_center(id),
                    });
                }
                tracing::warn!(
                    user_id = %user.id,
                    center_id = id,
                    "ignoring override for unknown or inactive center"
                );
            }
            None => {}
        }

        match &session.current_center_id {
            Some(id) if self.is_active(id)? => Ok(Resolution {
                scope: Scope::SingleTenant(id.clone()),
                session: session.clone(),
            }),
            Some(id) => {
                tracing::info!(user_id = %user.id, center_id = %id, "clearing stale session center");
                Ok(all_tenants())
            }
            None => Ok(all_tenants()),
        }
    }

    fn resolve_member(&self, user: &User, requested: Option<CenterOverride<'_>>) -> Result<Resolution> {
        if let Some(CenterOverride::Center(id)) = requested {
            if user.center_id.as_deref() != Some(id) {
                tracing::warn!(
                    user_id = %user.id,
                    center_id = id,
                    "center override ignored for center-bound user"
                );
            }
        }

        let Some(center_id) = user.center_id.as_deref() else {
            tracing::warn!(user_id = %user.id, role = %user.role, "user has no center; no access");
            return Ok(no_access());
        };

        if !self.is_active(center_id)? {
            tracing::warn!(user_id = %user.id, center_id, "user center unknown or inactive; no access");
            return Ok(no_access());
        }

        Ok(Resolution {
            scope: Scope::SingleTenant(center_id.to_string()),
            session: SessionState::with_center(center_id),
        })
    }

    /// Centers the user may browse.
    pub fn accessible_centers(&self, user: &User) -> Result<Vec<VocationalCenter>> {
        if user.role.spans_all_centers() {
            return self.centers.active_centers();
        }

        let Some(center_id) = user.center_id.as_deref() else {
            return Ok(Vec::new());
        };

        Ok(self
            .centers
            .find_center(center_id)?
            .filter(|c| c.is_active)
            .into_iter()
            .collect())
    }

    fn is_active(&self, id: &str) -> Result<bool> {
        Ok(self.centers.find_center(id)?.is_some_and(|c| c.is_active))
    }
}

fn all_tenants() -> Resolution {
    Resolution {
        scope: Scope::AllTenants,
        session: SessionState::default(),
    }
}

fn no_access() -> Resolution {
    Resolution {
        scope: Scope::NoAccess,
        session: SessionState::default(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::types::Role;

    struct Centers(BTreeMap<&'static str, bool>);

    impl CenterDirectory for Centers {
        fn find_center(&self, id: &str) -> Result<Option<VocationalCenter>> {
            Ok(self.0.get(id).map(|active| center(id, *active)))
        }

        fn active_centers(&self) -> Result<Vec<VocationalCenter>> {
            Ok(self
                .0
                .iter()
                .filter(|(_, active)| **active)
                .map(|(id, active)| center(id, *active))
                .collect())
        }
    }

    fn center(id: &str, is_active: bool) -> VocationalCenter {
        VocationalCenter {
            id: id.to_string(),
            code: id.to_uppercase(),
            name: format!("Center {id}"),
            is_active,
            created_at: Utc::now(),
        }
    }

    fn centers() -> Centers {
        Centers(BTreeMap::from([("c1", true), ("c2", true), ("old", false)]))
    }

    fn user(role: Role, center_id: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            username: "u1".to_string(),
            role,
            center_id: center_id.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_admin_without_override_sees_all() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        for role in [Role::Founder, Role::Admin] {
            let res = resolver
                .resolve_scope(&user(role, None), &SessionState::default(), None)
                .unwrap();
            assert_eq!(res.scope, Scope::AllTenants);
            assert_eq!(res.session, SessionState::default());
        }
    }

    #[test]
    fn test_admin_request_override_is_persisted() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        let res = resolver
            .resolve_scope(
                &user(Role::Admin, None),
                &SessionState::default(),
                Some(CenterOverride::Center("c2")),
            )
            .unwrap();
        assert_eq!(res.scope, Scope::SingleTenant("c2".to_string()));
        assert_eq!(res.session, SessionState::with_center("c2"));
        assert!(res.session_changed(&SessionState::default()));
    }

    #[test]
    fn test_admin_session_override_is_reused() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        let session = SessionState::with_center("c1");
        let res = resolver
            .resolve_scope(&user(Role::Founder, None), &session, None)
            .unwrap();
        assert_eq!(res.scope, Scope::SingleTenant("c1".to_string()));
        assert!(!res.session_changed(&session));
    }

    #[test]
    fn test_admin_inactive_override_falls_back() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        let admin = user(Role::Admin, None);

        let res = resolver
            .resolve_scope(&admin, &SessionState::with_center("c1"), Some(CenterOverride::Center("old")))
            .unwrap();
        assert_eq!(res.scope, Scope::SingleTenant("c1".to_string()));

        let res = resolver
            .resolve_scope(&admin, &SessionState::with_center("old"), None)
            .unwrap();
        assert_eq!(res.scope, Scope::AllTenants);
        assert_eq!(res.session, SessionState::default());
    }

    #[test]
    fn test_admin_clear_override() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        let res = resolver
            .resolve_scope(
                &user(Role::Admin, None),
                &SessionState::with_center("c1"),
                CenterOverride::from_param(Some("all")),
            )
            .unwrap();
        assert_eq!(res.scope, Scope::AllTenants);
        assert_eq!(res.session.current_center_id, None);
    }

    #[test]
    fn test_member_ignores_request_and_session() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        for role in [Role::Worker, Role::Director, Role::CenterManager, Role::Viewer] {
            let res = resolver
                .resolve_scope(
                    &user(role, Some("c1")),
                    &SessionState::with_center("c2"),
                    Some(CenterOverride::Center("c2")),
                )
                .unwrap();
            assert_eq!(res.scope, Scope::SingleTenant("c1".to_string()));
            assert_eq!(res.session, SessionState::with_center("c1"));
        }
    }

    #[test]
    fn test_member_without_center_has_no_access() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        let res = resolver
            .resolve_scope(&user(Role::Chef, None), &SessionState::default(), None)
            .unwrap();
        assert_eq!(res.scope, Scope::NoAccess);
    }

    #[test]
    fn test_member_of_inactive_center_has_no_access() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);
        let res = resolver
            .resolve_scope(&user(Role::Worker, Some("old")), &SessionState::with_center("old"), None)
            .unwrap();
        assert_eq!(res.scope, Scope::NoAccess);
        assert_eq!(res.session, SessionState::default());
    }

    #[test]
    fn test_accessible_centers() {
        let dir = centers();
        let resolver = TenantResolver::new(&dir);

        let all = resolver.accessible_centers(&user(Role::Founder, None)).unwrap();
        assert_eq!(all.len(), 2);

        let own = resolver.accessible_centers(&user(Role::Worker, Some("c2"))).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, "c2");

        assert!(resolver.accessible_centers(&user(Role::Worker, Some("old"))).unwrap().is_empty());
        assert!(resolver.accessible_centers(&user(Role::Worker, None)).unwrap().is_empty());
    }

    #[test]
    fn test_override_param_parsing() {
        assert_eq!(CenterOverride::from_param(None), None);
        assert_eq!(CenterOverride::from_param(Some("")), Some(CenterOverride::Clear));
        assert_eq!(CenterOverride::from_param(Some(" c1 ")), Some(CenterOverride::Center("c1")));
    }
}
