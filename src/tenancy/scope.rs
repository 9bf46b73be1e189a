use serde::{Deserialize, Serialize};

/// The set of centers a request may read and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "center_id", rename_all = "snake_case")]
pub enum Scope {
    AllTenants,
    SingleTenant(String),
    /// Fail-closed scope: nothing is visible, nothing is writable.
    NoAccess,
}

impl Scope {
    #[must_use]
    pub fn center_id(&self) -> Option<&str> {
        match self {
            Scope::SingleTenant(id) => Some(id),
            _ => None,
        }
    }

    /// Read visibility of a row owned by `center_id`. Rows without a center
    /// are shared data, visible to every scope except `NoAccess`.
    #[must_use]
    pub fn can_read(&self, center_id: Option<&str>) -> bool {
        match (self, center_id) {
            (Scope::NoAccess, _) => false,
            (Scope::AllTenants, _) => true,
            (Scope::SingleTenant(_), None) => true,
            (Scope::SingleTenant(own), Some(other)) => own == other,
        }
    }

    /// SQL form of [`Scope::can_read`] over `column`, binding `:center_id`.
    #[must_use]
    pub fn predicate(&self, column: &str) -> TenantPredicate {
        match self {
            Scope::AllTenants => TenantPredicate {
                clause: "1 = 1".to_string(),
                center_id: None,
            },
            Scope::SingleTenant(id) => TenantPredicate {
                clause: format!("({column} = :center_id OR {column} IS NULL)"),
                center_id: Some(id.clone()),
            },
            Scope::NoAccess => TenantPredicate {
                clause: "1 = 0".to_string(),
                center_id: None,
            },
        }
    }

    /// Like [`Scope::predicate`] but without shared rows: matches only rows
    /// that belong to the scope's own center.
    #[must_use]
    pub fn membership_predicate(&self, column: &str) -> TenantPredicate {
        match self {
            Scope::SingleTenant(id) => TenantPredicate {
                clause: format!("{column} = :center_id"),
                center_id: Some(id.clone()),
            },
            _ => self.predicate(column),
        }
    }
}

/// A `WHERE` fragment plus the value for its `:center_id` parameter, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantPredicate {
    pub clause: String,
    pub center_id: Option<String>,
}

/// Per-session tenancy state, carried between requests of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_center_id: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn with_center(center_id: impl Into<String>) -> Self {
        Self {
            current_center_id: Some(center_id.into()),
        }
    }
}
