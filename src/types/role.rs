use std::fmt;

use serde::{Deserialize, Serialize};

/// Organizational role of a user account.
///
/// Roles only decide tenant reach (see [`Role::spans_all_centers`]); what a
/// user may do is decided by their permission grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Founder,
    Admin,
    Director,
    Accountant,
    Economist,
    WarehouseManager,
    Chef,
    Worker,
    Viewer,
    CenterManager,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Founder,
        Role::Admin,
        Role::Director,
        Role::Accountant,
        Role::Economist,
        Role::WarehouseManager,
        Role::Chef,
        Role::Worker,
        Role::Viewer,
        Role::CenterManager,
    ];

    /// Founders and admins are not bound to a single center.
    #[must_use]
    pub const fn spans_all_centers(self) -> bool {
        matches!(self, Role::Founder | Role::Admin)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Founder => "founder",
            Role::Admin => "admin",
            Role::Director => "director",
            Role::Accountant => "accountant",
            Role::Economist => "economist",
            Role::WarehouseManager => "warehouse_manager",
            Role::Chef => "chef",
            Role::Worker => "worker",
            Role::Viewer => "viewer",
            Role::CenterManager => "center_manager",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_founder_and_admin_span_centers() {
        let global: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| r.spans_all_centers())
            .collect();
        assert_eq!(global, vec![Role::Founder, Role::Admin]);
    }

    #[test]
    fn test_parse_matches_serde_names() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
