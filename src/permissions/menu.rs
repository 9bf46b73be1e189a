use std::collections::BTreeSet;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuLink {
    pub title: &'static str,
    pub permission: &'static str,
}

/// A dashboard module. Shown when the user holds any `trigger` permission
/// and at least one of its links survives filtering.
#[derive(Debug, Clone, Copy)]
pub struct MenuSection {
    pub key: &'static str,
    pub name: &'static str,
    pub trigger: &'static [&'static str],
    pub links: &'static [MenuLink],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleSection {
    pub key: &'static str,
    pub name: &'static str,
    pub links: Vec<MenuLink>,
}

const fn link(title: &'static str, permission: &'static str) -> MenuLink {
    MenuLink { title, permission }
}

pub static MENU_SECTIONS: &[MenuSection] = &[
    MenuSection {
        key: "inventory",
        name: "Inventory Management",
        trigger: &["inventory_view_items", "inventory_add_transaction"],
        links: &[
            link("View items", "inventory_view_items"),
            link("Add transaction", "inventory_add_transaction"),
        ],
    },
    MenuSection {
        key: "equipment",
        name: "Asset Management",
        trigger: &["equipment_view_assets", "equipment_add_issue"],
        links: &[
            link("View assets", "equipment_view_assets"),
            link("Hand over asset", "equipment_add_issue"),
        ],
    },
    MenuSection {
        key: "restaurant",
        name: "Restaurant Management",
        trigger: &["restaurant_view_recipes", "restaurant_add_meal"],
        links: &[
            link("View recipes", "restaurant_view_recipes"),
            link("Record meal", "restaurant_add_meal"),
        ],
    },
    MenuSection {
        key: "suppliers",
        name: "Supplier Management",
        trigger: &["suppliers_view_orders", "suppliers_add_order"],
        links: &[
            link("View orders", "suppliers_view_orders"),
            link("Create purchase order", "suppliers_add_order"),
        ],
    },
    MenuSection {
        key: "employee_requests",
        name: "My Requests",
        trigger: &["requests_create", "requests_view_own"],
        links: &[
            link("View my requests", "requests_view_own"),
            link("Create request", "requests_create"),
        ],
    },
    MenuSection {
        key: "reports",
        name: "Reports",
        trigger: &["reports_inventory_movement", "reports_low_stock"],
        links: &[
            link("Inventory movement", "reports_inventory_movement"),
            link("Low stock items", "reports_low_stock"),
        ],
    },
];

#[must_use]
pub fn visible_sections(granted: &BTreeSet<String>) -> Vec<VisibleSection> {
    MENU_SECTIONS
        .iter()
        .filter(|section| section.trigger.iter().any(|key| granted.contains(*key)))
        .filter_map(|section| {
            let links: Vec<MenuLink> = section
                .links
                .iter()
                .filter(|l| granted.contains(l.permission))
                .copied()
                .collect();
            (!links.is_empty()).then(|| VisibleSection {
                key: section.key,
                name: section.name,
                links,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionRegistry;

    fn granted(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_no_grants_no_sections() {
        assert!(visible_sections(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_section_links_are_filtered() {
        let sections = visible_sections(&granted(&["inventory_view_items", "kpi_view"]));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].key, "inventory");
        assert_eq!(sections[0].links, vec![link("View items", "inventory_view_items")]);
    }

    #[test]
    fn test_every_menu_permission_is_in_catalog() {
        let registry = PermissionRegistry::builtin();
        for section in MENU_SECTIONS {
            for key in section.trigger {
                assert!(registry.contains(key), "{key}");
            }
            for l in section.links {
                assert!(registry.contains(l.permission), "{}", l.permission);
            }
        }
    }
}
