//! Granular permissions: the static catalog, per-user grant checks, grant
//! maintenance and menu visibility.

mod catalog;
mod category;
mod checker;
mod grants;
mod menu;
mod reconcile;

pub use catalog::{
    BUILTIN_CATALOG, CatalogTable, CategoryDefinitions, PermissionDefinition, PermissionRegistry,
};
pub use category::PermissionCategory;
pub use checker::PermissionChecker;
pub use grants::{GrantAllReport, grant_all, grant_permission, replace_user_grants, seed_user_grants};
pub use menu::{MENU_SECTIONS, MenuLink, MenuSection, VisibleSection, visible_sections};
pub use reconcile::{GrantDiff, reconcile, seed_for_role};
