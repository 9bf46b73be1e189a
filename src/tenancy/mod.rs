//! Center-scoped data isolation.
//!
//! Each request resolves a [`Scope`] from the user and its session, then
//! every read is filtered and every write is authorized against it.

mod filter;
mod resolver;
mod scope;

pub use filter::{Mutation, TenantScoped, assign_center, authorize_mutation, require_mutation, scope_query};
pub use resolver::{CenterDirectory, CenterOverride, Resolution, TenantResolver};
pub use scope::{Scope, SessionState, TenantPredicate};
