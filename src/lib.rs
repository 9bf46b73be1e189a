//! # cfpa-gate
//!
//! Permission checks and center-level data isolation for a multi-center
//! vocational training institution, usable as a standalone server or as a
//! library.
//!
//! - [`permissions`]: the static permission catalog and default-deny
//!   per-user grants.
//! - [`tenancy`]: resolving a request's center scope and filtering reads and
//!   writes against it.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cfpa_gate::server::{AppState, create_router};
//! use cfpa_gate::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/cfpa-gate.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): builds the `cfpa-gate` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod permissions;
pub mod server;
pub mod store;
pub mod tenancy;
pub mod types;
