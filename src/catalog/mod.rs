//! Catalog schema and persistence layer
//!
//! The catalog is a flat list of [`record::ToolRecord`]s keyed by exact tool
//! name. Records carry identity fields that survive every reconciliation,
//! evolving fields that are overwritten on major updates, and scoring fields
//! that are stripped and recomputed on every pass.
//!
//! # Modules
//!
//! - [`record`]: `ToolRecord` and its component types
//! - [`policy`]: declarative per-field merge policy
//! - [`store`]: JSON catalog load/save

pub mod policy;
pub mod record;
pub mod store;
