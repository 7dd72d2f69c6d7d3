//! Catalog reconciliation layer
//!
//! Compares freshly enriched data against the existing catalog, classifies
//! each change as major or minor, and merges field-by-field under the
//! catalog's mutability policy.
//!
//! # Modules
//!
//! - [`change`]: multi-signal major-update detection
//! - [`merge`]: field-level catalog merging and the version log

pub mod change;
pub mod merge;
