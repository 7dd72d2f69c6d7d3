//! JSON catalog persistence
//!
//! The catalog document is `{ "metadata": {...}, "tools": [...] }`; candidate
//! batches are a bare list of records. A missing file is an empty catalog; an
//! unparseable file is the one fatal error this crate surfaces, since every
//! downstream decision would otherwise run against corrupt state.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::record::ToolRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Run-level metadata persisted alongside the tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogMetadata {
    pub last_updated: Option<DateTime<Utc>>,
    pub total_tools: usize,
    pub new_tools_count: usize,
    pub updated_tools_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    pub metadata: CatalogMetadata,
    pub tools: Vec<ToolRecord>,
}

/// Load the catalog, returning an empty one when the file does not exist yet.
pub fn load_catalog(path: &Path) -> Result<CatalogDocument, StoreError> {
    if !path.exists() {
        debug!("no catalog at {:?}, starting empty", path);
        return Ok(CatalogDocument::default());
    }

    let raw = fs::read_to_string(path)?;
    let document: CatalogDocument = serde_json::from_str(&raw)?;
    info!("loaded {} tools from {:?}", document.tools.len(), path);
    Ok(document)
}

/// Load a bare list of candidate records. A missing file yields no candidates.
pub fn load_candidates(path: &Path) -> Result<Vec<ToolRecord>, StoreError> {
    if !path.exists() {
        debug!("no candidate file at {:?}", path);
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)?;
    let candidates: Vec<ToolRecord> = serde_json::from_str(&raw)?;
    info!("loaded {} candidates from {:?}", candidates.len(), path);
    Ok(candidates)
}

/// Persist the catalog document, creating parent directories as needed.
pub fn save_catalog(path: &Path, document: &CatalogDocument) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let raw = serde_json::to_string_pretty(document)?;
    fs::write(path, raw)?;
    info!("saved {} tools to {:?}", document.tools.len(), path);
    Ok(())
}

/// Persist any serializable report (version logs, summaries) next to the
/// catalog outputs.
pub fn save_report<T: Serialize>(path: &Path, report: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let raw = serde_json::to_string_pretty(report)?;
    fs::write(path, raw)?;
    debug!("saved report to {:?}", path);
    Ok(())
}
