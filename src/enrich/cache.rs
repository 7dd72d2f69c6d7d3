//! Fingerprint-keyed enrichment cache
//!
//! Re-enriching a tool whose data is still fresh wastes scraping time and,
//! worse, paid analysis calls. The cache keys each tool by a stable
//! fingerprint and stores the last enrichment payload with its timestamp;
//! entries past the TTL count as misses.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::enrich::error::CacheError;
use crate::enrich::fields::Enrichment;

/// Hex characters of the URL hash kept in a fingerprint.
const URL_HASH_LEN: usize = 8;

/// Fingerprint sentinel for tools without a URL.
const NO_URL_SENTINEL: &str = "nourl";

/// Stable cache key: normalized tool name (lowercase, spaces and hyphens
/// removed) plus a short hash of the URL.
pub fn fingerprint(name: &str, url: Option<&str>) -> String {
    let normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();

    let url_hash = match url {
        Some(url) if !url.is_empty() => {
            let digest = Sha256::digest(url.as_bytes());
            hex::encode(digest)[..URL_HASH_LEN].to_string()
        }
        _ => NO_URL_SENTINEL.to_string(),
    };

    format!("{}_{}", normalized, url_hash)
}

/// One cached enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub tool_name: String,
    pub payload: Enrichment,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry is still within its time-to-live at `now`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.cached_at) < ttl
    }
}

/// Storage seam for cached enrichments.
#[cfg_attr(test, mockall::automock)]
pub trait EnrichmentStore: Send + Sync {
    /// Load the entry for a fingerprint, fresh or not.
    fn load(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace the entry for its fingerprint.
    fn save(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Drop entries older than the given cutoff; returns how many were removed.
    fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError>;
}

pub struct SqliteEnrichmentCache {
    conn: Mutex<Connection>,
}

impl SqliteEnrichmentCache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing enrichment cache at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        let cache = Self {
            conn: Mutex::new(conn),
        };

        cache.create_schema()?;
        info!("Enrichment cache initialized successfully");

        Ok(cache)
    }

    /// Open an in-memory cache, for tests and dry runs.
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.create_schema()?;
        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating cache schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS enrichments (
                fingerprint TEXT PRIMARY KEY,
                tool_name TEXT NOT NULL,
                payload TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cached_at ON enrichments(cached_at)",
            [],
        )?;

        debug!("Cache schema created successfully");
        Ok(())
    }
}

impl EnrichmentStore for SqliteEnrichmentCache {
    fn load(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT tool_name, payload, cached_at FROM enrichments WHERE fingerprint = ?1",
        )?;

        let mut rows = stmt.query_map([fingerprint], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let Some(row) = rows.next() else {
            return Ok(None);
        };
        let (tool_name, payload_raw, cached_at_ms) = row?;

        let payload: Enrichment = serde_json::from_str(&payload_raw)?;
        let cached_at = DateTime::<Utc>::from_timestamp_millis(cached_at_ms)
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC);

        Ok(Some(CacheEntry {
            fingerprint: fingerprint.to_string(),
            tool_name,
            payload,
            cached_at,
        }))
    }

    fn save(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let payload = serde_json::to_string(&entry.payload)?;
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO enrichments (fingerprint, tool_name, payload, cached_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(fingerprint) DO UPDATE SET
                tool_name = excluded.tool_name,
                payload = excluded.payload,
                cached_at = excluded.cached_at
            "#,
            (
                &entry.fingerprint,
                &entry.tool_name,
                &payload,
                entry.cached_at.timestamp_millis(),
            ),
        )?;

        debug!("cached enrichment for {}", entry.tool_name);
        Ok(())
    }

    fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let conn = self.lock_conn()?;
        let removed = conn.execute(
            "DELETE FROM enrichments WHERE cached_at < ?1",
            [cutoff.timestamp_millis()],
        )?;

        if removed > 0 {
            debug!("evicted {} stale cache entries", removed);
        }
        Ok(removed)
    }
}
