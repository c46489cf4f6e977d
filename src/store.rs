//! Persisted client state.
//!
//! The role token and the matrix override live in a cookie-like key/value
//! store: every entry carries a path and an expiry, writes overwrite, and
//! there is no versioning (last writer wins). [`CookieJar`] is the
//! request-scoped, in-memory flavour used by the HTTP surface; [`SledStore`]
//! is the durable flavour used by the CLI.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use crate::errors::{GateResult, SafeReadLock, SafeWriteLock};

pub const ROLE_KEY: &str = "userRole";
pub const MATRIX_KEY: &str = "permissionMatrix";

/// Scope and lifetime attached to every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    pub max_age: Duration,
}

impl CookieOptions {
    /// Root scope, 24 hour expiry.
    pub fn session_default() -> Self {
        Self {
            path: "/".to_string(),
            max_age: Duration::hours(24),
        }
    }

    pub fn with_max_age_secs(secs: i64) -> Self {
        Self {
            max_age: Duration::seconds(secs),
            ..Self::session_default()
        }
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self::session_default()
    }
}

/// Storage backend for the role token and the matrix override.
///
/// Reads never fail: a missing, expired or unreadable entry is `None`.
pub trait PersistedStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> GateResult<()>;

    fn remove(&self, key: &str) -> GateResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub value: String,
    pub path: String,
    /// `None` for values that arrived without expiry information (e.g. an
    /// incoming `Cookie` header).
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn new(value: &str, options: &CookieOptions) -> Self {
        Self {
            value: value.to_string(),
            path: options.path.clone(),
            expires_at: Some(Utc::now() + options.max_age),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// `name=value` pairs of a raw `Cookie` header, in header order.
fn cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(k, _)| !k.is_empty())
}

/// Look up a single cookie in a raw `Cookie` header value.
///
/// When a name repeats, the first occurrence wins.
pub fn cookie_value<'h>(header: &'h str, name: &str) -> Option<&'h str> {
    cookie_pairs(header).find(|(k, _)| *k == name).map(|(_, v)| v)
}

/// In-memory cookie jar.
///
/// Seeded from an incoming `Cookie` header; writes update the jar and are
/// queued so the HTTP layer can echo them back as `Set-Cookie` headers.
#[derive(Debug, Default)]
pub struct CookieJar {
    entries: RwLock<BTreeMap<String, StoredEntry>>,
    pending: RwLock<Vec<(String, StoredEntry, i64)>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a `Cookie` header, keeping the same duplicate rule as
    /// [`cookie_value`].
    pub fn from_cookie_header(header: &str) -> Self {
        let mut entries = BTreeMap::new();
        for (k, v) in cookie_pairs(header) {
            entries.entry(k.to_string()).or_insert_with(|| StoredEntry {
                value: v.to_string(),
                path: "/".to_string(),
                expires_at: None,
            });
        }

        Self {
            entries: RwLock::new(entries),
            pending: RwLock::new(Vec::new()),
        }
    }

    /// Number of writes not yet drained by [`CookieJar::take_set_cookies`].
    pub fn pending_writes(&self) -> usize {
        self.pending.safe_read().map(|p| p.len()).unwrap_or(0)
    }

    /// Drain queued writes rendered as `Set-Cookie` header values.
    pub fn take_set_cookies(&self) -> GateResult<Vec<String>> {
        let mut pending = self.pending.safe_write()?;
        Ok(pending
            .drain(..)
            .map(|(key, entry, max_age)| {
                format!(
                    "{key}={}; Path={}; Max-Age={max_age}",
                    entry.value, entry.path
                )
            })
            .collect())
    }
}

impl PersistedStore for CookieJar {
    fn get(&self, key: &str) -> Option<String> {
        let entries = match self.entries.safe_read() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("cookie jar unreadable, treating {key} as absent: {e}");
                return None;
            }
        };
        entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(Utc::now()))
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> GateResult<()> {
        let entry = StoredEntry::new(value, options);
        self.entries
            .safe_write()?
            .insert(key.to_string(), entry.clone());
        self.pending
            .safe_write()?
            .push((key.to_string(), entry, options.max_age.num_seconds()));
        Ok(())
    }

    fn remove(&self, key: &str) -> GateResult<()> {
        self.entries.safe_write()?.remove(key);
        let expired = StoredEntry {
            value: String::new(),
            path: "/".to_string(),
            expires_at: Some(Utc::now()),
        };
        self.pending.safe_write()?.push((key.to_string(), expired, 0));
        Ok(())
    }
}

/// A sled-backed store that keeps cookie semantics (path + expiry) on disk.
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> GateResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn tree(&self) -> GateResult<sled::Tree> {
        Ok(self.db.open_tree("cookies")?)
    }

    fn read_entry(&self, key: &str) -> GateResult<Option<StoredEntry>> {
        match self.tree()?.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl PersistedStore for SledStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_entry(key) {
            Ok(Some(entry)) if !entry.is_expired_at(Utc::now()) => Some(entry.value),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("failed to read {key} from store, treating as absent: {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> GateResult<()> {
        let entry = StoredEntry::new(value, options);
        let bytes = serde_json::to_vec(&entry)?;
        let tree = self.tree()?;
        tree.insert(key.as_bytes(), bytes)?;
        tree.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> GateResult<()> {
        let tree = self.tree()?;
        tree.remove(key.as_bytes())?;
        tree.flush()?;
        Ok(())
    }
}
