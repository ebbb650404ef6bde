//! Answer cache keyed by normalized query text.
//!
//! Only successful answers are stored. Each entry remembers the document
//! store generation it was computed against; a lookup under a newer
//! generation treats the entry as a miss, so uploading a document
//! re-resolves document and hybrid questions without any explicit flush.
//!
//! SQL-only answers are recorded with generation `None` and stay valid
//! until [`QueryCache::clear`], since the database is treated as static.
//!
//! A cache built with [`QueryCache::with_capacity`] evicts its least
//! recently used entry when full.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::models::QueryResult;
use crate::normalize::normalize_query;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: QueryResult,
    pub created_at: DateTime<Utc>,
    /// Document generation the answer depends on, if any.
    pub generation: Option<u64>,
    last_used: u64,
}

/// Hit/miss counters plus current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    capacity: Option<usize>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// An unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The cache key for a raw query.
    pub fn key(raw: &str) -> String {
        normalize_query(raw)
    }

    /// Look up `key` as seen by document generation `generation`.
    ///
    /// Entries tied to an older generation are dropped and reported as a
    /// miss.
    pub fn get(&self, key: &str, generation: u64) -> Option<QueryResult> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let stale = entries
            .get(key)
            .and_then(|e| e.generation)
            .filter(|&g| g != generation);
        if let Some(stale) = stale {
            entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, stale, current = generation, "cache entry outdated");
            return None;
        }
        match entries.get_mut(key) {
            Some(e) => {
                e.last_used = self.tick();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(e.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a successful answer. Failures are ignored.
    pub fn insert(&self, key: String, value: QueryResult, generation: Option<u64>) {
        if !value.is_success() {
            return;
        }
        let entry = CacheEntry {
            key: key.clone(),
            value,
            created_at: Utc::now(),
            generation,
            last_used: self.tick(),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(capacity) = self.capacity {
            if entries.len() >= capacity && !entries.contains_key(&key) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                    tracing::debug!(key = %oldest, "cache entry evicted");
                }
            }
        }
        entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let n = entries.len();
        entries.clear();
        n
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
