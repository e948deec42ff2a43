//! In-memory cache manager with per-entry expiry
//!
//! Provides a `CacheManager` that stores cloneable values under string keys,
//! each with an expiry instant fixed at write time. Expired entries are never
//! returned and are reclaimed by [`super::SweeperHandle`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// TTL used when the configured one is zero
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Lower bound on the sweep interval
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on any TTL; longer values are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A stored value with its bookkeeping
struct CacheEntry<V> {
    data: V,
    cached_at: DateTime<Utc>,
    /// `None` when the expiry instant is not representable
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of reading from the cache, including when the value was stored
#[derive(Debug, Clone)]
pub struct CachedData<V> {
    pub data: V,
    pub cached_at: DateTime<Utc>,
}

/// Thread-safe key/value cache with TTL expiry
///
/// Clones share the same storage. There is no size bound; memory is only
/// reclaimed through expiry and sweeping, or [`CacheManager::clear`].
pub struct CacheManager<V> {
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    default_ttl: Duration,
}

impl<V> Clone for CacheManager<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V> fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("default_ttl", &self.default_ttl)
            .field("entries", &self.len())
            .finish()
    }
}

impl<V> CacheManager<V> {
    /// Creates an empty cache
    ///
    /// A zero TTL falls back to [`DEFAULT_TTL`]; anything above [`MAX_TTL`]
    /// is clamped.
    pub fn new(default_ttl: Duration) -> Self {
        let default_ttl = if default_ttl.is_zero() {
            DEFAULT_TTL
        } else {
            default_ttl.min(MAX_TTL)
        };
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// How often expired entries should be swept: half the TTL, at least a minute
    pub fn sweep_interval(&self) -> Duration {
        (self.default_ttl / 2).max(MIN_SWEEP_INTERVAL)
    }

    /// Stores a value with the default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Stores a value with an explicit TTL, replacing any existing entry
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            data: value,
            cached_at: Utc::now(),
            expires_at: Instant::now().checked_add(ttl.min(MAX_TTL)),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry and returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

impl<V: Clone> CacheManager<V> {
    /// Returns a clone of the value if present and not expired
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|cached| cached.data)
    }

    /// Like [`CacheManager::get`], with the time the value was stored
    pub fn get_entry(&self, key: &str) -> Option<CachedData<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(CachedData {
            data: entry.data.clone(),
            cached_at: entry.cached_at,
        })
    }
}
