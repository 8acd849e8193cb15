// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sharded, time-evicted read-through cache fronting the Route53 API.
//!
//! Keys are namespaced by [`CacheCategory`] and formatted `<prefix>-<suffix>`.
//! Values are opaque bytes: a hosted zone id, a JSON array of record sets, or a
//! change-batch fingerprint. Every entry is a hint. Callers must treat a miss,
//! an expired entry and an evicted entry identically and fall back to the
//! provider.
//!
//! The cache is constructed explicitly and shared through `Arc<DnsCache>`.
//! Sharding is delegated to [`DashMap`], so concurrent reconciliations of
//! different clusters never contend on a single lock.
//!
//! # Example
//!
//! ```rust
//! use route53_dns_operator::cache::{CacheCategory, CacheConfig, DnsCache};
//!
//! let cache = DnsCache::new(CacheConfig::default()).unwrap();
//! cache.set_string(CacheCategory::HostedZoneId, "demo.example.com", "Z123").unwrap();
//! assert_eq!(
//!     cache.get_string(CacheCategory::HostedZoneId, "demo.example.com").unwrap(),
//!     Some("Z123".to_string())
//! );
//! ```

use crate::constants::{
    DEFAULT_CACHE_CLEAN_WINDOW_SECS, DEFAULT_CACHE_LIFE_WINDOW_SECS, DEFAULT_CACHE_MAX_BYTES,
    DEFAULT_CACHE_SHARDS,
};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by [`DnsCache`].
///
/// A decode failure is fatal for the operation that read the entry; a miss is
/// never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache configuration is unusable
    #[error("Invalid cache configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration
        reason: String,
    },

    /// A single entry exceeds the whole byte budget
    #[error("Cache entry '{key}' of {size} bytes exceeds the cache budget of {max_bytes} bytes")]
    EntryTooLarge {
        /// Full cache key
        key: String,
        /// Size of the rejected entry in bytes
        size: usize,
        /// Configured byte budget
        max_bytes: usize,
    },

    /// A stored value could not be decoded into the requested type
    #[error("Failed to decode cache entry '{key}': {reason}")]
    Decode {
        /// Full cache key
        key: String,
        /// Decoder message
        reason: String,
    },

    /// A value could not be encoded for storage
    #[error("Failed to encode cache entry '{key}': {reason}")]
    Encode {
        /// Full cache key
        key: String,
        /// Encoder message
        reason: String,
    },
}

/// Key namespace of a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    /// Hosted zone id by domain name
    HostedZoneId,
    /// Full record-set snapshot by zone id
    ZoneRecords,
    /// Apex NS values by zone id
    NameServers,
    /// Fingerprint of the last applied ingress record pair by zone id
    IngressFingerprint,
    /// Fingerprint of the last applied delegation change by cluster domain
    DelegationFingerprint,
}

impl CacheCategory {
    /// Key prefix of this category
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::HostedZoneId => "zoneID",
            Self::ZoneRecords => "zoneRecords",
            Self::NameServers => "nameserverRecords",
            Self::IngressFingerprint => "ingressRecords",
            Self::DelegationFingerprint => "delegationRecords",
        }
    }

    /// Full cache key for `suffix` in this category
    #[must_use]
    pub fn key(self, suffix: &str) -> String {
        format!("{}-{suffix}", self.prefix())
    }
}

/// Tuning knobs of [`DnsCache`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of shards; a power of two greater than one
    pub shards: usize,
    /// Lifetime of an entry regardless of invalidation
    pub life_window: Duration,
    /// Interval at which the host sweeps expired entries
    pub clean_window: Duration,
    /// Byte budget across keys and values
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_CACHE_SHARDS,
            life_window: Duration::from_secs(DEFAULT_CACHE_LIFE_WINDOW_SECS),
            clean_window: Duration::from_secs(DEFAULT_CACHE_CLEAN_WINDOW_SECS),
            max_bytes: DEFAULT_CACHE_MAX_BYTES,
        }
    }
}

/// Point-in-time counters of a [`DnsCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries, including expired ones not yet swept
    pub entries: usize,
    /// Bytes accounted against the budget
    pub bytes: usize,
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
}

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    inserted_at: Instant,
}

/// Thread-safe TTL cache shared by every reconciliation.
#[derive(Debug)]
pub struct DnsCache {
    entries: DashMap<String, Entry>,
    config: CacheConfig,
    bytes: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DnsCache {
    /// Build a cache from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] when the shard count is not a power
    /// of two greater than one, or when the life window or byte budget is zero.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        if config.shards < 2 || !config.shards.is_power_of_two() {
            return Err(CacheError::InvalidConfig {
                reason: format!(
                    "shard count must be a power of two greater than one, got {}",
                    config.shards
                ),
            });
        }
        if config.life_window.is_zero() {
            return Err(CacheError::InvalidConfig {
                reason: "life window must be greater than zero".to_string(),
            });
        }
        if config.max_bytes == 0 {
            return Err(CacheError::InvalidConfig {
                reason: "byte budget must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            entries: DashMap::with_shard_amount(config.shards),
            config,
            bytes: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Configuration this cache was built with
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Raw bytes stored under `(category, suffix)`, or `None` on miss or expiry.
    #[must_use]
    pub fn get(&self, category: CacheCategory, suffix: &str) -> Option<Vec<u8>> {
        let key = category.key(suffix);
        let life_window = self.config.life_window;

        let expired = match self.entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < life_window => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some((key, entry)) = self
                .entries
                .remove_if(&key, |_, entry| entry.inserted_at.elapsed() >= life_window)
            {
                self.release(&key, &entry);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// UTF-8 value stored under `(category, suffix)`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Decode`] when the stored bytes are not UTF-8.
    pub fn get_string(
        &self,
        category: CacheCategory,
        suffix: &str,
    ) -> Result<Option<String>, CacheError> {
        self.get(category, suffix)
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|e| CacheError::Decode {
                    key: category.key(suffix),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// JSON value stored under `(category, suffix)`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Decode`] when the stored bytes do not deserialize
    /// into `T`.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        category: CacheCategory,
        suffix: &str,
    ) -> Result<Option<T>, CacheError> {
        self.get(category, suffix)
            .map(|bytes| {
                serde_json::from_slice(&bytes).map_err(|e| CacheError::Decode {
                    key: category.key(suffix),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Store `value` under `(category, suffix)`, evicting oldest entries while
    /// the byte budget is exceeded.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::EntryTooLarge`] when the entry alone exceeds the budget.
    pub fn set(
        &self,
        category: CacheCategory,
        suffix: &str,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), CacheError> {
        let key = category.key(suffix);
        let value = value.into();
        let size = key.len() + value.len();

        if size > self.config.max_bytes {
            return Err(CacheError::EntryTooLarge {
                key,
                size,
                max_bytes: self.config.max_bytes,
            });
        }

        if let Some((old_key, old_entry)) = self.entries.remove(&key) {
            self.release(&old_key, &old_entry);
        }
        self.evict_until_fits(size);

        self.bytes.fetch_add(size, Ordering::Relaxed);
        if let Some(replaced) = self.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        ) {
            // A concurrent writer raced us to the same key
            self.release(&key, &replaced);
        }
        Ok(())
    }

    /// Store a UTF-8 string.
    ///
    /// # Errors
    ///
    /// See [`DnsCache::set`].
    pub fn set_string(
        &self,
        category: CacheCategory,
        suffix: &str,
        value: &str,
    ) -> Result<(), CacheError> {
        self.set(category, suffix, value.as_bytes().to_vec())
    }

    /// Store `value` encoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Encode`] when serialization fails, otherwise see
    /// [`DnsCache::set`].
    pub fn set_json<T: Serialize + ?Sized>(
        &self,
        category: CacheCategory,
        suffix: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Encode {
            key: category.key(suffix),
            reason: e.to_string(),
        })?;
        self.set(category, suffix, bytes)
    }

    /// Invalidate `(category, suffix)`. Returns whether an entry was removed.
    pub fn delete(&self, category: CacheCategory, suffix: &str) -> bool {
        match self.entries.remove(&category.key(suffix)) {
            Some((key, entry)) => {
                self.release(&key, &entry);
                true
            }
            None => false,
        }
    }

    /// Drop every entry older than the life window. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let life_window = self.config.life_window;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.inserted_at.elapsed() >= life_window)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            if let Some((key, entry)) = self
                .entries
                .remove_if(&key, |_, entry| entry.inserted_at.elapsed() >= life_window)
            {
                self.release(&key, &entry);
                removed += 1;
            }
        }
        removed
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            bytes: self.bytes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn evict_until_fits(&self, incoming: usize) {
        while self.bytes.load(Ordering::Relaxed) + incoming > self.config.max_bytes {
            // The iterator holds shard read locks; collect the key before removing.
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.inserted_at)
                .map(|entry| entry.key().clone());

            let Some(key) = oldest else {
                break;
            };
            if let Some((key, entry)) = self.entries.remove(&key) {
                self.release(&key, &entry);
            }
        }
    }

    fn release(&self, key: &str, entry: &Entry) {
        let size = key.len() + entry.value.len();
        // Saturate so concurrent evictions of the same key never wrap the counter
        let _ = self
            .bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(size))
            });
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
