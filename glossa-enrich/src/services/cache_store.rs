//! Cache store adapter
//!
//! The cache is a pure accelerator. `CacheStore` is the raw key/value contract;
//! `WordCache` layers word-record (de)serialization on top and turns every
//! cache error into a miss, so an unavailable cache only makes enrichment
//! slower, never wrong.

use async_trait::async_trait;
use glossa_common::{WordRecord, WordSource};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of fully enriched entries
pub const QUERY_KEY_PREFIX: &str = "word:query:";
/// Prefix of database-hit backfill entries
pub const PREQUERY_KEY_PREFIX: &str = "word_prequery:";
/// Longer TTLs are shortened to this; `Instant` arithmetic cannot hold arbitrary durations
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache errors; never propagated past `WordCache`
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Key/value store with per-entry TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Values in the same order as `keys`
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Remove every key starting with `prefix`; returns the number removed
    async fn del_pattern(&self, prefix: &str) -> Result<usize, CacheError>;
}

/// Cache key for a fully enriched word: `word:query:<sha256(word)>`
pub fn query_key(word: &str) -> String {
    let hash = Sha256::digest(word.as_bytes());
    format!("{}{:x}", QUERY_KEY_PREFIX, hash)
}

/// Cache key for a database-hit backfill: `word_prequery:<word>`
pub fn prequery_key(word: &str) -> String {
    format!("{}{}", PREQUERY_KEY_PREFIX, word)
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process LRU cache with per-entry expiry
pub struct MemoryCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    /// `capacity` of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, CacheEntry>>, CacheError> {
        self.inner
            .lock()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))
    }

    fn get_live(cache: &mut LruCache<String, CacheEntry>, key: &str) -> Option<String> {
        let expired = match cache.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(key);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut cache = self.lock()?;
        Ok(Self::get_live(&mut cache, key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.min(MAX_TTL))
            .ok_or_else(|| CacheError::Unavailable(format!("TTL {:?} out of range", ttl)))?;
        let mut cache = self.lock()?;
        cache.put(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let mut cache = self.lock()?;
        Ok(keys.iter().map(|key| Self::get_live(&mut cache, key)).collect())
    }

    async fn del_pattern(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut cache = self.lock()?;
        let doomed: Vec<String> = cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            cache.pop(key);
        }
        Ok(doomed.len())
    }
}

/// Word-record view of a `CacheStore` that absorbs all cache failures
#[derive(Clone)]
pub struct WordCache {
    store: Arc<dyn CacheStore>,
    prequery_ttl: Duration,
    translation_ttl: Duration,
}

impl WordCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        prequery_ttl: Duration,
        translation_ttl: Duration,
    ) -> Self {
        Self {
            store,
            prequery_ttl,
            translation_ttl,
        }
    }

    /// Look up words; hits come back relabeled with `WordSource::Cache`.
    ///
    /// Any cache error is logged and treated as "everything missed".
    pub async fn lookup(&self, words: &[String]) -> HashMap<String, WordRecord> {
        if words.is_empty() {
            return HashMap::new();
        }

        let keys: Vec<String> = words
            .iter()
            .map(|w| query_key(w))
            .chain(words.iter().map(|w| prequery_key(w)))
            .collect();

        let values = match self.store.mget(&keys).await {
            Ok(values) if values.len() == keys.len() => values,
            Ok(values) => {
                warn!(
                    expected = keys.len(),
                    got = values.len(),
                    "Cache mget returned wrong arity, treating as miss"
                );
                return HashMap::new();
            }
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, treating as miss");
                return HashMap::new();
            }
        };

        let (query_values, prequery_values) = values.split_at(words.len());
        let mut hits = HashMap::new();

        for (i, word) in words.iter().enumerate() {
            let raw = query_values[i].as_ref().or(prequery_values[i].as_ref());
            let Some(raw) = raw else { continue };

            match serde_json::from_str::<WordRecord>(raw) {
                Ok(record) if record.word == *word => {
                    hits.insert(word.clone(), record.served_from(WordSource::Cache));
                }
                Ok(record) => {
                    warn!(
                        word = %word,
                        cached = %record.word,
                        "Cache entry keyed to a different word, ignoring"
                    );
                }
                Err(e) => {
                    warn!(word = %word, error = %e, "Corrupt cache entry, ignoring");
                }
            }
        }

        debug!(requested = words.len(), hits = hits.len(), "Cache lookup");
        hits
    }

    /// Store freshly enriched records under the long-lived query key
    pub async fn store_enriched(&self, records: &[WordRecord]) {
        for record in records {
            self.put(query_key(&record.word), record, self.translation_ttl).await;
        }
    }

    /// Backfill records found in the persistent store under the short-lived key
    pub async fn store_prequery(&self, records: &[WordRecord]) {
        for record in records {
            self.put(prequery_key(&record.word), record, self.prequery_ttl).await;
        }
    }

    async fn put(&self, key: String, record: &WordRecord, ttl: Duration) {
        let value = match serde_json::to_string(record) {
            Ok(value) => value,
            Err(e) => {
                warn!(word = %record.word, error = %e, "Failed to serialize record for cache");
                return;
            }
        };
        if let Err(e) = self.store.set(&key, value, ttl).await {
            warn!(word = %record.word, error = %e, "Cache write failed (ignored)");
        }
    }

    /// Drop every word entry; returns the number of keys removed
    pub async fn invalidate_all(&self) -> usize {
        let mut removed = 0;
        for prefix in [QUERY_KEY_PREFIX, PREQUERY_KEY_PREFIX] {
            match self.store.del_pattern(prefix).await {
                Ok(count) => removed += count,
                Err(e) => warn!(prefix, error = %e, "Cache invalidation failed"),
            }
        }
        removed
    }
}
