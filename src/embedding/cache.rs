//! Memo of `semantic_search` query vectors.
//!
//! Only query embeddings pass through here; indexing batches go straight to
//! the provider since every chunk is embedded once per indexing run.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use serde::Serialize;

use super::config::ProviderKind;

/// Provider plus a digest of the normalized query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct QueryKey {
    provider: ProviderKind,
    digest: [u8; 32],
}

impl QueryKey {
    fn new(provider: ProviderKind, query: &str) -> Self {
        Self {
            provider,
            digest: *blake3::hash(normalize_query(query).as_bytes()).as_bytes(),
        }
    }
}

/// Case and whitespace do not change what a natural-language query asks for.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

pub struct EmbeddingCache {
    entries: Mutex<LruCache<QueryKey, Arc<[f32]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Counts a hit or a miss.
    pub fn lookup(&self, provider: ProviderKind, query: &str) -> Option<Arc<[f32]>> {
        let key = QueryKey::new(provider, query);
        let found = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn store(&self, provider: ProviderKind, query: &str, vector: Arc<[f32]>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(QueryKey::new(provider, query), vector);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}
