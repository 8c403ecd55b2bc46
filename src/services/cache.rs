//! Short-lived memoisation of author search results.
//!
//! Only the read-only search path consults this cache. Every operation
//! that creates or modifies an author calls [`SearchCache::invalidate`].

use std::sync::Arc;

use moka::future::Cache;

use crate::{config::SearchCacheConfig, models::AuthorSearchHit};

#[derive(Clone)]
pub struct SearchCache {
    inner: Option<Cache<String, Arc<Vec<AuthorSearchHit>>>>,
}

impl SearchCache {
    pub fn new(config: &SearchCacheConfig) -> Self {
        let inner = config.enabled.then(|| {
            Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl())
                .build()
        });
        Self { inner }
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Normalised key: case and surrounding whitespace do not matter
    pub fn key(query: &str, limit: i64) -> String {
        format!("{}\u{1f}{}", query.trim().to_lowercase(), limit)
    }

    pub async fn get(&self, query: &str, limit: i64) -> Option<Arc<Vec<AuthorSearchHit>>> {
        let cache = self.inner.as_ref()?;
        cache.get(&Self::key(query, limit)).await
    }

    pub async fn insert(&self, query: &str, limit: i64, hits: Arc<Vec<AuthorSearchHit>>) {
        if let Some(ref cache) = self.inner {
            cache.insert(Self::key(query, limit), hits).await;
        }
    }

    pub fn invalidate(&self) {
        if let Some(ref cache) = self.inner {
            cache.invalidate_all();
            tracing::debug!("Author search cache invalidated");
        }
    }
}
