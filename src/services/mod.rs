//! Business logic services

pub mod authors;
pub mod cache;
pub mod publications;

use std::sync::Arc;

use crate::{config::SearchCacheConfig, repository::AuthorStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub authors: authors::AuthorService,
    pub publications: publications::PublicationsService,
    store: Arc<dyn AuthorStore>,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(store: Arc<dyn AuthorStore>, cache_config: &SearchCacheConfig) -> Self {
        let cache = cache::SearchCache::new(cache_config);
        let authors = authors::AuthorService::new(store.clone(), cache);
        Self {
            publications: publications::PublicationsService::new(store.clone(), authors.clone()),
            authors,
            store,
        }
    }

    /// Store connectivity check used by the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.store.ping().await
    }
}
