//! Cached option lists for panel controls
//!
//! Platforms and templates are static backend data, not part of the
//! configuration document, so they are cached with a TTL instead of being
//! mirrored.

use confsync_remote::{OptionSource, SyncError};
use moka::future::Cache;
use std::sync::Arc;

use crate::config::CatalogConfig;

/// Cache key for one option list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionKey {
    /// Publishing platforms
    Platforms,
    /// Template categories
    Categories,
    /// Templates in one category
    Templates(String),
}

/// Option lists backed by an [`OptionSource`]
///
/// Failed fetches are not cached.
#[derive(Clone)]
pub struct OptionCatalog {
    source: Arc<dyn OptionSource>,
    cache: Cache<OptionKey, Arc<Vec<String>>>,
}

impl std::fmt::Debug for OptionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionCatalog")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl OptionCatalog {
    /// Create catalog over `source`
    #[must_use]
    pub fn new(source: Arc<dyn OptionSource>, config: CatalogConfig) -> Self {
        Self {
            source,
            cache: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.ttl())
                .build(),
        }
    }

    /// Available publishing platforms
    ///
    /// # Errors
    /// Returns error if the list isn't cached and the fetch fails
    pub async fn platforms(&self) -> Result<Arc<Vec<String>>, SyncError> {
        self.get_or_fetch(OptionKey::Platforms).await
    }

    /// Template categories
    ///
    /// # Errors
    /// Returns error if the list isn't cached and the fetch fails
    pub async fn template_categories(&self) -> Result<Arc<Vec<String>>, SyncError> {
        self.get_or_fetch(OptionKey::Categories).await
    }

    /// Template names in `category`
    ///
    /// # Errors
    /// Returns error if the list isn't cached and the fetch fails
    pub async fn templates(&self, category: &str) -> Result<Arc<Vec<String>>, SyncError> {
        self.get_or_fetch(OptionKey::Templates(category.to_string()))
            .await
    }

    async fn get_or_fetch(&self, key: OptionKey) -> Result<Arc<Vec<String>>, SyncError> {
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let list = match &key {
            OptionKey::Platforms => self.source.platforms().await?,
            OptionKey::Categories => self.source.template_categories().await?,
            OptionKey::Templates(category) => self.source.templates(category).await?,
        };
        tracing::debug!(?key, count = list.len(), "option list fetched");

        let list = Arc::new(list);
        self.cache.insert(key, Arc::clone(&list)).await;
        Ok(list)
    }

    /// Drop every cached list
    #[inline]
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of cached lists
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
