//! Console session: everything a set of panels shares
//!
//! Construction runs the startup sequence in a fixed order:
//!
//! 1. build the backend client
//! 2. initialize the engine (fatal on failure)
//! 3. load preferences (falls back to defaults)
//! 4. build the option catalog
//!
//! Panels are only handed a session once all four steps are done.

use confsync_remote::{HttpRemote, OptionSource, PreferenceRemote, RemoteSync};
use std::sync::Arc;

use crate::catalog::OptionCatalog;
use crate::config::{CatalogConfig, EngineConfig};
use crate::engine::SyncEngine;
use crate::error::EngineError;
use crate::preferences::{FileCache, PreferenceCache, PreferenceStore};

/// Shared engine, preferences and option lists
#[derive(Debug)]
pub struct ConsoleSession<R = HttpRemote> {
    engine: SyncEngine<Arc<R>>,
    preferences: PreferenceStore,
    catalog: OptionCatalog,
}

impl ConsoleSession<HttpRemote> {
    /// Connect to the backend named in `config`
    ///
    /// # Errors
    /// `Client` if the base URL is unusable, `InitializationFailed` if the
    /// startup fetch fails
    pub async fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        let remote = Arc::new(HttpRemote::new(&config.remote)?);
        tracing::info!(base_url = %remote.base_url(), "connecting");
        let cache = Arc::new(FileCache::new(&config.preferences.cache_path));
        Self::assemble(remote, cache, config.catalog).await
    }
}

impl<R> ConsoleSession<R>
where
    R: RemoteSync + PreferenceRemote + OptionSource + 'static,
{
    /// Build a session over any backend implementation
    ///
    /// # Errors
    /// `InitializationFailed` if the startup fetch fails
    pub async fn assemble(
        remote: Arc<R>,
        cache: Arc<dyn PreferenceCache>,
        catalog: CatalogConfig,
    ) -> Result<Self, EngineError> {
        let engine = SyncEngine::connect(Arc::clone(&remote)).await?;
        let preferences = PreferenceStore::load(cache, remote.clone()).await;
        let catalog = OptionCatalog::new(remote, catalog);
        Ok(Self {
            engine,
            preferences,
            catalog,
        })
    }

    /// Configuration engine
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &SyncEngine<Arc<R>> {
        &self.engine
    }

    /// UI preferences
    #[inline]
    #[must_use]
    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    /// Option lists
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &OptionCatalog {
        &self.catalog
    }
}
