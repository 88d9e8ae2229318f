//! Local UI preference document
//!
//! Two fields, theme and window mode, kept redundantly in a local cache and
//! on the backend. Loading never fails: a missing or unreadable cache falls
//! back to the defaults. Every change is merged, written to the cache, then
//! written through to the backend; a backend failure is reported but rolls
//! nothing back.

use async_trait::async_trait;
use confsync_document::{merge, Document, DocumentError};
use confsync_remote::{PreferenceRemote, SyncError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};

/// Default theme identifier
pub const DEFAULT_THEME: &str = "light";

/// Default window-size mode identifier
pub const DEFAULT_WINDOW_MODE: &str = "STANDARD";

/// Typed view of the preference document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Visual theme identifier
    pub theme: String,
    /// Window-size mode identifier
    pub window_mode: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            window_mode: DEFAULT_WINDOW_MODE.to_string(),
        }
    }
}

impl Preferences {
    /// Default preferences as a document
    #[must_use]
    pub fn default_document() -> Document {
        let mut map = serde_json::Map::new();
        map.insert("theme".to_string(), DEFAULT_THEME.into());
        map.insert("windowMode".to_string(), DEFAULT_WINDOW_MODE.into());
        Document::from_map(map)
    }
}

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Read or write failed
    #[error("cache I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Cached data isn't a preference document
    #[error("corrupt cache entry: {0}")]
    Corrupt(#[from] DocumentError),
}

/// Preference engine errors
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    /// Change would produce a document that isn't valid preferences
    #[error("invalid preference change: {0}")]
    Invalid(#[from] DocumentError),
}

/// Local storage for the preference document
#[async_trait]
pub trait PreferenceCache: Send + Sync {
    /// Load the cached document, `None` when nothing was cached
    async fn load(&self) -> Result<Option<Document>, CacheError>;

    /// Overwrite the cached document
    async fn store(&self, preferences: &Document) -> Result<(), CacheError>;
}

/// JSON file cache (tokio::fs)
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Cache at `path`; parent directories are created on first write
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PreferenceCache for FileCache {
    async fn load(&self) -> Result<Option<Document>, CacheError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(Document::from_json(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, preferences: &Document) -> Result<(), CacheError> {
        let text = preferences.to_json_pretty()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replacing(&path, text.as_bytes()))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }
}

/// Write `bytes` to a fresh temp file beside `path`, then rename it over
/// `path`; concurrent writers never share a temp file
fn write_replacing(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// In-process cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    slot: Mutex<Option<Document>>,
}

impl MemoryCache {
    /// Empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-filled with `doc`
    #[must_use]
    pub fn with_document(doc: Document) -> Self {
        Self {
            slot: Mutex::new(Some(doc)),
        }
    }

    /// Current cached document
    #[must_use]
    pub fn snapshot(&self) -> Option<Document> {
        self.slot.lock().clone()
    }
}

#[async_trait]
impl PreferenceCache for MemoryCache {
    async fn load(&self) -> Result<Option<Document>, CacheError> {
        Ok(self.slot.lock().clone())
    }

    async fn store(&self, preferences: &Document) -> Result<(), CacheError> {
        *self.slot.lock() = Some(preferences.clone());
        Ok(())
    }
}

/// Result of one preference change
///
/// The change is applied in memory regardless; the two results say which
/// copies were written.
#[derive(Debug)]
pub struct WriteThrough {
    /// Preferences after the change
    pub preferences: Preferences,
    /// Local cache write
    pub cache: Result<(), CacheError>,
    /// Backend write-through
    pub remote: Result<(), SyncError>,
}

impl WriteThrough {
    /// Whether both copies were written
    #[inline]
    #[must_use]
    pub fn is_fully_synced(&self) -> bool {
        self.cache.is_ok() && self.remote.is_ok()
    }
}

/// Owner of the preference document
pub struct PreferenceStore {
    current: RwLock<Document>,
    // Held from merge through both writes so copies land in update order
    write_order: AsyncMutex<()>,
    cache: Arc<dyn PreferenceCache>,
    remote: Arc<dyn PreferenceRemote>,
    updates: watch::Sender<Preferences>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}

impl PreferenceStore {
    /// Load preferences: cached document merged over the defaults, or the
    /// defaults alone when the cache is empty or unusable
    pub async fn load(cache: Arc<dyn PreferenceCache>, remote: Arc<dyn PreferenceRemote>) -> Self {
        let defaults = Preferences::default_document();
        let current = match cache.load().await {
            Ok(Some(cached)) => {
                let merged = merge(&defaults, &cached);
                if merged.to_typed::<Preferences>().is_ok() {
                    merged
                } else {
                    tracing::warn!("cached preferences have wrong field types; using defaults");
                    defaults
                }
            }
            Ok(None) => defaults,
            Err(e) => {
                tracing::warn!(error = %e, "preference cache unreadable; using defaults");
                defaults
            }
        };

        let typed = current.to_typed::<Preferences>().unwrap_or_default();
        tracing::info!(theme = %typed.theme, window_mode = %typed.window_mode, "preferences loaded");
        let (updates, _) = watch::channel(typed);
        Self {
            current: RwLock::new(current),
            write_order: AsyncMutex::new(()),
            cache,
            remote,
            updates,
        }
    }

    /// Current preferences
    #[must_use]
    pub fn get(&self) -> Preferences {
        self.updates.borrow().clone()
    }

    /// Current preference document, including any extra cached fields
    #[must_use]
    pub fn document(&self) -> Document {
        self.current.read().clone()
    }

    /// Merge `change` into the preferences, cache the result, then write it
    /// through to the backend
    ///
    /// Overlapping updates are applied one at a time, so the cache and the
    /// backend always end on the same value as memory.
    ///
    /// # Errors
    /// Returns error only if the merged document isn't valid preferences;
    /// cache and backend failures are reported in [`WriteThrough`]
    pub async fn update(&self, change: &Document) -> Result<WriteThrough, PreferenceError> {
        let _ordered = self.write_order.lock().await;
        let (merged, typed) = {
            let mut current = self.current.write();
            let merged = merge(&current, change);
            let typed = merged.to_typed::<Preferences>()?;
            *current = merged.clone();
            (merged, typed)
        };
        self.updates.send_replace(typed.clone());

        let cache = self.cache.store(&merged).await;
        if let Err(e) = &cache {
            tracing::warn!(error = %e, "preference cache write failed");
        }

        let remote = self.remote.store_preferences(&merged).await;
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "preference write-through failed; keeping local value");
        }

        Ok(WriteThrough {
            preferences: typed,
            cache,
            remote,
        })
    }

    /// Change the theme
    ///
    /// # Errors
    /// See [`update`](Self::update)
    pub async fn set_theme(&self, theme: impl Into<String>) -> Result<WriteThrough, PreferenceError> {
        let change = Document::patch_at("/theme", serde_json::Value::String(theme.into()))?;
        self.update(&change).await
    }

    /// Change the window-size mode
    ///
    /// # Errors
    /// See [`update`](Self::update)
    pub async fn set_window_mode(
        &self,
        mode: impl Into<String>,
    ) -> Result<WriteThrough, PreferenceError> {
        let change = Document::patch_at("/windowMode", serde_json::Value::String(mode.into()))?;
        self.update(&change).await
    }

    /// Receive every future preference value (for theme and window appliers)
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.updates.subscribe()
    }
}
