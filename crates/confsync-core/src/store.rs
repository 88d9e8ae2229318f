//! In-memory document store
//!
//! Holds the mirror of the backend's working configuration and the last
//! document known to be durable. The mirror only moves in two ways:
//! - [`DocumentStore::replace`] after a full fetch
//! - [`DocumentStore::apply_local`] after the backend acknowledged the same
//!   patch
//!
//! so at any point it equals the last installed document deep-merged with
//! every acknowledged patch since. Readers get clones; nothing outside the
//! store holds a mutable reference to the mirror.

use chrono::{DateTime, Utc};
use confsync_document::{ContentHash, Document};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::EngineError;

#[derive(Debug, Clone)]
struct StoreState {
    mirror: Document,
    persisted: Document,
    installed_at: DateTime<Utc>,
    patches_since_install: u64,
}

/// Summary of the store's current contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Hash of the mirror
    pub mirror_hash: ContentHash,
    /// Hash of the last persisted snapshot
    pub persisted_hash: ContentHash,
    /// When the mirror was last replaced wholesale
    pub installed_at: DateTime<Utc>,
    /// Patches merged since then
    pub patches_since_install: u64,
}

/// Owner of the in-memory configuration mirror
///
/// Starts uninitialized. Every accessor except [`replace`](Self::replace)
/// fails with [`EngineError::NotInitialized`] until a document is installed,
/// so callers never operate on an empty stand-in document.
#[derive(Debug, Default)]
pub struct DocumentStore {
    inner: RwLock<Option<StoreState>>,
}

impl DocumentStore {
    /// Create an uninitialized store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `doc`
    #[must_use]
    pub fn with_document(doc: Document) -> Self {
        let store = Self::new();
        store.replace(doc);
        store
    }

    /// Whether a document has been installed
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Clone of the current mirror
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn get(&self) -> Result<Document, EngineError> {
        self.read(Document::clone)
    }

    /// Run `f` against the mirror without cloning it
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R, EngineError> {
        let guard = self.inner.read();
        let state = guard.as_ref().ok_or(EngineError::NotInitialized)?;
        Ok(f(&state.mirror))
    }

    /// Value at a JSON pointer in the mirror
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn get_field(&self, pointer: &str) -> Result<Option<JsonValue>, EngineError> {
        self.read(|doc| doc.get(pointer).cloned())
    }

    /// Install `doc` as the mirror wholesale
    ///
    /// The first install also becomes the persisted snapshot; later installs
    /// (reload, reset) leave the snapshot alone because the backend's working
    /// copy may hold unpersisted changes.
    pub fn replace(&self, doc: Document) {
        let mut guard = self.inner.write();
        let persisted = match guard.take() {
            Some(previous) => previous.persisted,
            None => doc.clone(),
        };
        tracing::debug!(hash = %doc.content_hash().short(), fields = doc.len(), "mirror replaced");
        *guard = Some(StoreState {
            mirror: doc,
            persisted,
            installed_at: Utc::now(),
            patches_since_install: 0,
        });
    }

    /// Deep-merge an acknowledged patch into the mirror
    ///
    /// Only call after the backend accepted the same patch.
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn apply_local(&self, patch: &Document) -> Result<(), EngineError> {
        let mut guard = self.inner.write();
        let state = guard.as_mut().ok_or(EngineError::NotInitialized)?;
        state.mirror.merge_from(patch);
        state.patches_since_install += 1;
        Ok(())
    }

    /// Record `snapshot` as the last document known to be durable
    ///
    /// Pass the mirror as it was when the commit request went out; patches
    /// acknowledged while the commit was in flight stay unpersisted.
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn mark_persisted(&self, snapshot: Document) -> Result<(), EngineError> {
        let mut guard = self.inner.write();
        let state = guard.as_mut().ok_or(EngineError::NotInitialized)?;
        state.persisted = snapshot;
        Ok(())
    }

    /// Last document known to be durable
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn persisted(&self) -> Result<Document, EngineError> {
        let guard = self.inner.read();
        let state = guard.as_ref().ok_or(EngineError::NotInitialized)?;
        Ok(state.persisted.clone())
    }

    /// Whether the mirror differs from the persisted snapshot
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn has_unpersisted_changes(&self) -> Result<bool, EngineError> {
        let stats = self.stats()?;
        Ok(stats.mirror_hash != stats.persisted_hash)
    }

    /// Store statistics
    ///
    /// # Errors
    /// `NotInitialized` before the first [`replace`](Self::replace)
    pub fn stats(&self) -> Result<StoreStats, EngineError> {
        let guard = self.inner.read();
        let state = guard.as_ref().ok_or(EngineError::NotInitialized)?;
        Ok(StoreStats {
            mirror_hash: state.mirror.content_hash(),
            persisted_hash: state.persisted.content_hash(),
            installed_at: state.installed_at,
            patches_since_install: state.patches_since_install,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: JsonValue) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn uninitialized_store_fails_fast() {
        let store = DocumentStore::new();
        assert!(!store.is_initialized());
        assert!(matches!(store.get(), Err(EngineError::NotInitialized)));
        assert!(matches!(
            store.apply_local(&doc(json!({"a": 1}))),
            Err(EngineError::NotInitialized)
        ));
        assert!(matches!(
            store.mark_persisted(Document::new()),
            Err(EngineError::NotInitialized)
        ));
        assert!(matches!(store.stats(), Err(EngineError::NotInitialized)));
    }

    #[test]
    fn apply_local_merges_into_mirror() {
        let store = DocumentStore::with_document(doc(json!({
            "api": {"ProviderA": {"model": "a-1", "api_key": "k"}}
        })));

        store
            .apply_local(&doc(json!({"api": {"ProviderA": {"model": "a-2"}}})))
            .unwrap();

        assert_eq!(
            store.get().unwrap(),
            doc(json!({"api": {"ProviderA": {"model": "a-2", "api_key": "k"}}}))
        );
        assert_eq!(store.stats().unwrap().patches_since_install, 1);
    }

    #[test]
    fn get_returns_detached_clone() {
        let store = DocumentStore::with_document(doc(json!({"a": 1})));
        let mut copy = store.get().unwrap();
        copy.merge_from(&doc(json!({"a": 2})));
        assert_eq!(store.get_field("/a").unwrap(), Some(json!(1)));
    }

    #[test]
    fn replace_keeps_persisted_snapshot_after_first_install() {
        let store = DocumentStore::with_document(doc(json!({"a": 1})));
        store.replace(doc(json!({"a": 2})));

        assert_eq!(store.persisted().unwrap(), doc(json!({"a": 1})));
        assert!(store.has_unpersisted_changes().unwrap());
        assert_eq!(store.stats().unwrap().patches_since_install, 0);
    }

    #[test]
    fn mark_persisted_clears_unpersisted_changes() {
        let store = DocumentStore::with_document(doc(json!({"a": 1})));
        store.apply_local(&doc(json!({"b": 2}))).unwrap();
        assert!(store.has_unpersisted_changes().unwrap());

        store.mark_persisted(store.get().unwrap()).unwrap();
        assert!(!store.has_unpersisted_changes().unwrap());
        assert_eq!(store.persisted().unwrap(), doc(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn patch_after_snapshot_stays_unpersisted() {
        let store = DocumentStore::with_document(doc(json!({"a": 1})));
        let snapshot = store.get().unwrap();
        store.apply_local(&doc(json!({"b": 2}))).unwrap();

        store.mark_persisted(snapshot).unwrap();

        assert!(store.has_unpersisted_changes().unwrap());
        assert_eq!(store.persisted().unwrap(), doc(json!({"a": 1})));
    }
}
