//! Synchronization engine
//!
//! Ties the backend client, the document store and the dirty tracker
//! together under the confirmed-update protocol:
//!
//! 1. `apply_patch` remotely
//! 2. on success, merge the same patch into the mirror
//! 3. mark the originating panel dirty
//!
//! and for saves: `commit` remotely, then clear the saving panel. A failure
//! at any step leaves the mirror and the dirty set exactly as they were.

use confsync_document::Document;
use confsync_remote::RemoteSync;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dirty::{DirtyChange, DirtyTracker};
use crate::error::EngineError;
use crate::store::DocumentStore;
use crate::types::PanelId;

/// Configuration synchronization engine
///
/// Owns the only [`DocumentStore`] and [`DirtyTracker`]; share it behind an
/// `Arc` between panels. Concurrent updates from different panels are not
/// serialized: disjoint keys merge, same-key races resolve in the order the
/// backend acknowledged them.
#[derive(Debug)]
pub struct SyncEngine<R> {
    remote: R,
    store: DocumentStore,
    dirty: DirtyTracker,
}

impl<R: RemoteSync> SyncEngine<R> {
    /// Create an engine with an uninitialized store
    #[must_use]
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            store: DocumentStore::new(),
            dirty: DirtyTracker::new(),
        }
    }

    /// Create and initialize in one step
    ///
    /// # Errors
    /// `InitializationFailed` if the startup fetch fails
    pub async fn connect(remote: R) -> Result<Self, EngineError> {
        let engine = Self::new(remote);
        engine.initialize().await?;
        Ok(engine)
    }

    /// Fetch the full document and install it
    ///
    /// On failure nothing is installed and the engine stays uninitialized;
    /// there is no fallback to defaults.
    ///
    /// # Errors
    /// `InitializationFailed` wrapping the backend error
    #[tracing::instrument(skip_all, fields(op_id = %Uuid::new_v4()))]
    pub async fn initialize(&self) -> Result<(), EngineError> {
        match self.remote.fetch_full().await {
            Ok(doc) => {
                tracing::info!(fields = doc.len(), "configuration loaded");
                self.store.replace(doc);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "initial configuration fetch failed");
                Err(EngineError::InitializationFailed(e))
            }
        }
    }

    /// Whether a document has been installed
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    /// Snapshot of the current document
    ///
    /// # Errors
    /// `NotInitialized` before a successful [`initialize`](Self::initialize)
    pub fn document(&self) -> Result<Document, EngineError> {
        self.store.get()
    }

    /// Value at a JSON pointer in the current document
    ///
    /// # Errors
    /// `NotInitialized` before a successful [`initialize`](Self::initialize)
    pub fn get(&self, pointer: &str) -> Result<Option<JsonValue>, EngineError> {
        self.store.get_field(pointer)
    }

    /// Apply a partial update on behalf of `panel`
    ///
    /// An empty patch succeeds without a round trip and leaves the panel's
    /// state alone.
    ///
    /// # Errors
    /// `NotInitialized`, or the backend error; on error neither the mirror
    /// nor the dirty set changed
    #[tracing::instrument(skip_all, fields(panel = %panel, op_id = %Uuid::new_v4()))]
    pub async fn apply_update(&self, panel: &PanelId, patch: &Document) -> Result<(), EngineError> {
        if !self.store.is_initialized() {
            return Err(EngineError::NotInitialized);
        }
        if patch.is_empty() {
            tracing::debug!("empty update ignored");
            return Ok(());
        }

        if let Err(e) = self.remote.apply_patch(patch).await {
            tracing::warn!(error = %e, "update rejected; mirror unchanged");
            return Err(e.into());
        }
        self.store.apply_local(patch)?;
        self.dirty.mark_applied(panel);
        tracing::info!(fields = patch.len(), "update applied");
        Ok(())
    }

    /// Set one field, addressed by JSON pointer, on behalf of `panel`
    ///
    /// # Errors
    /// `Document` for a bad pointer, otherwise as
    /// [`apply_update`](Self::apply_update)
    pub async fn set_field(
        &self,
        panel: &PanelId,
        pointer: &str,
        value: JsonValue,
    ) -> Result<(), EngineError> {
        let patch = Document::patch_at(pointer, value)?;
        self.apply_update(panel, &patch).await
    }

    /// Persist the backend's working configuration on behalf of `panel`
    ///
    /// Clears only `panel`'s dirty flag. On failure nothing is rolled back.
    /// The persisted snapshot is the mirror as of the request, so updates
    /// acknowledged while the commit is in flight still count as unpersisted.
    ///
    /// # Errors
    /// `NotInitialized`, or the backend error
    #[tracing::instrument(skip_all, fields(panel = %panel, op_id = %Uuid::new_v4()))]
    pub async fn save(&self, panel: &PanelId) -> Result<(), EngineError> {
        let snapshot = self.store.get()?;

        if let Err(e) = self.remote.commit().await {
            tracing::warn!(error = %e, "save failed; panel stays dirty");
            return Err(e.into());
        }
        self.store.mark_persisted(snapshot)?;
        self.dirty.mark_committed(panel);
        tracing::info!("configuration saved");
        Ok(())
    }

    /// Whether `panel` has applied changes it hasn't saved
    #[inline]
    #[must_use]
    pub fn is_dirty(&self, panel: &PanelId) -> bool {
        self.dirty.is_dirty(panel)
    }

    /// All panels with unsaved changes
    #[inline]
    #[must_use]
    pub fn dirty_panels(&self) -> Vec<PanelId> {
        self.dirty.dirty_panels()
    }

    /// Subscribe to panel dirty-state changes
    #[inline]
    #[must_use]
    pub fn subscribe_dirty(&self) -> broadcast::Receiver<DirtyChange> {
        self.dirty.subscribe()
    }

    /// Re-fetch the full document and install it
    ///
    /// Dirty flags are kept: they track what each panel still has to save,
    /// which a reload doesn't change.
    ///
    /// # Errors
    /// `NotInitialized`, or the backend error (mirror unchanged)
    #[tracing::instrument(skip_all, fields(op_id = %Uuid::new_v4()))]
    pub async fn reload(&self) -> Result<(), EngineError> {
        if !self.store.is_initialized() {
            return Err(EngineError::NotInitialized);
        }
        let doc = self.remote.fetch_full().await?;
        tracing::info!(fields = doc.len(), "configuration reloaded");
        self.store.replace(doc);
        Ok(())
    }

    /// Fetch the backend's default document without touching the mirror
    ///
    /// # Errors
    /// Backend error
    pub async fn fetch_defaults(&self) -> Result<Document, EngineError> {
        Ok(self.remote.fetch_default().await?)
    }

    /// Reset the working configuration to the backend defaults on behalf of
    /// `panel`
    ///
    /// The defaults are applied like any other update (so `panel` becomes
    /// dirty until it saves), then the full document is re-fetched so the
    /// mirror matches what the backend produced.
    ///
    /// Returns the installed document.
    ///
    /// # Errors
    /// `NotInitialized`, or the first backend error
    #[tracing::instrument(skip_all, fields(panel = %panel, op_id = %Uuid::new_v4()))]
    pub async fn reset_to_defaults(&self, panel: &PanelId) -> Result<Document, EngineError> {
        if !self.store.is_initialized() {
            return Err(EngineError::NotInitialized);
        }

        let defaults = self.fetch_defaults().await?;
        self.apply_update(panel, &defaults).await?;
        let doc = self.remote.fetch_full().await?;
        self.store.replace(doc.clone());
        tracing::info!("configuration reset to defaults");
        Ok(doc)
    }

    /// Document store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Dirty tracker
    #[inline]
    #[must_use]
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Backend client
    #[inline]
    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use confsync_remote::{Operation, SyncError};
    use mockall::{mock, Sequence};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    mock! {
        Remote {}

        #[async_trait]
        impl RemoteSync for Remote {
            async fn fetch_full(&self) -> Result<Document, SyncError>;
            async fn fetch_default(&self) -> Result<Document, SyncError>;
            async fn apply_patch(&self, patch: &Document) -> Result<(), SyncError>;
            async fn commit(&self) -> Result<(), SyncError>;
        }
    }

    fn doc(value: JsonValue) -> Document {
        Document::try_from(value).unwrap()
    }

    async fn initialized(mut remote: MockRemote, initial: JsonValue) -> SyncEngine<MockRemote> {
        let initial = doc(initial);
        remote
            .expect_fetch_full()
            .times(1)
            .return_once(move || Ok(initial));
        let engine = SyncEngine::new(remote);
        engine.initialize().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn initialize_failure_installs_nothing() {
        let mut remote = MockRemote::new();
        remote
            .expect_fetch_full()
            .times(1)
            .returning(|| Err(SyncError::network(Operation::FetchFull, "refused")));
        remote.expect_apply_patch().never();
        remote.expect_commit().never();

        let engine = SyncEngine::new(remote);
        let err = engine.initialize().await.unwrap_err();

        assert!(matches!(err, EngineError::InitializationFailed(_)));
        assert!(!engine.is_initialized());
        assert!(matches!(engine.document(), Err(EngineError::NotInitialized)));
        let panel = PanelId::new("platforms");
        assert!(matches!(
            engine.apply_update(&panel, &doc(json!({"a": 1}))).await,
            Err(EngineError::NotInitialized)
        ));
        assert!(matches!(engine.save(&panel).await, Err(EngineError::NotInitialized)));
    }

    #[tokio::test]
    async fn remote_apply_precedes_local_merge() {
        let mut remote = MockRemote::new();
        remote
            .expect_apply_patch()
            .withf(|patch| patch.get("/wechat/enabled") == Some(&json!(true)))
            .times(1)
            .returning(|_| Ok(()));
        let engine = initialized(remote, json!({"wechat": {"enabled": false, "app_id": "x"}})).await;
        let panel = PanelId::new("wechat");

        engine
            .set_field(&panel, "/wechat/enabled", json!(true))
            .await
            .unwrap();

        assert_eq!(
            engine.document().unwrap(),
            doc(json!({"wechat": {"enabled": true, "app_id": "x"}}))
        );
        assert!(engine.is_dirty(&panel));
    }

    #[tokio::test]
    async fn rejected_apply_leaves_state_untouched() {
        let mut remote = MockRemote::new();
        remote.expect_apply_patch().times(1).returning(|_| {
            Err(SyncError::rejected(Operation::ApplyPatch, Some(422), "bad field"))
        });
        let engine = initialized(remote, json!({"a": 1})).await;
        let panel = PanelId::new("api");

        let err = engine
            .apply_update(&panel, &doc(json!({"a": 2})))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Sync(SyncError::RejectedByServer { .. })));
        assert_eq!(engine.get("/a").unwrap(), Some(json!(1)));
        assert!(!engine.is_dirty(&panel));
    }

    #[tokio::test]
    async fn empty_update_skips_round_trip() {
        let mut remote = MockRemote::new();
        remote.expect_apply_patch().never();
        let engine = initialized(remote, json!({"a": 1})).await;
        let panel = PanelId::new("api");

        engine.apply_update(&panel, &Document::new()).await.unwrap();

        assert!(!engine.is_dirty(&panel));
    }

    #[tokio::test]
    async fn failed_save_keeps_panel_dirty() {
        let mut remote = MockRemote::new();
        remote.expect_apply_patch().returning(|_| Ok(()));
        remote
            .expect_commit()
            .times(1)
            .returning(|| Err(SyncError::persist(Some(500), "disk full")));
        let engine = initialized(remote, json!({"a": 1})).await;
        let panel = PanelId::new("api");

        engine.apply_update(&panel, &doc(json!({"a": 2}))).await.unwrap();
        let err = engine.save(&panel).await.unwrap_err();

        assert!(matches!(err, EngineError::Sync(SyncError::PersistFailure { .. })));
        assert!(engine.is_dirty(&panel));
        assert_eq!(engine.get("/a").unwrap(), Some(json!(2)));
        assert!(engine.store().has_unpersisted_changes().unwrap());
    }

    #[tokio::test]
    async fn successful_save_updates_persisted_snapshot() {
        let mut remote = MockRemote::new();
        remote.expect_apply_patch().returning(|_| Ok(()));
        remote.expect_commit().times(1).returning(|| Ok(()));
        let engine = initialized(remote, json!({"a": 1})).await;
        let panel = PanelId::new("api");

        engine.apply_update(&panel, &doc(json!({"b": 2}))).await.unwrap();
        engine.save(&panel).await.unwrap();

        assert!(!engine.is_dirty(&panel));
        assert!(!engine.store().has_unpersisted_changes().unwrap());
        assert_eq!(engine.store().persisted().unwrap(), doc(json!({"a": 1, "b": 2})));
    }

    #[tokio::test]
    async fn reset_applies_defaults_then_refetches() {
        let mut remote = MockRemote::new();
        let mut seq = Sequence::new();
        remote
            .expect_fetch_full()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|| Ok(doc(json!({"theme": "custom", "extra": 1}))));
        remote
            .expect_fetch_default()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|| Ok(doc(json!({"theme": "default"}))));
        remote
            .expect_apply_patch()
            .withf(|patch| *patch == doc(json!({"theme": "default"})))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        remote
            .expect_fetch_full()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|| Ok(doc(json!({"theme": "default"}))));

        let engine = SyncEngine::connect(remote).await.unwrap();
        let panel = PanelId::new("settings");
        let installed = engine.reset_to_defaults(&panel).await.unwrap();

        assert_eq!(installed, doc(json!({"theme": "default"})));
        assert_eq!(engine.document().unwrap(), installed);
        assert!(engine.is_dirty(&panel));
    }

    #[tokio::test]
    async fn failed_reload_keeps_mirror_and_flags() {
        let mut remote = MockRemote::new();
        let mut seq = Sequence::new();
        remote
            .expect_fetch_full()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|| Ok(doc(json!({"a": 1}))));
        remote.expect_apply_patch().returning(|_| Ok(()));
        remote
            .expect_fetch_full()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|| Err(SyncError::network(Operation::FetchFull, "timeout")));

        let engine = SyncEngine::connect(remote).await.unwrap();
        let panel = PanelId::new("api");
        engine.apply_update(&panel, &doc(json!({"b": 2}))).await.unwrap();

        assert!(engine.reload().await.is_err());
        assert_eq!(engine.document().unwrap(), doc(json!({"a": 1, "b": 2})));
        assert!(engine.is_dirty(&panel));
    }
}
