//! Backend client traits
//!
//! The engine talks to the backend only through these traits, so tests and
//! embedders can swap the HTTP client for any other transport.

use async_trait::async_trait;
use confsync_document::Document;
use std::sync::Arc;

use crate::error::SyncError;

/// Main configuration document operations
///
/// Implementations hold no document state and perform no merging. Each call
/// is independent; nothing is retried automatically and no timeout is added
/// beyond what the transport itself applies.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Retrieve the authoritative current document
    async fn fetch_full(&self) -> Result<Document, SyncError>;

    /// Retrieve the default document used by reset flows
    async fn fetch_default(&self) -> Result<Document, SyncError>;

    /// Ask the backend to merge `patch` into its working (unpersisted)
    /// configuration
    async fn apply_patch(&self, patch: &Document) -> Result<(), SyncError>;

    /// Ask the backend to persist its working configuration
    async fn commit(&self) -> Result<(), SyncError>;
}

/// UI preference write-through
#[async_trait]
pub trait PreferenceRemote: Send + Sync {
    /// Read the backend's copy of the preference document
    async fn fetch_preferences(&self) -> Result<Document, SyncError>;

    /// Overwrite the backend's copy with the full preference document
    async fn store_preferences(&self, preferences: &Document) -> Result<(), SyncError>;
}

/// Read-only option lists used to populate panel controls
#[async_trait]
pub trait OptionSource: Send + Sync {
    /// Available publishing platforms
    async fn platforms(&self) -> Result<Vec<String>, SyncError>;

    /// Template categories
    async fn template_categories(&self) -> Result<Vec<String>, SyncError>;

    /// Template names within one category
    async fn templates(&self, category: &str) -> Result<Vec<String>, SyncError>;
}

#[async_trait]
impl<T: RemoteSync + ?Sized> RemoteSync for Arc<T> {
    async fn fetch_full(&self) -> Result<Document, SyncError> {
        (**self).fetch_full().await
    }

    async fn fetch_default(&self) -> Result<Document, SyncError> {
        (**self).fetch_default().await
    }

    async fn apply_patch(&self, patch: &Document) -> Result<(), SyncError> {
        (**self).apply_patch(patch).await
    }

    async fn commit(&self) -> Result<(), SyncError> {
        (**self).commit().await
    }
}

#[async_trait]
impl<T: PreferenceRemote + ?Sized> PreferenceRemote for Arc<T> {
    async fn fetch_preferences(&self) -> Result<Document, SyncError> {
        (**self).fetch_preferences().await
    }

    async fn store_preferences(&self, preferences: &Document) -> Result<(), SyncError> {
        (**self).store_preferences(preferences).await
    }
}

#[async_trait]
impl<T: OptionSource + ?Sized> OptionSource for Arc<T> {
    async fn platforms(&self) -> Result<Vec<String>, SyncError> {
        (**self).platforms().await
    }

    async fn template_categories(&self) -> Result<Vec<String>, SyncError> {
        (**self).template_categories().await
    }

    async fn templates(&self, category: &str) -> Result<Vec<String>, SyncError> {
        (**self).templates(category).await
    }
}
