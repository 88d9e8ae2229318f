//! Error types for the synchronization engine
//!
//! Panels never see these directly; they get an [`Outcome`] (success flag
//! plus message) built from whatever the engine returned.

use confsync_document::DocumentError;
use confsync_remote::{ClientError, SyncError};
use serde::Serialize;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Operation attempted before a document was installed
    #[error("configuration not loaded: the engine has not been initialized")]
    NotInitialized,

    /// Startup fetch failed; no document was installed
    #[error("initialization failed: {0}")]
    InitializationFailed(#[source] SyncError),

    /// Backend round trip failed
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Update could not be turned into a document
    #[error("invalid update: {0}")]
    Document(#[from] DocumentError),

    /// HTTP client could not be constructed
    #[error("client setup failed: {0}")]
    Client(#[from] ClientError),
}

impl EngineError {
    /// Underlying backend error, if any
    #[inline]
    #[must_use]
    pub fn sync_error(&self) -> Option<&SyncError> {
        match self {
            Self::Sync(e) | Self::InitializationFailed(e) => Some(e),
            _ => None,
        }
    }

    /// Check if error is retryable by the caller
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.sync_error().is_some_and(SyncError::is_retryable)
    }
}

/// Result of a panel-initiated operation, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable message
    pub message: String,
}

impl Outcome {
    /// Successful outcome
    #[inline]
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed outcome
    #[inline]
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Build from an engine result
    pub fn from_result<T>(result: &Result<T, EngineError>, success_message: impl Into<String>) -> Self {
        match result {
            Ok(_) => Self::ok(success_message),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}
