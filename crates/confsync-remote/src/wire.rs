//! Request and response bodies exchanged with the backend

use confsync_document::Document;
use serde::{Deserialize, Serialize};

/// Body of `PATCH /config`
#[derive(Debug, Serialize)]
pub struct PatchRequest<'a> {
    /// Sparse document to merge into the working configuration
    pub config_data: &'a Document,
}

/// Status envelope returned by write endpoints
///
/// `POST /config` must return one. `PATCH /config` and
/// `POST /config/ui-config` may; when they do, a non-success status counts
/// as a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// `"success"` (or `"ok"`) when the operation succeeded
    pub status: String,
    /// Human-readable detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Successful envelope
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    /// Failed envelope with a message
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    /// Whether the status flag reports success
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success") || self.status.eq_ignore_ascii_case("ok")
    }

    /// Message, or the raw status when no message was sent
    #[must_use]
    pub fn describe(&self) -> String {
        self.message.clone().unwrap_or_else(|| self.status.clone())
    }
}
