//! Error types for backend synchronization
//!
//! Every failure a backend round trip can produce falls into one of three
//! kinds:
//! - the request never got an answer ([`SyncError::NetworkFailure`])
//! - the server answered with a non-success status or an unexpected body
//!   ([`SyncError::RejectedByServer`])
//! - the server could not persist its working configuration
//!   ([`SyncError::PersistFailure`], commit only)

use std::fmt;

/// Backend operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET /config`
    FetchFull,
    /// `GET /config/default`
    FetchDefault,
    /// `PATCH /config`
    ApplyPatch,
    /// `POST /config`
    Commit,
    /// `GET /config/ui-config`
    FetchPreferences,
    /// `POST /config/ui-config`
    StorePreferences,
    /// Auxiliary option-list reads
    FetchOptions,
}

impl Operation {
    /// Stable name used in logs and messages
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchFull => "fetch_full",
            Self::FetchDefault => "fetch_default",
            Self::ApplyPatch => "apply_patch",
            Self::Commit => "commit",
            Self::FetchPreferences => "fetch_preferences",
            Self::StorePreferences => "store_preferences",
            Self::FetchOptions => "fetch_options",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response
    Network,
    /// Non-success status or malformed response
    Rejected,
    /// Commit could not be made durable
    Persist,
}

/// Backend synchronization error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Request could not be sent or no response was received
    #[error("{op}: network failure: {message}")]
    NetworkFailure {
        /// Failed operation
        op: Operation,
        /// Transport error text
        message: String,
    },

    /// Well-formed request answered with a non-success status or an
    /// unexpected response shape
    #[error("{op}: rejected by server{}: {message}", status_suffix(.status))]
    RejectedByServer {
        /// Failed operation
        op: Operation,
        /// HTTP status, absent for malformed 2xx bodies
        status: Option<u16>,
        /// Server message or parse error
        message: String,
    },

    /// Backend failed to persist its working configuration
    #[error("commit: persist failure{}: {message}", status_suffix(.status))]
    PersistFailure {
        /// HTTP status, absent when the server reported failure in the body
        status: Option<u16>,
        /// Server message
        message: String,
    },
}

impl SyncError {
    /// Network failure for `op`
    #[inline]
    pub fn network(op: Operation, message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            op,
            message: message.into(),
        }
    }

    /// Server rejection for `op`
    #[inline]
    pub fn rejected(op: Operation, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RejectedByServer {
            op,
            status,
            message: message.into(),
        }
    }

    /// Malformed response body for `op`
    #[inline]
    pub fn malformed(op: Operation, message: impl fmt::Display) -> Self {
        Self::RejectedByServer {
            op,
            status: None,
            message: format!("malformed response: {message}"),
        }
    }

    /// Persist failure on commit
    #[inline]
    pub fn persist(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::PersistFailure {
            status,
            message: message.into(),
        }
    }

    /// Error classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkFailure { .. } => ErrorKind::Network,
            Self::RejectedByServer { .. } => ErrorKind::Rejected,
            Self::PersistFailure { .. } => ErrorKind::Persist,
        }
    }

    /// Operation that failed
    #[inline]
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::NetworkFailure { op, .. } | Self::RejectedByServer { op, .. } => *op,
            Self::PersistFailure { .. } => Operation::Commit,
        }
    }

    /// Whether repeating the same call could succeed
    ///
    /// The engine never retries on its own; this only informs callers.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure { .. } | Self::PersistFailure { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}
