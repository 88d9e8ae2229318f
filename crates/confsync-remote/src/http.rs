//! HTTP implementation of the backend client traits (reqwest)

use async_trait::async_trait;
use confsync_document::Document;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Operation, SyncError};
use crate::remote::{OptionSource, PreferenceRemote, RemoteSync};
use crate::wire::{PatchRequest, StatusResponse};

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Backend root, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl RemoteConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With backend base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            user_agent: concat!("confsync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Client construction errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Base URL could not be parsed or cannot carry a path
    #[error("invalid base URL {0:?}")]
    InvalidBaseUrl(String),

    /// reqwest client could not be built
    #[error("http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// reqwest-backed client for the configuration endpoints
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemote {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns error for an unusable base URL or a TLS backend failure
    pub fn new(config: &RemoteConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Use an existing reqwest client
    ///
    /// # Errors
    /// Returns error for an unusable base URL
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Backend root
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        op: Operation,
        request: RequestBuilder,
    ) -> Result<(StatusCode, String), SyncError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(op = %op, error = %e, "request failed");
            SyncError::network(op, e.to_string())
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::network(op, e.to_string()))?;
        tracing::debug!(op = %op, status = status.as_u16(), "response received");
        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        op: Operation,
        segments: &[&str],
    ) -> Result<T, SyncError> {
        let url = self.endpoint(segments);
        tracing::debug!(op = %op, url = %url, "GET");
        let (status, body) = self.send(op, self.client.get(url)).await?;
        if !status.is_success() {
            return Err(SyncError::rejected(
                op,
                Some(status.as_u16()),
                error_message(&body, status),
            ));
        }
        serde_json::from_str(&body).map_err(|e| SyncError::malformed(op, e))
    }

    async fn expect_ack(&self, op: Operation, request: RequestBuilder) -> Result<(), SyncError> {
        let (status, body) = self.send(op, request).await?;
        if !status.is_success() {
            return Err(SyncError::rejected(
                op,
                Some(status.as_u16()),
                error_message(&body, status),
            ));
        }
        check_optional_status(op, &body)
    }
}

#[async_trait]
impl RemoteSync for HttpRemote {
    async fn fetch_full(&self) -> Result<Document, SyncError> {
        self.get_json(Operation::FetchFull, &["config"]).await
    }

    async fn fetch_default(&self) -> Result<Document, SyncError> {
        self.get_json(Operation::FetchDefault, &["config", "default"])
            .await
    }

    async fn apply_patch(&self, patch: &Document) -> Result<(), SyncError> {
        let url = self.endpoint(&["config"]);
        tracing::debug!(url = %url, fields = patch.len(), "PATCH");
        let request = self
            .client
            .patch(url)
            .json(&PatchRequest { config_data: patch });
        self.expect_ack(Operation::ApplyPatch, request).await
    }

    async fn commit(&self) -> Result<(), SyncError> {
        let op = Operation::Commit;
        let url = self.endpoint(&["config"]);
        tracing::debug!(url = %url, "POST");
        let (status, body) = self.send(op, self.client.post(url)).await?;
        if !status.is_success() {
            return Err(SyncError::persist(
                Some(status.as_u16()),
                error_message(&body, status),
            ));
        }
        let envelope: StatusResponse =
            serde_json::from_str(&body).map_err(|e| SyncError::malformed(op, e))?;
        if envelope.is_success() {
            Ok(())
        } else {
            Err(SyncError::persist(None, envelope.describe()))
        }
    }
}

#[async_trait]
impl PreferenceRemote for HttpRemote {
    async fn fetch_preferences(&self) -> Result<Document, SyncError> {
        self.get_json(Operation::FetchPreferences, &["config", "ui-config"])
            .await
    }

    async fn store_preferences(&self, preferences: &Document) -> Result<(), SyncError> {
        let request = self
            .client
            .post(self.endpoint(&["config", "ui-config"]))
            .json(preferences);
        self.expect_ack(Operation::StorePreferences, request).await
    }
}

#[async_trait]
impl OptionSource for HttpRemote {
    async fn platforms(&self) -> Result<Vec<String>, SyncError> {
        self.get_json(Operation::FetchOptions, &["config", "platforms"])
            .await
    }

    async fn template_categories(&self) -> Result<Vec<String>, SyncError> {
        self.get_json(Operation::FetchOptions, &["config", "templates"])
            .await
    }

    async fn templates(&self, category: &str) -> Result<Vec<String>, SyncError> {
        self.get_json(Operation::FetchOptions, &["config", "templates", category])
            .await
    }
}

/// Write endpoints may answer with a status envelope; a failed one is a
/// rejection even under a 2xx status. Any other body is ignored.
fn check_optional_status(op: Operation, body: &str) -> Result<(), SyncError> {
    if body.trim().is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<StatusResponse>(body) {
        Ok(envelope) if !envelope.is_success() => {
            Err(SyncError::rejected(op, None, envelope.describe()))
        }
        _ => Ok(()),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<JsonValue>,
    error: Option<String>,
}

fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<ErrorBody>(body).ok().and_then(|b| {
        b.message
            .or(b.error)
            .or_else(|| match b.detail {
                Some(JsonValue::String(s)) => Some(s),
                Some(other) => Some(other.to_string()),
                None => None,
            })
    });
    let trimmed = body.trim();
    from_json
        .or_else(|| (!trimmed.is_empty()).then(|| trimmed.to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_segments() {
        let remote = HttpRemote::with_client(reqwest::Client::new(), "http://localhost:9000").unwrap();
        assert_eq!(
            remote.endpoint(&["config", "default"]).as_str(),
            "http://localhost:9000/config/default"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() {
        let remote =
            HttpRemote::with_client(reqwest::Client::new(), "http://localhost:9000/api/").unwrap();
        assert_eq!(
            remote.endpoint(&["config", "templates", "news feed"]).as_str(),
            "http://localhost:9000/api/config/templates/news%20feed"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpRemote::with_client(reqwest::Client::new(), "not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
    }

    #[test]
    fn error_message_prefers_structured_fields() {
        assert_eq!(
            error_message(r#"{"detail": "bad key"}"#, StatusCode::BAD_REQUEST),
            "bad key"
        );
        assert_eq!(
            error_message(r#"{"message": "nope"}"#, StatusCode::BAD_REQUEST),
            "nope"
        );
        assert_eq!(error_message("plain text", StatusCode::BAD_GATEWAY), "plain text");
        assert_eq!(
            error_message("", StatusCode::INTERNAL_SERVER_ERROR),
            "Internal Server Error"
        );
    }

    #[test]
    fn optional_status_only_rejects_failed_envelopes() {
        assert!(check_optional_status(Operation::ApplyPatch, "").is_ok());
        assert!(check_optional_status(Operation::ApplyPatch, r#"{"status": "success"}"#).is_ok());
        assert!(check_optional_status(Operation::ApplyPatch, r#"{"wechat": {}}"#).is_ok());
        let err = check_optional_status(
            Operation::ApplyPatch,
            r#"{"status": "error", "message": "locked"}"#,
        )
        .unwrap_err();
        assert_eq!(err, SyncError::rejected(Operation::ApplyPatch, None, "locked"));
    }
}
