//! Testing utilities for the confsync workspace
//!
//! An in-memory backend with failure injection, plus document fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use confsync_document::Document;
use confsync_remote::{OptionSource, Operation, PreferenceRemote, RemoteSync, SyncError};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap, VecDeque};

pub const PLATFORMS_PANEL: &str = "platforms";
pub const WECHAT_PANEL: &str = "wechat";
pub const API_PANEL: &str = "api";

/// Build a document from a JSON object literal
///
/// # Panics
/// If `value` isn't a JSON object
pub fn doc(value: JsonValue) -> Document {
    Document::try_from(value).expect("fixture must be a JSON object")
}

/// A representative console configuration
pub fn console_document() -> Document {
    doc(json!({
        "publish": {
            "platforms": ["wechat"],
            "schedule": {"enabled": false, "cron": "0 9 * * *"}
        },
        "wechat": {
            "credentials": [{"app_id": "wx-1", "app_secret": "s-1"}],
            "auto_publish": false
        },
        "api": {
            "ProviderA": {"model": "a-1", "api_key": "key-a", "temperature": 0.7},
            "ProviderB": {"model": "b-1", "api_key": "key-b", "base_url": "https://b.example"}
        }
    }))
}

#[derive(Debug, Default)]
struct BackendState {
    working: Document,
    persisted: Document,
    defaults: Document,
    preferences: Option<Document>,
    platforms: Vec<String>,
    templates: BTreeMap<String, Vec<String>>,
    patches: Vec<Document>,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, VecDeque<SyncError>>,
}

/// In-memory stand-in for the configuration backend
///
/// Mirrors the real service's split between a working copy (changed by
/// `apply_patch`) and a persisted copy (changed by `commit`). Failures queued
/// with [`fail_next`](Self::fail_next) are returned in order before the
/// operation behaves normally again. Every call, failed or not, is counted.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose working and persisted copies are `doc`
    pub fn with_document(self, doc: Document) -> Self {
        {
            let mut state = self.state.lock();
            state.persisted = doc.clone();
            state.working = doc;
        }
        self
    }

    pub fn with_defaults(self, defaults: Document) -> Self {
        self.state.lock().defaults = defaults;
        self
    }

    pub fn with_preferences(self, preferences: Document) -> Self {
        self.state.lock().preferences = Some(preferences);
        self
    }

    pub fn with_platforms<I, S>(self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_templates<I, S>(self, category: &str, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().templates.insert(
            category.to_string(),
            templates.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Queue `error` as the result of the next `op` call
    pub fn fail_next(&self, op: Operation, error: SyncError) {
        self.state.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Change the working copy behind the engine's back
    pub fn set_working(&self, doc: Document) {
        self.state.lock().working = doc;
    }

    pub fn working(&self) -> Document {
        self.state.lock().working.clone()
    }

    pub fn persisted(&self) -> Document {
        self.state.lock().persisted.clone()
    }

    pub fn stored_preferences(&self) -> Option<Document> {
        self.state.lock().preferences.clone()
    }

    /// Every patch accepted so far, in order
    pub fn patches(&self) -> Vec<Document> {
        self.state.lock().patches.clone()
    }

    pub fn call_count(&self, op: Operation) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: Operation) -> Result<parking_lot::MutexGuard<'_, BackendState>, SyncError> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_default() += 1;
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl RemoteSync for InMemoryBackend {
    async fn fetch_full(&self) -> Result<Document, SyncError> {
        Ok(self.enter(Operation::FetchFull)?.working.clone())
    }

    async fn fetch_default(&self) -> Result<Document, SyncError> {
        Ok(self.enter(Operation::FetchDefault)?.defaults.clone())
    }

    async fn apply_patch(&self, patch: &Document) -> Result<(), SyncError> {
        let mut state = self.enter(Operation::ApplyPatch)?;
        state.working.merge_from(patch);
        state.patches.push(patch.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<(), SyncError> {
        let mut state = self.enter(Operation::Commit)?;
        state.persisted = state.working.clone();
        Ok(())
    }
}

#[async_trait]
impl PreferenceRemote for InMemoryBackend {
    async fn fetch_preferences(&self) -> Result<Document, SyncError> {
        Ok(self
            .enter(Operation::FetchPreferences)?
            .preferences
            .clone()
            .unwrap_or_default())
    }

    async fn store_preferences(&self, preferences: &Document) -> Result<(), SyncError> {
        self.enter(Operation::StorePreferences)?.preferences = Some(preferences.clone());
        Ok(())
    }
}

#[async_trait]
impl OptionSource for InMemoryBackend {
    async fn platforms(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.enter(Operation::FetchOptions)?.platforms.clone())
    }

    async fn template_categories(&self) -> Result<Vec<String>, SyncError> {
        Ok(self
            .enter(Operation::FetchOptions)?
            .templates
            .keys()
            .cloned()
            .collect())
    }

    async fn templates(&self, category: &str) -> Result<Vec<String>, SyncError> {
        let state = self.enter(Operation::FetchOptions)?;
        state.templates.get(category).cloned().ok_or_else(|| {
            SyncError::rejected(
                Operation::FetchOptions,
                Some(404),
                format!("unknown template category {category:?}"),
            )
        })
    }
}
