//! confsync Core - configuration synchronization engine
//!
//! Keeps the console's in-memory configuration consistent with the backend:
//! - Mirrors the backend document in a [`DocumentStore`]
//! - Applies panel updates remotely first, then merges them locally
//! - Tracks which panels still have to save ([`DirtyTracker`])
//! - Owns the local UI preferences ([`PreferenceStore`])
//! - Caches option lists for panel controls ([`OptionCatalog`])
//!
//! # Example
//!
//! ```rust,ignore
//! use confsync_core::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), EngineError> {
//! let session = ConsoleSession::connect(&EngineConfig::new()).await?;
//! let engine = session.engine();
//! let panel = PanelId::new("api");
//!
//! engine.set_field(&panel, "/api/ProviderA/model", json!("a-2")).await?;
//! assert!(engine.is_dirty(&panel));
//!
//! engine.save(&panel).await?;
//! assert!(!engine.is_dirty(&panel));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod catalog;
pub mod config;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod preferences;
pub mod session;
pub mod store;
pub mod types;

pub use catalog::{OptionCatalog, OptionKey};
pub use config::{CatalogConfig, ConfigError, EngineConfig, PreferenceConfig};
pub use dirty::{next_state, DirtyChange, DirtyTracker, PanelEvent, PanelState};
pub use engine::SyncEngine;
pub use error::{EngineError, Outcome};
pub use preferences::{
    CacheError, FileCache, MemoryCache, PreferenceCache, PreferenceError, PreferenceStore,
    Preferences, WriteThrough, DEFAULT_THEME, DEFAULT_WINDOW_MODE,
};
pub use session::ConsoleSession;
pub use store::{DocumentStore, StoreStats};
pub use types::PanelId;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for panels driving the engine
    pub use crate::{
        ConsoleSession, EngineConfig, EngineError, Outcome, PanelId, Preferences, SyncEngine,
    };
    pub use confsync_document::Document;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
