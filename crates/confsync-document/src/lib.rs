//! confsync Document Model
//!
//! The configuration document mirrored by the console and the deep-merge
//! rule used to apply partial updates to it.
//!
//! # Core Concepts
//!
//! - [`Document`]: a JSON object tree; the root is always an object
//! - [`merge`]: pure deep merge (objects recurse, everything else replaces)
//! - [`ContentHash`]: Blake3 over canonical JSON, for snapshot comparison
//!
//! # Example
//!
//! ```
//! use confsync_document::{merge, Document};
//! use serde_json::json;
//!
//! let base = Document::try_from(json!({"api": {"A": {"model": "m1", "api_key": "k"}}})).unwrap();
//! let patch = Document::patch_at("/api/A/model", json!("m2")).unwrap();
//!
//! let merged = merge(&base, &patch);
//! assert_eq!(merged.get("/api/A/model"), Some(&json!("m2")));
//! assert_eq!(merged.get("/api/A/api_key"), Some(&json!("k")));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod hash;
pub mod merge;

pub use document::{json_kind, Document, DocumentError};
pub use hash::ContentHash;
pub use merge::{merge, merge_into, merge_values};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
