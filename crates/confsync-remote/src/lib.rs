//! confsync Remote Client
//!
//! Stateless access to the configuration backend:
//!
//! - [`RemoteSync`]: fetch full/default document, in-memory apply, commit
//! - [`PreferenceRemote`]: UI preference write-through
//! - [`OptionSource`]: read-only option lists for panel controls
//! - [`HttpRemote`]: reqwest implementation of all three
//!
//! # Endpoints
//!
//! ```text
//! GET   /config                    full working document
//! GET   /config/default            default document
//! PATCH /config   {config_data}    merge into working document (not durable)
//! POST  /config                    persist working document
//! GET   /config/ui-config          preference document
//! POST  /config/ui-config          overwrite preference document
//! GET   /config/platforms          platform names
//! GET   /config/templates          template categories
//! GET   /config/templates/{cat}    template names
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod http;
pub mod remote;
pub mod wire;

pub use error::{ErrorKind, Operation, SyncError};
pub use http::{ClientError, HttpRemote, RemoteConfig};
pub use remote::{OptionSource, PreferenceRemote, RemoteSync};
pub use wire::{PatchRequest, StatusResponse};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
