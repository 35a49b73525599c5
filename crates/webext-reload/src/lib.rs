//! Live reload for browser extensions under development.
//!
//! - [`tracker`] works out which source files changed between builds.
//! - [`server`] broadcasts reload notifications to connected extensions.
//! - [`coordinator`] runs on the extension side, deciding between a full
//!   extension reload and a lighter tab-and-views refresh.

pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tracker;

pub use coordinator::{
    decide, ConnectionState, CoordinatorConfig, CoordinatorHandle, ExtensionRuntime,
    ExtensionView, FullReloadReason, ReconnectTimer, ReloadCoordinator, ReloadDecision,
    DEFAULT_RECONNECT_DELAY,
};
pub use error::ReloadError;
pub use protocol::{parse_server_message, ReloadNotification, ServerMessage};
pub use server::{ReloadHandle, ReloadServer, DEFAULT_HOST, DEFAULT_PORT};
pub use tracker::{now_millis, ChangeSet, ChangeTracker, FileSnapshot};
