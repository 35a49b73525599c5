//! webext CLI library.
//!
//! Configuration, the filesystem asset host, the build session that ties
//! the manifest pipeline to the reload server, and the command
//! implementations behind the `webext` binary.

pub mod cli_args;
pub mod commands;
pub mod config;
pub mod host;
pub mod logging;
pub mod session;

pub use config::{Config, Overrides, CONFIG_FILE_NAME};
pub use host::FsHost;
pub use session::BuildSession;
