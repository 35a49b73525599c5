//! CLI command implementations

pub mod build;
pub mod listen;
pub mod validate;
pub mod watch;

use anyhow::{Context, Result};

/// Builds the multi-threaded runtime the async commands run on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}
