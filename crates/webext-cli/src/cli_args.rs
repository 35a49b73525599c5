//! CLI argument definitions for the webext command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use webext_manifest::Vendor;

use crate::config::Overrides;

/// webext - Browser extension manifest builder and live-reload server
#[derive(Parser)]
#[command(name = "webext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log debug detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by commands that build from a context directory.
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Directory containing manifest.json (default: current directory)
    #[arg(short, long)]
    pub context: Option<PathBuf>,

    /// Output directory, relative to the context (default: dist)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Browser vendor to build for (chrome, firefox, opera, edge, safari)
    #[arg(long)]
    pub vendor: Option<Vendor>,

    /// Path to a config file (default: <context>/webext.config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Reload server address flags.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Reload server host (default: localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// Reload server port (default: 35729)
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transform manifest.json once and write it to the output directory
    Build {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Validate a manifest after vendor and environment resolution
    Validate {
        /// Path to the manifest file
        #[arg(short, long, default_value = "manifest.json")]
        manifest: PathBuf,

        /// Browser vendor to resolve keys for
        #[arg(long)]
        vendor: Option<Vendor>,

        /// Path to a config file supplying manifestDefaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Rebuild on change and live-reload connected extensions
    Watch {
        #[command(flatten)]
        context: ContextArgs,

        #[command(flatten)]
        server: ServerArgs,

        /// Do not start the reload server or inject the client
        #[arg(long)]
        no_autoreload: bool,
    },

    /// Connect to a reload server and log the reload decisions it triggers
    Listen {
        #[command(flatten)]
        server: ServerArgs,

        /// Manifest used to classify changed files
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Browser vendor to resolve the manifest for
        #[arg(long)]
        vendor: Option<Vendor>,
    },
}

impl ContextArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            context: self.context.clone(),
            out_dir: self.out_dir.clone(),
            vendor: self.vendor,
            ..Default::default()
        }
    }
}

impl ServerArgs {
    pub fn apply(&self, overrides: &mut Overrides) {
        overrides.host = self.host.clone();
        overrides.port = self.port;
    }
}
