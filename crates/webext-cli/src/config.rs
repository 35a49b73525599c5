//! Tool configuration.
//!
//! Settings come from an optional `webext.config.json` (camelCase keys) and
//! are then overridden by command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use webext_manifest::{BootstrapSettings, PipelineOptions, Vendor};
use webext_reload::{CoordinatorConfig, DEFAULT_HOST, DEFAULT_PORT};

/// Config file looked up in the context directory.
pub const CONFIG_FILE_NAME: &str = "webext.config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Reload server port.
    pub port: u16,
    /// Reload server host.
    pub host: String,
    /// Client reconnect delay in milliseconds.
    pub reconnect_time: u64,
    /// Run the reload server and inject the client while watching.
    pub autoreload: bool,
    pub vendor: Vendor,
    /// Keys merged under the source manifest.
    pub manifest_defaults: Map<String, Value>,
    /// Only log warnings and errors.
    pub quiet: bool,
    pub skip_manifest_validation: bool,
    /// Directory holding `manifest.json` and the extension sources.
    pub context: PathBuf,
    /// Output directory, relative to `context` unless absolute.
    pub out_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            reconnect_time: 3000,
            autoreload: true,
            vendor: Vendor::default(),
            manifest_defaults: Map::new(),
            quiet: false,
            skip_manifest_validation: false,
            context: PathBuf::from("."),
            out_dir: PathBuf::from("dist"),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub context: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub vendor: Option<Vendor>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_autoreload: bool,
    pub quiet: bool,
}

impl Config {
    /// Reads a config file. A relative `context` in the file is resolved
    /// against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        if config.context.is_relative() {
            if let Some(dir) = path.parent() {
                config.context = dir.join(&config.context);
            }
        }
        Ok(config)
    }

    /// Loads `explicit` if given, else `<context>/webext.config.json` when it
    /// exists, else defaults; then applies `overrides`.
    pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let context = overrides
                    .context
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                let candidate = context.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(context) = &overrides.context {
            self.context = context.clone();
        }
        if let Some(out_dir) = &overrides.out_dir {
            self.out_dir = out_dir.clone();
        }
        if let Some(vendor) = overrides.vendor {
            self.vendor = vendor;
        }
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if overrides.no_autoreload {
            self.autoreload = false;
        }
        if overrides.quiet {
            self.quiet = true;
        }
    }

    /// The output directory resolved against the context.
    pub fn out_path(&self) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            self.context.join(&self.out_dir)
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_time)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            vendor: self.vendor,
            defaults: self.manifest_defaults.clone(),
            skip_validation: self.skip_manifest_validation,
        }
    }

    pub fn bootstrap_settings(&self) -> BootstrapSettings {
        BootstrapSettings {
            host: self.host.clone(),
            port: self.port,
            reconnect_time: self.reconnect_delay(),
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            host: self.host.clone(),
            port: self.port,
            reconnect_delay: self.reconnect_delay(),
        }
    }
}
