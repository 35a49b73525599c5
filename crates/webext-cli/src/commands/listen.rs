//! Listen command implementation
//!
//! Connects to a reload server as an extension would and logs the reload
//! decision for each notification.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;
use webext_manifest::{ManifestPipeline, PipelineOptions};
use webext_reload::{ExtensionRuntime, ExtensionView, ReloadCoordinator};

use crate::config::Config;

/// Runtime that logs what a browser would do.
#[derive(Debug, Clone, Default)]
pub struct LoggingRuntime {
    manifest: Value,
}

impl LoggingRuntime {
    pub fn new(manifest: Value) -> Self {
        Self { manifest }
    }
}

impl ExtensionRuntime for LoggingRuntime {
    fn manifest(&self) -> Value {
        self.manifest.clone()
    }

    fn reload(&self) {
        info!("extension reload");
    }

    fn reload_active_tab(&self) {
        info!("active tab reload");
    }

    fn open_views(&self) -> Vec<ExtensionView> {
        Vec::new()
    }

    fn reload_view(&self, view: &ExtensionView) {
        info!("view reload: {}", view.url);
    }
}

/// Loads and transforms the manifest the decisions are made against.
pub fn load_manifest(path: &Path, options: PipelineOptions) -> Result<Value> {
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let output = ManifestPipeline::new(PipelineOptions {
        skip_validation: true,
        ..options
    })
    .transform(&raw)?;
    Ok(output.manifest)
}

/// Run the listen command until Ctrl+C.
pub fn run(config: &Config, manifest_path: Option<&Path>) -> Result<ExitCode> {
    let manifest = match manifest_path {
        Some(path) => load_manifest(path, config.pipeline_options())?,
        None => Value::Object(Default::default()),
    };
    let coordinator = ReloadCoordinator::new(
        LoggingRuntime::new(manifest),
        config.coordinator_config(),
    );

    super::runtime()?.block_on(async {
        let handle = coordinator.handle();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("shutting down");
                handle.stop();
            }
        });
        coordinator.run().await;
    });

    Ok(ExitCode::SUCCESS)
}
