//! Per-process build session.
//!
//! A session is driven through four hooks per build: [`on_watch_start`]
//! before compiling, [`on_before_emit`] to produce the manifest,
//! [`on_after_compile`] to register watch dependencies and [`on_done`] to
//! notify connected extensions.
//!
//! [`on_watch_start`]: BuildSession::on_watch_start
//! [`on_before_emit`]: BuildSession::on_before_emit
//! [`on_after_compile`]: BuildSession::on_after_compile
//! [`on_done`]: BuildSession::on_done

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use webext_manifest::{
    to_pretty_json, AssetHost, BackgroundInjector, BootstrapSettings, InjectError,
    ManifestPipeline, TransformOutput, MANIFEST_FILE_NAME,
};
use webext_reload::{ChangeSet, ChangeTracker, FileSnapshot, ReloadHandle, ReloadServer};

use crate::config::Config;

pub struct BuildSession {
    config: Config,
    context: PathBuf,
    out_dir: PathBuf,
    pipeline: ManifestPipeline,
    injector: BackgroundInjector,
    tracker: ChangeTracker,
    server: ReloadServer,
    live: Option<ReloadHandle>,
    live_reload_disabled: bool,
    is_watching: bool,
    manifest_changed: bool,
    first_build: bool,
}

impl BuildSession {
    pub fn new(config: Config) -> Self {
        let context =
            std::fs::canonicalize(&config.context).unwrap_or_else(|_| config.context.clone());
        let out_dir = if config.out_dir.is_absolute() {
            config.out_dir.clone()
        } else {
            context.join(&config.out_dir)
        };
        Self {
            pipeline: ManifestPipeline::new(config.pipeline_options()),
            injector: BackgroundInjector::new(&config.bootstrap_settings()),
            tracker: ChangeTracker::starting_now(),
            server: ReloadServer::new(),
            live: None,
            live_reload_disabled: false,
            is_watching: false,
            manifest_changed: true,
            first_build: true,
            context,
            out_dir,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute context directory.
    pub fn context(&self) -> &Path {
        &self.context
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.context.join(MANIFEST_FILE_NAME)
    }

    pub fn is_watching(&self) -> bool {
        self.is_watching
    }

    pub fn manifest_changed(&self) -> bool {
        self.manifest_changed
    }

    /// The running reload server, if live reload is active.
    pub fn reload_handle(&self) -> Option<&ReloadHandle> {
        self.live.as_ref()
    }

    /// Replaces the change tracker; used to pin the process start time.
    pub fn with_tracker(mut self, tracker: ChangeTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Marks the session as watching and starts the reload server once.
    ///
    /// `modified` lists the files that triggered this build. The first build
    /// always reprocesses the manifest.
    pub async fn on_watch_start(&mut self, modified: &[PathBuf]) {
        self.is_watching = true;

        let manifest_path = self.manifest_path();
        self.manifest_changed =
            self.first_build || modified.iter().any(|p| same_path(p, &manifest_path));
        self.first_build = false;

        if self.config.autoreload && self.live.is_none() && !self.live_reload_disabled {
            match self.server.start(&self.config.host, self.config.port).await {
                Ok(handle) => {
                    // Bake the bound port into the client; the configured one may be 0.
                    let settings = BootstrapSettings {
                        port: handle.local_addr().port(),
                        ..self.config.bootstrap_settings()
                    };
                    self.injector = BackgroundInjector::new(&settings);
                    self.live = Some(handle);
                }
                Err(e) => {
                    warn!("{}; live reload disabled", e);
                    self.live_reload_disabled = true;
                }
            }
        }
    }

    /// Runs the manifest pipeline and emits `manifest.json`.
    ///
    /// Returns `None` when the manifest did not change since the last build.
    /// Validation errors are logged, never fatal. A missing background file
    /// skips injection but still emits the manifest.
    pub async fn on_before_emit<H: AssetHost + ?Sized>(
        &mut self,
        host: &H,
    ) -> Result<Option<TransformOutput>> {
        if !self.manifest_changed {
            debug!("manifest unchanged, skipping transform");
            return Ok(None);
        }

        let manifest_path = self.manifest_path();
        let raw = host
            .read_file(&manifest_path)
            .await
            .with_context(|| format!("Failed to read {}", manifest_path.display()))?;

        let mut output = self.pipeline.transform(&raw)?;

        if self.config.autoreload && self.is_watching && self.live.is_some() {
            self.injector.reset();
            match self
                .injector
                .inject(&output.manifest, host, &self.context)
                .await
            {
                Ok((manifest, _)) => output.manifest = manifest,
                Err(e @ InjectError::FileNotFound(_)) => {
                    warn!("{}; reload client not injected", e);
                }
                Err(e) => return Err(e).context("Failed to inject reload client"),
            }
        }

        let text = to_pretty_json(&output.manifest)?;
        host.emit_asset(MANIFEST_FILE_NAME, text.into_bytes())
            .await
            .with_context(|| format!("Failed to emit {}", MANIFEST_FILE_NAME))?;

        Ok(Some(output))
    }

    pub fn on_after_compile<H: AssetHost + ?Sized>(&self, host: &H) {
        host.add_file_dependency(&self.manifest_path());
    }

    /// Computes changed files and notifies connected clients.
    ///
    /// Does nothing unless watching with a live server.
    pub fn on_done(&mut self, snapshot: FileSnapshot) -> ChangeSet {
        let Some(handle) = self.live.as_ref().filter(|_| self.is_watching) else {
            return ChangeSet::new();
        };

        let changes = self.tracker.compute_changes(snapshot, &self.context);
        if !changes.is_empty() {
            handle.notify(changes.clone());
        }
        changes
    }

    /// Snapshot of the context directory, excluding the output directory.
    pub fn scan(&self) -> FileSnapshot {
        FileSnapshot::scan(&self.context, Some(&self.out_dir))
    }

    /// Runs one watch-mode build through every hook.
    pub async fn rebuild<H: AssetHost + ?Sized>(
        &mut self,
        host: &H,
        modified: &[PathBuf],
    ) -> Result<ChangeSet> {
        self.on_watch_start(modified).await;
        if let Some(output) = self.on_before_emit(host).await? {
            if let Some(errors) = &output.errors {
                info!("manifest built with {} validation error(s)", errors.len());
            }
        }
        self.on_after_compile(host);
        let snapshot = self.scan();
        Ok(self.on_done(snapshot))
    }

    pub fn shutdown(&self) {
        if let Some(handle) = &self.live {
            handle.shutdown();
        }
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
