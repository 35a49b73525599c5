//! Watch command implementation
//!
//! Rebuilds the manifest whenever files in the context change and tells
//! connected extensions to reload.

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::host::FsHost;
use crate::session::BuildSession;

/// Quiet period after the first change event before rebuilding.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Run the watch command until Ctrl+C.
pub fn run(config: Config) -> Result<ExitCode> {
    super::runtime()?.block_on(watch(config))
}

async fn watch(config: Config) -> Result<ExitCode> {
    let mut session = BuildSession::new(config);
    let host = FsHost::new(session.out_dir());

    let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
            Err(e) => warn!("watch error: {}", e),
        },
        notify::Config::default(),
    )
    .context("Failed to create file watcher")?;
    watcher
        .watch(session.context(), RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", session.context().display()))?;

    info!("watching {}", session.context().display());
    eprintln!("Press Ctrl+C to stop");

    rebuild(&mut session, &host, &[]).await;

    let out_dir = session.out_dir().to_path_buf();
    loop {
        tokio::select! {
            first = rx.recv() => {
                let Some(first) = first else { break };
                let modified = collect_batch(first, &mut rx, &out_dir).await;
                if modified.is_empty() {
                    continue;
                }
                debug!("{} path(s) changed", modified.len());
                rebuild(&mut session, &host, &modified).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    session.shutdown();
    Ok(ExitCode::SUCCESS)
}

/// Drains events arriving within [`DEBOUNCE`] of `first`, dropping output
/// paths and duplicates.
async fn collect_batch(
    first: PathBuf,
    rx: &mut mpsc::UnboundedReceiver<PathBuf>,
    out_dir: &Path,
) -> Vec<PathBuf> {
    let mut paths = vec![first];
    let deadline = tokio::time::sleep(DEBOUNCE);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            next = rx.recv() => match next {
                Some(path) => paths.push(path),
                None => break,
            },
        }
    }

    paths.retain(|p| !p.starts_with(out_dir));
    paths.sort();
    paths.dedup();
    paths
}

async fn rebuild(session: &mut BuildSession, host: &FsHost, modified: &[PathBuf]) {
    match session.rebuild(host, modified).await {
        Ok(changes) if !changes.is_empty() => debug!("changed: {}", changes.join(", ")),
        Ok(_) => {}
        Err(e) => error!("build failed: {:#}", e),
    }
}
