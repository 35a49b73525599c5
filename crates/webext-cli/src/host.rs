//! Filesystem-backed asset host.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use webext_manifest::AssetHost;

/// Reads sources from disk and writes emitted assets under `out_dir`.
#[derive(Debug)]
pub struct FsHost {
    out_dir: PathBuf,
    emitted: Mutex<Vec<String>>,
    dependencies: Mutex<Vec<PathBuf>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FsHost {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            emitted: Mutex::new(Vec::new()),
            dependencies: Mutex::new(Vec::new()),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Asset names written so far, in emit order.
    pub fn emitted(&self) -> Vec<String> {
        lock(&self.emitted).clone()
    }

    /// Files registered for watching.
    pub fn dependencies(&self) -> Vec<PathBuf> {
        lock(&self.dependencies).clone()
    }
}

#[async_trait]
impl AssetHost for FsHost {
    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn emit_asset(&self, name: &str, bytes: Vec<u8>) -> std::io::Result<()> {
        let target = self.out_dir.join(name);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!("emitted {}", target.display());
        lock(&self.emitted).push(name.to_string());
        Ok(())
    }

    fn add_file_dependency(&self, path: &Path) {
        let mut deps = lock(&self.dependencies);
        if !deps.iter().any(|p| p == path) {
            deps.push(path.to_path_buf());
        }
    }
}
