//! Capabilities the build host provides to the manifest stages.

use std::path::Path;

use async_trait::async_trait;

/// File access and asset output owned by the host build tool.
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Reads a source file. Missing files surface as `io::ErrorKind::NotFound`.
    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Registers `bytes` as the build output named `name`.
    async fn emit_asset(&self, name: &str, bytes: Vec<u8>) -> std::io::Result<()>;

    /// Asks the host to watch `path` for the next build.
    fn add_file_dependency(&self, _path: &Path) {}
}
