//! Fixture extension directories.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;
use webext_cli::Config;
use webext_manifest::MANIFEST_FILE_NAME;

/// A temporary extension source tree.
pub struct ExtensionFixture {
    dir: TempDir,
}

impl ExtensionFixture {
    /// Creates a context directory containing `manifest`.
    pub fn new(manifest: &Value) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let fixture = Self { dir };
        fixture.write(
            MANIFEST_FILE_NAME,
            &serde_json::to_string_pretty(manifest).expect("manifest serializes"),
        );
        fixture
    }

    pub fn context(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Writes a source file, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        std::fs::write(&path, contents).expect("failed to write fixture file");
        path
    }

    /// Config for this context with the reload server on an ephemeral port.
    pub fn config(&self) -> Config {
        Config {
            context: self.context().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        }
    }

    /// Reads an emitted asset from `dist/`.
    pub fn read_output(&self, name: &str) -> String {
        let path = self.path("dist").join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
    }

    pub fn output_manifest(&self) -> Value {
        serde_json::from_str(&self.read_output(MANIFEST_FILE_NAME))
            .expect("emitted manifest is JSON")
    }
}
