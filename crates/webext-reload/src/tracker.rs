//! Build-to-build change detection from file timestamps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

/// Context-relative, `/`-separated paths of files changed since the last build.
pub type ChangeSet = Vec<String>;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    system_time_millis(SystemTime::now())
}

fn system_time_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Modification timestamps for a set of paths, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSnapshot {
    entries: Vec<(PathBuf, u64)>,
    index: HashMap<PathBuf, usize>,
}

impl FileSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` with timestamp `modified_ms`, replacing any earlier stamp.
    pub fn insert(&mut self, path: impl Into<PathBuf>, modified_ms: u64) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = modified_ms,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, modified_ms));
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<u64> {
        self.index.get(path).map(|&i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, u64)> {
        self.entries.iter().map(|(p, t)| (p.as_path(), *t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walks `root` and records every regular file's modification time.
    ///
    /// Anything under `exclude` (typically the output directory) is skipped.
    /// Unreadable entries are ignored.
    pub fn scan(root: &Path, exclude: Option<&Path>) -> Self {
        let mut snapshot = Self::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| exclude.map_or(true, |ex| !e.path().starts_with(ex)))
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
                continue;
            };
            snapshot.insert(entry.path(), system_time_millis(modified));
        }
        snapshot
    }
}

impl FromIterator<(PathBuf, u64)> for FileSnapshot {
    fn from_iter<I: IntoIterator<Item = (PathBuf, u64)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (path, stamp) in iter {
            snapshot.insert(path, stamp);
        }
        snapshot
    }
}

/// Computes the files changed between consecutive builds.
///
/// A path counts as changed when it names a file (has an extension) and its
/// stamp is strictly newer than the previous build's stamp for that path, or
/// newer than the process start when the path is new. After each call the
/// given snapshot becomes the baseline for the next one.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    previous: FileSnapshot,
    process_start_ms: u64,
}

impl ChangeTracker {
    pub fn new(process_start_ms: u64) -> Self {
        Self {
            previous: FileSnapshot::new(),
            process_start_ms,
        }
    }

    /// A tracker whose process start is the current time.
    pub fn starting_now() -> Self {
        Self::new(now_millis())
    }

    pub fn process_start_ms(&self) -> u64 {
        self.process_start_ms
    }

    pub fn compute_changes(&mut self, current: FileSnapshot, context_root: &Path) -> ChangeSet {
        let changes = current
            .iter()
            .filter(|(path, _)| path.extension().is_some())
            .filter(|(path, stamp)| {
                let baseline = self.previous.get(path).unwrap_or(self.process_start_ms);
                *stamp > baseline
            })
            .map(|(path, _)| relative_display(path, context_root))
            .collect();
        self.previous = current;
        changes
    }
}

/// Renders `path` relative to `root` with `/` separators.
fn relative_display(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
