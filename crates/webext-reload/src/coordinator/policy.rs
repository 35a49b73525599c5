//! Reload decision policy.

use std::fmt;

use serde_json::Value;
use webext_manifest::{manifest_file_deps, MANIFEST_FILE_NAME};

/// Directory holding localized message catalogs.
const LOCALES_PREFIX: &str = "_locales/";

/// Why a full extension reload is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReloadReason {
    /// The notification carried no file list, or an empty one.
    NoChangedFiles,
    ManifestChanged,
    LocalesChanged,
    /// A file the manifest references changed.
    ManifestDependencyChanged,
}

impl fmt::Display for FullReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoChangedFiles => "no changed files reported",
            Self::ManifestChanged => "manifest changed",
            Self::LocalesChanged => "locales changed",
            Self::ManifestDependencyChanged => "manifest dependency changed",
        };
        f.write_str(text)
    }
}

/// How to apply a reload notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadDecision {
    /// Reload the whole extension.
    Full(FullReloadReason),
    /// Reload the active tab and every open extension view.
    Smart,
}

/// Picks the reload strategy for a notification.
///
/// `changed` is `None` when the notification omitted the file list; an
/// empty list is treated the same way. Rules apply in order; the first match
/// wins.
pub fn decide(changed: Option<&[String]>, manifest: &Value) -> ReloadDecision {
    let Some(changed) = changed.filter(|c| !c.is_empty()) else {
        return ReloadDecision::Full(FullReloadReason::NoChangedFiles);
    };

    if changed.iter().any(|f| f == MANIFEST_FILE_NAME) {
        return ReloadDecision::Full(FullReloadReason::ManifestChanged);
    }

    if changed.iter().any(|f| f.starts_with(LOCALES_PREFIX)) {
        return ReloadDecision::Full(FullReloadReason::LocalesChanged);
    }

    let deps = manifest_file_deps(manifest);
    if changed.iter().any(|f| deps.contains(f)) {
        return ReloadDecision::Full(FullReloadReason::ManifestDependencyChanged);
    }

    ReloadDecision::Smart
}
