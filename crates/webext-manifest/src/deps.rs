//! File paths referenced from a manifest.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

static FILE_REGEX: OnceLock<Regex> = OnceLock::new();

fn file_regex() -> &'static Regex {
    FILE_REGEX.get_or_init(|| Regex::new(r#"[^"]*\.[a-zA-Z]+"#).expect("invalid file pattern"))
}

/// Returns every filename-like string in the compact serialization of
/// `manifest` (icons, scripts, pages, ...), in document order.
///
/// The scan is textual, so it may over-report; callers use it to decide
/// whether a changed file could affect the manifest.
pub fn manifest_file_deps(manifest: &Value) -> Vec<String> {
    let serialized = manifest.to_string();
    file_regex()
        .find_iter(&serialized)
        .map(|m| m.as_str().to_string())
        .collect()
}
