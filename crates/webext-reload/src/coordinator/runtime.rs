//! The browser capabilities the coordinator drives.

use serde_json::Value;

/// An open extension page (popup, options page, extension tab).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionView {
    pub id: String,
    pub url: String,
}

/// Extension host operations used by [`ReloadCoordinator`](super::ReloadCoordinator).
///
/// Implementations bridge to a real browser runtime; tests use a recording
/// fake.
pub trait ExtensionRuntime: Send + Sync {
    /// The extension's current, already-transformed manifest.
    fn manifest(&self) -> Value;

    /// Reloads the whole extension.
    fn reload(&self);

    /// Reloads the focused tab of the current window.
    fn reload_active_tab(&self);

    fn open_views(&self) -> Vec<ExtensionView>;

    fn reload_view(&self, view: &ExtensionView);
}
