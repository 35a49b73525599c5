//! Injection of the live-reload client into the manifest's background entry.
//!
//! Depending on what the manifest declares, the client is prepended to the
//! service worker, referenced from the background page, or appended to the
//! background scripts list. Exactly one injection happens per build.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::InjectError;
use crate::host::AssetHost;
use crate::validation::{manifest_version, ManifestVersion};

/// Output path of the reload client asset.
pub const CLIENT_ASSET_PATH: &str = "webext/reload_client.js";

const CLIENT_TEMPLATE: &str = include_str!("../assets/reload_client.js");

static BODY_END_REGEX: OnceLock<Regex> = OnceLock::new();

fn body_end_regex() -> &'static Regex {
    BODY_END_REGEX.get_or_init(|| Regex::new(r"(?i)\s*</body>").expect("invalid body pattern"))
}

/// Connection settings baked into the reload client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSettings {
    pub host: String,
    pub port: u16,
    pub reconnect_time: Duration,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 35729,
            reconnect_time: Duration::from_millis(3000),
        }
    }
}

/// Renders the reload client with `settings`.
pub fn render_bootstrap(settings: &BootstrapSettings) -> String {
    CLIENT_TEMPLATE
        .replace("{{host}}", &settings.host)
        .replace("{{port}}", &settings.port.to_string())
        .replace(
            "{{reconnectTime}}",
            &settings.reconnect_time.as_millis().to_string(),
        )
}

/// Inserts a `<script>` tag for `script_path` before the closing body tag.
pub fn insert_script_tag(page: &str, script_path: &str) -> String {
    let tag = format!("\n<script src=\"{}\"></script>", script_path);
    match body_end_regex().find(page) {
        Some(m) => format!("{}{}{}", &page[..m.start()], tag, &page[m.start()..]),
        None => format!("{}{}", page, tag),
    }
}

/// What the injector did with the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// The client was prepended to the named service worker asset.
    ServiceWorker(String),
    /// The named background page now loads the client.
    Page(String),
    /// The client was added to `background.scripts`.
    Scripts,
    /// The manifest had no background entry; one was created.
    Created,
    /// The client was already injected during this build.
    AlreadyInjected,
}

/// Injects the reload client at most once per build.
#[derive(Debug, Clone)]
pub struct BackgroundInjector {
    bootstrap: String,
    injected: bool,
}

impl BackgroundInjector {
    pub fn new(settings: &BootstrapSettings) -> Self {
        Self {
            bootstrap: render_bootstrap(settings),
            injected: false,
        }
    }

    /// Rendered client source.
    pub fn bootstrap(&self) -> &str {
        &self.bootstrap
    }

    pub fn is_injected(&self) -> bool {
        self.injected
    }

    /// Starts a new build; the next [`inject`](Self::inject) runs again.
    pub fn reset(&mut self) {
        self.injected = false;
    }

    /// Injects the client into `manifest`'s background entry point.
    ///
    /// Files referenced by the manifest are read relative to `context`.
    /// Returns the (possibly updated) manifest and what was done.
    pub async fn inject<H: AssetHost + ?Sized>(
        &mut self,
        manifest: &Value,
        host: &H,
        context: &Path,
    ) -> Result<(Value, Injection), InjectError> {
        if self.injected {
            debug!("reload client already injected for this build");
            return Ok((manifest.clone(), Injection::AlreadyInjected));
        }

        let version = manifest_version(manifest);
        let mut manifest = manifest.clone();
        let root = manifest.as_object_mut().ok_or_else(|| {
            InjectError::InvalidBackground("manifest root must be an object".to_string())
        })?;

        let injection = if root.get("background").map_or(true, Value::is_null) {
            let background = match version {
                Some(ManifestVersion::V3) => json!({ "service_worker": CLIENT_ASSET_PATH }),
                _ => json!({ "scripts": [CLIENT_ASSET_PATH] }),
            };
            root.insert("background".to_string(), background);
            self.emit_client(host).await?;
            Injection::Created
        } else {
            let Some(Value::Object(background)) = root.get_mut("background") else {
                return Err(InjectError::InvalidBackground(
                    "background should be an object".to_string(),
                ));
            };

            if background.contains_key("page") && background.contains_key("scripts") {
                return Err(InjectError::ConflictingBackground);
            }

            if let Some(worker) = background.get("service_worker") {
                let worker = entry_str(worker, "background.service_worker")?.to_string();
                let source = read_text(host, &context.join(&worker)).await?;
                let combined = format!("{}\n{}", self.bootstrap, source);
                host.emit_asset(&worker, combined.into_bytes()).await?;
                Injection::ServiceWorker(worker)
            } else if let Some(page) = background.get("page") {
                let page = entry_str(page, "background.page")?.to_string();
                let source = read_text(host, &context.join(&page)).await?;
                let updated = insert_script_tag(&source, CLIENT_ASSET_PATH);
                host.emit_asset(&page, updated.into_bytes()).await?;
                self.emit_client(host).await?;
                Injection::Page(page)
            } else {
                let scripts = background
                    .entry("scripts")
                    .or_insert_with(|| Value::Array(Vec::new()));
                let list = scripts.as_array_mut().ok_or_else(|| {
                    InjectError::InvalidBackground(
                        "background.scripts should be an array".to_string(),
                    )
                })?;
                if !list.iter().any(|s| s.as_str() == Some(CLIENT_ASSET_PATH)) {
                    list.push(Value::String(CLIENT_ASSET_PATH.to_string()));
                }
                self.emit_client(host).await?;
                Injection::Scripts
            }
        };

        self.injected = true;
        info!(?injection, "injected reload client");
        Ok((manifest, injection))
    }

    async fn emit_client<H: AssetHost + ?Sized>(&self, host: &H) -> Result<(), InjectError> {
        host.emit_asset(CLIENT_ASSET_PATH, self.bootstrap.clone().into_bytes())
            .await?;
        Ok(())
    }
}

fn entry_str<'v>(value: &'v Value, path: &str) -> Result<&'v str, InjectError> {
    value
        .as_str()
        .ok_or_else(|| InjectError::InvalidBackground(format!("{} should be a string", path)))
}

async fn read_text<H: AssetHost + ?Sized>(host: &H, path: &Path) -> Result<String, InjectError> {
    let bytes = host.read_file(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            InjectError::FileNotFound(path.to_path_buf())
        } else {
            InjectError::Io(e)
        }
    })?;
    String::from_utf8(bytes).map_err(|_| InjectError::NotUtf8(PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory host: files keyed by path, emitted assets recorded by name.
    #[derive(Default)]
    struct MemoryHost {
        files: HashMap<PathBuf, String>,
        emitted: Mutex<Vec<(String, String)>>,
    }

    impl MemoryHost {
        fn with_file(mut self, path: &str, contents: &str) -> Self {
            self.files
                .insert(Path::new("/ctx").join(path), contents.to_string());
            self
        }

        fn emitted(&self) -> Vec<(String, String)> {
            self.emitted.lock().unwrap().clone()
        }

        fn emitted_names(&self) -> Vec<String> {
            self.emitted().into_iter().map(|(name, _)| name).collect()
        }
    }

    #[async_trait::async_trait]
    impl AssetHost for MemoryHost {
        async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
            self.files
                .get(path)
                .map(|s| s.clone().into_bytes())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        async fn emit_asset(&self, name: &str, bytes: Vec<u8>) -> std::io::Result<()> {
            let text = String::from_utf8(bytes).unwrap();
            self.emitted.lock().unwrap().push((name.to_string(), text));
            Ok(())
        }
    }

    fn injector() -> BackgroundInjector {
        BackgroundInjector::new(&BootstrapSettings::default())
    }

    #[tokio::test]
    async fn test_adds_background_scripts_when_missing() {
        let host = MemoryHost::default();
        let manifest = json!({"name": "left-pad", "manifest_version": 2});

        let (out, injection) = injector()
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap();

        assert_eq!(injection, Injection::Created);
        assert_eq!(
            out,
            json!({
                "name": "left-pad",
                "manifest_version": 2,
                "background": { "scripts": [CLIENT_ASSET_PATH] }
            })
        );
        assert_eq!(host.emitted_names(), vec![CLIENT_ASSET_PATH]);
    }

    #[tokio::test]
    async fn test_adds_service_worker_for_v3_without_background() {
        let host = MemoryHost::default();
        let manifest = json!({"name": "left-pad", "manifest_version": 3});

        let (out, _) = injector()
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap();

        assert_eq!(out["background"], json!({ "service_worker": CLIENT_ASSET_PATH }));
    }

    #[tokio::test]
    async fn test_extends_background_scripts() {
        let host = MemoryHost::default();
        let manifest = json!({"background": {"scripts": ["background.js"]}});

        let (out, injection) = injector()
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap();

        assert_eq!(injection, Injection::Scripts);
        assert_eq!(
            out["background"]["scripts"],
            json!(["background.js", CLIENT_ASSET_PATH])
        );
    }

    #[tokio::test]
    async fn test_background_page_gets_script_tag() {
        let host = MemoryHost::default().with_file(
            "background.html",
            "<!DOCTYPE html><html><body>\ncontent\n</body></html>",
        );
        let manifest = json!({"name": "left-pad", "background": {"page": "background.html"}});

        let (out, injection) = injector()
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap();

        assert_eq!(out, manifest);
        assert_eq!(injection, Injection::Page("background.html".to_string()));
        let emitted = host.emitted();
        assert_eq!(emitted[0].0, "background.html");
        assert_eq!(
            emitted[0].1,
            format!(
                "<!DOCTYPE html><html><body>\ncontent\n<script src=\"{}\"></script>\n</body></html>",
                CLIENT_ASSET_PATH
            )
        );
        assert_eq!(emitted[1].0, CLIENT_ASSET_PATH);
    }

    #[tokio::test]
    async fn test_service_worker_is_prefixed() {
        let host = MemoryHost::default().with_file("sw.js", "console.log('worker');");
        let manifest = json!({"manifest_version": 3, "background": {"service_worker": "sw.js"}});
        let mut injector = injector();

        let (out, injection) = injector
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap();

        assert_eq!(out, manifest);
        assert_eq!(injection, Injection::ServiceWorker("sw.js".to_string()));
        let emitted = host.emitted();
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].1.starts_with(injector.bootstrap()));
        assert!(emitted[0].1.ends_with("console.log('worker');"));
    }

    #[tokio::test]
    async fn test_missing_service_worker_is_file_not_found() {
        let host = MemoryHost::default();
        let manifest = json!({"background": {"service_worker": "missing.js"}});

        let err = injector()
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap_err();

        assert!(matches!(err, InjectError::FileNotFound(p) if p.ends_with("missing.js")));
        assert!(host.emitted().is_empty());
    }

    #[tokio::test]
    async fn test_page_and_scripts_conflict() {
        let host = MemoryHost::default();
        let manifest = json!({"background": {"scripts": ["background.js"], "page": "background.html"}});

        let err = injector()
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap_err();

        assert!(matches!(err, InjectError::ConflictingBackground));
    }

    #[tokio::test]
    async fn test_injects_once_per_build() {
        let host = MemoryHost::default();
        let manifest = json!({"background": {"scripts": ["background.js"]}});
        let mut injector = injector();

        let (first, _) = injector
            .inject(&manifest, &host, Path::new("/ctx"))
            .await
            .unwrap();
        let (second, injection) = injector
            .inject(&first, &host, Path::new("/ctx"))
            .await
            .unwrap();

        assert_eq!(injection, Injection::AlreadyInjected);
        assert_eq!(first, second);
        assert_eq!(host.emitted().len(), 1);

        injector.reset();
        let (third, _) = injector
            .inject(&first, &host, Path::new("/ctx"))
            .await
            .unwrap();
        assert_eq!(third["background"]["scripts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_render_bootstrap() {
        let client = render_bootstrap(&BootstrapSettings {
            host: "127.0.0.1".to_string(),
            port: 9000,
            reconnect_time: Duration::from_millis(1500),
        });
        assert!(client.contains("ws://127.0.0.1:9000"));
        assert!(client.contains("parseInt(\"1500\", 10)"));
        assert!(!client.contains("{{"));
    }

    #[test]
    fn test_insert_script_tag_without_body() {
        assert_eq!(
            insert_script_tag("<html></html>", "a.js"),
            "<html></html>\n<script src=\"a.js\"></script>"
        );
    }
}
