//! End-to-end tests for manifest builds.
//!
//! Each test lays out an extension in a temp directory and drives it through
//! a `BuildSession` with the filesystem host, checking what lands in `dist/`.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p webext-tests --test e2e_pipeline
//! ```

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use webext_cli::{BuildSession, Config, FsHost};
use webext_manifest::{Vendor, CLIENT_ASSET_PATH};
use webext_reload::ChangeTracker;
use webext_tests::fixtures::ExtensionFixture;
use webext_tests::harness::{connect, next_json, wait_until};

fn session_for(config: Config) -> (BuildSession, FsHost) {
    let session = BuildSession::new(config).with_tracker(ChangeTracker::new(0));
    let host = FsHost::new(session.out_dir());
    (session, host)
}

#[tokio::test]
async fn test_service_worker_gets_client_prepended() {
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 3,
        "name": "worker",
        "version": "1.0.0",
        "background": {"service_worker": "bg.js"}
    }));
    fixture.write("bg.js", "console.log('worker');\n");
    let (mut session, host) = session_for(fixture.config());

    session.rebuild(&host, &[]).await.unwrap();

    let worker = fixture.read_output("bg.js");
    assert!(worker.starts_with("/* webext live-reload client."));
    assert!(worker.ends_with("console.log('worker');\n"));
    let port = session.reload_handle().unwrap().local_addr().port();
    assert!(worker.contains(&format!("ws://127.0.0.1:{}", port)));
    assert_eq!(
        fixture.output_manifest()["background"],
        json!({"service_worker": "bg.js"})
    );
    session.shutdown();
}

#[tokio::test]
async fn test_background_page_gets_script_tag() {
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 2,
        "name": "page",
        "version": "1.0.0",
        "background": {"page": "background.html"}
    }));
    fixture.write(
        "background.html",
        "<html>\n<body>\n<script src=\"bg.js\"></script>\n</body>\n</html>\n",
    );
    let (mut session, host) = session_for(fixture.config());

    session.rebuild(&host, &[]).await.unwrap();

    let page = fixture.read_output("background.html");
    let tag = format!("<script src=\"{}\"></script>", CLIENT_ASSET_PATH);
    let tag_at = page.find(&tag).unwrap();
    assert!(tag_at < page.find("</body>").unwrap());
    assert!(tag_at > page.find("bg.js").unwrap());
    assert!(!fixture.read_output(CLIENT_ASSET_PATH).is_empty());
    session.shutdown();
}

#[tokio::test]
async fn test_missing_background_is_created() {
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 3,
        "name": "bare",
        "version": "1.0.0"
    }));
    let (mut session, host) = session_for(fixture.config());

    session.rebuild(&host, &[]).await.unwrap();

    assert_eq!(
        fixture.output_manifest()["background"],
        json!({"service_worker": CLIENT_ASSET_PATH})
    );
    assert!(!fixture.read_output(CLIENT_ASSET_PATH).is_empty());
    session.shutdown();
}

#[tokio::test]
async fn test_missing_service_worker_still_builds() {
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 3,
        "name": "worker",
        "version": "1.0.0",
        "background": {"service_worker": "missing.js"}
    }));
    let (mut session, host) = session_for(fixture.config());

    session.rebuild(&host, &[]).await.unwrap();

    assert!(fixture.path("dist").join("manifest.json").is_file());
    assert_eq!(
        fixture.output_manifest()["background"],
        json!({"service_worker": "missing.js"})
    );
    assert!(!fixture.path("dist").join("missing.js").exists());
    session.shutdown();
}

#[tokio::test]
async fn test_page_and_scripts_conflict_fails_build() {
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 2,
        "name": "conflict",
        "version": "1.0.0",
        "background": {"page": "bg.html", "scripts": ["bg.js"]}
    }));
    let (mut session, host) = session_for(fixture.config());

    let err = session.rebuild(&host, &[]).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("only 1 may be present"), "{}", message);
    session.shutdown();
}

#[tokio::test]
async fn test_one_shot_build_resolves_vendor_and_env() {
    std::env::set_var("WEBEXT_E2E_HOMEPAGE", "https://example.org");
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 2,
        "name": "vendor",
        "version": "1.0.0",
        "homepage_url": "__WEBEXT_E2E_HOMEPAGE__",
        "__firefox__browser_specific_settings": {"gecko": {"id": "x@example.org"}},
        "__chrome|opera__minimum_chrome_version": "88",
        "background": {"scripts": ["bg.js"]}
    }));
    let config = Config {
        vendor: Vendor::Firefox,
        ..fixture.config()
    };
    let (mut session, host) = session_for(config);

    let output = session.on_before_emit(&host).await.unwrap().unwrap();
    assert!(output.is_valid());

    assert_eq!(
        fixture.output_manifest(),
        json!({
            "manifest_version": 2,
            "name": "vendor",
            "version": "1.0.0",
            "homepage_url": "https://example.org",
            "browser_specific_settings": {"gecko": {"id": "x@example.org"}},
            "background": {"scripts": ["bg.js"]}
        })
    );
}

#[tokio::test]
async fn test_invalid_manifest_still_emitted() {
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 3,
        "name": "invalid",
        "version": "1.0.0",
        "browser_action": {"default_popup": "popup.html"}
    }));
    let config = Config {
        autoreload: false,
        ..fixture.config()
    };
    let (mut session, host) = session_for(config);

    let output = session.on_before_emit(&host).await.unwrap().unwrap();
    let errors = output.errors.unwrap();
    assert_eq!(errors[0].path, "browser_action");
    assert_eq!(
        fixture.output_manifest()["browser_action"]["default_popup"],
        "popup.html"
    );
}

#[tokio::test]
async fn test_rebuild_notifies_connected_client() {
    let fixture = ExtensionFixture::new(&json!({
        "manifest_version": 2,
        "name": "live",
        "version": "1.0.0",
        "background": {"scripts": ["bg.js"]}
    }));
    fixture.write("bg.js", "");
    let (mut session, host) = session_for(fixture.config());

    // First build reports every source file; nobody is listening yet.
    let first = session.rebuild(&host, &[]).await.unwrap();
    assert!(first.contains(&"bg.js".to_string()));
    assert!(first.contains(&"manifest.json".to_string()));

    let handle = session.reload_handle().unwrap().clone();
    let mut client = connect(handle.local_addr()).await;
    assert!(wait_until(Duration::from_secs(5), || handle.connection_count() == 1).await);

    let popup = fixture.write("popup.js", "console.log('popup');");
    let changes = session.rebuild(&host, &[popup]).await.unwrap();
    assert_eq!(changes, vec!["popup.js".to_string()]);

    let frame = next_json(&mut client, Duration::from_secs(5)).await.unwrap();
    assert_eq!(frame, json!({"action": "reload", "changedFiles": ["popup.js"]}));
    assert!(!session.manifest_changed());

    session.shutdown();
}
