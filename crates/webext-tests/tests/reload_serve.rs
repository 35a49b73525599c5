//! Integration tests for the reload server and coordinator.
//!
//! These tests verify live reload over a real socket by:
//! - Starting a reload server on a dynamic port
//! - Connecting raw WebSocket clients and coordinators
//! - Broadcasting notifications and checking what each side observes
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p webext-tests --test reload_serve
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use webext_reload::{
    ConnectionState, CoordinatorConfig, ExtensionRuntime, ExtensionView, ReloadCoordinator,
    ReloadHandle, ReloadServer,
};
use webext_tests::harness::{connect, next_json, wait_until};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingRuntime {
    calls: Mutex<Vec<String>>,
}

impl RecordingRuntime {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl ExtensionRuntime for RecordingRuntime {
    fn manifest(&self) -> Value {
        json!({
            "manifest_version": 3,
            "name": "n",
            "version": "1",
            "background": {"service_worker": "sw.js"},
            "action": {"default_popup": "popup.html"}
        })
    }

    fn reload(&self) {
        self.record("reload");
    }

    fn reload_active_tab(&self) {
        self.record("tab");
    }

    fn open_views(&self) -> Vec<ExtensionView> {
        vec![ExtensionView {
            id: "popup".to_string(),
            url: "chrome-extension://abc/popup.html".to_string(),
        }]
    }

    fn reload_view(&self, view: &ExtensionView) {
        self.record(format!("view:{}", view.id));
    }
}

async fn start_server() -> ReloadHandle {
    let mut server = ReloadServer::new();
    server.start("127.0.0.1", 0).await.unwrap()
}

fn spawn_coordinator(
    port: u16,
) -> (
    Arc<ReloadCoordinator<RecordingRuntime>>,
    tokio::task::JoinHandle<()>,
) {
    let coordinator = Arc::new(ReloadCoordinator::new(
        RecordingRuntime::default(),
        CoordinatorConfig {
            host: "127.0.0.1".to_string(),
            port,
            reconnect_delay: Duration::from_millis(50),
        },
    ));
    let task = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        async move { coordinator.run().await }
    });
    (coordinator, task)
}

#[tokio::test]
async fn test_every_client_gets_each_notification_in_order() {
    let handle = start_server().await;
    let mut a = connect(handle.local_addr()).await;
    let mut b = connect(handle.local_addr()).await;
    assert!(wait_until(TIMEOUT, || handle.connection_count() == 2).await);

    assert_eq!(handle.notify(vec!["one.js".to_string()]), 2);
    assert_eq!(handle.notify(vec!["two.js".to_string()]), 2);

    for client in [&mut a, &mut b] {
        let first = next_json(client, TIMEOUT).await.unwrap();
        let second = next_json(client, TIMEOUT).await.unwrap();
        assert_eq!(first["changedFiles"], json!(["one.js"]));
        assert_eq!(second["changedFiles"], json!(["two.js"]));
    }
    handle.shutdown();
}

#[tokio::test]
async fn test_closed_client_receives_nothing() {
    let handle = start_server().await;
    let mut gone = connect(handle.local_addr()).await;
    let mut stays = connect(handle.local_addr()).await;
    assert!(wait_until(TIMEOUT, || handle.connection_count() == 2).await);

    gone.close(None).await.unwrap();
    assert!(wait_until(TIMEOUT, || handle.connection_count() == 1).await);

    assert_eq!(handle.notify(vec!["a.js".to_string()]), 1);
    assert_eq!(
        next_json(&mut stays, TIMEOUT).await.unwrap(),
        json!({"action": "reload", "changedFiles": ["a.js"]})
    );
    handle.shutdown();
}

#[tokio::test]
async fn test_coordinator_applies_full_and_smart_reloads() {
    let handle = start_server().await;
    let (coordinator, task) = spawn_coordinator(handle.local_addr().port());
    assert!(wait_until(TIMEOUT, || handle.connection_count() == 1).await);

    handle.notify(vec!["_locales/de/messages.json".to_string()]);
    assert!(wait_until(TIMEOUT, || coordinator.runtime().calls().len() == 1).await);
    assert_eq!(coordinator.runtime().calls(), vec!["reload"]);

    handle.notify(vec!["popup.js".to_string()]);
    assert!(wait_until(TIMEOUT, || coordinator.runtime().calls().len() == 3).await);
    assert_eq!(
        coordinator.runtime().calls(),
        vec!["reload", "tab", "view:popup"]
    );

    handle.notify(vec!["sw.js".to_string()]);
    assert!(wait_until(TIMEOUT, || coordinator.runtime().calls().len() == 4).await);
    assert_eq!(coordinator.runtime().calls()[3], "reload");

    coordinator.handle().stop();
    tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
    handle.shutdown();
}

#[tokio::test]
async fn test_coordinator_reconnects_after_server_restart() {
    let handle = start_server().await;
    let port = handle.local_addr().port();
    let (coordinator, task) = spawn_coordinator(port);
    assert!(wait_until(TIMEOUT, || coordinator.state() == ConnectionState::Connected).await);

    handle.shutdown();
    assert!(wait_until(TIMEOUT, || coordinator.state() != ConnectionState::Connected).await);

    // The old listener is released once its accept loop observes shutdown.
    let mut restarted = None;
    for _ in 0..100 {
        let mut server = ReloadServer::new();
        if let Ok(handle) = server.start("127.0.0.1", port).await {
            restarted = Some(handle);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let restarted = restarted.expect("port was not released");
    assert!(wait_until(TIMEOUT, || restarted.connection_count() == 1).await);
    assert!(wait_until(TIMEOUT, || coordinator.state() == ConnectionState::Connected).await);

    restarted.notify(vec!["manifest.json".to_string()]);
    assert!(wait_until(TIMEOUT, || coordinator.runtime().calls() == vec!["reload"]).await);

    coordinator.handle().stop();
    tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
    restarted.shutdown();
}
