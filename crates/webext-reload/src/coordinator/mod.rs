//! In-extension reload coordinator.
//!
//! Connects to the reload server, decides how to apply each notification,
//! and reconnects after a fixed delay whenever the connection drops.

mod policy;
mod runtime;
mod timer;


use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::protocol::{parse_server_message, ServerMessage};
use crate::server::{DEFAULT_HOST, DEFAULT_PORT};

pub use policy::{decide, FullReloadReason, ReloadDecision};
pub use runtime::{ExtensionRuntime, ExtensionView};
pub use timer::ReconnectTimer;

/// Default delay before reconnecting.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Where and how often the coordinator connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub host: String,
    pub port: u16,
    pub reconnect_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl CoordinatorConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Coordinator connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Applying a received notification.
    Deciding,
    Disconnected,
}

/// Stops a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    stop: broadcast::Sender<()>,
}

impl CoordinatorHandle {
    pub fn stop(&self) {
        let _ = self.stop.send(());
    }
}

/// Drives an [`ExtensionRuntime`] from reload notifications.
pub struct ReloadCoordinator<R: ExtensionRuntime> {
    runtime: R,
    config: CoordinatorConfig,
    state: watch::Sender<ConnectionState>,
    stop: broadcast::Sender<()>,
}

impl<R: ExtensionRuntime> ReloadCoordinator<R> {
    pub fn new(runtime: R, config: CoordinatorConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (stop, _) = broadcast::channel(1);
        Self {
            runtime,
            config,
            state,
            stop,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observes state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            stop: self.stop.clone(),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Handles one text frame from the server.
    ///
    /// Returns the decision applied, or `None` for malformed payloads and
    /// unknown actions.
    pub fn handle_text(&self, text: &str) -> Option<ReloadDecision> {
        let message = match parse_server_message(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("ignoring malformed reload message: {}", e);
                return None;
            }
        };

        match message {
            ServerMessage::Reload { changed_files } => {
                let previous = self.state();
                self.set_state(ConnectionState::Deciding);
                let manifest = self.runtime.manifest();
                let decision = decide(changed_files.as_deref(), &manifest);
                self.apply(decision);
                self.set_state(previous);
                Some(decision)
            }
            ServerMessage::Unknown { action } => {
                warn!("unknown action: {}", action);
                None
            }
        }
    }

    /// Performs the runtime calls for `decision`.
    pub fn apply(&self, decision: ReloadDecision) {
        match decision {
            ReloadDecision::Full(reason) => {
                info!("reloading extension ({})", reason);
                self.runtime.reload();
            }
            ReloadDecision::Smart => {
                info!("reloading active tab and extension views");
                self.runtime.reload_active_tab();
                for view in self.runtime.open_views() {
                    debug!("reloading view {}", view.url);
                    self.runtime.reload_view(&view);
                }
            }
        }
    }

    /// Connects and handles notifications until stopped, reconnecting after
    /// `reconnect_delay` whenever the connection closes or fails.
    pub async fn run(&self) {
        let mut stop_rx = self.stop.subscribe();
        let mut timer = ReconnectTimer::new(self.config.reconnect_delay);
        let url = self.config.url();

        loop {
            self.set_state(ConnectionState::Connecting);
            match connect_async(url.as_str()).await {
                Ok((ws_stream, _)) => {
                    self.set_state(ConnectionState::Connected);
                    info!("connected to reload server at {}", url);

                    let (mut write, mut read) = ws_stream.split();
                    loop {
                        tokio::select! {
                            msg_opt = read.next() => {
                                match msg_opt {
                                    Some(Ok(Message::Text(text))) => {
                                        self.handle_text(&text);
                                    }
                                    Some(Ok(Message::Close(_))) | None => break,
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        warn!("connection error: {}", e);
                                        break;
                                    }
                                }
                            }
                            _ = stop_rx.recv() => {
                                let _ = write.send(Message::Close(None)).await;
                                self.set_state(ConnectionState::Disconnected);
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("could not connect to {}: {}", url, e);
                }
            }

            self.set_state(ConnectionState::Disconnected);
            info!(
                "connection closed, reconnecting in {:?}",
                self.config.reconnect_delay
            );
            timer.schedule();
            tokio::select! {
                _ = timer.fired() => {}
                _ = stop_rx.recv() => return,
            }
        }
    }
}
