//! Error types for the reload server and client.

use thiserror::Error;

/// Errors from the live-reload subsystem.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The reload server could not acquire its port.
    #[error("failed to bind reload server to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A wire payload was not a valid notification envelope.
    #[error("could not parse server payload: {0}")]
    MessageParse(#[from] serde_json::Error),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
