//! Wire format for reload notifications.
//!
//! The server sends UTF-8 JSON text frames of one shape:
//!
//! ```json
//! {"action": "reload", "changedFiles": ["popup.js", "_locales/en/messages.json"]}
//! ```
//!
//! Receivers treat any other `action` as a no-op.

use serde::{Deserialize, Serialize};

use crate::error::ReloadError;
use crate::tracker::ChangeSet;

/// The only action the server sends.
pub const RELOAD_ACTION: &str = "reload";

/// Raw message envelope as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_files: Option<Vec<String>>,
}

/// A reload request carrying the files changed by the last build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadNotification {
    pub changed_files: ChangeSet,
}

impl ReloadNotification {
    pub fn new(changed_files: ChangeSet) -> Self {
        Self { changed_files }
    }

    /// Serializes the notification as a wire frame.
    pub fn to_json(&self) -> Result<String, ReloadError> {
        let envelope = Envelope {
            action: RELOAD_ACTION.to_string(),
            changed_files: Some(self.changed_files.clone()),
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

/// A decoded server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Reload request; `changed_files` is `None` when the field was absent.
    Reload { changed_files: Option<Vec<String>> },
    /// An action this client does not understand.
    Unknown { action: String },
}

/// Decodes a text frame.
pub fn parse_server_message(text: &str) -> Result<ServerMessage, ReloadError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    Ok(if envelope.action == RELOAD_ACTION {
        ServerMessage::Reload {
            changed_files: envelope.changed_files,
        }
    } else {
        ServerMessage::Unknown {
            action: envelope.action,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_notification_wire_shape() {
        let notification = ReloadNotification::new(vec!["popup.js".to_string()]);
        assert_eq!(
            notification.to_json().unwrap(),
            r#"{"action":"reload","changedFiles":["popup.js"]}"#
        );
    }

    #[test]
    fn test_parse_reload() {
        let msg = parse_server_message(r#"{"action":"reload","changedFiles":["a.js"]}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Reload {
                changed_files: Some(vec!["a.js".to_string()])
            }
        );
    }

    #[test]
    fn test_parse_reload_without_files() {
        let msg = parse_server_message(r#"{"action":"reload"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Reload { changed_files: None });
    }

    #[test]
    fn test_parse_unknown_action() {
        let msg = parse_server_message(r#"{"action":"explode","changedFiles":[]}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Unknown {
                action: "explode".to_string()
            }
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_server_message("not json"),
            Err(ReloadError::MessageParse(_))
        ));
        assert!(parse_server_message(r#"{"changedFiles":[]}"#).is_err());
    }
}
