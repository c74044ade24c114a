//! Live-reload message protocol.
//!
//! JSON messages pushed from the dev server to browser clients:
//!
//! - `connected`: sent once after the WebSocket handshake
//! - `reload`: full page reload
//! - `css`: replace a stylesheet in place (no reload)
//! - `error`: show the build-error overlay
//! - `clear_error`: hide the overlay after a successful rebuild

use serde::{Deserialize, Serialize};

/// Message sent over the live-reload WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected {
        /// Server version
        version: String,
    },

    /// Full page reload
    Reload {
        /// Optional reason, shown in the browser console
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Stylesheet update
    Css {
        /// URL path of the stylesheet, e.g. `/css/main.min.css`
        path: String,
        /// New CSS content
        content: String,
    },

    /// Build failure (display overlay, no reload)
    Error {
        /// Group that failed, e.g. `styles`
        group: String,
        message: String,
    },

    /// Clear the error overlay
    ClearError,
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn reload(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn css(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Css {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn error(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            group: group.into(),
            message: message.into(),
        }
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> String {
        // Every variant holds only strings, serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
