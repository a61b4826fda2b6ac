//! Inbound message from the transport: delivered to the dispatcher for admission and routing.

use serde::{Deserialize, Serialize};

/// A message delivered by the transport bridge.
///
/// Immutable once received; the self-command redirect builds a new value with
/// [`IncomingMessage::swapped`] instead of editing this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    /// Transport message id, used for quoting replies and media download.
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub body: String,
    /// Seconds since the Unix epoch, when the transport knows it.
    #[serde(default, rename = "timestamp")]
    pub timestamp_unix: Option<i64>,
    #[serde(default)]
    pub has_media: bool,
    #[serde(default, rename = "fromMe")]
    pub is_from_self: bool,
    #[serde(default, rename = "isGroup")]
    pub chat_is_group: bool,
}

impl IncomingMessage {
    /// Plain text message from `from` to `to` with no timestamp or media.
    pub fn text(from: impl Into<String>, to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
            body: body.into(),
            timestamp_unix: None,
            has_media: false,
            is_from_self: false,
            chat_is_group: false,
        }
    }

    /// Copy of this message with `from` and `to` exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            ..self.clone()
        }
    }
}
