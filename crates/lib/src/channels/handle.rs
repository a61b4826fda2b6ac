//! Transport handle: the operations the pipeline needs from a messaging transport.

use async_trait::async_trait;

/// Media attached to a message, as downloaded from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub mimetype: String,
    pub data: Vec<u8>,
}

/// Handle to a running transport (stop, send message, download media).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "bridge").
    fn id(&self) -> &str;
    /// Stop the channel connector.
    fn stop(&self);
    /// Send a text message to `to`, optionally quoting the message it answers.
    async fn send_message(&self, to: &str, text: &str, quoted_id: Option<&str>) -> Result<(), String>;
    /// Download the media of a message. Default returns error.
    async fn download_media(&self, _message_id: &str) -> Result<MediaPayload, String> {
        Err("media download not implemented".to_string())
    }
}
