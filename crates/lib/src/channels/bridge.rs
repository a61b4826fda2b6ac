//! Bridge channel: talks to a sidecar process that owns the messaging-network session.
//!
//! Inbound messages arrive as webhook POSTs on the gateway (`/inbound`). Outbound replies
//! and media downloads go to the bridge's own HTTP API.

use crate::channels::handle::{ChannelHandle, MediaPayload};
use crate::persona::error_text;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest<'a> {
    to: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quoted_message_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    mimetype: String,
    /// Base64-encoded file content.
    data: String,
}

/// Bridge channel connector: sends replies via `POST /messages`, fetches media via `GET /media/{id}`.
pub struct BridgeChannel {
    id: String,
    base_url: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl BridgeChannel {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            id: "bridge".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            running: AtomicBool::new(true),
            client,
        }
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Send a text message through the bridge.
    pub async fn send_message(
        &self,
        to: &str,
        text: &str,
        quoted_id: Option<&str>,
    ) -> Result<(), String> {
        if !self.running() {
            return Err("bridge channel stopped".to_string());
        }
        let url = format!("{}/messages", self.base_url);
        let body = SendMessageRequest {
            to,
            text,
            quoted_message_id: quoted_id,
        };
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| error_text(&e))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("send message failed: {} {}", status, body));
        }
        Ok(())
    }

    /// `{base_url}/media/{message_id}`, with the id escaped as a single path segment.
    fn media_url(&self, message_id: &str) -> Result<reqwest::Url, String> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| format!("invalid bridge url {}: {}", self.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| format!("invalid bridge url {}", self.base_url))?
            .pop_if_empty()
            .push("media")
            .push(message_id);
        Ok(url)
    }

    /// Download and decode the media attached to a message.
    pub async fn download_media(&self, message_id: &str) -> Result<MediaPayload, String> {
        let url = self.media_url(message_id)?;
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| error_text(&e))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("media download failed: {} {}", status, body));
        }
        let media: MediaResponse = res.json().await.map_err(|e| error_text(&e))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(media.data.as_bytes())
            .map_err(|e| format!("invalid media encoding: {}", e))?;
        Ok(MediaPayload {
            mimetype: media.mimetype,
            data,
        })
    }
}

#[async_trait]
impl ChannelHandle for BridgeChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(&self, to: &str, text: &str, quoted_id: Option<&str>) -> Result<(), String> {
        BridgeChannel::send_message(self, to, text, quoted_id).await
    }

    async fn download_media(&self, message_id: &str) -> Result<MediaPayload, String> {
        BridgeChannel::download_media(self, message_id).await
    }
}
