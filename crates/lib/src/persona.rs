//! Persona backend client.
//!
//! Every persona speaks the same contract: `POST {apiServerUrl}{path}` with
//! `{ "message", "user_id" }`, answered by `{ "msg" }`. One client per configured persona.
//! Conversation continuity belongs to the backend; the sender id is the only key sent.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::PersonaRoute;

/// Request body for a persona backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendRequest<'a> {
    pub message: &'a str,
    pub user_id: &'a str,
}

/// Reply from a persona backend. `msg` is never empty once returned from [`PersonaClient::send`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendReply {
    pub msg: String,
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    msg: Option<String>,
}

/// Any failure talking to a persona backend: network, HTTP status, body parsing, or a missing reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendCallFailed {
    /// Text of the underlying error; shown to the user as-is.
    pub message: String,
}

impl BackendCallFailed {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BackendCallFailed {
    fn from(e: reqwest::Error) -> Self {
        Self::new(error_text(&e))
    }
}

/// Message of `err` followed by each of its sources, joined with `: `.
/// reqwest keeps the cause (connection refused, DNS, TLS) out of its own `Display`.
pub fn error_text(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

/// Join a base URL and a relative path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim().trim_start_matches('/')
    )
}

/// Client for one persona backend.
#[derive(Clone)]
pub struct PersonaClient {
    name: String,
    chat_url: String,
    voice_url: String,
    client: reqwest::Client,
}

impl PersonaClient {
    pub fn new(api_server_url: &str, route: &PersonaRoute, client: reqwest::Client) -> Self {
        let chat_url = join_url(api_server_url, &route.path);
        let voice_url = route
            .voice_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| join_url(api_server_url, p))
            .unwrap_or_else(|| chat_url.clone());
        Self {
            name: route.name.clone(),
            chat_url,
            voice_url,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn voice_url(&self) -> &str {
        &self.voice_url
    }

    /// POST a text message to the persona's chat endpoint.
    pub async fn send(&self, message: &str, user_id: &str) -> Result<BackendReply, BackendCallFailed> {
        self.post(&self.chat_url, message, user_id).await
    }

    /// POST a transcribed voice message to the persona's voice endpoint.
    pub async fn send_voice(
        &self,
        transcript: &str,
        user_id: &str,
    ) -> Result<BackendReply, BackendCallFailed> {
        self.post(&self.voice_url, transcript, user_id).await
    }

    async fn post(
        &self,
        url: &str,
        message: &str,
        user_id: &str,
    ) -> Result<BackendReply, BackendCallFailed> {
        log::info!("[{}] received prompt from {}: {}", self.name, user_id, message);
        let start = Instant::now();
        let res = self
            .client
            .post(url)
            .json(&BackendRequest { message, user_id })
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(BackendCallFailed::new(format!("{} {}", status, body.trim())));
        }
        let raw: RawReply = res.json().await?;
        let msg = raw
            .msg
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| BackendCallFailed::new("backend returned no reply"))?;
        log::info!(
            "[{}] answer to {}: {} ({}ms)",
            self.name,
            user_id,
            msg,
            start.elapsed().as_millis()
        );
        Ok(BackendReply { msg })
    }
}
