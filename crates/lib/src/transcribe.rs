//! Speech-to-text client used when the media policy is `transcribe`.
//! Raw audio is POSTed as the request body; the service answers `{ "text": string }`.

use serde::Deserialize;

use crate::channels::MediaPayload;
use crate::persona::error_text;

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription request failed: {0}")]
    Request(String),
    #[error("transcription api error: {0}")]
    Api(String),
    #[error("transcription returned no text")]
    Empty,
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(error_text(&e))
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Client for the transcription service.
#[derive(Clone)]
pub struct TranscriptionClient {
    url: String,
    client: reqwest::Client,
}

impl TranscriptionClient {
    pub fn new(url: &str, client: reqwest::Client) -> Self {
        Self {
            url: url.trim().to_string(),
            client,
        }
    }

    /// Transcribe one audio payload. Whitespace-only results are an error.
    pub async fn transcribe(&self, media: &MediaPayload) -> Result<String, TranscriptionError> {
        let res = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, media.mimetype.as_str())
            .body(media.data.clone())
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api(format!("{} {}", status, body)));
        }
        let data: TranscriptionResponse = res.json().await?;
        let text = data.text.map(|t| t.trim().to_string()).unwrap_or_default();
        if text.is_empty() {
            return Err(TranscriptionError::Empty);
        }
        log::debug!("transcribed {} bytes of {}: {}", media.data.len(), media.mimetype, text);
        Ok(text)
    }
}
