//! Per-message pipeline: admission -> persona routing -> backend call -> reply.

use std::sync::Arc;

use crate::admission::{self, Admission, AdmissionPolicy, DropReason, ReadyTimestamp};
use crate::channels::{ChannelHandle, IncomingMessage};
use crate::config::{Config, MediaPolicy};
use crate::persona::{BackendCallFailed, PersonaClient};
use crate::reply;
use crate::routing::PersonaRouter;
use crate::transcribe::TranscriptionClient;

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Dropped(DropReason),
    /// No persona owns the destination.
    Unroutable,
    /// A reply (or apology) was handed to the transport.
    Replied,
}

/// Everything a message task needs. Cheap to clone; shared state is read-only.
#[derive(Clone)]
pub struct Dispatcher {
    policy: AdmissionPolicy,
    ready: Arc<ReadyTimestamp>,
    router: Arc<PersonaRouter>,
    transport: Arc<dyn ChannelHandle>,
    transcriber: Option<TranscriptionClient>,
    media_disabled_reply: Arc<str>,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        ready: Arc<ReadyTimestamp>,
        router: Arc<PersonaRouter>,
        transport: Arc<dyn ChannelHandle>,
        client: reqwest::Client,
    ) -> Self {
        let transcriber = match (config.media.policy, config.media.transcription_url.as_deref()) {
            (MediaPolicy::Transcribe, Some(url)) => Some(TranscriptionClient::new(url, client)),
            _ => None,
        };
        Self {
            policy: AdmissionPolicy::from_config(config),
            ready,
            router,
            transport,
            transcriber,
            media_disabled_reply: Arc::from(config.media.disabled_reply.as_str()),
        }
    }

    pub fn ready(&self) -> &ReadyTimestamp {
        &self.ready
    }

    pub fn router(&self) -> &PersonaRouter {
        &self.router
    }

    /// Process one inbound message to completion. Never fails: backend problems become replies.
    pub async fn handle(&self, msg: IncomingMessage) -> Outcome {
        match admission::admit(&msg, &self.ready, &self.policy) {
            Admission::Drop(reason) => {
                if reason.notifies_sender() {
                    reply::send_text(self.transport.as_ref(), &msg, &self.media_disabled_reply).await;
                }
                Outcome::Dropped(reason)
            }
            Admission::Redirect(m) | Admission::Forward(m) => {
                let Some(persona) = self.route(&m) else {
                    return Outcome::Unroutable;
                };
                let result = persona.send(&m.body, &m.from).await;
                reply::emit(self.transport.as_ref(), &m, result).await;
                Outcome::Replied
            }
            Admission::Transcribe(m) => {
                let Some(persona) = self.route(&m) else {
                    return Outcome::Unroutable;
                };
                let result = match self.transcribe(&m).await {
                    Ok(transcript) => persona.send_voice(&transcript, &m.from).await,
                    Err(e) => Err(e),
                };
                reply::emit(self.transport.as_ref(), &m, result).await;
                Outcome::Replied
            }
        }
    }

    fn route(&self, msg: &IncomingMessage) -> Option<Arc<PersonaClient>> {
        let persona = self.router.resolve(&msg.to);
        if persona.is_none() {
            log::debug!("no persona for destination {}, ignoring message from {}", msg.to, msg.from);
        }
        persona
    }

    async fn transcribe(&self, msg: &IncomingMessage) -> Result<String, BackendCallFailed> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| BackendCallFailed::new("transcription is not configured"))?;
        let id = msg
            .id
            .as_deref()
            .ok_or_else(|| BackendCallFailed::new("media message has no id"))?;
        let media = self
            .transport
            .download_media(id)
            .await
            .map_err(BackendCallFailed::new)?;
        transcriber
            .transcribe(&media)
            .await
            .map_err(|e| BackendCallFailed::new(e.to_string()))
    }
}
