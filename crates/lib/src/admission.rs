//! Admission control: decide, per inbound message, whether it reaches a persona.
//!
//! Rules run in a fixed order and the first match wins:
//! 1. not ready yet -> drop
//! 2. sent before the ready instant -> drop
//! 3. group chat while group chats are disabled -> drop
//! 4. own message: `/command` is swapped and redirected, anything else is dropped
//! 5. media: dropped with a notice, or handed to transcription (per [`MediaPolicy`])
//! 6. everything else is forwarded

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::OnceLock;

use crate::channels::IncomingMessage;
use crate::config::{Config, MediaPolicy};

/// Prefix that turns a note-to-self into an operator command.
pub const COMMAND_PREFIX: char = '/';

/// Instant the process became ready to accept messages. Written once, read by every message task.
#[derive(Debug, Default)]
pub struct ReadyTimestamp(OnceLock<DateTime<Utc>>);

impl ReadyTimestamp {
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Already-ready timestamp (for tests and one-shot tools).
    pub fn at(instant: DateTime<Utc>) -> Self {
        let ready = Self::new();
        ready.set(instant);
        ready
    }

    /// Mark ready now. Later calls keep the first instant. Returns the instant in effect.
    pub fn mark_ready(&self) -> DateTime<Utc> {
        *self.0.get_or_init(Utc::now)
    }

    /// Set the ready instant. Ignored if already set.
    pub fn set(&self, instant: DateTime<Utc>) {
        let _ = self.0.set(instant);
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0.get().copied()
    }
}

/// Config-derived inputs to admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub groupchats_enabled: bool,
    pub media: MediaPolicy,
}

impl AdmissionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            groupchats_enabled: config.channels.groupchats_enabled,
            media: config.media.policy,
        }
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            groupchats_enabled: false,
            media: MediaPolicy::Disabled,
        }
    }
}

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotReady,
    Stale,
    GroupChat,
    SelfNote,
    MediaDisabled,
}

impl DropReason {
    /// True when the sender should be told the message was not processed.
    pub fn notifies_sender(&self) -> bool {
        matches!(self, Self::MediaDisabled)
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "not ready yet"),
            Self::Stale => write!(f, "sent before ready"),
            Self::GroupChat => write!(f, "group chats are disabled"),
            Self::SelfNote => write!(f, "own note"),
            Self::MediaDisabled => write!(f, "media is disabled"),
        }
    }
}

/// Outcome of admission for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Drop(DropReason),
    /// Operator command: sender and recipient swapped, then routed like any other message.
    Redirect(IncomingMessage),
    Forward(IncomingMessage),
    /// Media under the transcription policy: transcribe first, then route.
    Transcribe(IncomingMessage),
}

/// True if the message was sent strictly before the ready instant.
/// Unrepresentable timestamps count as unknown, like a missing one.
fn is_stale(timestamp_unix: Option<i64>, ready_at: DateTime<Utc>) -> bool {
    timestamp_unix
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .is_some_and(|sent_at| sent_at < ready_at)
}

/// Run the admission rules for `msg`.
pub fn admit(msg: &IncomingMessage, ready: &ReadyTimestamp, policy: &AdmissionPolicy) -> Admission {
    let Some(ready_at) = ready.get() else {
        log::debug!("ignoring message because relay is not ready yet: {}", msg.body);
        return Admission::Drop(DropReason::NotReady);
    };
    if is_stale(msg.timestamp_unix, ready_at) {
        log::debug!("ignoring old message: {}", msg.body);
        return Admission::Drop(DropReason::Stale);
    }
    if msg.chat_is_group && !policy.groupchats_enabled {
        log::debug!("ignoring group chat message from {}", msg.from);
        return Admission::Drop(DropReason::GroupChat);
    }

    let (candidate, redirected) = if msg.is_from_self {
        if !msg.body.starts_with(COMMAND_PREFIX) {
            log::info!("ignoring own note to {}", msg.to);
            return Admission::Drop(DropReason::SelfNote);
        }
        log::info!("operator command {:?}: redirecting {} -> {}", msg.body, msg.to, msg.from);
        (msg.swapped(), true)
    } else {
        (msg.clone(), false)
    };

    if candidate.has_media {
        return match policy.media {
            MediaPolicy::Disabled => {
                log::info!("media from {} dropped: media is disabled", candidate.from);
                Admission::Drop(DropReason::MediaDisabled)
            }
            MediaPolicy::Transcribe => Admission::Transcribe(candidate),
        };
    }

    if redirected {
        Admission::Redirect(candidate)
    } else {
        Admission::Forward(candidate)
    }
}
