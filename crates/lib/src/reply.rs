//! Reply emission: the one place backend failures become user-visible text.

use crate::channels::{ChannelHandle, IncomingMessage};
use crate::persona::{BackendCallFailed, BackendReply};

/// Reply text for a failed backend call; always carries the underlying error text.
pub fn apology(err: &BackendCallFailed) -> String {
    format!(
        "An error occured, please contact the administrator. ({})",
        err.message
    )
}

/// Send the backend's reply (or an apology) to the sender of `msg`, quoting it when possible.
/// Send failures are logged and swallowed.
pub async fn emit(
    transport: &dyn ChannelHandle,
    msg: &IncomingMessage,
    result: Result<BackendReply, BackendCallFailed>,
) {
    let text = match result {
        Ok(reply) => reply.msg,
        Err(e) => {
            log::warn!("backend call for {} failed: {}", msg.from, e);
            apology(&e)
        }
    };
    send_text(transport, msg, &text).await;
}

/// Send fixed text to the sender of `msg`.
pub async fn send_text(transport: &dyn ChannelHandle, msg: &IncomingMessage, text: &str) {
    if let Err(e) = transport
        .send_message(&msg.from, text, msg.id.as_deref())
        .await
    {
        log::warn!("{}: reply to {} failed: {}", transport.id(), msg.from, e);
    }
}
