//! Messaging transport seam.
//!
//! The pipeline only depends on [`ChannelHandle`]; the bridge connector is the one
//! concrete transport. Inbound messages are pushed to the gateway by the bridge.

mod bridge;
mod handle;
mod inbound;

pub use bridge::BridgeChannel;
pub use handle::{ChannelHandle, MediaPayload};
pub use inbound::IncomingMessage;
