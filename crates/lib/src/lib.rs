//! Relay core library: admission control, persona routing, backend calls and replies
//! for inbound chat messages, plus the gateway that feeds them in.

pub mod admission;
pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod init;
pub mod persona;
pub mod reply;
pub mod routing;
pub mod transcribe;
