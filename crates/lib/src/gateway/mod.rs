//! Gateway: HTTP surface of the relay.
//!
//! Single port serves the health probe (`GET /`) and the bridge webhook (`POST /inbound`).
//! Each accepted message is processed on its own task.

mod server;

pub use server::{run_gateway, GatewayState, BRIDGE_SECRET_HEADER};
