//! Gateway HTTP server: health probe and inbound webhook for the transport bridge.

use crate::admission::ReadyTimestamp;
use crate::channels::{BridgeChannel, ChannelHandle, IncomingMessage};
use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use crate::routing::PersonaRouter;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Header the bridge uses to prove it knows the shared secret.
pub const BRIDGE_SECRET_HEADER: &str = "x-relay-bridge-secret";

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    /// When Some, inbound POSTs must carry this value in [`BRIDGE_SECRET_HEADER`].
    pub webhook_secret: Option<String>,
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// When bind is not loopback, a bridge webhook secret must be configured or startup fails.
/// The ready timestamp is set once the listener is bound; messages sent earlier are ignored.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    config.validate()?;
    let bind = config.gateway.bind.trim().to_string();
    let webhook_secret = config::resolve_bridge_secret(&config);
    if !config::is_loopback_bind(&bind) && webhook_secret.is_none() {
        anyhow::bail!(
            "refusing to bind gateway to {} without a webhook secret (set channels.bridge.webhookSecret or RELAY_BRIDGE_SECRET)",
            bind
        );
    }
    if config.personas.is_empty() {
        log::warn!("no personas configured; every inbound message will be ignored");
    }

    let client = reqwest::Client::new();
    let router = Arc::new(PersonaRouter::from_config(&config, client.clone())?);
    let bridge = Arc::new(BridgeChannel::new(&config.channels.bridge.url, client.clone()));
    let transport: Arc<dyn ChannelHandle> = bridge.clone();
    let ready = Arc::new(ReadyTimestamp::new());
    let dispatcher = Dispatcher::new(&config, ready.clone(), router, transport, client);

    let port = config.gateway.port;
    let state = GatewayState {
        config: Arc::new(config),
        dispatcher,
        webhook_secret,
    };
    let app = Router::new()
        .route("/", get(health_http))
        .route("/inbound", post(inbound_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    let ready_at = ready.mark_ready();
    log::info!("gateway listening on {} (ready at {})", bind_addr, ready_at);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(bridge))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM), then stops the bridge.
async fn shutdown_signal(bridge: Arc<BridgeChannel>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping {} channel", bridge.id());
    bridge.stop();
}

/// True when no secret is configured or the request carries the expected one.
fn secret_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(BRIDGE_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided == expected)
}

/// POST /inbound: receives one message from the bridge; verifies optional secret, spawns its task.
async fn inbound_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !secret_matches(state.webhook_secret.as_deref(), &headers) {
        return StatusCode::FORBIDDEN;
    }
    let msg: IncomingMessage = match serde_json::from_slice(&body) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("inbound: bad payload: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        let from = msg.from.clone();
        let outcome = dispatcher.handle(msg).await;
        log::debug!("inbound: message from {} -> {:?}", from, outcome);
    });
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "ready": state.dispatcher.ready().get().is_some(),
        "personas": state.dispatcher.router().len(),
        "port": state.config.gateway.port,
    }))
}
