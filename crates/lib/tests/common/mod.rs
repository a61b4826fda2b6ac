//! Test doubles: a recording transport and HTTP mock servers for persona backends,
//! the transcription service and the transport bridge.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Bytes, http::StatusCode, routing::post, Json, Router};
use lib::channels::{ChannelHandle, MediaPayload};
use lib::config::{Config, PersonaRoute};
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub const MAYA: &str = "111@c.us";
pub const SAMANTHA: &str = "222@c.us";
pub const JOURNAL: &str = "333@c.us";

/// One message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub to: String,
    pub text: String,
    pub quoted_id: Option<String>,
}

/// Transport that records outbound messages and serves canned media.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<Sent>>,
    pub media: Option<MediaPayload>,
}

impl RecordingChannel {
    pub fn with_media(media: MediaPayload) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            media: Some(media),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelHandle for RecordingChannel {
    fn id(&self) -> &str {
        "recording"
    }

    fn stop(&self) {}

    async fn send_message(&self, to: &str, text: &str, quoted_id: Option<&str>) -> Result<(), String> {
        self.sent.lock().unwrap().push(Sent {
            to: to.to_string(),
            text: text.to_string(),
            quoted_id: quoted_id.map(String::from),
        });
        Ok(())
    }

    async fn download_media(&self, _message_id: &str) -> Result<MediaPayload, String> {
        self.media.clone().ok_or_else(|| "no media".to_string())
    }
}

/// Requests received by a mock server: (path, JSON body).
pub type Calls = Arc<Mutex<Vec<(String, Value)>>>;

pub struct MockServer {
    /// Base URL with trailing slash, e.g. "http://127.0.0.1:1234/".
    pub url: String,
    pub calls: Calls,
}

impl MockServer {
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}/", addr)
}

/// JSON server answering each `(path, status, body)` route and recording request bodies.
pub async fn spawn_json_server(routes: &[(&str, StatusCode, Value)]) -> MockServer {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = Router::new();
    for (path, status, reply) in routes {
        let path = path.trim_start_matches('/').to_string();
        let route = format!("/{}", path);
        let calls = calls.clone();
        let status = *status;
        let reply = reply.clone();
        app = app.route(
            &route,
            post(move |Json(body): Json<Value>| {
                let calls = calls.clone();
                let reply = reply.clone();
                let path = path.clone();
                async move {
                    calls.lock().unwrap().push((path, body));
                    (status, Json(reply))
                }
            }),
        );
    }
    MockServer {
        url: serve(app).await,
        calls,
    }
}

/// Transcription service: records raw bodies (as byte length) and answers `{ "text": text }`.
pub async fn spawn_transcriber(text: &str) -> MockServer {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let reply = serde_json::json!({ "text": text });
    let recorded = calls.clone();
    let app = Router::new().route(
        "/transcribe",
        post(move |body: Bytes| {
            let calls = recorded.clone();
            let reply = reply.clone();
            async move {
                calls
                    .lock()
                    .unwrap()
                    .push(("transcribe".to_string(), Value::from(body.len())));
                Json(reply)
            }
        }),
    );
    MockServer {
        url: serve(app).await,
        calls,
    }
}

/// Port nothing is listening on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Config with the three reference personas pointing at `api_server_url`.
pub fn three_persona_config(api_server_url: &str) -> Config {
    let route = |name: &str, address: &str, path: &str, voice_path: Option<&str>| PersonaRoute {
        name: name.to_string(),
        address: address.to_string(),
        path: path.to_string(),
        voice_path: voice_path.map(String::from),
    };
    let mut config = Config::default();
    config.api.server_url = api_server_url.to_string();
    config.personas = vec![
        route("maya", MAYA, "api/maya/chat", Some("api/chat/transcribe")),
        route("samantha", SAMANTHA, "api/samantha/chat", Some("api/chat/transcribe")),
        route("journal", JOURNAL, "api/journal/chat", None),
    ];
    config
}

pub fn ok_reply(msg: &str) -> (StatusCode, Value) {
    (StatusCode::OK, serde_json::json!({ "msg": msg }))
}
