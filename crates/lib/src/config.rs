//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.relay/config.json`) and environment.
//! Everything here is read once at startup and treated as read-only afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings (health probe and inbound webhook).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Persona backend API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Persona routing table: one entry per destination address.
    #[serde(default)]
    pub personas: Vec<PersonaRoute>,

    /// Channel settings (group chats, transport bridge).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// How media (voice notes, images) is handled.
    #[serde(default)]
    pub media: MediaConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Persona backend API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Base URL every persona path is joined onto. Overridden by RELAY_API_SERVER_URL env.
    #[serde(default = "default_api_server_url")]
    pub server_url: String,
}

fn default_api_server_url() -> String {
    "https://api.mamaguru.co/".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_url: default_api_server_url(),
        }
    }
}

/// One persona: the destination address it owns and the backend paths it talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaRoute {
    /// Display name used in logs and by `relay ask --persona`.
    pub name: String,
    /// Destination identifier (e.g. "84777464037@c.us"); matched exactly against `to`.
    pub address: String,
    /// Chat endpoint path relative to the API server (e.g. "api/maya/chat").
    pub path: String,
    /// Endpoint for transcribed voice messages. Falls back to `path` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_path: Option<String>,
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    /// When false (default), messages from group chats are dropped. Overridden by RELAY_GROUPCHATS_ENABLED env.
    #[serde(default)]
    pub groupchats_enabled: bool,

    #[serde(default)]
    pub bridge: BridgeChannelConfig,
}

/// Transport bridge: the sidecar that owns the messaging-network session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeChannelConfig {
    /// Base URL of the bridge's HTTP API (outbound sends, media download).
    #[serde(default = "default_bridge_url")]
    pub url: String,
    /// Shared secret the bridge must send in X-Relay-Bridge-Secret. Overridden by RELAY_BRIDGE_SECRET env.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

impl Default for BridgeChannelConfig {
    fn default() -> Self {
        Self {
            url: default_bridge_url(),
            webhook_secret: None,
        }
    }
}

/// What to do with messages carrying media. The two policies are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPolicy {
    /// Reply with `disabledReply` and drop the message.
    #[default]
    Disabled,
    /// Download the media, transcribe it, and forward the transcript to the persona's voice path.
    Transcribe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    #[serde(default)]
    pub policy: MediaPolicy,
    /// Fixed reply sent when media arrives and the policy is `disabled`.
    #[serde(default = "default_media_disabled_reply")]
    pub disabled_reply: String,
    /// Transcription service endpoint. Required when the policy is `transcribe`.
    #[serde(default)]
    pub transcription_url: Option<String>,
}

fn default_media_disabled_reply() -> String {
    "This feature is currently disabled.".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            policy: MediaPolicy::default(),
            disabled_reply: default_media_disabled_reply(),
            transcription_url: None,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the API server URL: env RELAY_API_SERVER_URL overrides config.
pub fn resolve_api_server_url(config: &Config) -> String {
    env_non_empty("RELAY_API_SERVER_URL").unwrap_or_else(|| config.api.server_url.trim().to_string())
}

/// Resolve the group-chat flag: env RELAY_GROUPCHATS_ENABLED ("true"/"false") overrides config.
pub fn resolve_groupchats_enabled(config: &Config) -> bool {
    match env_non_empty("RELAY_GROUPCHATS_ENABLED") {
        Some(v) => parse_bool_flag(&v),
        None => config.channels.groupchats_enabled,
    }
}

/// Resolve the bridge webhook secret: env RELAY_BRIDGE_SECRET overrides config.
pub fn resolve_bridge_secret(config: &Config) -> Option<String> {
    env_non_empty("RELAY_BRIDGE_SECRET").or_else(|| {
        config
            .channels
            .bridge
            .webhook_secret
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Only a case-insensitive "true" enables a flag; anything else disables it.
fn parse_bool_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Apply env overrides in place so the rest of the process only reads `Config`.
pub fn apply_env_overrides(config: &mut Config) {
    config.api.server_url = resolve_api_server_url(config);
    config.channels.groupchats_enabled = resolve_groupchats_enabled(config);
    config.channels.bridge.webhook_secret = resolve_bridge_secret(config);
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

impl Config {
    /// Reject configurations the router cannot serve.
    pub fn validate(&self) -> Result<()> {
        if self.api.server_url.trim().is_empty() {
            anyhow::bail!("api.serverUrl must not be empty");
        }
        let mut seen = HashSet::new();
        for p in &self.personas {
            if p.address.trim().is_empty() {
                anyhow::bail!("persona {:?} has an empty address", p.name);
            }
            if p.path.trim().is_empty() {
                anyhow::bail!("persona {:?} has an empty path", p.name);
            }
            if !seen.insert(p.address.as_str()) {
                anyhow::bail!("address {} is assigned to more than one persona", p.address);
            }
        }
        if self.media.policy == MediaPolicy::Transcribe
            && self
                .media
                .transcription_url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty())
        {
            anyhow::bail!("media.policy \"transcribe\" requires media.transcriptionUrl");
        }
        Ok(())
    }

    /// Look up a persona by its display name (case-insensitive).
    pub fn persona_by_name(&self, name: &str) -> Option<&PersonaRoute> {
        self.personas
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or RELAY_CONFIG_PATH). Missing file => default config.
/// Env overrides are applied and the result validated. Returns the config and the path used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_env_overrides(&mut config);
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Process env is shared by every test thread; tests that touch it hold this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 3] = [
        "RELAY_API_SERVER_URL",
        "RELAY_GROUPCHATS_ENABLED",
        "RELAY_BRIDGE_SECRET",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("relay-config-{}-{}", std::process::id(), name))
    }

    fn route(name: &str, address: &str) -> PersonaRoute {
        PersonaRoute {
            name: name.to_string(),
            address: address.to_string(),
            path: format!("api/{}/chat", name),
            voice_path: None,
        }
    }

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 15152);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn defaults_keep_groups_and_media_off() {
        let config = Config::default();
        assert!(!config.channels.groupchats_enabled);
        assert_eq!(config.media.policy, MediaPolicy::Disabled);
        assert!(config.personas.is_empty());
    }

    #[test]
    fn parses_camel_case_file() {
        let json = r#"{
            "api": { "serverUrl": "http://backend:8000/" },
            "personas": [
                { "name": "maya", "address": "111@c.us", "path": "api/maya/chat", "voicePath": "api/chat/transcribe" }
            ],
            "channels": { "groupchatsEnabled": true },
            "media": { "policy": "transcribe", "transcriptionUrl": "http://stt/" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.api.server_url, "http://backend:8000/");
        assert_eq!(config.personas[0].voice_path.as_deref(), Some("api/chat/transcribe"));
        assert!(config.channels.groupchats_enabled);
        assert_eq!(config.media.policy, MediaPolicy::Transcribe);
        assert_eq!(config.media.disabled_reply, default_media_disabled_reply());
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_duplicate_address() {
        let mut config = Config::default();
        config.personas = vec![route("maya", "1@c.us"), route("samantha", "1@c.us")];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than one persona"));
    }

    #[test]
    fn validate_rejects_transcribe_without_url() {
        let mut config = Config::default();
        config.media.policy = MediaPolicy::Transcribe;
        assert!(config.validate().is_err());
        config.media.transcription_url = Some("http://stt/".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bool_flag_is_true_only_for_true() {
        assert!(parse_bool_flag("TRUE"));
        assert!(parse_bool_flag(" true "));
        assert!(!parse_bool_flag("1"));
        assert!(!parse_bool_flag("yes"));
    }

    #[test]
    fn persona_by_name_ignores_case() {
        let mut config = Config::default();
        config.personas = vec![route("maya", "1@c.us")];
        assert_eq!(config.persona_by_name("Maya").map(|p| p.address.as_str()), Some("1@c.us"));
        assert!(config.persona_by_name("journal").is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let path = temp_path("missing.json");
        let _ = std::fs::remove_file(&path);
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 15152);
        assert_eq!(config.api.server_url, default_api_server_url());
        assert!(!config.channels.groupchats_enabled);
        assert!(config.personas.is_empty());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let path = temp_path("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(Some(path.clone())).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(format!("{:#}", err).contains(&path.display().to_string()), "{:#}", err);
    }

    #[test]
    fn env_overrides_are_trimmed_and_win_over_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let path = temp_path("overrides.json");
        std::fs::write(
            &path,
            r#"{ "api": { "serverUrl": "http://file/" }, "channels": { "groupchatsEnabled": false } }"#,
        )
        .unwrap();
        std::env::set_var("RELAY_API_SERVER_URL", "  http://env:8000/  ");
        std::env::set_var("RELAY_GROUPCHATS_ENABLED", " TRUE ");
        std::env::set_var("RELAY_BRIDGE_SECRET", " s3cret ");
        let loaded = load_config(Some(path.clone()));
        clear_env();
        let _ = std::fs::remove_file(&path);

        let (config, _) = loaded.unwrap();
        assert_eq!(config.api.server_url, "http://env:8000/");
        assert!(config.channels.groupchats_enabled);
        assert_eq!(config.channels.bridge.webhook_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn groupchats_env_can_disable_file_setting() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let mut config = Config::default();
        config.channels.groupchats_enabled = true;
        std::env::set_var("RELAY_GROUPCHATS_ENABLED", "false");
        apply_env_overrides(&mut config);
        clear_env();
        assert!(!config.channels.groupchats_enabled);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let mut config = Config::default();
        config.api.server_url = "http://file/".to_string();
        config.channels.groupchats_enabled = true;
        config.channels.bridge.webhook_secret = Some("from-file".to_string());
        for key in ENV_KEYS {
            std::env::set_var(key, "   ");
        }
        apply_env_overrides(&mut config);
        clear_env();
        assert_eq!(config.api.server_url, "http://file/");
        assert!(config.channels.groupchats_enabled);
        assert_eq!(config.channels.bridge.webhook_secret.as_deref(), Some("from-file"));
    }
}
