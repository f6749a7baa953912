//! Router settings for amsprobe.
//!
//! TOML file + `AMSPROBE_*` environment loading via figment, translation to
//! `amsprobe_core::MonitorConfig`, and a flattened key/value view used for
//! the startup configuration dump.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use amsprobe_core::{
    AMS_TCP_PORT, AmsAddress, AmsNetId, DEFAULT_SOURCE_PORT, MonitorConfig, POLL_INTERVAL,
    RouterSettings, SessionSettings, TransportConfig,
};

/// Environment prefix for settings overrides (`AMSPROBE_ROUTER__NETID`).
pub const ENV_PREFIX: &str = "AMSPROBE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Local AMS router identity and relays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<RouterSettings>,

    /// Session tuning.
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSection {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// AMS port stamped on outgoing requests.
    #[serde(default = "default_source_port")]
    pub source_port: u16,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            source_port: default_source_port(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}
fn default_source_port() -> u16 {
    DEFAULT_SOURCE_PORT
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "amsprobe", "amsprobe").map_or_else(
        || PathBuf::from("amsprobe.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Build the layered figment: defaults, then the TOML file, then env.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .map(|key| canonical_key(key.as_str()).into())
                .lowercase(false),
        )
}

/// Map an env-derived dotted key onto the key spelling used in the file,
/// so `AMSPROBE_ROUTER__NETID` overrides `router.netId` instead of
/// landing beside it.
fn canonical_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    match key.as_str() {
        "router.netid" => "router.netId".to_owned(),
        "router.loopbackip" => "router.loopbackIP".to_owned(),
        "router.loopbackport" => "router.loopbackPort".to_owned(),
        _ => key,
    }
}

/// Load the Config from `path` (or the default location) + environment.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

/// Render the config as TOML.
pub fn render_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

// ── Translation ─────────────────────────────────────────────────────

/// Translate loaded settings into the immutable value the monitor runs on.
///
/// The router endpoint is `loopbackIP:loopbackPort` (default
/// `127.0.0.1:48898`). The local net id is `router.netId`, or the loopback
/// IPv4 address followed by `.1.1`.
pub fn to_monitor_config(cfg: &Config) -> Result<MonitorConfig, ConfigError> {
    let router = cfg.router.clone().unwrap_or_default();

    let ip = router
        .loopback_ip
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let port = router.loopback_port.unwrap_or(AMS_TCP_PORT);
    let endpoint = SocketAddr::new(ip, port);

    let net_id = match router.net_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            raw.parse::<AmsNetId>()
                .map_err(|e| ConfigError::Validation {
                    field: "router.netId".into(),
                    reason: e.to_string(),
                })?
        }
        _ => match ip {
            IpAddr::V4(v4) => AmsNetId::from_ipv4(v4),
            IpAddr::V6(_) => AmsNetId::from_ipv4(Ipv4Addr::LOCALHOST),
        },
    };

    if cfg.session.timeout == 0 {
        return Err(ConfigError::Validation {
            field: "session.timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    let session = SessionSettings {
        timeout: Duration::from_secs(cfg.session.timeout),
    };

    let transport = TransportConfig::for_router(endpoint)
        .with_source(AmsAddress::new(net_id, cfg.session.source_port))
        .with_request_timeout(session.timeout);

    Ok(MonitorConfig {
        router: cfg.router.clone(),
        transport,
        session,
        poll_interval: POLL_INTERVAL,
    })
}

// ── Dump ────────────────────────────────────────────────────────────

/// Flatten the config into sorted `(dotted.key, value)` pairs.
pub fn flatten(cfg: &Config) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Ok(value) = serde_json::to_value(cfg) {
        flatten_into(&mut out, String::new(), &value);
    }
    out.sort();
    out
}

fn flatten_into(out: &mut Vec<(String, String)>, prefix: String, value: &serde_json::Value) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten_into(out, join(key), child);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(out, join(&index.to_string()), child);
            }
        }
        serde_json::Value::Null => {}
        serde_json::Value::String(s) => out.push((prefix, s.clone())),
        other => out.push((prefix, other.to_string())),
    }
}
