// ── Runtime monitor configuration ──
//
// These types describe *where* the router is and *how* to talk to it.
// They are plain immutable values: the binary (via amsprobe-config)
// builds a `MonitorConfig` and hands it in; core never reads files.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use amsprobe_api::TransportConfig;

/// Fixed delay between consecutive state reads.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Identity and relay settings of the local AMS router.
///
/// Read once at startup and only logged; broker relays are carried for
/// operator visibility and never contacted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Router name.
    pub name: Option<String>,

    /// Local AMS net id of the router.
    #[serde(rename = "netId", alias = "net_id")]
    pub net_id: Option<String>,

    /// Address the router accepts AMS/TCP connections on.
    #[serde(rename = "loopbackIP", alias = "loopback_ip")]
    pub loopback_ip: Option<IpAddr>,

    /// Port the router accepts AMS/TCP connections on.
    #[serde(rename = "loopbackPort", alias = "loopback_port")]
    pub loopback_port: Option<u16>,

    /// Message-broker relays.
    #[serde(default)]
    pub mqtt: Vec<BrokerRelay>,
}

/// One message-broker relay entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRelay {
    pub address: String,
    pub port: u16,
    pub topic: String,
}

/// Per-session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Bound on a single request/response round trip.
    pub timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

/// Everything a [`Monitor`](crate::Monitor) needs besides the target.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Router settings as loaded, for the startup dump.
    pub router: Option<RouterSettings>,
    /// Router endpoint and local source address.
    pub transport: TransportConfig,
    pub session: SessionSettings,
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            router: None,
            transport: TransportConfig::default(),
            session: SessionSettings::default(),
            poll_interval: POLL_INTERVAL,
        }
    }
}
