// ── AMS addressing ──
//
// An AMS net id names a node inside the router's addressing scheme;
// combined with a port it identifies one ADS service on that node.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Port of the first PLC runtime on a TwinCAT 3 system.
pub const PLC_RUNTIME_PORT: u16 = 851;

/// Number of octets in an AMS net id.
const NET_ID_LEN: usize = 6;

// ── AmsNetId ────────────────────────────────────────────────────────

/// Six-octet AMS network identifier, written `a.b.c.d.e.f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AmsNetId([u8; NET_ID_LEN]);

impl AmsNetId {
    pub const fn new(octets: [u8; NET_ID_LEN]) -> Self {
        Self(octets)
    }

    /// Conventional net id for a host: its IPv4 address followed by `.1.1`.
    pub fn from_ipv4(ip: Ipv4Addr) -> Self {
        let [a, b, c, d] = ip.octets();
        Self([a, b, c, d, 1, 1])
    }

    pub fn octets(&self) -> [u8; NET_ID_LEN] {
        self.0
    }
}

impl fmt::Display for AmsNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a}.{b}.{c}.{d}.{e}.{g}")
    }
}

impl FromStr for AmsNetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| Error::InvalidNetId {
            value: s.to_owned(),
            reason,
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty".into()));
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != NET_ID_LEN {
            return Err(invalid(format!(
                "expected {NET_ID_LEN} dot-separated octets, found {}",
                parts.len()
            )));
        }

        let mut octets = [0u8; NET_ID_LEN];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            *slot = part
                .parse::<u8>()
                .map_err(|_| invalid(format!("'{part}' is not an octet (0-255)")))?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for AmsNetId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AmsNetId> for String {
    fn from(id: AmsNetId) -> Self {
        id.to_string()
    }
}

// ── AmsAddress ──────────────────────────────────────────────────────

/// A net id plus port: the full address of one ADS service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AmsAddress {
    pub net_id: AmsNetId,
    pub port: u16,
}

impl AmsAddress {
    pub const fn new(net_id: AmsNetId, port: u16) -> Self {
        Self { net_id, port }
    }
}

impl fmt::Display for AmsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.net_id, self.port)
    }
}

impl FromStr for AmsAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (net_id, port) = s.rsplit_once(':').ok_or_else(|| Error::InvalidAddress {
            value: s.to_owned(),
            reason: "missing ':<port>'".into(),
        })?;
        let port = port.parse::<u16>().map_err(|_| Error::InvalidAddress {
            value: s.to_owned(),
            reason: format!("'{port}' is not a port number"),
        })?;
        Ok(Self::new(net_id.parse()?, port))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_octets() {
        let id: AmsNetId = "5.1.204.160.1.1".parse().unwrap();
        assert_eq!(id.octets(), [5, 1, 204, 160, 1, 1]);
        assert_eq!(id.to_string(), "5.1.204.160.1.1");
    }

    #[test]
    fn rejects_wrong_octet_count() {
        let err = "192.168.1.10".parse::<AmsNetId>().unwrap_err();
        assert!(matches!(err, Error::InvalidNetId { .. }));
        assert!(err.to_string().contains("found 4"));
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!("5.1.204.300.1.1".parse::<AmsNetId>().is_err());
        assert!("5.1.x.160.1.1".parse::<AmsNetId>().is_err());
        assert!("5.1..160.1.1".parse::<AmsNetId>().is_err());
        assert!("".parse::<AmsNetId>().is_err());
        assert!("   ".parse::<AmsNetId>().is_err());
    }

    #[test]
    fn net_id_from_ipv4_appends_one_one() {
        let id = AmsNetId::from_ipv4(Ipv4Addr::new(172, 17, 0, 2));
        assert_eq!(id.to_string(), "172.17.0.2.1.1");
    }

    #[test]
    fn address_display_and_parse() {
        let addr: AmsAddress = "5.1.204.160.1.1:851".parse().unwrap();
        assert_eq!(addr.port, PLC_RUNTIME_PORT);
        assert_eq!(addr.to_string(), "5.1.204.160.1.1:851");
        assert!("5.1.204.160.1.1".parse::<AmsAddress>().is_err());
        assert!("5.1.204.160.1.1:99999".parse::<AmsAddress>().is_err());
    }

    #[test]
    fn net_id_serde_uses_dotted_string() {
        let id: AmsNetId = "10.0.0.1.1.1".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"10.0.0.1.1.1\"");
        let back: AmsNetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<AmsNetId>("\"1.2.3\"").is_err());
    }
}
