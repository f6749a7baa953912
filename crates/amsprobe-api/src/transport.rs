// Shared transport configuration for opening AMS/TCP connections.
//
// Carries the router endpoint, the local AMS address requests are sent
// from, and the timeouts applied to connect and request round trips.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::addr::{AmsAddress, AmsNetId};

/// TCP port AMS routers listen on.
pub const AMS_TCP_PORT: u16 = 48898;

/// First port of the dynamic range handed to ADS clients.
pub const DEFAULT_SOURCE_PORT: u16 = 32905;

/// Shared transport configuration for building `AdsClient` connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// TCP endpoint of the AMS router.
    pub router: SocketAddr,
    /// Local AMS address stamped on outgoing requests.
    pub source: AmsAddress,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Timeout for a single request/response round trip.
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            router: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, AMS_TCP_PORT)),
            source: AmsAddress::new(
                AmsNetId::from_ipv4(Ipv4Addr::LOCALHOST),
                DEFAULT_SOURCE_PORT,
            ),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Use `router` as the endpoint, deriving the source net id from its IP
    /// when the router is IPv4.
    pub fn for_router(router: SocketAddr) -> Self {
        let mut config = Self {
            router,
            ..Self::default()
        };
        if let SocketAddr::V4(v4) = router {
            config.source.net_id = AmsNetId::from_ipv4(*v4.ip());
        }
        config
    }

    pub fn with_source(mut self, source: AmsAddress) -> Self {
        self.source = source;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
