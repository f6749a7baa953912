// ── Endpoint resolution ──
//
// Turns the HOST_AMS_NETID environment value into the AMS address of the
// target PLC runtime. The environment is read through an injectable
// lookup so callers never need to mutate process state.

use std::fmt;

use tracing::{error, info, info_span};

use amsprobe_api::{AmsAddress, AmsNetId, PLC_RUNTIME_PORT};

use crate::config::RouterSettings;
use crate::error::CoreError;

/// Environment key holding the target's AMS net id.
pub const HOST_NET_ID_VAR: &str = "HOST_AMS_NETID";

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Derives the target [`AmsAddress`] from the environment.
pub struct EndpointResolver {
    lookup: Box<Lookup>,
}

impl EndpointResolver {
    /// Resolve against the real process environment.
    pub fn from_process_env() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary key lookup.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Log the router settings, then build the target address.
    ///
    /// Fails with [`CoreError::Configuration`] when `HOST_AMS_NETID` is
    /// unset, blank, or not a valid AMS net id.
    pub fn resolve(&self, router: Option<&RouterSettings>) -> Result<AmsAddress, CoreError> {
        if let Some(settings) = router {
            log_router_settings(settings);
        }

        let raw = (self.lookup)(HOST_NET_ID_VAR).unwrap_or_default();
        if raw.trim().is_empty() {
            error!("{HOST_NET_ID_VAR} environment variable is not set!");
            return Err(CoreError::config(format!(
                "missing required environment value {HOST_NET_ID_VAR}"
            )));
        }

        let net_id: AmsNetId = raw.parse().map_err(|e| {
            error!(value = %raw, "{HOST_NET_ID_VAR} is not a valid AMS net id");
            CoreError::config(format!("{HOST_NET_ID_VAR}: {e}"))
        })?;
        info!("Host AMS NetID: {net_id}");

        let address = AmsAddress::new(net_id, PLC_RUNTIME_PORT);
        info!("Connecting to host TwinCAT at '{address}'");
        Ok(address)
    }
}

impl fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver").finish_non_exhaustive()
    }
}

fn log_router_settings(settings: &RouterSettings) {
    let _span = info_span!("starting").entered();

    if settings.net_id.is_some() {
        info!("RouterName  : {}", settings.name.as_deref().unwrap_or("<unset>"));
        info!("LocalNetID  : {}", settings.net_id.as_deref().unwrap_or_default());
        info!(
            "LoopbackIP  : {}",
            settings
                .loopback_ip
                .map_or_else(|| "<unset>".to_owned(), |ip| ip.to_string())
        );
        info!(
            "LoopbackPort: {}",
            settings
                .loopback_port
                .map_or_else(|| "<unset>".to_owned(), |p| p.to_string())
        );
    }

    for (index, relay) in settings.mqtt.iter().enumerate() {
        info!(index, "Address : {}", relay.address);
        info!(index, "Port    : {}", relay.port);
        info!(index, "Topic   : {}", relay.topic);
    }
}
