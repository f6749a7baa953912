// ── Monitor ──
//
// Ties the pieces together for one target:
// resolve → open session → poll until cancelled → close.

use std::io::Write;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::poll::{PollSummary, Poller};
use crate::resolver::EndpointResolver;
use crate::session::{Connector, RouterConnector, Session};

/// Health probe for a single controller.
pub struct Monitor<K: Connector = RouterConnector> {
    config: MonitorConfig,
    resolver: EndpointResolver,
    connector: K,
}

impl Monitor<RouterConnector> {
    /// Monitor that dials the router described by `config` and reads the
    /// target from the process environment.
    pub fn new(config: MonitorConfig) -> Self {
        let connector = RouterConnector::new(config.transport.clone());
        Self {
            config,
            resolver: EndpointResolver::from_process_env(),
            connector,
        }
    }
}

impl<K: Connector> Monitor<K> {
    /// Monitor with a custom connector.
    pub fn with_connector(config: MonitorConfig, connector: K) -> Self {
        Self {
            config,
            resolver: EndpointResolver::from_process_env(),
            connector,
        }
    }

    /// Replace the endpoint resolver.
    pub fn with_resolver(mut self, resolver: EndpointResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Run until `cancel` fires or something fails.
    ///
    /// Configuration and connection failures return before any polling.
    /// Once a session is open it is closed exactly once, whichever way
    /// the poll loop ends.
    pub async fn run<W: Write>(
        &self,
        cancel: &CancellationToken,
        out: W,
    ) -> Result<PollSummary, CoreError> {
        let target = self.resolver.resolve(self.config.router.as_ref())?;
        let session = Session::open(&self.connector, target, &self.config.session).await?;

        let mut poller = Poller::new(target, self.config.poll_interval, out);
        let outcome = session
            .scope(async |connection| poller.run(connection, cancel).await)
            .await;

        match outcome {
            Ok(summary) => {
                info!(reads = summary.reads, "Client Service stopped!");
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Client Service stopped on error");
                Err(e)
            }
        }
    }
}
