// ── Session lifecycle ──
//
// A `Session` owns exactly one connection to the target and closes it
// exactly once. `Session::scope` brackets a body future with the close,
// so teardown runs whether the body returns, fails, or panics.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use amsprobe_api::{AdsClient, AmsAddress, DeviceStateResult, TransportConfig};

use crate::config::SessionSettings;
use crate::error::CoreError;

// ── Capabilities ─────────────────────────────────────────────────────

/// A live connection that can read the target's state.
pub trait AdsConnection: Send {
    /// Issue one ReadState request and wait for its answer.
    fn read_state(
        &mut self,
    ) -> impl Future<Output = Result<DeviceStateResult, amsprobe_api::Error>> + Send;

    /// Release the connection. Called at most once by [`Session`].
    fn close(&mut self) -> impl Future<Output = Result<(), amsprobe_api::Error>> + Send;
}

/// Opens connections to a target through the router.
pub trait Connector: Send + Sync {
    type Connection: AdsConnection;

    fn connect(
        &self,
        target: AmsAddress,
        settings: &SessionSettings,
    ) -> impl Future<Output = Result<Self::Connection, amsprobe_api::Error>> + Send;
}

impl AdsConnection for AdsClient {
    async fn read_state(&mut self) -> Result<DeviceStateResult, amsprobe_api::Error> {
        AdsClient::read_state(self).await
    }

    async fn close(&mut self) -> Result<(), amsprobe_api::Error> {
        AdsClient::close(self).await
    }
}

/// [`Connector`] that dials the AMS router over TCP.
#[derive(Debug, Clone)]
pub struct RouterConnector {
    transport: TransportConfig,
}

impl RouterConnector {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }
}

impl Connector for RouterConnector {
    type Connection = AdsClient;

    async fn connect(
        &self,
        target: AmsAddress,
        settings: &SessionSettings,
    ) -> Result<AdsClient, amsprobe_api::Error> {
        let transport = self.transport.clone().with_request_timeout(settings.timeout);
        AdsClient::connect(target, &transport).await
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// One logical connection to a target, closed exactly once.
pub struct Session<C: AdsConnection> {
    connection: C,
    target: AmsAddress,
    closed: bool,
}

impl<C: AdsConnection> Session<C> {
    /// Open a session to `target`. Router unreachable or session rejected
    /// yields [`CoreError::Connection`].
    pub async fn open<K>(
        connector: &K,
        target: AmsAddress,
        settings: &SessionSettings,
    ) -> Result<Self, CoreError>
    where
        K: Connector<Connection = C>,
    {
        info!(
            %target,
            timeout_ms = u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX),
            "opening ADS session"
        );

        match connector.connect(target, settings).await {
            Ok(connection) => {
                info!(%target, "ADS session open");
                Ok(Self {
                    connection,
                    target,
                    closed: false,
                })
            }
            Err(source) => {
                error!(%target, error = %source, "failed to open ADS session");
                Err(CoreError::Connection {
                    target: target.to_string(),
                    source,
                })
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the session. Later calls are no-ops; a failing close is
    /// logged, never returned.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.connection.close().await {
            warn!(addr = %self.target, error = %e, "closing ADS session failed (non-fatal)");
        }
        debug!(addr = %self.target, "ADS session closed");
    }

    /// Run `body` with the connection, then close the session on every
    /// exit path. A panic in `body` is resumed after the close.
    pub async fn scope<T>(
        mut self,
        body: impl AsyncFnOnce(&mut C) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let outcome = AssertUnwindSafe(body(&mut self.connection))
            .catch_unwind()
            .await;
        self.close().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl<C: AdsConnection> Drop for Session<C> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(addr = %self.target, "ADS session dropped without close");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use tokio_test::assert_ok;

    use amsprobe_api::AdsState;

    use super::*;

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        reads: AtomicUsize,
        closes: AtomicUsize,
    }

    struct CountingConnection(Arc<Counters>);

    impl AdsConnection for CountingConnection {
        async fn read_state(&mut self) -> Result<DeviceStateResult, amsprobe_api::Error> {
            self.0.reads.fetch_add(1, Ordering::SeqCst);
            Ok(DeviceStateResult {
                ads_state: AdsState::Run,
                device_state: 0,
                read_at: Utc::now(),
            })
        }

        async fn close(&mut self) -> Result<(), amsprobe_api::Error> {
            self.0.closes.fetch_add(1, Ordering::SeqCst);
            Err(amsprobe_api::Error::Closed)
        }
    }

    struct CountingConnector {
        counters: Arc<Counters>,
        refuse: bool,
    }

    impl Connector for CountingConnector {
        type Connection = CountingConnection;

        async fn connect(
            &self,
            _target: AmsAddress,
            _settings: &SessionSettings,
        ) -> Result<CountingConnection, amsprobe_api::Error> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(amsprobe_api::Error::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )));
            }
            Ok(CountingConnection(Arc::clone(&self.counters)))
        }
    }

    fn target() -> AmsAddress {
        "5.1.204.160.1.1:851".parse().unwrap()
    }

    async fn open() -> (Session<CountingConnection>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let connector = CountingConnector {
            counters: Arc::clone(&counters),
            refuse: false,
        };
        let session = assert_ok!(
            Session::open(&connector, target(), &SessionSettings::default()).await
        );
        (session, counters)
    }

    #[tokio::test]
    async fn open_failure_is_connection_error() {
        let counters = Arc::new(Counters::default());
        let connector = CountingConnector {
            counters: Arc::clone(&counters),
            refuse: true,
        };
        let result = Session::open(&connector, target(), &SessionSettings::default()).await;

        assert!(matches!(result, Err(CoreError::Connection { .. })));
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scope_closes_once_on_success() {
        let (session, counters) = open().await;

        let state = session
            .scope(async |conn| Ok(conn.read_state().await.unwrap().ads_state))
            .await
            .unwrap();

        assert_eq!(state, AdsState::Run);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scope_closes_once_on_error() {
        let (session, counters) = open().await;

        let result: Result<(), _> = session
            .scope(async |_conn| {
                Err(CoreError::Poll {
                    target: target().to_string(),
                    source: amsprobe_api::Error::Timeout { timeout_ms: 5000 },
                })
            })
            .await;

        assert!(matches!(result, Err(CoreError::Poll { .. })));
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scope_closes_once_on_panic() {
        let (session, counters) = open().await;

        let outcome = AssertUnwindSafe(session.scope(async |_conn| -> Result<(), CoreError> {
            panic!("poll body exploded")
        }))
        .catch_unwind()
        .await;

        assert!(outcome.is_err());
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut session, counters) = open().await;

        session.close().await;
        session.close().await;

        assert!(session.is_closed());
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.reads.load(Ordering::SeqCst), 0);
    }
}
