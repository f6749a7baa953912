//! Session lifecycle and cancellable state polling for an ADS controller.
//!
//! This crate owns the run-time behavior of `amsprobe`:
//!
//! - **[`EndpointResolver`]** -- Reads `HOST_AMS_NETID` and pairs it with the
//!   PLC runtime port (851) to form the target [`AmsAddress`]. Also dumps the
//!   router settings to the log before resolving.
//!
//! - **[`Session`]** -- One connection to the target, opened through a
//!   [`Connector`] and closed exactly once. [`Session::scope`] brackets the
//!   work done with the connection so teardown runs on every exit path.
//!
//! - **[`Poller`]** -- Sequential, cancellation-aware state reads at a fixed
//!   interval, reported to a console sink and to `tracing`.
//!
//! - **[`Monitor`]** -- Resolve, open, poll, close.
//!
//! Configuration arrives as an immutable [`MonitorConfig`]; cancellation as a
//! `tokio_util` [`CancellationToken`](tokio_util::sync::CancellationToken).

pub mod config;
pub mod error;
pub mod monitor;
pub mod poll;
pub mod resolver;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BrokerRelay, MonitorConfig, POLL_INTERVAL, RouterSettings, SessionSettings};
pub use error::CoreError;
pub use monitor::Monitor;
pub use poll::{PollState, PollSummary, Poller, report_line};
pub use resolver::{EndpointResolver, HOST_NET_ID_VAR};
pub use session::{AdsConnection, Connector, RouterConnector, Session};

pub use amsprobe_api::Error as TransportError;
pub use amsprobe_api::{
    AMS_TCP_PORT, AdsState, AmsAddress, AmsNetId, DEFAULT_SOURCE_PORT, DeviceStateResult,
    PLC_RUNTIME_PORT, TransportConfig,
};
