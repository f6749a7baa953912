//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use amsprobe_config::ConfigError;
use amsprobe_core::{CoreError, TransportError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(amsprobe::target),
        help(
            "Set HOST_AMS_NETID to the AMS net id of the controller,\n\
             e.g. HOST_AMS_NETID=5.1.204.160.1.1"
        )
    )]
    Target { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(amsprobe::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(amsprobe::config),
        help("Check the settings file passed with --config and any AMSPROBE_* variables.")
    )]
    Config(Box<ConfigError>),

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not open an ADS session to {target}")]
    #[diagnostic(
        code(amsprobe::connection_failed),
        help(
            "Check that the AMS router is running and reachable\n\
             (router.loopbackIP / router.loopbackPort) and that a route\n\
             to {target} exists."
        )
    )]
    ConnectionFailed {
        target: String,
        #[source]
        source: TransportError,
    },

    #[error("Lost the connection to {target}")]
    #[diagnostic(code(amsprobe::disconnected))]
    Disconnected {
        target: String,
        #[source]
        source: TransportError,
    },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("{target} did not answer in time")]
    #[diagnostic(
        code(amsprobe::timeout),
        help("Increase session.timeout or check the controller's responsiveness.")
    )]
    Timeout {
        target: String,
        #[source]
        source: TransportError,
    },

    // ── Polling ──────────────────────────────────────────────────────
    #[error("Reading the state of {target} failed")]
    #[diagnostic(code(amsprobe::poll_failed))]
    PollFailed {
        target: String,
        #[source]
        source: TransportError,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render settings as JSON: {0}")]
    #[diagnostic(code(amsprobe::json))]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Target { .. } | Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            Self::ConnectionFailed { .. } | Self::Disconnected { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let timed_out = err.is_timeout();
        match err {
            CoreError::Configuration { message } => Self::Target { message },
            CoreError::Connection { target, source } if timed_out => {
                Self::Timeout { target, source }
            }
            CoreError::Connection { target, source } => Self::ConnectionFailed { target, source },
            CoreError::Poll { target, source } if timed_out => Self::Timeout { target, source },
            CoreError::Poll { target, source } if source.is_disconnect() => {
                Self::Disconnected { target, source }
            }
            CoreError::Poll { target, source } => Self::PollFailed { target, source },
        }
    }
}
