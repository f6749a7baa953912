// ── Core error types ──
//
// Run-level errors from amsprobe-core. Each variant marks where in the
// lifecycle the run ended: before a session existed, while opening it,
// or while polling. Transport details ride along as the source.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Startup ──────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Cannot open ADS session to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: amsprobe_api::Error,
    },

    // ── Polling ──────────────────────────────────────────────────────
    #[error("Reading state of {target} failed: {source}")]
    Poll {
        target: String,
        #[source]
        source: amsprobe_api::Error,
    },
}

impl CoreError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the run ended because a request or connect timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Connection { source, .. } | Self::Poll { source, .. } => source.is_timeout(),
            Self::Configuration { .. } => false,
        }
    }
}
