use thiserror::Error;

/// Top-level error type for the `amsprobe-api` crate.
///
/// Covers every failure mode of the AMS/TCP transport: addressing,
/// socket I/O, request timeouts, ADS-level error codes, and malformed
/// frames. `amsprobe-core` maps these into run-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Addressing ──────────────────────────────────────────────────
    /// The string is not a valid AMS net id (`a.b.c.d.e.f`).
    #[error("Invalid AMS net id '{value}': {reason}")]
    InvalidNetId { value: String, reason: String },

    /// The string is not a valid `<netid>:<port>` AMS address.
    #[error("Invalid AMS address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Socket-level failure (connection refused, reset, broken pipe).
    #[error("AMS transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Router endpoint could not be reached within the connect timeout.
    #[error("Connecting to AMS router at {endpoint} timed out after {timeout_ms}ms")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    /// No response arrived within the request timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The connection was closed, locally or by the router.
    #[error("Connection closed")]
    Closed,

    // ── Protocol ────────────────────────────────────────────────────
    /// The device (or router) answered with a non-zero ADS error code.
    #[error("ADS error 0x{code:X}: {}", describe_ads_error(*code))]
    Ads { code: u32 },

    /// The peer sent a frame that does not follow the AMS/TCP layout.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl Error {
    /// Returns `true` if this error came from an expired request timer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ConnectTimeout { .. })
    }

    /// Returns `true` if the underlying connection is no longer usable.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Closed)
    }

    /// The ADS error code, if the peer reported one.
    pub fn ads_code(&self) -> Option<u32> {
        match self {
            Self::Ads { code } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Short description for the ADS return codes a state read can produce.
fn describe_ads_error(code: u32) -> &'static str {
    match code {
        0x0006 => "target port not found",
        0x0007 => "target machine not found",
        0x000A => "unknown AMS command",
        0x0012 => "port disabled",
        0x0013 => "port already connected",
        0x0700 => "general device error",
        0x0701 => "service not supported by server",
        0x0710 => "device not ready",
        0x0711 => "device busy",
        0x0745 => "timeout elapsed",
        0x0746 => "client error",
        0x0748 => "client port not open",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ads_error_message_includes_code_and_text() {
        let err = Error::Ads { code: 0x0006 };
        assert_eq!(err.to_string(), "ADS error 0x6: target port not found");
        assert_eq!(err.ads_code(), Some(6));
    }

    #[test]
    fn classifies_timeouts_and_disconnects() {
        assert!(Error::Timeout { timeout_ms: 5000 }.is_timeout());
        assert!(!Error::Closed.is_timeout());
        assert!(Error::Closed.is_disconnect());
        assert!(!Error::Ads { code: 0x0711 }.is_disconnect());
    }
}
