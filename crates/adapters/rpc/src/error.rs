//! RPC adapter error types.

use std::time::Duration;

use fissionbus_domain::error::{BusError, ValidationError};

/// An endpoint URL that cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The URL has no `scheme://` prefix.
    #[error("endpoint `{url}` has no scheme")]
    MissingScheme { url: String },

    /// The scheme is neither `tcp` nor (on unix) `unix`.
    #[error("endpoint `{url}` uses unsupported scheme `{scheme}`")]
    UnsupportedScheme { url: String, scheme: String },

    /// Nothing follows the scheme.
    #[error("endpoint `{url}` has no address")]
    EmptyAddress { url: String },

    /// A TCP endpoint without a valid `:port` suffix.
    #[error("endpoint `{url}` has no valid port")]
    InvalidPort { url: String },
}

impl EndpointError {
    /// The URL that was rejected.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::MissingScheme { url }
            | Self::UnsupportedScheme { url, .. }
            | Self::EmptyAddress { url }
            | Self::InvalidPort { url } => url,
        }
    }
}

/// Errors specific to the RPC bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A configured or received endpoint URL is invalid.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// Socket failure while binding, dialing or exchanging frames.
    #[error("i/o error on {endpoint}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// A frame did not hold a valid protocol document.
    #[error("malformed rpc frame")]
    Codec(#[from] serde_json::Error),

    /// The peer hung up before replying.
    #[error("{endpoint} closed the connection before replying")]
    ConnectionClosed { endpoint: String },

    /// The call did not complete in time.
    #[error("call to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    /// The peer answered with an error.
    #[error("peer rejected the call: {0}")]
    Remote(String),

    /// The peer answered with a reply that does not match the request.
    #[error("unexpected reply to {method}")]
    UnexpectedReply { method: &'static str },
}

impl BridgeError {
    pub(crate) fn io(endpoint: impl ToString, source: std::io::Error) -> Self {
        Self::Io {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

impl From<BridgeError> for BusError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Endpoint(inner) => ValidationError::InvalidEndpoint {
                url: inner.url().to_string(),
            }
            .into(),
            other => BusError::Transport(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_endpoint_error_to_validation_error() {
        let err: BusError = BridgeError::from(EndpointError::MissingScheme {
            url: "localhost".to_string(),
        })
        .into();
        assert!(matches!(
            err,
            BusError::Validation(ValidationError::InvalidEndpoint { url }) if url == "localhost"
        ));
    }

    #[test]
    fn should_convert_remote_error_to_transport_error() {
        let err: BusError = BridgeError::Remote("nope".to_string()).into();
        assert!(matches!(err, BusError::Transport(_)));
    }

    #[test]
    fn should_display_timeout() {
        let err = BridgeError::Timeout {
            endpoint: "tcp://127.0.0.1:7633".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "call to tcp://127.0.0.1:7633 timed out after 250ms"
        );
    }

    #[test]
    fn should_display_unsupported_scheme() {
        let err = EndpointError::UnsupportedScheme {
            url: "udp://x:1".to_string(),
            scheme: "udp".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "endpoint `udp://x:1` uses unsupported scheme `udp`"
        );
        assert_eq!(err.url(), "udp://x:1");
    }
}
