//! Error types shared across the middleware chain and harness.

use axum::http::StatusCode;
use thiserror::Error;

/// Failures surfaced through the middleware chain or the server lifecycle.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The handler was abandoned before it produced a response.
    ///
    /// The message is an opaque contract matched byte-for-byte by the
    /// regression suite; do not reword it.
    #[error("No response returned.")]
    NoResponseReturned,

    /// The outermost observer received a response with the wrong status.
    #[error("expected 204 No Content, got {0}")]
    UnexpectedStatus(StatusCode),

    /// Listener or runtime I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The background server never reported that its listener started.
    #[error("server did not report startup in time")]
    StartupTimeout,
}

impl GatewayError {
    /// Whether a boxed chain error is the abandoned-handler condition.
    pub fn is_no_response(err: &tower::BoxError) -> bool {
        matches!(
            err.downcast_ref::<GatewayError>(),
            Some(GatewayError::NoResponseReturned)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_response_message_is_exact() {
        // External contract; both regression scenarios assert on this string.
        assert_eq!(
            GatewayError::NoResponseReturned.to_string(),
            "No response returned."
        );
    }

    #[test]
    fn is_no_response_matches_only_the_condition() {
        let boxed: tower::BoxError = Box::new(GatewayError::NoResponseReturned);
        assert!(GatewayError::is_no_response(&boxed));

        let other: tower::BoxError = Box::new(GatewayError::StartupTimeout);
        assert!(!GatewayError::is_no_response(&other));

        let foreign: tower::BoxError =
            Box::new(std::io::Error::new(std::io::ErrorKind::Other, "nope"));
        assert!(!GatewayError::is_no_response(&foreign));
    }
}
