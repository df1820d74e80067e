//! Error types for the REST client.
//!
//! # Design
//! Every failure of a call surfaces as one `Error` value and nothing is
//! retried or logged on the way out. Non-2xx responses are deliberately
//! textual: `Status` carries only the status line, not the code or body.

use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by [`RoundTrip`](crate::RoundTrip) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `Client` construction and `Client::call`.
#[derive(Debug, Error)]
pub enum Error {
    /// The request body could not be encoded as JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Method, URL or a header could not form a valid request.
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    /// The default transport's TLS configuration could not be built.
    #[error("tls configuration: {0}")]
    Tls(#[from] rustls::Error),

    /// Connecting, writing the request or reading the response failed.
    #[error("request failed: {0}")]
    Transport(#[source] BoxError),

    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The engine's per-call timeout elapsed before the exchange finished.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered outside `[200, 300)`; holds the status line,
    /// e.g. `404 Not Found`.
    #[error("{0}")]
    Status(String),

    /// The response body could not be decoded into the destination type.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_displays_raw_status_line() {
        let err = Error::Status("404 Not Found".to_string());
        assert_eq!(err.to_string(), "404 Not Found");
    }

    #[test]
    fn context_errors_read_like_context_errors() {
        assert_eq!(Error::Canceled.to_string(), "context canceled");
        assert_eq!(
            Error::DeadlineExceeded.to_string(),
            "context deadline exceeded"
        );
    }

    #[test]
    fn transport_error_keeps_its_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::Transport(Box::new(io));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "refused");
    }
}
