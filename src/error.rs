//! Error taxonomy for every client operation

use std::time::Duration;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the client.
///
/// Causes from `reqwest`/`serde_json` are carried as rendered messages so the
/// error stays `Clone`: a single refresh outcome is handed to every caller
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Credentials were rejected, or the token could not be refreshed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server rejected the request (4xx other than 429), or the request was
    /// refused locally before being sent.
    #[error("bad request (HTTP {status}): {message}")]
    BadRequest { status: u16, message: String },

    /// HTTP 429. `retry_after` is the wait the server asked for.
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// HTTP 5xx that survived the retry budget.
    #[error("upstream unavailable (HTTP {status}) after {retries} retries: {message}")]
    UpstreamUnavailable {
        status: u16,
        retries: u32,
        message: String,
    },

    /// No HTTP status was obtained (connect failure, timeout, broken body).
    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },

    /// The body did not match the expected shape.
    #[error("could not deserialize response: {0}")]
    Serialization(String),

    /// The operation is not available on this object (e.g. going backward on
    /// a cursor page).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl Error {
    /// Build a `BadRequest` that never reached the server.
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::BadRequest {
            status: 400,
            message: message.into(),
        }
    }

    /// HTTP status attached to the error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { status, .. } | Self::UpstreamUnavailable { status, .. } => {
                Some(*status)
            }
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether retrying the whole operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::UpstreamUnavailable { .. } | Self::Transport { .. }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::usage(format!("invalid URL: {err}"))
    }
}
