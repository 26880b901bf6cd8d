use std::sync::Arc;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Caller-supplied data violates a constraint. Raised before any request is sent.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid base URL configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The server rejected the token.
    #[error("unauthorized, token is likely invalid")]
    Unauthorized,

    /// The server answered with a non-success status other than 401.
    #[error("received {status} response: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// Network error.
    #[error(transparent)]
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    Network(Arc<reqwest::Error>),

    /// A successful response carried a body that is not a JSON object.
    #[error("failed to decode response body")]
    Decode(#[source] Arc<serde_json::Error>),

    /// The payload could not be encoded as JSON.
    #[error("failed to serialize payload")]
    Serialization(#[source] Arc<serde_json::Error>),
}

impl Error {
    pub(crate) fn invalid_message(message: impl Into<String>) -> Self {
        Error::InvalidMessage(message.into())
    }

    /// Returns `true` if the call was rejected by validation and nothing was sent.
    pub fn is_invalid_message(&self) -> bool {
        matches!(self, Error::InvalidMessage(_))
    }

    /// Returns `true` if the request could not be completed or the server refused it.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized | Error::HttpStatus { .. } | Error::Network(_) | Error::Decode(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        // The URL carries nothing secret, but it is noise in error messages.
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Serialization(Arc::new(value))
    }
}
