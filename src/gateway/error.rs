//! Gateway error types

use thiserror::Error;

/// Failure of any backend call. Every variant is a transport failure from
/// the conversation's point of view; an empty suggestion list is not an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Status(code), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Decode, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection refused, reset, or body could not be read
    Network,
    /// Backend answered with a non-success status
    Status(u16),
    /// Body was not the JSON shape the endpoint promises
    Decode,
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::decode(format!("Failed to parse response: {e}"))
        } else if e.is_connect() {
            GatewayError::network(format!("Connection failed: {e}"))
        } else if let Some(status) = e.status() {
            GatewayError::status(status.as_u16(), format!("HTTP {status}"))
        } else {
            GatewayError::network(format!("Request failed: {e}"))
        }
    }
}
