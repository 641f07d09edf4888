//! Error types for the Grafana API client.
//!
//! # Design
//! Four failure classes reach the caller. `Construction` is local and never
//! retried. `Transport` is retried by the executor and surfaced as-is once
//! attempts run out. `Api` is the normal shape of a well-formed error
//! response and carries the parsed JSON body for inspection. `Decode` means
//! the body could not be parsed and keeps the raw text for diagnosis.

use serde_json::{Map, Value};
use thiserror::Error;

/// Failure to exchange a response with the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The status line arrived but the body could not be read in full.
    #[error("failed to read response body: {0}")]
    ReadBody(String),
}

/// Errors returned by `Client` calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad method, URL or header. Raised before anything is sent.
    #[error("invalid request: {0}")]
    Construction(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with status >= 400 and a JSON object body.
    #[error("status: {status}, body: {}", Value::Object(.body.clone()))]
    Api { status: u16, body: Map<String, Value> },

    #[error("failed to decode response body '{body}' for status {status}: {source}")]
    Decode {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl ClientError {
    /// HTTP status of the response this error came from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } | ClientError::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The `message` field of an API error body.
    pub fn message(&self) -> Option<&str> {
        match self {
            ClientError::Api { body, .. } => body.get("message").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}
