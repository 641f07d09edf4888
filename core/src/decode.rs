//! Response classification and decoding.
//!
//! # Design
//! Every terminal response passes through `check_status` first. Status codes
//! >= 400 become `ClientError::Api` when the body is a JSON object and
//! `ClientError::Decode` otherwise. Successful bodies are then decoded into
//! the caller's type, either returned by value (`decode_json`) or written
//! into a caller-owned slot (`decode_into`).

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::http::HttpResponse;

/// Map status >= 400 to `Api` or `Decode`.
pub fn check_status(response: &HttpResponse) -> Result<(), ClientError> {
    if response.status < 400 {
        return Ok(());
    }
    let body: Map<String, Value> =
        serde_json::from_slice(&response.body).map_err(|e| decode_error(response, e))?;
    Err(ClientError::Api {
        status: response.status,
        body,
    })
}

/// Decode a terminal response into `T`.
pub fn decode_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ClientError> {
    check_status(response)?;
    serde_json::from_slice(&response.body).map_err(|e| decode_error(response, e))
}

/// Decode a terminal response into an existing value.
///
/// With `out` set to `None` only the status is checked and the body is
/// ignored.
pub fn decode_into<T: DeserializeOwned>(
    response: &HttpResponse,
    out: Option<&mut T>,
) -> Result<(), ClientError> {
    match out {
        None => check_status(response),
        Some(slot) => {
            *slot = decode_json(response)?;
            Ok(())
        }
    }
}

fn decode_error(response: &HttpResponse, source: serde_json::Error) -> ClientError {
    ClientError::Decode {
        status: response.status,
        body: response.body_text(),
        source,
    }
}
