//! Default blocking transport built on `ureq`.
//!
//! # Design
//! The agent is configured so that every HTTP status comes back as data
//! (status interpretation belongs to the decoder), proxies are never picked
//! up from the environment, and each exchange is bounded by a global
//! timeout. Basic-auth credentials travel in the URL user-info up to this
//! point; they are moved into an `Authorization` header before sending.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use ureq::http;
use url::Url;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// Upper bound on connect + send + body read for one attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters escaped in URL user-info: everything outside the RFC 3986
/// unreserved set, `%` included, so decoding restores the exact input.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `HttpTransport` backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .proxy(None)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    /// Wrap a caller-configured agent. The agent must have
    /// `http_status_as_error(false)` or error statuses surface as transport
    /// failures.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let (url, basic_auth) = split_credentials(&request.url)?;

        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(url.as_str());
        if let Some(value) = basic_auth.filter(|_| request.header("Authorization").is_none()) {
            builder = builder.header("Authorization", value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let sent = match &request.body {
            Some(body) => builder.body(body.clone()).map(|req| self.agent.run(req)),
            None => builder.body(()).map(|req| self.agent.run(req)),
        };
        let mut response = sent
            .map_err(|e| TransportError::Connect(format!("invalid request: {e}")))?
            .map_err(map_ureq_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // ureq caps bodies at 10 MiB unless told otherwise.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| TransportError::ReadBody(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Percent-encode one user-info component so it survives the round trip
/// through the URL unchanged.
pub(crate) fn encode_userinfo(raw: &str) -> String {
    utf8_percent_encode(raw, USERINFO).to_string()
}

/// Strip user-info from `raw` and render it as a basic-auth header value.
fn split_credentials(raw: &str) -> Result<(Url, Option<String>), TransportError> {
    let mut url =
        Url::parse(raw).map_err(|e| TransportError::Connect(format!("invalid URL {raw}: {e}")))?;
    if url.username().is_empty() && url.password().is_none() {
        return Ok((url, None));
    }
    let user = percent_decode_str(url.username()).decode_utf8_lossy().into_owned();
    let pass = url
        .password()
        .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
        .unwrap_or_default();
    let header = format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")));

    let no_credentials = |()| TransportError::Connect(format!("URL cannot carry credentials: {raw}"));
    url.set_username("").map_err(no_credentials)?;
    url.set_password(None).map_err(no_credentials)?;
    Ok((url, Some(header)))
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout(err.to_string()),
        other => TransportError::Connect(other.to_string()),
    }
}
