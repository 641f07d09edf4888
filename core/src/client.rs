//! Grafana API client and its retrying executor.
//!
//! # Design
//! `Client` holds a parsed base URL, an immutable `Config` and the resolved
//! transport. It carries no mutable state between calls, so one value can be
//! shared across threads. Every call funnels through `execute`, which owns
//! the retry loop; the typed (`request`), status-only (`request_no_content`)
//! and legacy (`request_into`) entry points are thin adapters over it and the
//! decoder.

use std::io::Read;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::decode::{check_status, decode_into, decode_json};
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpResponse, HttpTransport, Query};
use crate::request::build_request;
use crate::transport::{encode_userinfo, UreqTransport};

/// Blocking client for the Grafana HTTP API.
#[derive(Clone)]
pub struct Client {
    config: Config,
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish()
    }
}

impl Client {
    /// Parse `base_url` and bind it to `config`.
    ///
    /// Basic-auth credentials from the config are written into the URL
    /// user-info. Without an injected transport a `UreqTransport` is used.
    pub fn new(base_url: &str, config: Config) -> Result<Self, ClientError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| ClientError::Construction(format!("invalid base URL {base_url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ClientError::Construction(format!(
                "base URL must be http(s): {base_url:?}"
            )));
        }
        if let Some(auth) = &config.basic_auth {
            let no_credentials =
                |()| ClientError::Construction(format!("base URL cannot carry credentials: {base_url:?}"));
            url.set_username(&encode_userinfo(&auth.username))
                .map_err(no_credentials)?;
            let password = auth.password.as_deref().map(encode_userinfo);
            url.set_password(password.as_deref()).map_err(no_credentials)?;
        }
        let transport = config
            .transport
            .clone()
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));
        Ok(Self {
            config,
            base_url: url,
            transport,
        })
    }

    /// A copy of this client scoped to `org_id`. `self` is left untouched.
    pub fn with_org_id(&self, org_id: i64) -> Self {
        let mut config = self.config.clone();
        config.org_id = org_id;
        Self {
            config,
            base_url: self.base_url.clone(),
            transport: Arc::clone(&self.transport),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send a request, retrying transport failures, 5xx and 429 responses.
    ///
    /// Runs at most `num_retries + 1` attempts with `retry_delay` between
    /// them. A response with status < 500 other than 429 ends the loop. When
    /// attempts run out, the outcome of the last attempt is returned as-is:
    /// its transport error, or its (retryable) response.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, ClientError> {
        let max_retries = self.config.num_retries;
        let mut attempt = 0;

        let outcome = loop {
            let request = build_request(&self.config, &self.base_url, method, path, query, body)?;

            if attempt > 0 {
                tracing::debug!(
                    attempt,
                    max_retries,
                    delay = ?self.config.retry_delay,
                    "retrying {method} {path}"
                );
                self.config.sleeper.sleep(self.config.retry_delay);
            }

            let result = self.transport.send(&request);
            let retryable = match &result {
                Ok(response) if response.is_terminal() => false,
                Ok(response) => {
                    tracing::debug!(attempt, status = response.status, "retryable status for {method} {path}");
                    true
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "transport failure for {method} {path}");
                    true
                }
            };
            if !retryable || attempt >= max_retries {
                break result;
            }
            attempt += 1;
        };

        let response = outcome?;
        if self.config.verbose {
            tracing::info!(
                status = response.status,
                body = %response.body_text(),
                "response received"
            );
        }
        Ok(response)
    }

    /// Send `body` as JSON and decode the response into `Res`.
    pub fn request<Req, Res>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query,
        body: Option<&Req>,
    ) -> Result<Res, ClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let bytes = encode_body(body)?;
        let response = self.execute(method, path, query, bytes.as_deref())?;
        decode_json(&response)
    }

    /// Like `request` but only checks the status; the body is discarded.
    pub fn request_no_content<Req>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query,
        body: Option<&Req>,
    ) -> Result<(), ClientError>
    where
        Req: Serialize + ?Sized,
    {
        let bytes = encode_body(body)?;
        let response = self.execute(method, path, query, bytes.as_deref())?;
        check_status(&response)
    }

    /// Legacy entry point: raw body reader in, caller-owned result slot out.
    ///
    /// The reader is drained once before the first attempt so retries resend
    /// the same bytes. With `out` set to `None` the response body is ignored.
    pub fn request_into<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query,
        body: Option<&mut dyn Read>,
        out: Option<&mut T>,
    ) -> Result<(), ClientError> {
        let bytes = match body {
            Some(reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).map_err(|e| {
                    ClientError::Construction(format!("failed to read request body: {e}"))
                })?;
                Some(buf)
            }
            None => None,
        };
        let response = self.execute(method, path, query, bytes.as_deref())?;
        decode_into(&response, out)
    }
}

fn encode_body<T: Serialize + ?Sized>(body: Option<&T>) -> Result<Option<Vec<u8>>, ClientError> {
    body.map(serde_json::to_vec)
        .transpose()
        .map_err(ClientError::Serialization)
}
