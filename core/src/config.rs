//! Client configuration.
//!
//! # Design
//! `Config` is a plain struct filled in by the caller and never mutated once
//! a `Client` owns it. `Client::with_org_id` clones it, so every derived
//! client holds an independent copy; only the transport and sleeper handles
//! are shared through `Arc`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::http::HttpTransport;

/// Delay between attempts of the retry loop.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Header carrying the organization id.
pub const ORG_ID_HEADER: &str = "X-Grafana-Org-Id";

/// Blocks the calling thread between retry attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// `Sleeper` backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Basic-auth credentials placed in the base URL's user-info.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration for a `Client`.
#[derive(Clone)]
pub struct Config {
    /// API key or service account token, sent as a bearer token.
    pub api_key: Option<String>,
    pub basic_auth: Option<BasicAuth>,
    /// Extra headers, applied in order after the built-in ones.
    pub http_headers: Vec<(String, String)>,
    /// Organization to scope requests to; 0 means none. Service account
    /// tokens are bound to a single organization and the server rejects an
    /// explicit override.
    pub org_id: i64,
    /// Attempts after the first one.
    pub num_retries: u32,
    pub retry_delay: Duration,
    /// Log every request and response body through `tracing`.
    pub verbose: bool,
    /// Defaults to `UreqTransport` when unset.
    pub transport: Option<Arc<dyn HttpTransport>>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            basic_auth: None,
            http_headers: Vec::new(),
            org_id: 0,
            num_retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            verbose: false,
            transport: None,
            sleeper: Arc::new(ThreadSleeper),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("basic_auth", &self.basic_auth)
            .field("http_headers", &self.http_headers)
            .field("org_id", &self.org_id)
            .field("num_retries", &self.num_retries)
            .field("retry_delay", &self.retry_delay)
            .field("verbose", &self.verbose)
            .field("transport", &self.transport.as_ref().map(|_| "<custom>"))
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build a config from `GRAFANA_*` environment variables.
    ///
    /// `GRAFANA_AUTH` holding `user:pass` selects basic auth, anything else is
    /// taken as a token. `GRAFANA_ORG_ID`, `GRAFANA_RETRIES` and
    /// `GRAFANA_RETRY_DELAY_SECS` fall back to defaults when absent or
    /// unparseable. A non-empty `GF_LOG` turns on verbose logging.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(auth) = read_non_empty_env("GRAFANA_AUTH") {
            match auth.split_once(':') {
                Some((user, pass)) => config.basic_auth = Some(BasicAuth::new(user, pass)),
                None => config.api_key = Some(auth),
            }
        }
        config.org_id = read_env_parsed("GRAFANA_ORG_ID").unwrap_or(0);
        config.num_retries = read_env_parsed("GRAFANA_RETRIES").unwrap_or(0);
        if let Some(secs) = read_env_parsed::<u64>("GRAFANA_RETRY_DELAY_SECS") {
            config.retry_delay = Duration::from_secs(secs);
        }
        config.verbose = read_non_empty_env("GF_LOG").is_some();
        config
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

fn read_non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    read_non_empty_env(name).and_then(|raw| raw.parse().ok())
}
