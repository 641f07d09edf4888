//! Blocking client core for the Grafana HTTP API.
//!
//! # Overview
//! Every endpoint goes through one pipeline: build the request (URL join,
//! query encoding, auth and org headers), send it through an injectable
//! `HttpTransport` with a bounded fixed-delay retry loop, then classify and
//! decode the terminal response.
//!
//! # Design
//! - `Client` is immutable and `Send + Sync`; `with_org_id` derives a copy.
//! - Transport failures, 5xx and 429 are retried; the last attempt's outcome
//!   is returned when attempts run out.
//! - Error responses become `ClientError::Api` with the parsed JSON body.
//! - Dashboard and search endpoints are thin wrappers over `Client::request`.
//! - Diagnostics go through `tracing`; the verbose flag is part of `Config`.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod decode;
pub mod error;
pub mod http;
pub mod request;
pub mod search;
pub mod transport;

pub use client::Client;
pub use config::{BasicAuth, Config, Sleeper, ThreadSleeper};
pub use dashboard::{
    Dashboard, DashboardImportInput, DashboardImportRequest, DashboardImportResponse,
    DashboardMeta, DashboardSaveResponse,
};
pub use error::{ClientError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, Query};
pub use search::FolderDashboardSearchResponse;
pub use transport::UreqTransport;
