//! Request construction.
//!
//! Turns `(method, path, query, body)` plus the client configuration into an
//! `HttpRequest`. Nothing here touches the network.

use url::Url;

use crate::config::{Config, ORG_ID_HEADER};
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, Query};

/// Join URL paths segment-wise.
///
/// Empty segments collapse, `.` is skipped and `..` removes the previous
/// segment. The result is rooted and has no trailing slash.
pub fn join_path(base: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Form-encode query pairs sorted by key. Values of a repeated key keep
/// their relative order.
pub fn encode_query(query: &Query) -> String {
    let mut pairs: Vec<&(String, String)> = query.pairs().iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.into_iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

/// Build the outbound request for one attempt.
pub fn build_request(
    config: &Config,
    base_url: &Url,
    method: HttpMethod,
    path: &str,
    query: &Query,
    body: Option<&[u8]>,
) -> Result<HttpRequest, ClientError> {
    let mut url = base_url.clone();
    url.set_path(&join_path(base_url.path(), path));
    if query.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&encode_query(query)));
    }

    let mut headers = Vec::with_capacity(3 + config.http_headers.len());
    headers.push(("Content-Type".to_string(), "application/json".to_string()));
    if let Some(token) = config.api_key.as_deref().filter(|t| !t.is_empty()) {
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    }
    if config.org_id != 0 {
        headers.push((ORG_ID_HEADER.to_string(), config.org_id.to_string()));
    }
    for (name, value) in &config.http_headers {
        validate_header(name, value)?;
        headers.push((name.clone(), value.clone()));
    }

    if config.verbose {
        match body {
            Some(bytes) => tracing::info!(
                method = %method,
                url = %url,
                body = %String::from_utf8_lossy(bytes),
                "request with body data"
            ),
            None => tracing::info!(method = %method, url = %url, "request with no body data"),
        }
    }

    Ok(HttpRequest {
        method,
        url: url.into(),
        headers,
        body: body.map(<[u8]>::to_vec),
    })
}

fn validate_header(name: &str, value: &str) -> Result<(), ClientError> {
    let token_char = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);
    if name.is_empty() || !name.chars().all(token_char) {
        return Err(ClientError::Construction(format!(
            "invalid header name: {name:?}"
        )));
    }
    if value.chars().any(|c| c == '\r' || c == '\n' || c == '\0') {
        return Err(ClientError::Construction(format!(
            "invalid value for header {name}"
        )));
    }
    Ok(())
}
