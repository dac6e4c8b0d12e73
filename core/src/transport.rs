//! The HTTP collaborator that executes built requests.
//!
//! # Design
//! The core only needs "GET this URL, give me status and body". `Transport`
//! is that seam; `UreqTransport` is the blocking default. Status codes are
//! returned as data (ureq's status-as-error behaviour is switched off) so the
//! core alone decides what counts as a failure.

use std::time::Duration;

use crate::error::{QueryError, Result};
use crate::http::{HttpRequest, HttpResponse};

/// Executes a GET described by an `HttpRequest`.
///
/// Implementations must be shareable across threads; `Collection` values
/// hold the transport behind an `Arc` and may be used concurrently.
pub trait Transport: Send + Sync {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// `timeout` bounds the whole call (resolve, connect, send, receive).
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Cap on response body size in bytes. Unbounded unless set; ureq's own
    /// 10 MiB default would reject large but ordinary `fetch_all` pages.
    pub fn with_body_limit(mut self, limit: Option<u64>) -> Self {
        self.body_limit = limit.unwrap_or(u64::MAX);
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.agent.get(request.url());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .call()
            .map_err(|e| QueryError::Transport(e.to_string()))?;

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
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
