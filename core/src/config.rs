//! Endpoint configuration.
//!
//! Everything an endpoint needs travels in this value; nothing is read from
//! process-wide state after construction, so several endpoints can coexist.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

pub const DEFAULT_MAX_ROWS: u64 = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Root of the service, e.g. `http://localhost:8983/solr`.
    pub base_url: String,
    /// Forwarded to the transport as a whole-call timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Sent with every request.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Response body cap in bytes; unbounded when unset.
    #[serde(default)]
    pub max_body_bytes: Option<u64>,
    /// Upper bound on rows `Collection::fetch_all` will pull in one call.
    #[serde(default = "default_max_rows")]
    pub max_rows: u64,
}

fn default_max_rows() -> u64 {
    DEFAULT_MAX_ROWS
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: None,
            headers: Vec::new(),
            max_body_bytes: None,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Read `SOLRQ_BASE_URL` (required), `SOLRQ_TIMEOUT_SECS` and
    /// `SOLRQ_MAX_ROWS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("SOLRQ_BASE_URL")
            .ok_or_else(|| QueryError::InvalidArgument("SOLRQ_BASE_URL is not set".to_string()))?;
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup("SOLRQ_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|e| {
                QueryError::InvalidArgument(format!("SOLRQ_TIMEOUT_SECS={raw}: {e}"))
            })?;
            config.timeout_secs = Some(secs);
        }
        if let Some(raw) = lookup("SOLRQ_MAX_ROWS") {
            config.max_rows = raw
                .parse::<u64>()
                .map_err(|e| QueryError::InvalidArgument(format!("SOLRQ_MAX_ROWS={raw}: {e}")))?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
