//! Endpoint and collection handles: select request builder plus the
//! one-shot operations that run it through a `Transport`.
//!
//! # Design
//! `ServiceEndpoint` and `Collection` are immutable values. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`; the un-prefixed method
//! (`fetch`, `stats`, ...) validates, builds, executes and parses in one go.
//! Callers that own their HTTP stack can drive `build_*`/`parse_*` directly.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{EndpointConfig, DEFAULT_MAX_ROWS};
use crate::error::{QueryError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::response;
use crate::transport::{Transport, UreqTransport};
use crate::types::{FacetRanges, RangeFacet, ResultSet, StatsSpec, StatsResult};

/// Root address of the search service plus the settings every request
/// inherits.
#[derive(Clone)]
pub struct ServiceEndpoint {
    base_url: String,
    headers: Vec<(String, String)>,
    max_rows: u64,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("max_rows", &self.max_rows)
            .finish_non_exhaustive()
    }
}

impl ServiceEndpoint {
    /// Endpoint at `base_url` using a default `UreqTransport`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_transport(base_url, Arc::new(UreqTransport::new()))
    }

    pub fn from_config(config: EndpointConfig) -> Result<Self> {
        let transport =
            UreqTransport::with_timeout(config.timeout()).with_body_limit(config.max_body_bytes);
        Ok(Self::with_transport(&config.base_url, Arc::new(transport))?
            .with_headers(config.headers)
            .with_max_rows(config.max_rows))
    }

    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.trim().is_empty() {
            return Err(QueryError::InvalidArgument(
                "base address must not be empty".to_string(),
            ));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            headers: Vec::new(),
            max_rows: DEFAULT_MAX_ROWS,
            transport,
        })
    }

    /// Headers sent with every request from this endpoint.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_rows(&self) -> u64 {
        self.max_rows
    }

    /// Handle for the collection `name`. No network I/O.
    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        if name.is_empty() {
            return Err(QueryError::InvalidArgument(
                "collection name must not be empty".to_string(),
            ));
        }
        // The name goes into the path verbatim, so only characters that
        // never need percent-encoding are allowed.
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(QueryError::InvalidArgument(format!(
                "collection name `{name}` may only contain ASCII letters, digits, `_`, `-` and `.`"
            )));
        }
        Ok(Collection {
            endpoint: self.clone(),
            name: name.to_string(),
        })
    }
}

/// One named collection on a `ServiceEndpoint`.
#[derive(Debug, Clone)]
pub struct Collection {
    endpoint: ServiceEndpoint,
    name: String,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.select_path())
    }
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    // -----------------------------------------------------------------------
    // fetch
    // -----------------------------------------------------------------------

    /// Documents matching `query`, with `fl` set to `fields` in order.
    ///
    /// `fields` only shapes the request; returned documents are passed
    /// through as the server sent them.
    pub fn fetch<S: AsRef<str>>(&self, query: &str, fields: &[S]) -> Result<ResultSet> {
        let request = self.build_fetch(query, fields)?;
        self.parse_fetch(self.execute(&request)?)
    }

    pub fn build_fetch<S: AsRef<str>>(&self, query: &str, fields: &[S]) -> Result<HttpRequest> {
        let params = vec![
            param("q", validate_query(query)?),
            param("fl", field_list(fields)?),
            param("wt", "json"),
            param("indent", "true"),
        ];
        Ok(self.request(params))
    }

    pub fn parse_fetch(&self, response: HttpResponse) -> Result<ResultSet> {
        response::docs(&response::json_body(response)?)
    }

    /// As `fetch`, with an explicit `rows` limit instead of the server
    /// default.
    pub fn fetch_rows<S: AsRef<str>>(&self, query: &str, fields: &[S], rows: u64) -> Result<ResultSet> {
        let request = self.build_fetch_rows(query, fields, rows)?;
        self.parse_fetch(self.execute(&request)?)
    }

    pub fn build_fetch_rows<S: AsRef<str>>(
        &self,
        query: &str,
        fields: &[S],
        rows: u64,
    ) -> Result<HttpRequest> {
        let params = vec![
            param("q", validate_query(query)?),
            param("fl", field_list(fields)?),
            param("rows", rows.to_string()),
            param("wt", "json"),
            param("indent", "false"),
        ];
        Ok(self.request(params))
    }

    /// Every matching document, or `None` when the match count exceeds the
    /// endpoint's `max_rows`.
    pub fn fetch_all<S: AsRef<str>>(&self, query: &str, fields: &[S]) -> Result<Option<ResultSet>> {
        // Validate before the count request goes out.
        field_list(fields)?;
        let found = self.count(query)?;
        if found > self.endpoint.max_rows {
            debug!(
                collection = %self.name,
                found,
                max_rows = self.endpoint.max_rows,
                "match count exceeds max_rows, not fetching"
            );
            return Ok(None);
        }
        if found == 0 {
            return Ok(Some(Vec::new()));
        }
        self.fetch_rows(query, fields, found).map(Some)
    }

    // -----------------------------------------------------------------------
    // count
    // -----------------------------------------------------------------------

    /// Number of documents matching `query`.
    pub fn count(&self, query: &str) -> Result<u64> {
        let request = self.build_count(query)?;
        self.parse_count(self.execute(&request)?)
    }

    pub fn build_count(&self, query: &str) -> Result<HttpRequest> {
        let params = vec![
            param("q", validate_query(query)?),
            param("rows", "0"),
            param("wt", "json"),
            param("indent", "false"),
        ];
        Ok(self.request(params))
    }

    pub fn parse_count(&self, response: HttpResponse) -> Result<u64> {
        response::num_found(&response::json_body(response)?)
    }

    // -----------------------------------------------------------------------
    // stats
    // -----------------------------------------------------------------------

    /// Aggregate statistics for each of `fields` over the documents matching
    /// `query`.
    pub fn stats<S: AsRef<str>>(
        &self,
        query: &str,
        fields: &[S],
        stats_spec: Option<&StatsSpec>,
    ) -> Result<StatsResult> {
        let request = self.build_stats(query, fields, stats_spec)?;
        self.parse_stats(self.execute(&request)?, fields)
    }

    /// One `stats.field` parameter per entry of `fields`, in order. Fields
    /// with modifiers in `stats_spec` get a local parameter block with the
    /// flags in canonical order.
    pub fn build_stats<S: AsRef<str>>(
        &self,
        query: &str,
        fields: &[S],
        stats_spec: Option<&StatsSpec>,
    ) -> Result<HttpRequest> {
        let mut params = vec![
            param("q", validate_query(query)?),
            param("fl", field_list(fields)?),
            param("stats", "true"),
            param("stats.calcdistinct", "true"),
        ];
        for field in fields {
            params.push(param("stats.field", stats_field(field.as_ref(), stats_spec)));
        }
        params.push(param("rows", "0"));
        params.push(param("wt", "json"));
        params.push(param("indent", "false"));
        Ok(self.request(params))
    }

    pub fn parse_stats<S: AsRef<str>>(&self, response: HttpResponse, fields: &[S]) -> Result<StatsResult> {
        let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        response::stats_fields(&response::json_body(response)?, &fields)
    }

    // -----------------------------------------------------------------------
    // facet ranges
    // -----------------------------------------------------------------------

    /// Range facet buckets for each entry of `ranges`.
    pub fn facet_range(&self, query: &str, ranges: &[RangeFacet]) -> Result<FacetRanges> {
        let request = self.build_facet_range(query, ranges)?;
        self.parse_facet_range(self.execute(&request)?, ranges)
    }

    pub fn build_facet_range(&self, query: &str, ranges: &[RangeFacet]) -> Result<HttpRequest> {
        if ranges.is_empty() {
            return Err(QueryError::InvalidArgument(
                "at least one range facet is required".to_string(),
            ));
        }
        let mut params = vec![param("q", validate_query(query)?), param("facet", "true")];
        for range in ranges {
            let field = validate_field(&range.field)?;
            params.push(param("facet.range", field));
            params.push(param(format!("f.{field}.facet.range.start"), &range.start));
            params.push(param(format!("f.{field}.facet.range.end"), &range.end));
            params.push(param(format!("f.{field}.facet.range.gap"), &range.gap));
            if let Some(include) = &range.include {
                params.push(param(format!("f.{field}.facet.range.include"), include));
            }
        }
        params.push(param("rows", "0"));
        params.push(param("wt", "json"));
        params.push(param("indent", "false"));
        Ok(self.request(params))
    }

    pub fn parse_facet_range(&self, response: HttpResponse, ranges: &[RangeFacet]) -> Result<FacetRanges> {
        let fields: Vec<&str> = ranges.iter().map(|r| r.field.as_str()).collect();
        response::facet_ranges(&response::json_body(response)?, &fields)
    }

    // -----------------------------------------------------------------------

    fn select_path(&self) -> String {
        format!("{}/{}/select", self.endpoint.base_url, self.name)
    }

    fn request(&self, params: Vec<(String, String)>) -> HttpRequest {
        let request = HttpRequest {
            path: self.select_path(),
            params,
            headers: self.endpoint.headers.clone(),
        };
        debug!(collection = %self.name, url = %request.url(), "built select request");
        request
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.endpoint.transport.get(request).inspect_err(|e| {
            warn!(collection = %self.name, error = %e, "select request did not complete");
        })
    }
}

fn param(key: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (key.into(), value.into())
}

fn validate_query(query: &str) -> Result<&str> {
    if query.trim().is_empty() {
        return Err(QueryError::InvalidArgument(
            "query must not be empty".to_string(),
        ));
    }
    Ok(query)
}

/// Field names are bare tokens: letters, digits, `_`, `-`, `.`, and the `*`
/// wildcard `fl` accepts.
fn validate_field(field: &str) -> Result<&str> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '*'));
    if !valid {
        return Err(QueryError::InvalidArgument(format!(
            "`{field}` is not a valid field name"
        )));
    }
    Ok(field)
}

fn field_list<S: AsRef<str>>(fields: &[S]) -> Result<String> {
    if fields.is_empty() {
        return Err(QueryError::InvalidArgument(
            "field list must not be empty".to_string(),
        ));
    }
    let fields = fields
        .iter()
        .map(|f| validate_field(f.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(fields.join(","))
}

/// `field`, or `{!min=true ...}field` when `stats_spec` has modifiers for it.
fn stats_field(field: &str, stats_spec: Option<&StatsSpec>) -> String {
    match stats_spec.and_then(|spec| spec.flags(field)) {
        Some(flags) => {
            let block = flags
                .iter()
                .map(|flag| format!("{}=true", flag.as_str()))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{{!{block}}}{field}")
        }
        None => field.to_string(),
    }
}
