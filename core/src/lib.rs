//! Blocking client core for a Solr-style `/select` search endpoint.
//!
//! # Overview
//! Turns a collection name, a query expression and a field list into a
//! well-formed select request, and turns the JSON envelope that comes back
//! into flat rows or per-field statistics.
//!
//! # Design
//! - `ServiceEndpoint` and `Collection` are immutable and carry no state
//!   between calls; clone them freely and share them across threads.
//! - Each operation is split into `build_*` (produces `HttpRequest`) and
//!   `parse_*` (consumes `HttpResponse`), so the I/O boundary is explicit.
//!   The one-shot methods (`fetch`, `stats`, ...) join the two through a
//!   `Transport`, `UreqTransport` by default.
//! - Response trees stay `serde_json::Value`; extraction fails with
//!   `MalformedResponse` instead of coercing.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
mod response;
pub mod transport;
pub mod types;

pub use client::{Collection, ServiceEndpoint};
pub use config::EndpointConfig;
pub use error::{ErrorKind, QueryError, Result};
pub use http::{HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Document, FacetRanges, FieldStats, RangeFacet, ResultSet, StatsFlag, StatsResult, StatsSpec,
};
