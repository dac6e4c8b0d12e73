//! Response normalization: status check, JSON parse, and explicit descent
//! into the select handler's envelopes.
//!
//! Every extraction fails with `MalformedResponse` on a shape mismatch; no
//! value is coerced or defaulted.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{QueryError, Result};
use crate::http::HttpResponse;
use crate::types::{FacetRanges, ResultSet, StatsResult};

/// Reject non-2xx responses, then parse the body as JSON.
pub(crate) fn json_body(response: HttpResponse) -> Result<Value> {
    if !response.is_success() {
        warn!(status = response.status, "select request failed");
        return Err(QueryError::HttpStatus {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    serde_json::from_slice(&response.body).map_err(|e| malformed(format!("body is not JSON: {e}")))
}

fn malformed(reason: String) -> QueryError {
    warn!(%reason, "malformed select response");
    QueryError::MalformedResponse(reason)
}

fn descend<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut node = root;
    for (depth, key) in path.iter().enumerate() {
        node = node.get(key).ok_or_else(|| {
            malformed(format!("missing `{}`", path[..=depth].join(".")))
        })?;
    }
    Ok(node)
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| malformed(format!("`{what}` is not an object")))
}

/// `response.docs`, each entry required to be an object.
pub(crate) fn docs(root: &Value) -> Result<ResultSet> {
    let docs = descend(root, &["response", "docs"])?
        .as_array()
        .ok_or_else(|| malformed("`response.docs` is not a list".to_string()))?;
    docs.iter()
        .enumerate()
        .map(|(i, doc)| as_object(doc, &format!("response.docs[{i}]")).cloned())
        .collect()
}

/// `response.numFound`.
pub(crate) fn num_found(root: &Value) -> Result<u64> {
    descend(root, &["response", "numFound"])?
        .as_u64()
        .ok_or_else(|| {
            malformed("`response.numFound` is not an unsigned integer".to_string())
        })
}

/// `stats.stats_fields.<field>` for every requested field, flattened.
pub(crate) fn stats_fields(root: &Value, fields: &[String]) -> Result<StatsResult> {
    let envelope = as_object(descend(root, &["stats", "stats_fields"])?, "stats.stats_fields")?;
    fields
        .iter()
        .map(|field| {
            let entry = envelope.get(field).ok_or_else(|| {
                malformed(format!("missing `stats.stats_fields.{field}`"))
            })?;
            let stats = as_object(entry, &format!("stats.stats_fields.{field}"))?;
            Ok((field.clone(), stats.clone()))
        })
        .collect()
}

/// `facet_counts.facet_ranges.<field>` for every requested field.
pub(crate) fn facet_ranges(root: &Value, fields: &[&str]) -> Result<FacetRanges> {
    let envelope = as_object(
        descend(root, &["facet_counts", "facet_ranges"])?,
        "facet_counts.facet_ranges",
    )?;
    fields
        .iter()
        .map(|field| {
            let entry = envelope.get(*field).ok_or_else(|| {
                malformed(format!("missing `facet_counts.facet_ranges.{field}`"))
            })?;
            let ranges = as_object(entry, &format!("facet_counts.facet_ranges.{field}"))?;
            Ok((field.to_string(), ranges.clone()))
        })
        .collect()
}
