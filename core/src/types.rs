//! Caller-facing query options and normalized result shapes.
//!
//! # Design
//! Response rows and statistics are arbitrary JSON, so they stay as
//! `serde_json::Value` trees rather than typed structs: the server decides
//! which fields come back, not this crate.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One returned document: field name to scalar or list value.
pub type Document = Map<String, Value>;

/// Documents in the order the server returned them.
pub type ResultSet = Vec<Document>;

/// Statistic name (`min`, `max`, `countDistinct`, ...) to value for one field.
pub type FieldStats = Map<String, Value>;

/// Per-field statistics with the `stats.stats_fields` envelope removed.
pub type StatsResult = BTreeMap<String, FieldStats>;

/// Per-field range facet buckets, as found under `facet_counts.facet_ranges`.
pub type FacetRanges = BTreeMap<String, Map<String, Value>>;

/// A per-field statistics modifier.
///
/// Declaration order is the canonical emission order inside a local
/// parameter block; `Ord` is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatsFlag {
    Min,
    Max,
    CountDistinct,
}

impl StatsFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            StatsFlag::Min => "min",
            StatsFlag::Max => "max",
            StatsFlag::CountDistinct => "countDistinct",
        }
    }
}

/// Optional per-field modifiers for a statistics query.
///
/// A field with no entry, or with an empty flag set, is requested in plain
/// form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsSpec {
    modifiers: BTreeMap<String, BTreeSet<StatsFlag>>,
}

impl StatsSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `flags` for `field`, adding to any flags already set.
    pub fn with_field(
        mut self,
        field: impl Into<String>,
        flags: impl IntoIterator<Item = StatsFlag>,
    ) -> Self {
        self.modifiers.entry(field.into()).or_default().extend(flags);
        self
    }

    /// Enabled flags for `field` in canonical order, or `None` for plain mode.
    pub fn flags(&self, field: &str) -> Option<&BTreeSet<StatsFlag>> {
        self.modifiers.get(field).filter(|flags| !flags.is_empty())
    }
}

/// One `facet.range` request.
///
/// Bounds and gap are passed through verbatim so both numeric (`0`, `100`,
/// `10`) and date math (`NOW/DAY-7DAYS`, `NOW/DAY`, `+1DAY`) ranges work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFacet {
    pub field: String,
    pub start: String,
    pub end: String,
    pub gap: String,
    /// `lower`, `upper`, `edge`, `outer` or `all`; server default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

impl RangeFacet {
    pub fn new(
        field: impl Into<String>,
        start: impl ToString,
        end: impl ToString,
        gap: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            start: start.to_string(),
            end: end.to_string(),
            gap: gap.to_string(),
            include: None,
        }
    }

    pub fn include(mut self, include: impl Into<String>) -> Self {
        self.include = Some(include.into());
        self
    }
}
