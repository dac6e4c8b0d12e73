//! Evaluation of a select request against an in-memory collection.
//!
//! Supports just enough of the query grammar for tests: `*:*`,
//! `field:value` and `field:*` terms joined by `AND`, clauses joined by
//! `OR`, plus `fl`, `rows`, `stats.field` (with `{!...}` local parameters)
//! and numeric `facet.range`.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::Document;

const DEFAULT_ROWS: usize = 10;

pub fn execute(docs: &[Document], params: &[(String, String)]) -> Result<Value, String> {
    let q = first(params, "q").ok_or("missing required parameter `q`")?;
    let matched = docs
        .iter()
        .filter_map(|doc| matches(doc, q).map(|hit| hit.then_some(doc)).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    let rows = match first(params, "rows") {
        Some(raw) => raw.parse::<usize>().map_err(|_| format!("bad rows: {raw}"))?,
        None => DEFAULT_ROWS,
    };
    let fl: Vec<&str> = first(params, "fl")
        .map(|fl| fl.split(',').map(str::trim).filter(|f| !f.is_empty()).collect())
        .unwrap_or_default();

    let page: Vec<Value> = matched
        .iter()
        .take(rows)
        .map(|doc| Value::Object(project(doc, &fl)))
        .collect();

    let echoed: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let mut body = json!({
        "responseHeader": {"status": 0, "QTime": 0, "params": echoed},
        "response": {"numFound": matched.len(), "start": 0, "docs": page},
    });

    if first(params, "stats") == Some("true") {
        let calc_distinct = first(params, "stats.calcdistinct") == Some("true");
        let mut stats_fields = Map::new();
        for raw in all(params, "stats.field") {
            let (flags, field) = parse_local_params(raw)?;
            let stats = field_stats(&matched, field, calc_distinct, &flags);
            stats_fields.insert(field.to_string(), Value::Object(stats));
        }
        body["stats"] = json!({ "stats_fields": stats_fields });
    }

    if first(params, "facet") == Some("true") {
        let mut ranges = Map::new();
        for field in all(params, "facet.range") {
            ranges.insert(field.to_string(), range_facet(&matched, field, params)?);
        }
        body["facet_counts"] = json!({
            "facet_queries": {},
            "facet_fields": {},
            "facet_ranges": ranges,
        });
    }

    Ok(body)
}

fn first<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn all<'a>(params: &'a [(String, String)], key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    params
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn matches(doc: &Document, q: &str) -> Result<bool, String> {
    let q = q.trim();
    if q == "*:*" {
        return Ok(true);
    }
    for clause in q.split(" OR ") {
        let mut hit = true;
        for term in clause.split(" AND ") {
            let (field, value) = term
                .trim()
                .split_once(':')
                .ok_or_else(|| format!("cannot parse term `{term}`"))?;
            if !term_matches(doc.get(field), value.trim_matches('"')) {
                hit = false;
                break;
            }
        }
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

fn term_matches(value: Option<&Value>, wanted: &str) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(_) if wanted == "*" => true,
        Some(Value::Array(items)) => items.iter().any(|v| term_matches(Some(v), wanted)),
        Some(Value::String(s)) => s == wanted,
        Some(other) => match (other.as_f64(), wanted.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => other.to_string() == wanted,
        },
    }
}

fn project(doc: &Document, fl: &[&str]) -> Document {
    if fl.is_empty() || fl.contains(&"*") {
        return doc.clone();
    }
    fl.iter()
        .filter_map(|f| doc.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect()
}

/// Split `{!min=true max=true}field` into its enabled flags and the field.
fn parse_local_params(raw: &str) -> Result<(BTreeSet<String>, &str), String> {
    let Some(rest) = raw.strip_prefix("{!") else {
        return Ok((BTreeSet::new(), raw));
    };
    let (block, field) = rest
        .split_once('}')
        .ok_or_else(|| format!("unterminated local params in `{raw}`"))?;
    let mut flags = BTreeSet::new();
    for pair in block.split_whitespace() {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("bad local param `{pair}`"))?;
        if value == "true" {
            flags.insert(key.to_string());
        }
    }
    Ok((flags, field))
}

fn field_stats(
    docs: &[&Document],
    field: &str,
    calc_distinct: bool,
    flags: &BTreeSet<String>,
) -> Map<String, Value> {
    let mut values = Vec::new();
    let mut missing = 0u64;
    for doc in docs {
        match doc.get(field) {
            None | Some(Value::Null) => missing += 1,
            Some(Value::Array(items)) => values.extend(items.iter().cloned()),
            Some(v) => values.push(v.clone()),
        }
    }

    let numbers: Option<Vec<f64>> = values.iter().map(Value::as_f64).collect();
    let distinct: BTreeSet<String> = values.iter().map(Value::to_string).collect();

    let mut all = Map::new();
    match numbers {
        Some(nums) if !nums.is_empty() => {
            let count = nums.len() as f64;
            let sum: f64 = nums.iter().sum();
            let sum_sq: f64 = nums.iter().map(|n| n * n).sum();
            let mean = sum / count;
            let stddev = if nums.len() > 1 {
                ((sum_sq - sum * mean) / (count - 1.0)).max(0.0).sqrt()
            } else {
                0.0
            };
            all.insert("min".into(), json!(nums.iter().copied().fold(f64::INFINITY, f64::min)));
            all.insert("max".into(), json!(nums.iter().copied().fold(f64::NEG_INFINITY, f64::max)));
            all.insert("count".into(), json!(nums.len()));
            all.insert("missing".into(), json!(missing));
            all.insert("sum".into(), json!(sum));
            all.insert("sumOfSquares".into(), json!(sum_sq));
            all.insert("mean".into(), json!(mean));
            all.insert("stddev".into(), json!(stddev));
        }
        _ => {
            let strings: Vec<String> = values
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect();
            all.insert("min".into(), json!(strings.iter().min()));
            all.insert("max".into(), json!(strings.iter().max()));
            all.insert("count".into(), json!(strings.len()));
            all.insert("missing".into(), json!(missing));
        }
    }
    if calc_distinct {
        let mut seen = BTreeSet::new();
        let unique: Vec<Value> = values
            .iter()
            .filter(|v| seen.insert(v.to_string()))
            .cloned()
            .collect();
        all.insert("distinctValues".into(), Value::Array(unique));
        all.insert("countDistinct".into(), json!(distinct.len()));
    }

    if flags.is_empty() {
        return all;
    }
    // With local params only the requested statistics come back.
    all.into_iter().filter(|(k, _)| flags.contains(k)).collect()
}

fn range_facet(docs: &[&Document], field: &str, params: &[(String, String)]) -> Result<Value, String> {
    let bound = |name: &str| -> Result<f64, String> {
        let key = format!("f.{field}.facet.range.{name}");
        let raw = first(params, &key).ok_or_else(|| format!("missing `{key}`"))?;
        raw.parse::<f64>().map_err(|_| format!("`{key}` is not numeric: {raw}"))
    };
    let start = bound("start")?;
    let end = bound("end")?;
    let gap = bound("gap")?;
    if gap <= 0.0 {
        return Err(format!("gap for `{field}` must be positive"));
    }

    let values: Vec<f64> = docs
        .iter()
        .filter_map(|doc| doc.get(field).and_then(Value::as_f64))
        .collect();

    let mut counts = Vec::new();
    let mut lower = start;
    while lower < end {
        let upper = (lower + gap).min(end);
        // A gap below the float resolution at `lower` makes no progress.
        if upper <= lower {
            break;
        }
        let hits = values.iter().filter(|v| **v >= lower && **v < upper).count();
        counts.push(Value::String(label(lower)));
        counts.push(json!(hits));
        lower = upper;
    }

    Ok(json!({"counts": counts, "gap": gap, "start": start, "end": end}))
}

fn label(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_documents;

    fn docs() -> Vec<Document> {
        sample_documents()
            .into_iter()
            .map(|d| d.as_object().unwrap().clone())
            .collect()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn and_or_terms() {
        let docs = docs();
        let doc = &docs[0];
        assert!(matches(doc, "region:north AND product:alpha").unwrap());
        assert!(!matches(doc, "region:north AND product:beta").unwrap());
        assert!(matches(doc, "region:south OR year:1995").unwrap());
        assert!(matches(doc, "floor_margin_s:*").unwrap());
        assert!(!matches(&docs[4], "floor_margin_s:*").unwrap());
        assert!(matches(&docs[4], "tags:promo").unwrap());
        assert!(matches(doc, "region:\"north\"").unwrap());
        assert!(matches(doc, "nonsense").is_err());
    }

    #[test]
    fn rows_and_projection() {
        let body = execute(&docs(), &params(&[("q", "*:*"), ("fl", "id,region"), ("rows", "2")])).unwrap();
        assert_eq!(body["response"]["numFound"], 5);
        let page = body["response"]["docs"].as_array().unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0], json!({"id": "1", "region": "north"}));
    }

    #[test]
    fn local_params_limit_returned_stats() {
        let (flags, field) = parse_local_params("{!min=true countDistinct=true max=false}price").unwrap();
        assert_eq!(field, "price");
        assert_eq!(flags.into_iter().collect::<Vec<_>>(), vec!["countDistinct", "min"]);
        assert!(parse_local_params("{!min=true price").is_err());
    }

    #[test]
    fn numeric_stats_over_matches() {
        let body = execute(
            &docs(),
            &params(&[
                ("q", "*:*"),
                ("stats", "true"),
                ("stats.calcdistinct", "true"),
                ("stats.field", "floor_margin_s"),
                ("rows", "0"),
            ]),
        )
        .unwrap();
        let stats = &body["stats"]["stats_fields"]["floor_margin_s"];
        assert_eq!(stats["min"], 1.0);
        assert_eq!(stats["max"], 9.0);
        assert_eq!(stats["count"], 4);
        assert_eq!(stats["missing"], 1);
        assert_eq!(stats["countDistinct"], 3);
        assert!(body["response"]["docs"].as_array().unwrap().is_empty());
    }

    #[test]
    fn range_facet_buckets() {
        let body = execute(
            &docs(),
            &params(&[
                ("q", "*:*"),
                ("facet", "true"),
                ("facet.range", "year"),
                ("f.year.facet.range.start", "1990"),
                ("f.year.facet.range.end", "2020"),
                ("f.year.facet.range.gap", "10"),
            ]),
        )
        .unwrap();
        assert_eq!(
            body["facet_counts"]["facet_ranges"]["year"]["counts"],
            json!(["1990", 2, "2000", 1, "2010", 2])
        );
    }

    #[test]
    fn range_facet_stops_when_gap_vanishes() {
        let body = execute(
            &docs(),
            &params(&[
                ("q", "*:*"),
                ("facet", "true"),
                ("facet.range", "year"),
                ("f.year.facet.range.start", "1e20"),
                ("f.year.facet.range.end", "2e20"),
                ("f.year.facet.range.gap", "1"),
            ]),
        )
        .unwrap();
        assert_eq!(body["facet_counts"]["facet_ranges"]["year"]["counts"], json!([]));
    }

    #[test]
    fn missing_q_is_an_error() {
        assert!(execute(&docs(), &params(&[("fl", "id")])).is_err());
    }
}
