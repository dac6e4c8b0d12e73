//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or error kinds. Results are compared as parsed
//! JSON so key ordering never matters.

use std::sync::Arc;

use serde_json::Value;
use solrq_core::{
    Collection, ErrorKind, HttpRequest, HttpResponse, Result, ServiceEndpoint, StatsSpec, Transport,
};

const BASE_URL: &str = "http://localhost:8983/solr";

/// Build/parse only; any attempt to execute is a test bug.
struct NoNetwork;

impl Transport for NoNetwork {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse> {
        panic!("unexpected network call to {}", request.url());
    }
}

fn collection(name: &str) -> Collection {
    ServiceEndpoint::with_transport(BASE_URL, Arc::new(NoNetwork))
        .unwrap()
        .get_collection(name)
        .unwrap()
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

fn expected_params(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let pair = strings(pair);
            (pair[0].clone(), pair[1].clone())
        })
        .collect()
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
    }
}

fn error_kind(name: &str) -> ErrorKind {
    match name {
        "InvalidArgument" => ErrorKind::InvalidArgument,
        "RequestFailed" => ErrorKind::RequestFailed,
        "MalformedResponse" => ErrorKind::MalformedResponse,
        other => panic!("unknown expected_error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

#[test]
fn fetch_test_vectors() {
    let raw = include_str!("../../test-vectors/fetch.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = collection(case["collection"].as_str().unwrap());
        let query = case["query"].as_str().unwrap();
        let fields = strings(&case["fields"]);
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_fetch(query, &fields).unwrap();
        assert_eq!(
            req.path,
            format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()),
            "{name}: path"
        );
        assert_eq!(req.params, expected_params(&expected_req["params"]), "{name}: params");
        assert_eq!(
            req.url(),
            format!(
                "{}?{}",
                req.path,
                expected_req["query_string"].as_str().unwrap()
            ),
            "{name}: url"
        );
        assert!(req.headers.is_empty(), "{name}: headers");

        // Verify parse
        let result = c.parse_fetch(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), error_kind(expected_error.as_str().unwrap()), "{name}: error kind");
        } else {
            let docs = serde_json::to_value(result.unwrap()).unwrap();
            assert_eq!(docs, case["expected_result"], "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[test]
fn stats_test_vectors() {
    let raw = include_str!("../../test-vectors/stats.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = collection(case["collection"].as_str().unwrap());
        let query = case["query"].as_str().unwrap();
        let fields = strings(&case["fields"]);
        let spec: Option<StatsSpec> = serde_json::from_value(case["stats_spec"].clone()).unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_stats(query, &fields, spec.as_ref()).unwrap();
        assert_eq!(
            req.path,
            format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()),
            "{name}: path"
        );
        assert_eq!(req.params, expected_params(&expected_req["params"]), "{name}: params");
        assert_eq!(
            req.params_named("stats.field").count(),
            fields.len(),
            "{name}: one stats.field per field"
        );

        // Verify parse
        let result = c.parse_stats(simulated(case), &fields);
        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), error_kind(expected_error.as_str().unwrap()), "{name}: error kind");
        } else {
            let stats = serde_json::to_value(result.unwrap()).unwrap();
            assert_eq!(stats, case["expected_result"], "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Query encoding
// ---------------------------------------------------------------------------

/// Raw value of the first `key` in the encoded query string, still escaped.
fn encoded_param<'a>(url: &'a str, key: &str) -> &'a str {
    let (_, query) = url.split_once('?').unwrap();
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
        .unwrap()
}

#[test]
fn q_decodes_back_to_the_literal_query() {
    let c = collection("margins");
    let queries = [
        "a:1 & b:2",
        "title:C++ OR title:\"a+b\"",
        "discount:50% AND ratio:100%25",
        "expr:x=y AND k:==",
        "city:Zürich OR name:\"東京\" OR emoji:🚀",
        "path:/a/b?c#d",
    ];
    for query in queries {
        let url = c.build_fetch(query, &["id"]).unwrap().url();
        let encoded = encoded_param(&url, "q");
        assert!(!encoded.contains(&['&', '+', '=', ' ', '#', '?'][..]), "{query}: {encoded}");
        assert_eq!(urlencoding::decode(encoded).unwrap(), query, "{query}");

        let url = c.build_stats(query, &["id"], None).unwrap().url();
        assert_eq!(urlencoding::decode(encoded_param(&url, "q")).unwrap(), query, "{query}");
    }
}
