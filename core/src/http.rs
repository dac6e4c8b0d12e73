//! HTTP request and response values for the host-does-IO pattern.
//!
//! # Design
//! `Collection::build_*` methods produce an `HttpRequest` and
//! `Collection::parse_*` methods consume an `HttpResponse`; neither touches
//! the network. A `Transport` sits between the two when the caller uses the
//! one-shot operations (`fetch`, `stats`, ...).
//!
//! The query parameters are kept un-encoded in `params` so they can be
//! inspected directly. `url()` is the only place percent-encoding happens, so
//! every key and value is encoded exactly once.

/// A GET request against the select handler, described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute path without the query string, e.g.
    /// `http://localhost:8983/solr/books/select`.
    pub path: String,
    /// Query parameters in emission order. Keys may repeat.
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Full URL with every parameter key and value percent-encoded.
    pub fn url(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }

    /// First value for `key`, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for a repeated `key`, in emission order.
    pub fn params_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// The body stays raw bytes; decoding is the parser's job so a body that is
/// not UTF-8 surfaces as a malformed response rather than a failed call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
