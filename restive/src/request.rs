// Copyright 2025 Oxide Computer Company

//! The normalized form of an inbound request.
//!
//! A [`RequestModel`] is what routing and dispatch operate on.  It is built
//! once per request, either from an `http::Request` with
//! [`RequestModel::from_http`] or piecewise with the builder-style methods,
//! and never changes afterwards.

use crate::body::decode_body;
use crate::body::decode_pairs;
use crate::cache::parse_http_date;
use crate::params::ValueMap;
use crate::resource::HttpVerb;
use bytes::Bytes;
use chrono::DateTime;
use chrono::Utc;
use http::StatusCode;

/// Wildcard that matches every media type.
pub const ACCEPT_ANY: &str = "*/*";

/// Requests rejected before routing.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("The HTTP method '{0}' is not implemented.")]
    UnsupportedMethod(String),
    #[error("Unsupported request Content-Type '{0}'.")]
    UnsupportedContentType(String),
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::UnsupportedContentType(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            RequestError::MalformedBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// A normalized inbound request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestModel {
    pub verb: HttpVerb,
    /// URI path, still percent-encoded
    pub path: String,
    /// media ranges from `Accept`, best first
    pub accept: Vec<String>,
    pub query: ValueMap,
    pub body: ValueMap,
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_none_match: Option<String>,
    /// value of the `Host` header
    pub host: Option<String>,
}

impl RequestModel {
    /// A request for `path` accepting anything, with no parameters.
    pub fn new<S: Into<String>>(verb: HttpVerb, path: S) -> RequestModel {
        RequestModel {
            verb,
            path: path.into(),
            accept: vec![ACCEPT_ANY.to_string()],
            query: ValueMap::new(),
            body: ValueMap::new(),
            if_modified_since: None,
            if_none_match: None,
            host: None,
        }
    }

    /// Sets the ranked accept list from an `Accept` header value.
    pub fn with_accept(mut self, header: &str) -> Self {
        self.accept = parse_accept(header);
        self
    }

    /// Sets the query parameters from a raw query string.
    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query = decode_pairs(query.as_bytes());
        self
    }

    pub fn with_query(mut self, query: ValueMap) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: ValueMap) -> Self {
        self.body = body;
        self
    }

    pub fn with_if_modified_since(mut self, when: DateTime<Utc>) -> Self {
        self.if_modified_since = Some(when);
        self
    }

    pub fn with_if_none_match<S: Into<String>>(mut self, etag: S) -> Self {
        self.if_none_match = Some(etag.into());
        self
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Builds the model of an HTTP request.
    ///
    /// Only GET, POST, PUT and DELETE are accepted.  Bodies are decoded
    /// according to their `Content-Type`: form-encoded, multipart, JSON
    /// object and XML bodies become body parameters; any other declared type
    /// is rejected.
    /// An `If-Modified-Since` header that is not a valid HTTP date is
    /// ignored.
    pub fn from_http(
        request: &http::Request<Bytes>,
    ) -> Result<RequestModel, RequestError> {
        let verb = HttpVerb::from_method(request.method()).ok_or_else(|| {
            RequestError::UnsupportedMethod(request.method().to_string())
        })?;
        let headers = request.headers();
        let header = |name: http::header::HeaderName| {
            headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
        };

        let accept = match header(http::header::ACCEPT) {
            Some(value) if !value.is_empty() => parse_accept(value),
            _ => vec![ACCEPT_ANY.to_string()],
        };
        let query = request
            .uri()
            .query()
            .map(|q| decode_pairs(q.as_bytes()))
            .unwrap_or_default();
        let body =
            decode_body(header(http::header::CONTENT_TYPE), request.body())?;

        Ok(RequestModel {
            verb,
            path: request.uri().path().to_string(),
            accept,
            query,
            body,
            if_modified_since: header(http::header::IF_MODIFIED_SINCE)
                .and_then(parse_http_date),
            if_none_match: header(http::header::IF_NONE_MATCH)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            host: header(http::header::HOST).map(str::to_string),
        })
    }
}

/// Parses an `Accept` header into media ranges ordered by preference.
///
/// Entries are separated by commas; the weight comes from a `q=` parameter
/// of the form `0`, `1`, `0.5`, `1.000` (default 1).  An entry whose weight
/// has any other form is dropped, as is an entry with weight 0.  Equal
/// weights keep header order, and repeated ranges keep their first
/// occurrence.
pub fn parse_accept(header: &str) -> Vec<String> {
    let mut entries: Vec<(f64, String)> = Vec::new();
    'entries: for entry in header.split(',') {
        let mut parts = entry.split(';');
        let range = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        if range.is_empty() {
            continue;
        }
        let mut weight = 1.0;
        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("q") {
                continue;
            }
            match parse_weight(value.trim()) {
                Some(w) => weight = w,
                None => continue 'entries,
            }
        }
        if weight <= 0.0 {
            continue;
        }
        entries.push((weight, range));
    }

    // sort_by is stable, so ties keep header order.
    entries.sort_by(|a, b| b.0.total_cmp(&a.0));
    let mut ranked: Vec<String> = Vec::with_capacity(entries.len());
    for (_, range) in entries {
        if !ranked.contains(&range) {
            ranked.push(range);
        }
    }
    ranked
}

/// Parses a weight of the form `0`, `1`, or either followed by a fraction,
/// no greater than 1.
fn parse_weight(value: &str) -> Option<f64> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };
    if whole != "0" && whole != "1" {
        return None;
    }
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
    }
    value.parse().ok().filter(|w| *w <= 1.0)
}
