// Copyright 2025 Oxide Computer Company

//! Responses and their rendering into HTTP messages.
//!
//! A [`Response`] is produced by the dispatcher for every request, including
//! failed ones.  It carries the data to send, the negotiated content type, and
//! the cache validators computed from the data.  A [`Renderer`] turns it into
//! an `http::Response<Bytes>` in that content type.

use crate::cache;
use crate::config::ConfigServer;
use crate::error::ConfigError;
use crate::http_util::ContentType;
use crate::http_util::HEADER_REQUEST_ID;
use crate::params::Value;
use crate::request::RequestModel;
use crate::resource::UI_RESOURCE;
use crate::router::DEFAULT_JSONP_CALLBACK;
use bytes::Bytes;
use chrono::DateTime;
use chrono::Utc;
use http::header;
use http::HeaderValue;
use http::StatusCode;
use std::fmt::Write;

/// Marker an HTML template must contain.  Rendered data replaces it.
pub const TEMPLATE_PLACEHOLDER: &str = "<!-- {dynamic} -->";

const DEFAULT_PAGE: &str = "<!DOCTYPE html>
<html>
<head>
<meta charset=\"utf-8\">
<title>restive</title>
</head>
<body>
<!-- {dynamic} -->
</body>
</html>
";

/// The outcome of a request, before rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: ContentType,
    pub data: Value,
    /// seconds clients may cache the response; 0 disables caching
    pub max_age: u64,
    pub last_modified: DateTime<Utc>,
    /// quoted entity tag
    pub etag: String,
    /// function wrapping JavaScript responses
    pub jsonp_callback: Option<String>,
}

impl Response {
    /// Creates an uncached response.  The entity tag is computed from `data`
    /// and `content_type`, and the modification time is guessed from `data`.
    pub fn new(
        status: StatusCode,
        content_type: ContentType,
        data: Value,
    ) -> Response {
        let etag = cache::etag(&data, content_type);
        let last_modified = cache::guess_last_modified(&data, Utc::now());
        Response {
            status,
            content_type,
            data,
            max_age: 0,
            last_modified,
            etag,
            jsonp_callback: None,
        }
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Computes the entity tag from `subject` instead of the data.  Used when
    /// the data carries per-request fields.
    pub fn with_etag_of(mut self, subject: &Value) -> Self {
        self.etag = cache::etag(subject, self.content_type);
        self
    }

    pub fn with_jsonp_callback(mut self, callback: Option<String>) -> Self {
        self.jsonp_callback = callback;
        self
    }

    /// Turns the response into 304 Not Modified if `request` shows that the
    /// client already holds it.  Never applies in debug mode.
    pub fn check_conditional(
        mut self,
        request: &RequestModel,
        debug: bool,
    ) -> Response {
        if cache::is_not_modified(
            debug,
            self.status,
            request.if_modified_since.as_ref(),
            request.if_none_match.as_deref(),
            &self.last_modified,
            &self.etag,
        ) {
            self.status = StatusCode::NOT_MODIFIED;
            self.data = Value::Null;
        }
        self
    }

    /// 204 and 304 responses carry no body.
    pub fn has_body(&self) -> bool {
        self.status != StatusCode::NO_CONTENT
            && self.status != StatusCode::NOT_MODIFIED
    }
}

/// Renders [`Response`]s.  Holds what HTML pages need: the page template and
/// the base URL the sandbox script is served under.
#[derive(Clone, Debug)]
pub struct Renderer {
    base_url: String,
    template: Option<String>,
}

impl Renderer {
    /// A renderer using the built-in HTML page.
    pub fn new(base_url: &str) -> Renderer {
        Renderer { base_url: base_url.to_string(), template: None }
    }

    /// Uses `template` for HTML pages.  Fails if it lacks
    /// [`TEMPLATE_PLACEHOLDER`].
    pub fn with_template(mut self, template: String) -> Result<Self, String> {
        if !template.contains(TEMPLATE_PLACEHOLDER) {
            return Err(format!(
                "template does not contain \"{}\"",
                TEMPLATE_PLACEHOLDER
            ));
        }
        self.template = Some(template);
        Ok(self)
    }

    /// Builds the renderer described by the server configuration, loading
    /// the HTML template if one is configured.
    pub fn from_config(config: &ConfigServer) -> Result<Renderer, ConfigError> {
        let renderer = Renderer::new(&config.base_url());
        let Some(path) = &config.html_template else {
            return Ok(renderer);
        };
        let template = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io { path: path.clone(), source }
        })?;
        renderer.with_template(template).map_err(|message| {
            ConfigError::Template { path: path.clone(), message }
        })
    }

    /// Renders the body of `response` in its content type.
    pub fn render(&self, response: &Response) -> String {
        let data = &response.data;
        match response.content_type {
            ContentType::Json => data.to_string(),
            ContentType::Javascript => match (&response.jsonp_callback, data) {
                (Some(callback), _) => format!("{}({});", callback, data),
                (None, Value::String(script)) => script.clone(),
                (None, _) => format!("{}({});", DEFAULT_JSONP_CALLBACK, data),
            },
            ContentType::Xml => render_xml(data),
            ContentType::Html => self.render_html(data),
            ContentType::Text => match data {
                Value::String(text) => text.clone(),
                _ => serde_json::to_string_pretty(data)
                    .unwrap_or_else(|_| data.to_string()),
            },
        }
    }

    /// Builds the HTTP response for `response`.
    pub fn to_http(
        &self,
        response: &Response,
        request_id: &str,
    ) -> http::Response<Bytes> {
        let body = if response.has_body() {
            Bytes::from(self.render(response))
        } else {
            Bytes::new()
        };
        let mut http_response = http::Response::new(body);
        *http_response.status_mut() = response.status;

        let headers = http_response.headers_mut();
        if response.has_body() {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(response.content_type.mime()),
            );
        }
        if response.max_age > 0 {
            let cache_control =
                format!("max-age={}, must-revalidate", response.max_age);
            let last_modified = cache::format_http_date(&response.last_modified);
            for (name, value) in [
                (header::CACHE_CONTROL, cache_control.as_str()),
                (header::LAST_MODIFIED, last_modified.as_str()),
                (header::ETAG, response.etag.as_str()),
            ] {
                if let Ok(value) = HeaderValue::from_str(value) {
                    headers.insert(name, value);
                }
            }
        } else {
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache"),
            );
        }
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert(HEADER_REQUEST_ID, value);
        }
        http_response
    }

    fn render_html(&self, data: &Value) -> String {
        let mut fragment = String::new();
        write_html(&mut fragment, data);
        let page = self.template.as_deref().unwrap_or(DEFAULT_PAGE);
        let page = page.replacen(TEMPLATE_PLACEHOLDER, &fragment, 1);

        let script = format!(
            "<script src=\"{}/{}\"></script>\n",
            escape_html(&self.base_url),
            UI_RESOURCE
        );
        match page.to_ascii_lowercase().find("</head>") {
            Some(at) => {
                let mut page = page;
                page.insert_str(at, &script);
                page
            }
            None => script + &page,
        }
    }
}

/*
 * HTML: maps become definition lists, sequences ordered lists.  Absolute URLs
 * are rendered as links, which makes discovery documents browsable.
 */
fn write_html(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            out.push_str("<dl>");
            for (key, item) in map {
                let _ = write!(out, "<dt>{}</dt><dd>", escape_html(key));
                write_html(out, item);
                out.push_str("</dd>");
            }
            out.push_str("</dl>");
        }
        Value::Array(items) => {
            out.push_str("<ol>");
            for item in items {
                out.push_str("<li>");
                write_html(out, item);
                out.push_str("</li>");
            }
            out.push_str("</ol>");
        }
        Value::String(s)
            if s.starts_with("http://") || s.starts_with("https://") =>
        {
            let s = escape_html(s);
            let _ = write!(out, "<a href=\"{}\">{}</a>", s, s);
        }
        Value::String(s) => out.push_str(&escape_html(s)),
        Value::Null => out.push_str("<em>null</em>"),
        other => out.push_str(&other.to_string()),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/*
 * XML: the data is the content of a <response> element.  Map keys become
 * element names (characters not allowed in names are replaced), sequences
 * become <item> elements, and null becomes an empty element.
 */
fn render_xml(data: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_xml(&mut out, "response", data);
    out.push('\n');
    out
}

fn write_xml(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => {
            let _ = write!(out, "<{}/>", name);
        }
        Value::Object(map) => {
            let _ = write!(out, "<{}>", name);
            for (key, item) in map {
                write_xml(out, &xml_name(key), item);
            }
            let _ = write!(out, "</{}>", name);
        }
        Value::Array(items) => {
            let _ = write!(out, "<{}>", name);
            for item in items {
                write_xml(out, "item", item);
            }
            let _ = write!(out, "</{}>", name);
        }
        Value::String(s) => {
            let _ = write!(out, "<{}>{}</{}>", name, escape_html(s), name);
        }
        other => {
            let _ = write!(out, "<{}>{}</{}>", name, other, name);
        }
    }
}

fn xml_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let starts_well = name
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_');
    if !starts_well {
        name.insert(0, '_');
    }
    name
}
