// Copyright 2025 Oxide Computer Company

//! General-purpose HTTP-related facilities: the table of response content
//! types this crate knows how to produce, plus a few header names.

use std::fmt;

/// header name for conveying request ids ("x-request-id")
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// MIME type for JSON
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// MIME type for XML
pub const CONTENT_TYPE_XML: &str = "application/xml";
/// MIME type for HTML
pub const CONTENT_TYPE_HTML: &str = "text/html";
/// MIME type for plain text
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
/// MIME type for JavaScript (JSONP and the sandbox script)
pub const CONTENT_TYPE_JAVASCRIPT: &str = "text/javascript";
/// MIME type for form-encoded request bodies
pub const CONTENT_TYPE_URL_ENCODED: &str = "application/x-www-form-urlencoded";
/// MIME type for multipart form request bodies
pub const CONTENT_TYPE_MULTIPART_FORM_DATA: &str = "multipart/form-data";
/// Alternate MIME type accepted for XML request bodies
pub const CONTENT_TYPE_TEXT_XML: &str = "text/xml";

/// A response representation supported by the server.
///
/// The order of [`ContentType::ALL`] is significant: its first entry is what
/// an `Accept: */*` client gets, and wildcard matches pick the earliest entry
/// that fits.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContentType {
    Json,
    Xml,
    Html,
    Text,
    Javascript,
}

impl ContentType {
    /// Every supported content type, default first.
    pub const ALL: [ContentType; 5] = [
        ContentType::Json,
        ContentType::Xml,
        ContentType::Html,
        ContentType::Text,
        ContentType::Javascript,
    ];

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => CONTENT_TYPE_JSON,
            ContentType::Xml => CONTENT_TYPE_XML,
            ContentType::Html => CONTENT_TYPE_HTML,
            ContentType::Text => CONTENT_TYPE_TEXT,
            ContentType::Javascript => CONTENT_TYPE_JAVASCRIPT,
        }
    }

    /// Short name used in path extensions (`/members/getplanets.xml`) and in
    /// the `content_type` query parameter.
    pub fn short_name(&self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Xml => "xml",
            ContentType::Html => "html",
            ContentType::Text => "txt",
            ContentType::Javascript => "js",
        }
    }

    pub fn from_short_name(name: &str) -> Option<ContentType> {
        let name = name.to_ascii_lowercase();
        ContentType::ALL.into_iter().find(|c| c.short_name() == name)
    }

    pub fn from_mime(mime: &str) -> Option<ContentType> {
        let mime = mime.trim().to_ascii_lowercase();
        ContentType::ALL.into_iter().find(|c| c.mime() == mime)
    }

    /// The part of the MIME type before the slash.
    pub fn top_level(&self) -> &'static str {
        self.mime().split_once('/').map(|(t, _)| t).unwrap_or_default()
    }

    /// The part of the MIME type after the slash.
    pub fn subtype(&self) -> &'static str {
        self.mime().split_once('/').map(|(_, s)| s).unwrap_or_default()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Returns the media type of a `Content-Type` header value with parameters
/// stripped and case folded, e.g. `application/json` for
/// `Application/JSON; charset=utf-8`.
pub fn media_type_essence(header: &str) -> String {
    header.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}
