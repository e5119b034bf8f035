// Copyright 2025 Oxide Computer Company

//! Generic server error handling facilities
//!
//! Errors fall into two families.  Configuration errors ([`ConfigError`]) are
//! detected while the registry is built, before any request is served; they
//! abort startup rather than leaving a resource half-defined.  Everything that
//! goes wrong while handling a request, whether in request decoding, routing,
//! or handler code, is converted into an [`HttpError`] before the response is
//! rendered.
//!
//! An `HttpError` carries both an external message, sent to the client, and
//! an internal message, recorded in the log.  For server errors the two differ:
//! outside of debug mode the client only learns that something went wrong,
//! while the log gets the full cause chain.

use camino::Utf8PathBuf;
use http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use std::error::Error;
use std::fmt;

/// Message prefix for server errors outside of debug mode.
pub const GENERIC_FAULT_MESSAGE: &str = "Something went wrong in the framework.";

/// `HttpError` represents an error generated as part of handling a request.
/// These are turned into an HTTP response, which includes:
///
///   * a status code, 400-level for client errors like bad input or an
///     unknown resource, 500-level for server errors
///   * a body, rendered in the negotiated content type when one could be
///     determined, which includes an optional string error code and a
///     human-readable message
///
/// `HttpError`s also have an internal error message, which may differ from
/// the message reported to clients.
#[derive(Debug)]
pub struct HttpError {
    /// HTTP status code for this error
    pub status_code: StatusCode,
    /// Optional string error code for this error.
    pub error_code: Option<String>,
    /// Error message to be sent to the client for this error
    pub external_message: String,
    /// Error message recorded in the log for this error
    pub internal_message: String,
}

/// Body of an HTTP response for an `HttpError`.
#[derive(Debug, Deserialize, Serialize)]
pub struct HttpErrorResponseBody {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub message: String,
}

impl HttpError {
    /// Generates an `HttpError` for any 400-level client error with a custom
    /// `message` used for both the internal and external message.
    pub fn for_client_error(
        error_code: Option<String>,
        status_code: StatusCode,
        message: String,
    ) -> Self {
        HttpError {
            status_code,
            error_code,
            internal_message: message.clone(),
            external_message: message,
        }
    }

    /// Generates a 400 "Bad Request" error with the given `message` used for
    /// both the internal and external message.
    pub fn for_bad_request(
        error_code: Option<String>,
        message: String,
    ) -> Self {
        HttpError::for_client_error(
            error_code,
            StatusCode::BAD_REQUEST,
            message,
        )
    }

    /// Generates a 404 "Not Found" error with the given `message` used for
    /// both the internal and external message.
    pub fn for_not_found(error_code: Option<String>, message: String) -> Self {
        HttpError::for_client_error(error_code, StatusCode::NOT_FOUND, message)
    }

    /// Generates an `HttpError` for a 500 "Internal Server Error" with the
    /// given `internal_message`.  The client sees only a generic message.
    pub fn for_internal_error(internal_message: String) -> Self {
        HttpError::for_server_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            internal_message,
        )
    }

    /// Like [`HttpError::for_internal_error`], for any 500-level status.
    pub fn for_server_error(
        status_code: StatusCode,
        internal_message: String,
    ) -> Self {
        HttpError {
            status_code,
            error_code: Some(String::from("Internal")),
            external_message: GENERIC_FAULT_MESSAGE.to_string(),
            internal_message,
        }
    }

    /// Returns the response body for this error.
    pub fn to_body(&self, request_id: &str) -> HttpErrorResponseBody {
        HttpErrorResponseBody {
            request_id: request_id.to_string(),
            error_code: self.error_code.clone(),
            message: self.external_message.clone(),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpError({}): {}", self.status_code, self.external_message)
    }
}

impl Error for HttpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// Renders an error and its chain of causes, one per paragraph.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut out = format!("Message: {}\n", error);
    let mut cause = error.source();
    while let Some(previous) = cause {
        out.push_str(&format!("\nPrevious error\n\nMessage: {}\n", previous));
        cause = previous.source();
    }
    out
}

/// A problem with the server configuration, detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read \"{path}\": {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("resource \"{resource}\": unknown handler class \"{class}\"")]
    UnknownHandler { resource: String, class: String },
    #[error(
        "resource \"{resource}\": the resource HTTP method ({method}) is not \
         allowed"
    )]
    DisallowedVerb { resource: String, method: String },
    #[error(
        "resource \"{resource}\": max-age must be a non-negative integer \
         ({max_age} given)"
    )]
    NegativeMaxAge { resource: String, max_age: i64 },
    #[error("resource name \"{0}\" is reserved")]
    ReservedName(String),
    #[error("resource \"{0}\" is defined more than once")]
    DuplicateResource(String),
    #[error(
        "resource \"{resource}\": invalid constructor arguments (missing \
         \"{parameter}\")"
    )]
    UnbindableConstructor { resource: String, parameter: String },
    #[error("resource \"{resource}\": invalid handler description: {message}")]
    InvalidDescription { resource: String, message: String },
    #[error("HTML template \"{path}\": {message}")]
    Template { path: Utf8PathBuf, message: String },
}
