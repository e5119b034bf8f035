// Copyright 2025 Oxide Computer Company
/*!
 * Routes normalized requests to resource methods
 */

use crate::http_util::ContentType;
use crate::params::BoundParams;
use crate::params::Value;
use crate::params::ValueMap;
use crate::registry::Registry;
use crate::request::RequestModel;
use crate::resource::HttpVerb;
use crate::resource::ResourceSpec;
use crate::resource::DISCOVER_RESOURCE;
use crate::resource::UI_RESOURCE;
use http::StatusCode;
use percent_encoding::percent_decode_str;
use std::fmt;

/** query parameter selecting the response type by short name */
pub const CONTENT_TYPE_PARAM: &str = "content_type";
/** query parameter naming a JSONP callback */
pub const JSONP_PARAM: &str = "jsonp";
/** callback used for JavaScript responses when none is named */
pub const DEFAULT_JSONP_CALLBACK: &str = "parseResponse";

/**
 * A fully resolved request: the method to run, its bound parameters, and the
 * representation to render the result in.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct RouteResult {
    pub resource: String,
    pub method: String,
    pub params: BoundParams,
    pub content_type: ContentType,
    pub jsonp_callback: Option<String>,
}

/**
 * Why a request could not be routed.  When several apply, the one listed
 * first here is reported.
 */
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnmatchedReason {
    UnknownResource,
    VerbMismatch,
    UnknownMethod,
    ParamMismatch,
    InvalidCallback,
    NoAcceptableContentType,
}

impl UnmatchedReason {
    pub fn status(&self) -> StatusCode {
        match self {
            UnmatchedReason::UnknownResource => StatusCode::NOT_FOUND,
            UnmatchedReason::VerbMismatch => StatusCode::METHOD_NOT_ALLOWED,
            UnmatchedReason::UnknownMethod => StatusCode::NOT_FOUND,
            UnmatchedReason::ParamMismatch => StatusCode::BAD_REQUEST,
            UnmatchedReason::InvalidCallback => StatusCode::BAD_REQUEST,
            UnmatchedReason::NoAcceptableContentType => StatusCode::BAD_REQUEST,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnmatchedReason::UnknownResource => "unknown-resource",
            UnmatchedReason::VerbMismatch => "verb-mismatch",
            UnmatchedReason::UnknownMethod => "unknown-method",
            UnmatchedReason::ParamMismatch => "param-mismatch",
            UnmatchedReason::InvalidCallback => "invalid-callback",
            UnmatchedReason::NoAcceptableContentType => {
                "no-acceptable-content-type"
            }
        }
    }
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
 * A request that could not be routed.
 *
 * Besides the reason, a failure records what routing learned before it
 * failed: the resource, if one was found (its max-age applies to the error
 * response), and the content type the error should be rendered in, if one
 * could be negotiated.  A valid `jsonp` callback is kept whenever the
 * request would have been answered in JavaScript, so script-tag clients can
 * evaluate the error too.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct RouteFailure {
    pub reason: UnmatchedReason,
    pub resource: Option<String>,
    pub content_type: Option<ContentType>,
    pub jsonp_callback: Option<String>,
    pub message: String,
}

impl RouteFailure {
    pub fn status(&self) -> StatusCode {
        self.reason.status()
    }
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RouteFailure {}

/**
 * Returns the first supported content type matched by the ranked media
 * ranges in `accept`.
 *
 * Ranges are tried in order.  An exact range matches only itself.  A range
 * with a wildcard type or subtype matches the earliest entry of
 * [`ContentType::ALL`] that fits, so a client accepting anything gets the
 * default type.
 */
pub fn negotiate(accept: &[String]) -> Option<ContentType> {
    accept.iter().find_map(|range| {
        ContentType::ALL.into_iter().find(|c| range_matches(range, *c))
    })
}

/** Returns true if any range in `accept` matches `content_type`. */
pub fn accepts(accept: &[String], content_type: ContentType) -> bool {
    accept.iter().any(|range| range_matches(range, content_type))
}

fn range_matches(range: &str, content_type: ContentType) -> bool {
    if range == "*" {
        return true;
    }
    match range.split_once('/') {
        Some((top, sub)) => {
            (top == "*" || top == content_type.top_level())
                && (sub == "*" || sub == content_type.subtype())
        }
        None => false,
    }
}

/**
 * Returns true if `name` may be used as a JSONP callback: one or more ASCII
 * letters, digits or underscores.
 */
pub fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/**
 * Turns [`RequestModel`]s into [`RouteResult`]s against a [`Registry`].
 *
 * Paths have the form `{base}/{resource}/{method}[.{ext}]`.  Three routes
 * are synthesized rather than looked up: the empty path lists all resources
 * through `discover`, a path naming only a resource lists that resource's
 * methods through `discover`, and any path under `ui` returns the sandbox
 * script.  These answer only GET.
 *
 * The response type is negotiated from the `Accept` list, which the
 * `content_type` query parameter and then the path extension can each put a
 * type in front of.  A `jsonp` parameter selects JavaScript whenever the
 * client accepts it.  Both override parameters are removed before binding.
 *
 * Parameters come from the query string for GET and DELETE, and from the
 * body for POST and PUT, with the query string filling in keys the body
 * lacks.
 */
#[derive(Clone, Debug)]
pub struct Router {
    /** decoded segments of the base URL */
    base: Vec<String>,
}

impl Router {
    pub fn new(base_url: &str) -> Router {
        Router {
            base: base_url
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /**
     * Resolves `request`.  Failures report the most specific reason that
     * applies, in the order of [`UnmatchedReason`].
     */
    pub fn route(
        &self,
        request: &RequestModel,
        registry: &Registry,
    ) -> Result<RouteResult, RouteFailure> {
        let mut input = parameter_source(request);
        let mut negotiation = Negotiation::new(&request.accept, &mut input);

        let segments = self.resource_segments(&request.path).ok_or_else(|| {
            negotiation.fail(
                UnmatchedReason::UnknownResource,
                None,
                "Resource not found.".to_string(),
            )
        })?;

        let Some(first) = segments.first() else {
            let discover = reserved(registry, DISCOVER_RESOURCE, &negotiation)?;
            require_get(request, discover, &negotiation)?;
            return negotiation.complete(discover, "resources", &input);
        };

        let resource = registry.get(first).ok_or_else(|| {
            negotiation.fail(
                UnmatchedReason::UnknownResource,
                None,
                "Resource not found.".to_string(),
            )
        })?;

        if resource.name == UI_RESOURCE {
            require_get(request, resource, &negotiation)?;
            return ui_route(resource, &negotiation);
        }

        let Some(method_segment) = segments.get(1) else {
            require_get(request, resource, &negotiation)?;
            let discover = reserved(registry, DISCOVER_RESOURCE, &negotiation)?;
            let mut synthetic = ValueMap::new();
            synthetic.insert(
                String::from("resource"),
                Value::String(resource.name.clone()),
            );
            return negotiation.complete(discover, "methods", &synthetic);
        };

        if resource.http_method != request.verb {
            return Err(negotiation.fail(
                UnmatchedReason::VerbMismatch,
                Some(resource),
                verb_message(request.verb, resource),
            ));
        }

        let method_name = match method_segment.split_once('.') {
            Some((name, extension)) => {
                match ContentType::from_short_name(extension) {
                    Some(content_type) => {
                        negotiation.extension = Some(content_type);
                        name
                    }
                    None => {
                        return Err(negotiation.fail(
                            UnmatchedReason::UnknownMethod,
                            Some(resource),
                            method_message(resource),
                        ))
                    }
                }
            }
            None => method_segment.as_str(),
        };

        negotiation.complete(resource, method_name, &input)
    }

    /**
     * Splits `path` into decoded segments and strips the base URL.  Returns
     * `None` if the path is not under the base URL or cannot be decoded.
     */
    fn resource_segments(&self, path: &str) -> Option<Vec<String>> {
        let segments = input_path_to_segments(path).ok()?;
        if segments.len() < self.base.len()
            || segments.iter().zip(&self.base).any(|(s, b)| s != b)
        {
            return None;
        }
        Some(segments[self.base.len()..].to_vec())
    }
}

/*
 * Paths are split on "/" with empty segments ignored, so "/members//x/" is
 * "/members/x".  Dot-segments are refused rather than resolved.
 */
fn input_path_to_segments(path: &str) -> Result<Vec<String>, String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment {
            "." | ".." => Err("dot-segments are not permitted".to_string()),
            _ => Ok(percent_decode_str(segment)
                .decode_utf8()
                .map_err(|e| e.to_string())?
                .to_string()),
        })
        .collect()
}

/*
 * Keys are compared ignoring case, so a body "Name" hides a query "name".
 */
fn parameter_source(request: &RequestModel) -> ValueMap {
    match request.verb {
        HttpVerb::Get | HttpVerb::Delete => request.query.clone(),
        HttpVerb::Post | HttpVerb::Put => {
            let mut input = request.body.clone();
            for (key, value) in &request.query {
                let folded = key.to_lowercase();
                if !input.keys().any(|k| k.to_lowercase() == folded) {
                    input.insert(key.clone(), value.clone());
                }
            }
            input
        }
    }
}

/** Removes `name` from `input`, ignoring case, and returns its value. */
fn take_param(input: &mut ValueMap, name: &str) -> Option<Value> {
    let key = input.keys().find(|k| k.eq_ignore_ascii_case(name))?.clone();
    input.remove(&key)
}

fn value_as_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn reserved<'a>(
    registry: &'a Registry,
    name: &str,
    negotiation: &Negotiation,
) -> Result<&'a ResourceSpec, RouteFailure> {
    registry.get(name).ok_or_else(|| {
        negotiation.fail(
            UnmatchedReason::UnknownResource,
            None,
            "Resource not found.".to_string(),
        )
    })
}

fn require_get(
    request: &RequestModel,
    resource: &ResourceSpec,
    negotiation: &Negotiation,
) -> Result<(), RouteFailure> {
    if request.verb == HttpVerb::Get {
        return Ok(());
    }
    Err(negotiation.fail(
        UnmatchedReason::VerbMismatch,
        Some(resource),
        verb_message(request.verb, resource),
    ))
}

fn ui_route(
    resource: &ResourceSpec,
    negotiation: &Negotiation,
) -> Result<RouteResult, RouteFailure> {
    let method = resource.methods().next().ok_or_else(|| {
        negotiation.fail(
            UnmatchedReason::UnknownMethod,
            Some(resource),
            method_message(resource),
        )
    })?;
    Ok(RouteResult {
        resource: resource.name.clone(),
        method: method.name.clone(),
        params: BoundParams::new(),
        content_type: ContentType::Javascript,
        jsonp_callback: None,
    })
}

fn verb_message(verb: HttpVerb, resource: &ResourceSpec) -> String {
    format!(
        "The HTTP method '{}' is not allowed for the resource '{}'.",
        verb, resource.name
    )
}

fn method_message(resource: &ResourceSpec) -> String {
    format!("Method not found for the resource '{}'.", resource.name)
}

/**
 * Content negotiation state for one request: the ranked `Accept` list plus
 * the overrides found in the parameters and the path.
 */
struct Negotiation {
    accept: Vec<String>,
    /** raw `content_type` parameter */
    requested: Option<String>,
    /** type named by the path extension */
    extension: Option<ContentType>,
    /** raw `jsonp` parameter */
    callback: Option<String>,
}

impl Negotiation {
    /** Takes the override parameters out of `input`. */
    fn new(accept: &[String], input: &mut ValueMap) -> Negotiation {
        Negotiation {
            accept: accept.to_vec(),
            requested: take_param(input, CONTENT_TYPE_PARAM)
                .map(value_as_string),
            extension: None,
            callback: take_param(input, JSONP_PARAM).map(value_as_string),
        }
    }

    /**
     * The `Accept` list with the overrides in front.  `None` if the
     * `content_type` parameter names no known type.
     */
    fn candidates(&self) -> Option<Vec<String>> {
        let mut candidates = self.accept.clone();
        if let Some(requested) = &self.requested {
            let content_type = ContentType::from_short_name(requested.trim())?;
            prepend(&mut candidates, content_type);
        }
        if let Some(content_type) = self.extension {
            prepend(&mut candidates, content_type);
        }
        Some(candidates)
    }

    /**
     * Type and callback to render an error in.  The callback is only
     * honoured when it is valid and JavaScript is acceptable, the same as
     * for a routed request.
     */
    fn best_effort(&self) -> (Option<ContentType>, Option<String>) {
        let Some(candidates) = self.candidates() else {
            return (None, None);
        };
        if let Some(callback) = &self.callback {
            if is_valid_callback(callback)
                && accepts(&candidates, ContentType::Javascript)
            {
                return (Some(ContentType::Javascript), Some(callback.clone()));
            }
        }
        (negotiate(&candidates), None)
    }

    fn resolve(
        &self,
    ) -> Result<(ContentType, Option<String>), (UnmatchedReason, String)> {
        if let Some(callback) = &self.callback {
            if !is_valid_callback(callback) {
                return Err((
                    UnmatchedReason::InvalidCallback,
                    format!("Invalid JSONP callback name '{}'.", callback),
                ));
            }
        }
        let not_available = || {
            (
                UnmatchedReason::NoAcceptableContentType,
                String::from(
                    "The requested Content-Type(s) is (are) not available.",
                ),
            )
        };
        let candidates = self.candidates().ok_or_else(not_available)?;
        let negotiated = negotiate(&candidates).ok_or_else(not_available)?;

        if let Some(callback) = &self.callback {
            if accepts(&candidates, ContentType::Javascript) {
                return Ok((ContentType::Javascript, Some(callback.clone())));
            }
        }
        if negotiated == ContentType::Javascript {
            return Ok((
                ContentType::Javascript,
                Some(DEFAULT_JSONP_CALLBACK.to_string()),
            ));
        }
        Ok((negotiated, None))
    }

    /** Looks up and binds the method, then settles the content type. */
    fn complete(
        &self,
        resource: &ResourceSpec,
        method_name: &str,
        input: &ValueMap,
    ) -> Result<RouteResult, RouteFailure> {
        let method = resource.method(method_name).ok_or_else(|| {
            self.fail(
                UnmatchedReason::UnknownMethod,
                Some(resource),
                method_message(resource),
            )
        })?;
        let params = method.bind(input).map_err(|missing| {
            self.fail(
                UnmatchedReason::ParamMismatch,
                Some(resource),
                format!("Invalid parameters (missing \"{}\").", missing),
            )
        })?;
        let (content_type, jsonp_callback) =
            self.resolve().map_err(|(reason, message)| {
                self.fail(reason, Some(resource), message)
            })?;
        Ok(RouteResult {
            resource: resource.name.clone(),
            method: method.name.clone(),
            params,
            content_type,
            jsonp_callback,
        })
    }

    fn fail(
        &self,
        reason: UnmatchedReason,
        resource: Option<&ResourceSpec>,
        message: String,
    ) -> RouteFailure {
        let (content_type, jsonp_callback) = self.best_effort();
        RouteFailure {
            reason,
            resource: resource.map(|r| r.name.clone()),
            content_type,
            jsonp_callback,
            message,
        }
    }
}

/** Moves the MIME type of `content_type` to the front of `candidates`. */
fn prepend(candidates: &mut Vec<String>, content_type: ContentType) {
    let mime = content_type.mime();
    candidates.retain(|range| range != mime);
    candidates.insert(0, mime.to_string());
}
