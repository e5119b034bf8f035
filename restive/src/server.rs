// Copyright 2025 Oxide Computer Company

//! The dispatcher: routes each request, runs the selected method, and turns
//! the outcome into a [`Response`].

use crate::config::Config;
use crate::config::ConfigServer;
use crate::discover::DiscoveryContext;
use crate::error::error_chain;
use crate::error::ConfigError;
use crate::error::HttpError;
use crate::handler::HandlerError;
use crate::handler::HandlerTable;
use crate::http_util::ContentType;
use crate::params::is_empty_value;
use crate::params::Value;
use crate::params::ValueMap;
use crate::registry::Registry;
use crate::request::RequestError;
use crate::request::RequestModel;
use crate::resource::ExecContext;
use crate::resource::HttpVerb;
use crate::response::Renderer;
use crate::response::Response;
use crate::router::RouteFailure;
use crate::router::RouteResult;
use crate::router::Router;
use crate::router::UnmatchedReason;
use crate::router::DEFAULT_JSONP_CALLBACK;
use bytes::Bytes;
use http::StatusCode;
use slog::Logger;
use std::time::Instant;
use uuid::Uuid;

/// Host used in discovery URLs when nothing better is known.
const FALLBACK_HOST: &str = "localhost";

/// A configured server: the resource registry together with the router and
/// renderer built for it.
///
/// `Server` owns no connections.  The transport hands it one request at a
/// time through [`Server::handle`]; everything it holds is read-only, so a
/// `Server` may be shared between threads.
#[derive(Debug)]
pub struct Server {
    config: ConfigServer,
    registry: Registry,
    router: Router,
    renderer: Renderer,
    /// host for discovery URLs of requests without a `Host` header
    default_host: String,
    log: Logger,
}

impl Server {
    /// Builds a server from a parsed configuration.  Fails if any resource
    /// definition is invalid or the HTML template can't be used.
    pub fn new(
        config: &Config,
        handlers: &HandlerTable,
        log: &Logger,
    ) -> Result<Server, ConfigError> {
        let registry = Registry::from_config(config, handlers, log)?;
        Server::with_registry(config.server.clone(), registry, log)
    }

    /// Builds a server around an already assembled registry.
    pub fn with_registry(
        config: ConfigServer,
        registry: Registry,
        log: &Logger,
    ) -> Result<Server, ConfigError> {
        let renderer = Renderer::from_config(&config)?;
        let router = Router::new(&config.base_url());
        let default_host = config
            .host
            .clone()
            .or_else(|| {
                hostname::get().ok().and_then(|name| name.into_string().ok())
            })
            .unwrap_or_else(|| FALLBACK_HOST.to_string());
        let log = log.new(o!("base_url" => config.base_url()));
        info!(log, "server ready";
            "resources" => registry.iter().count(),
            "debug" => config.debug,
        );
        Ok(Server { config, registry, router, renderer, default_host, log })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    /// Discovery URL settings for a request that named `host`.
    pub fn discovery_context(&self, host: Option<&str>) -> DiscoveryContext {
        DiscoveryContext {
            scheme: self.config.scheme.clone(),
            host: host.unwrap_or(&self.default_host).to_string(),
            base_url: self.config.base_url(),
            list_reserved: self.config.list_reserved,
        }
    }

    /// Handles one HTTP request from start to finish.
    pub fn handle(&self, request: &http::Request<Bytes>) -> http::Response<Bytes> {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let request_log = self.log.new(o!(
            "req_id" => request_id.clone(),
            "method" => request.method().as_str().to_string(),
            "uri" => format!("{}", request.uri()),
        ));
        trace!(request_log, "incoming request");

        let response = match RequestModel::from_http(request) {
            Ok(model) => self.respond(&model, &request_id, &request_log),
            Err(error) => self.rejected(&error, &request_id, &request_log),
        };
        let http_response = self.renderer.to_http(&response, &request_id);

        let latency_us = start_time.elapsed().as_micros();
        info!(request_log, "request completed";
            "response_code" => http_response.status().as_str(),
            "latency_us" => latency_us,
        );
        http_response
    }

    /// Dispatches a normalized request.  Every outcome, including routing
    /// and handler failures, becomes a `Response`.
    pub fn respond(
        &self,
        request: &RequestModel,
        request_id: &str,
        log: &Logger,
    ) -> Response {
        let discovery = self.discovery_context(request.host.as_deref());
        let response = match self.router.route(request, &self.registry) {
            Ok(route) => self.execute(request, route, &discovery, request_id, log),
            Err(failure) => {
                self.unrouted(request, &failure, &discovery, request_id, log)
            }
        };
        response.check_conditional(request, self.config.debug)
    }

    /// Runs `method` on `resource` in process, binding `args` the way a
    /// request's parameters are bound.
    pub fn invoke(
        &self,
        resource: &str,
        method: &str,
        args: ValueMap,
    ) -> Result<Value, HttpError> {
        let spec = self.registry.get(resource).ok_or_else(|| {
            HttpError::for_not_found(
                Some(UnmatchedReason::UnknownResource.to_string()),
                format!("Resource '{}' not found.", resource),
            )
        })?;
        let method_spec = spec.method(method).ok_or_else(|| {
            HttpError::for_not_found(
                Some(UnmatchedReason::UnknownMethod.to_string()),
                format!("Method not found for the resource '{}'.", spec.name),
            )
        })?;
        let params = method_spec.bind(&args).map_err(|missing| {
            HttpError::for_bad_request(
                Some(UnmatchedReason::ParamMismatch.to_string()),
                format!("Invalid parameters (missing \"{}\").", missing),
            )
        })?;
        let discovery = self.discovery_context(None);
        let context =
            ExecContext { registry: &self.registry, discovery: &discovery };
        spec.exec(&method_spec.name, params, &context)
            .map_err(|error| handler_http_error(&error))
    }

    fn execute(
        &self,
        request: &RequestModel,
        route: RouteResult,
        discovery: &DiscoveryContext,
        request_id: &str,
        log: &Logger,
    ) -> Response {
        debug!(log, "routed";
            "resource" => &route.resource,
            "method" => &route.method,
            "content_type" => route.content_type.mime(),
        );
        let Some(resource) = self.registry.get(&route.resource) else {
            let error = HttpError::for_internal_error(format!(
                "routed to unregistered resource \"{}\"",
                route.resource
            ));
            return self.error_response(&error, route.content_type, 0, request_id);
        };
        let max_age = cache_lifetime(request, resource.max_age);
        let context = ExecContext { registry: &self.registry, discovery };

        match resource.exec(&route.method, route.params, &context) {
            Ok(data) => {
                let status = if request.verb == HttpVerb::Get
                    || !is_empty_value(&data)
                {
                    StatusCode::OK
                } else {
                    StatusCode::NO_CONTENT
                };
                Response::new(status, route.content_type, data)
                    .with_max_age(max_age)
                    .with_jsonp_callback(route.jsonp_callback)
            }
            Err(error) => {
                let http_error = handler_http_error(&error);
                if http_error.status_code.is_server_error() {
                    error!(log, "the resource model raised an error";
                        "resource" => &route.resource,
                        "method" => &route.method,
                        "error" => &http_error.internal_message,
                    );
                    if self.config.debug {
                        return debug_response(&http_error);
                    }
                } else {
                    debug!(log, "handler rejected the request";
                        "error" => &http_error.internal_message,
                    );
                }
                self.error_response(
                    &http_error,
                    route.content_type,
                    max_age,
                    request_id,
                )
                .with_jsonp_callback(route.jsonp_callback)
            }
        }
    }

    fn unrouted(
        &self,
        request: &RequestModel,
        failure: &RouteFailure,
        discovery: &DiscoveryContext,
        request_id: &str,
        log: &Logger,
    ) -> Response {
        debug!(log, "request not routed";
            "reason" => failure.reason.as_str(),
            "message" => &failure.message,
        );
        let max_age = failure
            .resource
            .as_deref()
            .and_then(|name| self.registry.get(name))
            .map_or(self.config.default_max_age, |r| r.max_age);
        let error = HttpError::for_client_error(
            Some(failure.reason.to_string()),
            failure.status(),
            format!(
                "{} You must specify a valid resource and method, with \
                 appropriate parameters.  Browse {} to discover the available \
                 resources.",
                failure.message,
                discovery.root_url()
            ),
        );
        let content_type = failure.content_type.unwrap_or(ContentType::ALL[0]);
        let callback = failure.jsonp_callback.clone().or_else(|| {
            (content_type == ContentType::Javascript)
                .then(|| DEFAULT_JSONP_CALLBACK.to_string())
        });
        self.error_response(
            &error,
            content_type,
            cache_lifetime(request, max_age),
            request_id,
        )
        .with_jsonp_callback(callback)
    }

    fn rejected(
        &self,
        error: &RequestError,
        request_id: &str,
        log: &Logger,
    ) -> Response {
        debug!(log, "request rejected"; "error" => %error);
        let error = HttpError::for_client_error(
            None,
            error.status_code(),
            error.to_string(),
        );
        self.error_response(&error, ContentType::ALL[0], 0, request_id)
    }

    fn error_response(
        &self,
        error: &HttpError,
        content_type: ContentType,
        max_age: u64,
        request_id: &str,
    ) -> Response {
        let body = serde_json::to_value(error.to_body(request_id))
            .unwrap_or_default();
        // The request id differs on every request, so it is left out of the
        // entity tag.
        let mut subject = body.clone();
        if let Value::Object(fields) = &mut subject {
            fields.remove("request_id");
        }
        Response::new(error.status_code, content_type, body)
            .with_etag_of(&subject)
            .with_max_age(max_age)
    }
}

/// Only GET responses are cacheable.
fn cache_lifetime(request: &RequestModel, max_age: u64) -> u64 {
    if request.verb.is_cacheable() {
        max_age
    } else {
        0
    }
}

/// Converts a handler fault.  A status carried by the fault is kept; without
/// one, the fault is an internal error whose cause chain is logged but not
/// shown to the client.
fn handler_http_error(error: &HandlerError) -> HttpError {
    match error.status() {
        Some(status) if !status.is_server_error() => {
            HttpError::for_client_error(None, status, error.to_string())
        }
        status => HttpError::for_server_error(
            status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            error_chain(error),
        ),
    }
}

/// In debug mode, internal errors are shown in full, as plain text.
fn debug_response(error: &HttpError) -> Response {
    let text = format!("Internal Exception\n\n{}", error.internal_message);
    Response::new(error.status_code, ContentType::Text, Value::String(text))
}
