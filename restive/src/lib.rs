// Copyright 2025 Oxide Computer Company

//! Restive exposes ordinary Rust types as self-describing REST resources.
//!
//! A server is configured with a table of **resources**.  Each resource is
//! backed by a **handler** type, and each public method of that type is a
//! **method** of the resource, addressed as `/{resource}/{method}`.  Restive
//! routes requests to those methods, binds query or body parameters to the
//! method's parameters by name, negotiates the response representation, and
//! applies HTTP caching.  It also publishes what it serves: the reserved
//! `discover` resource lists every resource, method, and parameter, with the
//! documentation extracted from the handler's doc comments.
//!
//! ## Usage
//!
//! ```
//! use restive::resource;
//! use restive::Config;
//! use restive::HandlerTable;
//! use restive::Server;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! /// Greets people.
//! #[resource]
//! impl Greeter {
//!     pub fn new(greeting: String) -> Self {
//!         Greeter { greeting }
//!     }
//!
//!     /// Greet someone by name.
//!     /// @param string $name Who to greet
//!     pub fn hello(&self, #[restive(default = "world")] name: String) -> String {
//!         format!("{}, {}!", self.greeting, name)
//!     }
//! }
//!
//! fn main() -> Result<(), String> {
//!     let config = Config::from_toml(
//!         r##"
//!             [resources.greeter]
//!             class = "Greeter"
//!             construct = { greeting = "Hello" }
//!         "##,
//!     )
//!     .map_err(|e| e.to_string())?;
//!
//!     let mut handlers = HandlerTable::new();
//!     handlers.register::<Greeter>("Greeter")?;
//!
//!     let log = slog::Logger::root(slog::Discard, slog::o!());
//!     let server =
//!         Server::new(&config, &handlers, &log).map_err(|e| e.to_string())?;
//!
//!     let request = http::Request::get("/greeter/hello.txt?name=Ford")
//!         .body(bytes::Bytes::new())
//!         .map_err(|e| e.to_string())?;
//!     let response = server.handle(&request);
//!     assert_eq!(response.status(), http::StatusCode::OK);
//!     assert_eq!(response.body().as_ref(), b"Hello, Ford!");
//!     Ok(())
//! }
//! ```
//!
//! `Server` does not listen on a socket.  It handles one `http::Request` at a
//! time and returns the `http::Response` to send, leaving connections to
//! whatever transport the program uses.
//!
//! ## Handlers
//!
//! The [`resource`] attribute implements [`Handler`] for a type from its
//! inherent `impl` block:
//!
//! * every `pub fn` taking `&self` or `&mut self` is exposed, named after its
//!   identifier (or `#[restive(rename = "...")]`) and addressed ignoring case;
//! * `pub fn new` is the constructor, whose arguments come from the
//!   `construct` table of the resource definition; without one, the type's
//!   `Default` implementation is used;
//! * a parameter is optional if it is annotated `#[restive(default = ...)]`
//!   or has type `Option<_>`;
//! * methods may return anything `Serialize`, or a `Result` whose error
//!   converts into [`HandlerError`].
//!
//! A fresh handler is constructed for every call, so no state carries over
//! from one request to the next.
//!
//! Doc comments become the documentation published by discovery.  The first
//! sentence is the description and the rest the purpose; `@param type $name
//! text` and `@return type text` tags document parameters and results.
//!
//! ## Routing and content negotiation
//!
//! Requests have the form `{base_url}/{resource}/{method}[.{ext}]`.  The
//! response is rendered as JSON, XML, HTML, plain text, or JavaScript
//! (JSONP), picked from the `Accept` header unless the path extension
//! (`.json`, `.xml`, `.html`, `.txt`, `.js`) or the `content_type` query
//! parameter asks for a type explicitly, or a `jsonp` parameter names a
//! callback.  A request that can't be routed fails with the most specific
//! reason: unknown resource (404), wrong HTTP method (405), unknown method
//! (404), missing parameters (400), invalid callback (400), or no acceptable
//! content type (400).
//!
//! ## Caching
//!
//! GET responses from a resource with a nonzero `max_age` carry
//! `Cache-Control`, `Last-Modified`, and an `ETag` derived from the data.  A
//! request whose `If-None-Match` or `If-Modified-Since` shows the client is
//! current gets a 304 instead, except in debug mode.

mod api_description;
mod body;
mod cache;
mod config;
mod discover;
mod doc;
mod error;
mod handler;
mod http_util;
mod logging;
mod params;
mod registry;
mod request;
mod resource;
mod response;
mod router;
mod server;
mod ui;

pub mod test_util;

#[macro_use]
extern crate slog;

pub use api_description::bind_parameters;
pub use api_description::HandlerDescription;
pub use api_description::MethodSpec;
pub use api_description::MethodSpecBuilder;
pub use api_description::ParameterSpec;
pub use api_description::RESERVED_METHOD_PREFIX;
pub use cache::etag;
pub use config::Config;
pub use config::ConfigResource;
pub use config::ConfigServer;
pub use discover::Discovery;
pub use discover::DiscoveryContext;
pub use error::ConfigError;
pub use error::HttpError;
pub use error::HttpErrorResponseBody;
pub use handler::Handler;
pub use handler::HandlerError;
pub use handler::HandlerFactory;
pub use handler::HandlerTable;
pub use handler::TypedHandlerFactory;
pub use http_util::ContentType;
pub use http_util::CONTENT_TYPE_HTML;
pub use http_util::CONTENT_TYPE_JAVASCRIPT;
pub use http_util::CONTENT_TYPE_JSON;
pub use http_util::CONTENT_TYPE_TEXT;
pub use http_util::CONTENT_TYPE_URL_ENCODED;
pub use http_util::CONTENT_TYPE_XML;
pub use http_util::HEADER_REQUEST_ID;
pub use logging::ConfigLogging;
pub use logging::ConfigLoggingIfExists;
pub use logging::ConfigLoggingLevel;
pub use params::BoundParams;
pub use params::Value;
pub use params::ValueMap;
pub use registry::Registry;
pub use request::parse_accept;
pub use request::RequestError;
pub use request::RequestModel;
pub use resource::HttpVerb;
pub use resource::ResourceSpec;
pub use resource::DISCOVER_RESOURCE;
pub use resource::UI_RESOURCE;
pub use response::Renderer;
pub use response::Response;
pub use response::TEMPLATE_PLACEHOLDER;
pub use router::negotiate;
pub use router::RouteFailure;
pub use router::RouteResult;
pub use router::Router;
pub use router::UnmatchedReason;
pub use server::Server;

extern crate restive_endpoint;

/// Describes a handler type from its inherent `impl` block.
///
/// The attribute leaves the `impl` block as written, apart from removing the
/// `#[restive(...)]` helper attributes, and adds an implementation of
/// [`Handler`].  See the [crate documentation](crate#handlers) for which
/// methods are exposed and how their parameters are described.
///
/// ```
/// use restive::resource;
/// use restive::Handler;
/// use restive::HandlerError;
///
/// #[derive(Default)]
/// struct Planets;
///
/// /// The planets of the solar system.
/// #[resource]
/// impl Planets {
///     /// Count the planets.
///     pub fn count(&self) -> u32 {
///         8
///     }
///
///     /// Look up a planet by position.
///     /// @param int $position Position from the sun, starting at 1
///     #[restive(rename = "byPosition")]
///     pub fn by_position(
///         &self,
///         position: usize,
///     ) -> Result<&'static str, HandlerError> {
///         ["Mercury", "Venus", "Earth", "Mars"]
///             .get(position.wrapping_sub(1))
///             .copied()
///             .ok_or_else(|| HandlerError::not_found("no such planet"))
///     }
///
///     fn helper(&self) {}
/// }
///
/// let description = Planets::describe();
/// let names: Vec<_> = description.methods().map(|m| m.name.as_str()).collect();
/// assert_eq!(names, vec!["count", "byposition"]);
/// let method = description.method_spec("byPosition").unwrap();
/// assert_eq!(method.parameters[0].type_name, "int");
/// assert_eq!(method.return_type, "&'static str");
/// ```
pub use restive_endpoint::resource;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;

    /// Captures a parameter's default value.
    pub fn to_default<T: serde::Serialize>(value: T) -> crate::Value {
        serde_json::to_value(value).unwrap_or(crate::Value::Null)
    }
}
