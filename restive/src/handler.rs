// Copyright 2025 Oxide Computer Company
//! Interface for implementing resource handlers.
//!
//! A handler is an ordinary Rust type whose methods become the methods of a
//! resource.  The [`Handler`] trait is the registration table for such a type:
//! it describes the exposed methods without running any of them, builds an
//! instance from configured constructor arguments, and dispatches a call by
//! method name.  Implementations are usually generated with the
//! `#[restive::resource]` attribute.
//!
//! The dispatcher constructs a fresh instance for every invocation, so state
//! kept in a handler's fields never outlives one request.
//!
//! Handler types are made available to configuration by registering them in a
//! [`HandlerTable`] under the class name that resource definitions refer to.

use crate::api_description::HandlerDescription;
use crate::params::BoundParams;
use crate::params::Value;
use http::StatusCode;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// A type whose methods are exposed as a resource.
pub trait Handler: Sized + Send + 'static {
    /// Describes the constructor and the exposed methods.
    fn describe() -> HandlerDescription;

    /// Builds an instance from the bound constructor arguments.
    fn construct(args: BoundParams) -> Result<Self, HandlerError>;

    /// Invokes the method named `method` (lowercase, as described) with
    /// parameters already bound against its description.
    fn call(
        &mut self,
        method: &str,
        params: BoundParams,
    ) -> Result<Value, HandlerError>;
}

/// A fault raised by handler code.
///
/// When the error carries a status code, that status is sent to the client
/// as is.  Otherwise the request fails with a 500.
#[derive(Debug)]
pub struct HandlerError {
    status: Option<StatusCode>,
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl HandlerError {
    pub fn new<S: Into<String>>(message: S) -> HandlerError {
        HandlerError { status: None, message: message.into(), source: None }
    }

    pub fn with_status<S: Into<String>>(
        status: StatusCode,
        message: S,
    ) -> HandlerError {
        HandlerError { status: Some(status), ..HandlerError::new(message) }
    }

    pub fn bad_request<S: Into<String>>(message: S) -> HandlerError {
        HandlerError::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> HandlerError {
        HandlerError::with_status(StatusCode::NOT_FOUND, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> HandlerError
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> HandlerError {
        HandlerError::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> HandlerError {
        HandlerError::new(message)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(error: std::io::Error) -> HandlerError {
        HandlerError::new(format!("I/O error: {}", error)).with_source(error)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> HandlerError {
        HandlerError::new(format!("failed to serialize result: {}", error))
            .with_source(error)
    }
}

/// Type-erased access to a [`Handler`] implementation, so that resources
/// backed by different handler types can live in one registry.
pub trait HandlerFactory: Debug + Send + Sync {
    /// the class name under which the handler type was registered
    fn class_name(&self) -> &str;

    fn describe(&self) -> HandlerDescription;

    /// Constructs a fresh handler from `args` and invokes `method` on it.
    fn exec(
        &self,
        args: &BoundParams,
        method: &str,
        params: BoundParams,
    ) -> Result<Value, HandlerError>;
}

/// [`HandlerFactory`] for a concrete handler type `H`.
pub struct TypedHandlerFactory<H: Handler> {
    class_name: String,
    phantom: PhantomData<fn() -> H>,
}

impl<H: Handler> TypedHandlerFactory<H> {
    pub fn new<S: Into<String>>(class_name: S) -> TypedHandlerFactory<H> {
        TypedHandlerFactory { class_name: class_name.into(), phantom: PhantomData }
    }
}

impl<H: Handler> Debug for TypedHandlerFactory<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHandlerFactory")
            .field("class_name", &self.class_name)
            .field("type", &std::any::type_name::<H>())
            .finish()
    }
}

impl<H: Handler> HandlerFactory for TypedHandlerFactory<H> {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn describe(&self) -> HandlerDescription {
        H::describe()
    }

    fn exec(
        &self,
        args: &BoundParams,
        method: &str,
        params: BoundParams,
    ) -> Result<Value, HandlerError> {
        let mut handler = H::construct(args.clone())?;
        handler.call(method, params)
    }
}

/// Handler types known to the server, by class name.
#[derive(Debug, Default)]
pub struct HandlerTable {
    factories: BTreeMap<String, Arc<dyn HandlerFactory>>,
}

impl HandlerTable {
    pub fn new() -> HandlerTable {
        HandlerTable::default()
    }

    /// Registers handler type `H` under `class_name`.
    pub fn register<H: Handler>(
        &mut self,
        class_name: &str,
    ) -> Result<(), String> {
        if self.factories.contains_key(class_name) {
            return Err(format!(
                "handler class \"{}\" is already registered",
                class_name
            ));
        }
        self.factories.insert(
            class_name.to_string(),
            Arc::new(TypedHandlerFactory::<H>::new(class_name)),
        );
        Ok(())
    }

    pub fn get(&self, class_name: &str) -> Option<Arc<dyn HandlerFactory>> {
        self.factories.get(class_name).cloned()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
