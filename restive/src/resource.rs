// Copyright 2025 Oxide Computer Company

//! Resource descriptors: a handler type bound to its configuration.

use crate::api_description::bind_parameters;
use crate::api_description::HandlerDescription;
use crate::api_description::MethodSpec;
use crate::config::ConfigResource;
use crate::discover;
use crate::discover::DiscoveryContext;
use crate::error::ConfigError;
use crate::handler::HandlerError;
use crate::handler::HandlerFactory;
use crate::handler::HandlerTable;
use crate::params::BoundParams;
use crate::params::Value;
use crate::params::ValueMap;
use crate::registry::Registry;
use crate::ui;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Name of the reserved resource backed by the discovery generator.
pub const DISCOVER_RESOURCE: &str = "discover";
/// Name of the reserved resource serving the sandbox script.
pub const UI_RESOURCE: &str = "ui";
/// Resource names user configuration may not use.
pub const RESERVED_RESOURCES: [&str; 2] = [DISCOVER_RESOURCE, UI_RESOURCE];

/// max-age of the reserved resources
const RESERVED_MAX_AGE: u64 = 600;

/// The HTTP methods a resource can be bound to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }

    /// Maps a transport method onto a verb, if it is one we serve.
    pub fn from_method(method: &http::Method) -> Option<HttpVerb> {
        match *method {
            http::Method::GET => Some(HttpVerb::Get),
            http::Method::POST => Some(HttpVerb::Post),
            http::Method::PUT => Some(HttpVerb::Put),
            http::Method::DELETE => Some(HttpVerb::Delete),
            _ => None,
        }
    }

    /// Whether responses to this verb may be cached.
    pub fn is_cacheable(&self) -> bool {
        *self == HttpVerb::Get
    }
}

impl FromStr for HttpVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "DELETE" => Ok(HttpVerb::Delete),
            _ => Err(format!("unsupported HTTP method \"{}\"", s)),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What answers calls on a resource.
#[derive(Clone, Debug)]
enum ResourceBacking {
    Handler(Arc<dyn HandlerFactory>),
    Discovery,
    Ui,
}

/// State a resource may need while executing a call.
pub(crate) struct ExecContext<'a> {
    pub registry: &'a Registry,
    pub discovery: &'a DiscoveryContext,
}

/// A named resource: the verb it answers to, its cache lifetime, its
/// methods, and the handler type backing it.
#[derive(Clone, Debug)]
pub struct ResourceSpec {
    /// lowercase resource name
    pub name: String,
    /// handler class name, as registered in the `HandlerTable`
    pub class: String,
    pub http_method: HttpVerb,
    /// always 0 for verbs other than GET
    pub max_age: u64,
    pub description: String,
    pub purpose: String,
    /// constructor arguments bound at registration time
    pub constructor_args: BoundParams,
    methods: IndexMap<String, MethodSpec>,
    backing: ResourceBacking,
}

impl ResourceSpec {
    /// Builds a resource from its configuration-file definition.  The class
    /// defaults to the resource name and must be present in `handlers`.
    pub fn from_config(
        name: &str,
        config: &ConfigResource,
        handlers: &HandlerTable,
    ) -> Result<ResourceSpec, ConfigError> {
        check_name(name)?;
        let class = config.class.clone().unwrap_or_else(|| name.to_string());
        let factory = handlers.get(&class).ok_or_else(|| {
            ConfigError::UnknownHandler {
                resource: name.to_lowercase(),
                class: class.clone(),
            }
        })?;
        ResourceSpec::from_inline(
            name,
            factory,
            &config.http_method,
            config.max_age,
            &config.construct,
        )
    }

    /// Builds a resource from explicitly provided settings.
    pub fn from_inline(
        name: &str,
        factory: Arc<dyn HandlerFactory>,
        http_method: &str,
        max_age: i64,
        construct: &ValueMap,
    ) -> Result<ResourceSpec, ConfigError> {
        check_name(name)?;
        let name = name.to_lowercase();

        let http_method: HttpVerb = http_method.parse().map_err(|_| {
            ConfigError::DisallowedVerb {
                resource: name.clone(),
                method: http_method.to_string(),
            }
        })?;
        let max_age = u64::try_from(max_age).map_err(|_| {
            ConfigError::NegativeMaxAge { resource: name.clone(), max_age }
        })?;
        let max_age = if http_method.is_cacheable() { max_age } else { 0 };

        let description = factory.describe();
        description.validate().map_err(|message| {
            ConfigError::InvalidDescription { resource: name.clone(), message }
        })?;
        let constructor_args =
            bind_parameters(description.constructor_parameters(), construct)
                .map_err(|parameter| ConfigError::UnbindableConstructor {
                    resource: name.clone(),
                    parameter,
                })?;

        let class = factory.class_name().to_string();
        Ok(ResourceSpec::assemble(
            name,
            class,
            http_method,
            max_age,
            description,
            constructor_args,
            ResourceBacking::Handler(factory),
        ))
    }

    /// The reserved `discover` resource.
    pub(crate) fn discovery() -> ResourceSpec {
        ResourceSpec::assemble(
            DISCOVER_RESOURCE.to_string(),
            String::from("Discover"),
            HttpVerb::Get,
            RESERVED_MAX_AGE,
            discover::describe(),
            BoundParams::new(),
            ResourceBacking::Discovery,
        )
    }

    /// The reserved `ui` resource.
    pub(crate) fn ui() -> ResourceSpec {
        ResourceSpec::assemble(
            UI_RESOURCE.to_string(),
            String::from("Ui"),
            HttpVerb::Get,
            RESERVED_MAX_AGE,
            ui::describe(),
            BoundParams::new(),
            ResourceBacking::Ui,
        )
    }

    fn assemble(
        name: String,
        class: String,
        http_method: HttpVerb,
        max_age: u64,
        description: HandlerDescription,
        constructor_args: BoundParams,
        backing: ResourceBacking,
    ) -> ResourceSpec {
        let resource_description = description.description.clone();
        let purpose = description.purpose.clone();
        let (_, methods) = description.into_parts();
        ResourceSpec {
            name,
            class,
            http_method,
            max_age,
            description: resource_description,
            purpose,
            constructor_args,
            methods,
            backing,
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self.backing, ResourceBacking::Handler(_))
    }

    /// The exposed methods, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodSpec> {
        self.methods.values()
    }

    /// Looks up a method by name, ignoring case.
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(&name.to_lowercase())
    }

    /// Runs `method` with already-bound parameters on a fresh handler.
    pub(crate) fn exec(
        &self,
        method: &str,
        params: BoundParams,
        context: &ExecContext<'_>,
    ) -> Result<Value, HandlerError> {
        let spec = self.method(method).ok_or_else(|| {
            HandlerError::not_found(format!("Unknown method ({}).", method))
        })?;
        match &self.backing {
            ResourceBacking::Handler(factory) => {
                factory.exec(&self.constructor_args, &spec.name, params)
            }
            ResourceBacking::Discovery => discover::exec(
                context.registry,
                context.discovery,
                &spec.name,
                params,
            ),
            ResourceBacking::Ui => {
                Ok(Value::String(ui::script(&context.discovery.base_url)))
            }
        }
    }
}

fn check_name(name: &str) -> Result<(), ConfigError> {
    let lower = name.to_lowercase();
    if RESERVED_RESOURCES.contains(&lower.as_str()) {
        return Err(ConfigError::ReservedName(lower));
    }
    Ok(())
}
