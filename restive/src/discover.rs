// Copyright 2025 Oxide Computer Company

//! The discovery generator behind the reserved `discover` resource.
//!
//! Discovery publishes the registry itself: every resource with its methods,
//! and every method with its parameters, each entry carrying an absolute URL
//! at which its own detail can be fetched.
//!
//! ```text
//! {"resources": {"members": {"desc": .., "purpose": .., "httpMethod": "GET",
//!     "methods": {"getplanets": {"desc": .., "purpose": ..,
//!         "return": {"type": .., "desc": ..}, "params": {..},
//!         "discover": "http://host/api/discover/params?resource=members&method=getplanets"}},
//!     "discover": "http://host/api/discover/methods?resource=members"}}}
//! ```

use crate::api_description::HandlerDescription;
use crate::api_description::MethodSpec;
use crate::api_description::ParameterSpec;
use crate::handler::HandlerError;
use crate::params::BoundParams;
use crate::params::Value;
use crate::params::ValueMap;
use crate::registry::Registry;
use crate::resource::ResourceSpec;
use crate::resource::DISCOVER_RESOURCE;
use serde_json::json;

/// Where discovery URLs point, and what discovery lists.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryContext {
    pub scheme: String,
    pub host: String,
    /// normalized base URL: empty, or a leading slash and no trailing slash
    pub base_url: String,
    /// whether the reserved resources are listed
    pub list_reserved: bool,
}

impl DiscoveryContext {
    /// Absolute URL of the server's root, i.e. of the resource listing.
    pub fn root_url(&self) -> String {
        format!("{}://{}{}/", self.scheme, self.host, self.base_url)
    }

    /// URL listing the methods of `resource`.
    pub fn methods_url(&self, resource: &str) -> String {
        self.discover_url("methods", &[("resource", resource)])
    }

    /// URL listing the parameters of `method` on `resource`.
    pub fn params_url(&self, resource: &str, method: &str) -> String {
        self.discover_url("params", &[("resource", resource), ("method", method)])
    }

    fn discover_url(&self, method: &str, query: &[(&str, &str)]) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        format!(
            "{}{}/{}?{}",
            self.root_url(),
            DISCOVER_RESOURCE,
            method,
            query
        )
    }
}

/// A view of the registry that renders discovery documents.
pub struct Discovery<'a> {
    registry: &'a Registry,
    context: &'a DiscoveryContext,
}

impl<'a> Discovery<'a> {
    pub fn new(
        registry: &'a Registry,
        context: &'a DiscoveryContext,
    ) -> Discovery<'a> {
        Discovery { registry, context }
    }

    /// Every resource, with its methods and their parameters.
    pub fn list_resources(&self) -> Value {
        let resources: ValueMap = self
            .registry
            .iter()
            .filter(|r| self.context.list_reserved || !r.is_reserved())
            .map(|r| (r.name.clone(), self.resource_entry(r)))
            .collect();
        json!({ "resources": resources })
    }

    /// The methods of one resource.
    pub fn list_methods(&self, resource: &str) -> Result<Value, HandlerError> {
        let resource = self.resource(resource)?;
        Ok(json!({ "methods": self.methods_map(resource) }))
    }

    /// The parameters of one method.
    pub fn list_params(
        &self,
        resource: &str,
        method: &str,
    ) -> Result<Value, HandlerError> {
        let resource = self.resource(resource)?;
        let method = resource.method(method).ok_or_else(|| {
            HandlerError::not_found(format!(
                "Method '{}' not found for the resource '{}'.",
                method, resource.name
            ))
        })?;
        Ok(json!({ "params": params_map(method) }))
    }

    fn resource(&self, name: &str) -> Result<&'a ResourceSpec, HandlerError> {
        self.registry.get(name).ok_or_else(|| {
            HandlerError::not_found(format!("Resource '{}' not found.", name))
        })
    }

    fn resource_entry(&self, resource: &ResourceSpec) -> Value {
        json!({
            "desc": resource.description,
            "purpose": resource.purpose,
            "httpMethod": resource.http_method.as_str(),
            "methods": self.methods_map(resource),
            "discover": self.context.methods_url(&resource.name),
        })
    }

    fn methods_map(&self, resource: &ResourceSpec) -> ValueMap {
        resource
            .methods()
            .map(|method| {
                let entry = json!({
                    "desc": method.description,
                    "purpose": method.purpose,
                    "return": {
                        "type": method.return_type,
                        "desc": method.return_description,
                    },
                    "params": params_map(method),
                    "discover": self
                        .context
                        .params_url(&resource.name, &method.name),
                });
                (method.name.clone(), entry)
            })
            .collect()
    }
}

fn params_map(method: &MethodSpec) -> ValueMap {
    method
        .parameters
        .iter()
        .map(|p| {
            let entry = json!({
                "position": p.position,
                "type": p.type_name,
                "isOptional": p.is_optional,
                "defaultValue": p.default_value.clone().unwrap_or(Value::Null),
                "desc": p.description,
            });
            (p.name.clone(), entry)
        })
        .collect()
}

/// Describes the `discover` resource's own methods.
pub(crate) fn describe() -> HandlerDescription {
    let resource_param = ParameterSpec::required("resource").with_type("string");
    HandlerDescription::new(
        "Discover the resources of this server.\n\
         Lists resources, their methods and the parameters of each method.",
    )
    .method(
        MethodSpec::builder("resources")
            .doc(
                "List every resource.\n\
                 @return object Resources with their methods and parameters",
            )
            .build(),
    )
    .method(
        MethodSpec::builder("methods")
            .doc(
                "List the methods of a resource.\n\
                 @param string $resource The resource name\n\
                 @return object Methods with their parameters",
            )
            .param(resource_param.clone())
            .build(),
    )
    .method(
        MethodSpec::builder("params")
            .doc(
                "List the parameters of a method.\n\
                 @param string $resource The resource name\n\
                 @param string $method The method name\n\
                 @return object Parameters",
            )
            .param(resource_param)
            .param(ParameterSpec::required("method").with_type("string"))
            .build(),
    )
}

/// Executes a `discover` method.
pub(crate) fn exec(
    registry: &Registry,
    context: &DiscoveryContext,
    method: &str,
    mut params: BoundParams,
) -> Result<Value, HandlerError> {
    let discovery = Discovery::new(registry, context);
    match method {
        "resources" => Ok(discovery.list_resources()),
        "methods" => {
            let resource: String = params.take("resource")?;
            discovery.list_methods(&resource)
        }
        "params" => {
            let resource: String = params.take("resource")?;
            let method: String = params.take("method")?;
            discovery.list_params(&resource, &method)
        }
        _ => Err(HandlerError::not_found(format!(
            "Unknown method ({}).",
            method
        ))),
    }
}
