// Copyright 2025 Oxide Computer Company

//! The set of resources a server exposes.

use crate::config::Config;
use crate::error::ConfigError;
use crate::handler::HandlerTable;
use crate::resource::ResourceSpec;
use crate::resource::RESERVED_RESOURCES;
use slog::Logger;
use std::collections::BTreeMap;

/// Resources by lowercase name.  Built once at startup and read-only
/// afterwards.  Always contains the reserved `discover` and `ui` resources.
#[derive(Clone, Debug)]
pub struct Registry {
    resources: BTreeMap<String, ResourceSpec>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    /// Returns a registry holding only the reserved resources.
    pub fn new() -> Registry {
        let mut resources = BTreeMap::new();
        for resource in [ResourceSpec::discovery(), ResourceSpec::ui()] {
            resources.insert(resource.name.clone(), resource);
        }
        Registry { resources }
    }

    /// Builds a registry from the `[resources]` table of `config`.  Any
    /// invalid definition fails the whole registry.
    pub fn from_config(
        config: &Config,
        handlers: &HandlerTable,
        log: &Logger,
    ) -> Result<Registry, ConfigError> {
        let mut registry = Registry::new();
        for (name, definition) in &config.resources {
            let resource = ResourceSpec::from_config(name, definition, handlers)?;
            debug!(log, "registered resource";
                "resource" => &resource.name,
                "class" => &resource.class,
                "http_method" => resource.http_method.as_str(),
                "max_age" => resource.max_age,
                "methods" => resource.methods().count(),
            );
            registry.register(resource)?;
        }
        Ok(registry)
    }

    /// Adds a resource.  Reserved names and names already present (ignoring
    /// case) are rejected.
    pub fn register(
        &mut self,
        resource: ResourceSpec,
    ) -> Result<(), ConfigError> {
        let name = resource.name.to_lowercase();
        if RESERVED_RESOURCES.contains(&name.as_str()) {
            return Err(ConfigError::ReservedName(name));
        }
        if self.resources.contains_key(&name) {
            return Err(ConfigError::DuplicateResource(name));
        }
        self.resources.insert(name, resource);
        Ok(())
    }

    /// Looks up a resource by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&ResourceSpec> {
        self.resources.get(&name.to_lowercase())
    }

    /// All resources, in name order, reserved ones included.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceSpec> {
        self.resources.values()
    }
}
