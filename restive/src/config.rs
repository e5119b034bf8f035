// Copyright 2025 Oxide Computer Company
/*!
 * Configuration for a Restive server
 */

use crate::error::ConfigError;
use crate::logging::ConfigLogging;
use crate::params::ValueMap;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/**
 * Complete configuration of a server: global options, logging, and the
 * resource table.
 *
 * ```
 * use restive::Config;
 *
 * fn main() -> Result<(), String> {
 *     let config = Config::from_toml(
 *         r##"
 *             [server]
 *             base_url = "/api"
 *
 *             [resources.members]
 *             class = "Members"
 *             maxAge = 60
 *             [resources.members.construct]
 *             data = "crew.csv"
 *         "##,
 *     )
 *     .map_err(|error| error.to_string())?;
 *     assert_eq!(config.server.base_url(), "/api");
 *     assert_eq!(config.resources["members"].max_age, 60);
 *     Ok(())
 * }
 * ```
 */
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ConfigServer,
    #[serde(default)]
    pub logging: ConfigLogging,
    /** resource definitions, keyed by resource name */
    #[serde(default)]
    pub resources: BTreeMap<String, ConfigResource>,
}

impl Config {
    /** Parses a configuration from TOML text. */
    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /** Reads and parses a TOML configuration file. */
    pub fn from_file(path: &Utf8Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io { path: path.to_path_buf(), source }
        })?;
        Config::from_toml(&text)
    }
}

/**
 * Global server options.
 */
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ConfigServer {
    /** path prefix under which resources are served, e.g. "/api" */
    #[serde(alias = "baseUrl")]
    pub base_url: String,
    /** expose internal failure details and disable conditional responses */
    pub debug: bool,
    /** HTML page wrapped around text/html responses; must contain
     *  [`crate::response::TEMPLATE_PLACEHOLDER`] */
    #[serde(alias = "htmlTemplate")]
    pub html_template: Option<Utf8PathBuf>,
    /** host used in discovery URLs when a request carries no Host header;
     *  defaults to the machine's hostname */
    pub host: Option<String>,
    /** scheme used in discovery URLs */
    pub scheme: String,
    /** whether the reserved `discover` and `ui` resources are listed by
     *  discovery */
    pub list_reserved: bool,
    /** max-age for responses that could not be attributed to a resource */
    pub default_max_age: u64,
}

impl Default for ConfigServer {
    fn default() -> Self {
        ConfigServer {
            base_url: String::new(),
            debug: false,
            html_template: None,
            host: None,
            scheme: String::from("http"),
            list_reserved: false,
            default_max_age: 3600,
        }
    }
}

impl ConfigServer {
    /**
     * Returns the base URL with a leading slash and no trailing slash, or an
     * empty string if resources are served from the root.
     */
    pub fn base_url(&self) -> String {
        let trimmed = self.base_url.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/**
 * Definition of one resource.
 */
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ConfigResource {
    /** handler class name registered in the `HandlerTable`; defaults to
     *  the resource name */
    #[serde(default)]
    pub class: Option<String>,
    /** the only HTTP method the resource answers to */
    #[serde(default = "default_http_method", alias = "httpMethod")]
    pub http_method: String,
    /** cache lifetime of GET responses, in seconds */
    #[serde(default = "default_max_age", alias = "maxAge")]
    pub max_age: i64,
    /** arguments for the handler constructor, by parameter name */
    #[serde(default)]
    pub construct: ValueMap,
}

fn default_http_method() -> String {
    String::from("GET")
}

fn default_max_age() -> i64 {
    600
}
