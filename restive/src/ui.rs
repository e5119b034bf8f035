// Copyright 2025 Oxide Computer Company

//! The reserved `ui` resource: a browser script adding a request sandbox to
//! the HTML discovery pages.

use crate::api_description::HandlerDescription;
use crate::api_description::MethodSpec;

const SCRIPT: &str = include_str!("ui.js");

/// Returns the sandbox script bound to `base_url`.
///
/// The script is a single self-invoking function; its trailing `})();` is
/// rewritten so that the function receives the base URL as its argument.
pub fn script(base_url: &str) -> String {
    let script = SCRIPT.trim_end();
    // serde_json renders a string as a quoted, escaped JavaScript literal.
    let argument = serde_json::Value::String(base_url.to_string()).to_string();
    match script.strip_suffix("})();") {
        Some(body) => format!("{}}})({});\n", body, argument),
        None => format!("{}\n", script),
    }
}

pub(crate) fn describe() -> HandlerDescription {
    HandlerDescription::new(
        "Browser sandbox.\nServes the script used by the HTML discovery pages.",
    )
    .method(
        MethodSpec::builder("get")
            .doc("Get the sandbox script.\n@return string JavaScript source")
            .build(),
    )
}
