// Copyright 2025 Oxide Computer Company

//! Tests for handlers described with `#[resource]`.

use restive::resource;
use restive::BoundParams;
use restive::Handler;
use restive::HandlerError;
use serde_json::json;

use crate::common::Members;

#[test]
fn test_describe() {
    let description = Members::describe();
    assert_eq!(description.description, "Members of the crew.");

    let constructor = description.constructor_parameters();
    assert_eq!(constructor.len(), 1);
    assert_eq!(constructor[0].name, "manifest");
    assert!(constructor[0].is_optional);
    assert_eq!(constructor[0].default_value, Some(json!("heart-of-gold")));

    let names: Vec<&str> =
        description.methods().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "getplanets",
            "getfromplanet",
            "gethumans",
            "getbyname",
            "getnth",
            "getmanifest",
            "count",
            "clear",
            "explode",
        ]
    );

    let method = description.method_spec("GetFromPlanet").unwrap();
    assert_eq!(method.description, "Get the members from a planet.");
    assert_eq!(method.return_type, "array");
    assert_eq!(method.return_description, "");
    assert_eq!(method.parameters[0].default_value, Some(json!("Earth")));
    description.validate().unwrap();
}

#[test]
fn test_construct_and_call() {
    let mut members = Members::construct(BoundParams::new()).unwrap();

    let mut params = BoundParams::new();
    params.insert("planet", json!("Earth"));
    let humans = members.call("getfromplanet", params).unwrap();
    assert_eq!(humans.as_array().unwrap().len(), 2);

    // Unbound parameters fall back to their declared defaults.
    let defaulted =
        members.call("getfromplanet", BoundParams::new()).unwrap();
    assert_eq!(defaulted, humans);

    let error = members.call("nosuch", BoundParams::new()).unwrap_err();
    assert_eq!(error.to_string(), "Unknown method (nosuch).");
    assert_eq!(error.status(), Some(http::StatusCode::NOT_FOUND));

    // Methods see the state of the instance they're called on.
    assert_eq!(members.call("clear", BoundParams::new()).unwrap(), json!(null));
    assert_eq!(members.call("count", BoundParams::new()).unwrap(), json!(0));

    let args: BoundParams =
        [(String::from("manifest"), json!("vogon-fleet"))].into_iter().collect();
    let error = Members::construct(args).err().unwrap();
    assert_eq!(error.to_string(), "unknown manifest \"vogon-fleet\"");
    assert_eq!(error.status(), None);
}

/// A handler with neither a constructor nor documentation.
#[derive(Default)]
struct Towel {
    uses: u32,
}

#[resource]
impl Towel {
    pub fn wrap(&mut self, #[restive(default = 1)] times: u32) -> u32 {
        self.uses += times;
        self.uses
    }

    #[restive(rename = "isDry")]
    pub fn is_dry(&self) -> Result<bool, String> {
        Err(String::from("it never is"))
    }

    pub fn r#type(&self) -> &'static str {
        "towel"
    }
}

#[test]
fn test_defaults_and_conversions() {
    let description = Towel::describe();
    assert_eq!(description.description, "");
    assert!(description.constructor_parameters().is_empty());

    let wrap = description.method_spec("wrap").unwrap();
    assert_eq!(wrap.parameters[0].type_name, "u32");
    assert_eq!(wrap.parameters[0].default_value, Some(json!(1)));
    assert_eq!(wrap.return_type, "u32");
    assert_eq!(description.method_spec("isdry").unwrap().return_type, "bool");
    assert!(description.method_spec("type").is_some());

    let mut towel = Towel::construct(BoundParams::new()).unwrap();
    let mut params = BoundParams::new();
    params.insert("times", json!("3"));
    assert_eq!(towel.call("wrap", params).unwrap(), json!(3));
    assert_eq!(towel.call("type", BoundParams::new()).unwrap(), json!("towel"));

    let mut params = BoundParams::new();
    params.insert("times", json!("lots"));
    let error = towel.call("wrap", params).unwrap_err();
    assert_eq!(error.status(), Some(http::StatusCode::BAD_REQUEST));

    let error: HandlerError = towel.call("isdry", BoundParams::new()).unwrap_err();
    assert_eq!(error.to_string(), "it never is");
    assert_eq!(error.status(), None);
}
