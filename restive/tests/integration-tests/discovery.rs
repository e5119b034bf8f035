// Copyright 2025 Oxide Computer Company

//! Tests for the discovery documents and the sandbox script.

use http::header;
use http::StatusCode;
use restive::test_util::read_string;
use restive::test_util::TestRequest;
use serde_json::json;

use crate::common;

#[test]
fn test_discover_resources() {
    let testctx = common::test_setup("test_discover_resources");

    let listing =
        testctx.request_json(TestRequest::get("/"), StatusCode::OK);
    let resources = listing["resources"].as_object().unwrap();
    let names: Vec<&str> = resources.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["crew", "members"]);

    let members = &resources["members"];
    assert_eq!(members["desc"], json!("Members of the crew."));
    assert_eq!(
        members["purpose"],
        json!("Everyone aboard the Heart of Gold, with their planet of origin.")
    );
    assert_eq!(members["httpMethod"], json!("GET"));
    assert_eq!(
        members["discover"],
        json!("http://restive.test/discover/methods?resource=members")
    );
    assert_eq!(resources["crew"]["httpMethod"], json!("POST"));

    let methods = members["methods"].as_object().unwrap();
    let names: Vec<&str> = methods.keys().map(String::as_str).collect();
    assert!(names.contains(&"getplanets"));
    assert!(names.contains(&"clear"));
    assert!(!names.contains(&"new"));
    assert!(!names.contains(&"__internal"));

    let get_planets = &methods["getplanets"];
    assert_eq!(get_planets["desc"], json!("Get the planets the crew comes from."));
    assert_eq!(
        get_planets["return"],
        json!({"type": "array", "desc": "Planet names, in name order"})
    );
    assert_eq!(get_planets["params"], json!({}));
    assert_eq!(
        get_planets["discover"],
        json!(
            "http://restive.test/discover/params?resource=members&\
             method=getplanets"
        )
    );

    assert_eq!(
        methods["getfromplanet"]["params"]["planet"],
        json!({
            "position": 0,
            "type": "string",
            "isOptional": true,
            "defaultValue": "Earth",
            "desc": "The planet name",
        })
    );
    assert_eq!(methods["getbyname"]["params"]["name"]["type"], json!("String"));
    assert_eq!(methods["getbyname"]["return"]["type"], json!("Member"));
    assert_eq!(methods["gethumans"]["return"]["type"], json!("Vec<Member>"));
    assert_eq!(methods["clear"]["return"]["type"], json!("void"));
    assert_eq!(
        methods["count"]["params"]["planet"]["type"],
        json!("Option<String>")
    );
    assert_eq!(
        methods["count"]["params"]["planet"]["defaultValue"],
        json!(null)
    );

    testctx.teardown();
}

#[test]
fn test_discover_methods_and_params() {
    let testctx = common::test_setup("test_discover_methods_and_params");

    let by_path = testctx.request_json(
        TestRequest::get("/members").header("host", "hitchhiker.example"),
        StatusCode::OK,
    );
    let by_query = testctx.request_json(
        TestRequest::get("/discover/methods?resource=MEMBERS")
            .header("host", "hitchhiker.example"),
        StatusCode::OK,
    );
    assert_eq!(by_path, by_query);
    assert_eq!(
        by_path["methods"]["getnth"]["discover"],
        json!(
            "http://hitchhiker.example/discover/params?resource=members&\
             method=getnth"
        )
    );

    let params = testctx.request_json(
        TestRequest::get("/discover/params?resource=members&method=getNth"),
        StatusCode::OK,
    );
    assert_eq!(
        params,
        json!({
            "params": {
                "index": {
                    "position": 0,
                    "type": "int",
                    "isOptional": false,
                    "defaultValue": null,
                    "desc": "Zero-based position",
                }
            }
        })
    );

    let error = testctx.request_json(
        TestRequest::get("/discover/params?resource=members&method=fly"),
        StatusCode::NOT_FOUND,
    );
    assert_eq!(
        error["message"],
        json!("Method 'fly' not found for the resource 'members'.")
    );

    let error = testctx.request_json(
        TestRequest::get("/discover/methods?resource=vogons"),
        StatusCode::NOT_FOUND,
    );
    assert_eq!(error["message"], json!("Resource 'vogons' not found."));

    testctx.teardown();
}

#[test]
fn test_discover_list_reserved() {
    let testctx = common::test_setup_with_config(
        "test_discover_list_reserved",
        r#"
            [server]
            base_url = "/api"
            host = "restive.test"
            scheme = "https"
            list_reserved = true

            [resources.members]
            class = "Members"
        "#,
    );

    let listing =
        testctx.request_json(TestRequest::get("/api/"), StatusCode::OK);
    let resources = listing["resources"].as_object().unwrap();
    let names: Vec<&str> = resources.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["discover", "members", "ui"]);
    assert_eq!(
        resources["members"]["discover"],
        json!("https://restive.test/api/discover/methods?resource=members")
    );

    testctx.teardown();
}

#[test]
fn test_discover_html() {
    let testctx = common::test_setup("test_discover_html");

    let response =
        testctx.request(TestRequest::get("/").header("accept", "text/html"));
    assert_eq!(response.status(), StatusCode::OK);
    let html = read_string(&response);
    assert!(
        html.contains(
            "<a href=\"http://restive.test/discover/methods?resource=members\">"
        ),
        "{}",
        html
    );

    testctx.teardown();
}

#[test]
fn test_ui_script() {
    let testctx = common::test_setup_with_config(
        "test_ui_script",
        r#"
            [server]
            base_url = "/api"

            [resources.members]
            class = "Members"
        "#,
    );

    let response = testctx.request(
        TestRequest::get("/api/ui").header("accept", "application/json"),
    );
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/javascript");
    let script = read_string(&response);
    assert!(script.contains("/api"), "{}", script);
    assert!(!script.starts_with("parseResponse("));

    let response = testctx.request(TestRequest::post("/api/ui"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    testctx.teardown();
}
