// Copyright 2025 Oxide Computer Company

//! Tests for failures raised by handlers.

use http::header;
use http::StatusCode;
use restive::test_util::read_string;
use restive::test_util::TestRequest;
use restive::ValueMap;
use serde_json::json;

use crate::common;

#[test]
fn test_handler_client_errors() {
    let testctx = common::test_setup("test_handler_client_errors");

    let error = testctx.request_json(
        TestRequest::get("/members/getbyname.json?name=Slartibartfast"),
        StatusCode::NOT_FOUND,
    );
    assert_eq!(error["message"], json!("no member named Slartibartfast"));
    assert!(error.get("error_code").is_none());

    let member = testctx.request_json(
        TestRequest::get("/members/getnth.json?index=1"),
        StatusCode::OK,
    );
    assert_eq!(member["name"], json!("Ford Prefect"));

    let error = testctx.request_json(
        TestRequest::get("/members/getnth.json?index=first"),
        StatusCode::BAD_REQUEST,
    );
    let message = error["message"].as_str().unwrap();
    assert!(
        message.starts_with("invalid value for parameter \"index\""),
        "{}",
        message
    );

    testctx.teardown();
}

#[test]
fn test_handler_internal_error() {
    let testctx = common::test_setup("test_handler_internal_error");

    let error = testctx.request_json(
        TestRequest::get("/members/explode"),
        StatusCode::INTERNAL_SERVER_ERROR,
    );
    assert_eq!(error["error_code"], json!("Internal"));
    assert_eq!(error["message"], json!("Something went wrong in the framework."));

    let records = testctx.teardown_with_log();
    let messages: Vec<&str> = records.iter().map(|r| r.msg.as_str()).collect();
    assert!(messages.contains(&"the resource model raised an error"));
    assert_eq!(messages.last(), Some(&"request completed"));
}

#[test]
fn test_handler_internal_error_debug() {
    let testctx = common::test_setup_with_config(
        "test_handler_internal_error_debug",
        r#"
            [server]
            debug = true

            [resources.members]
            class = "Members"
        "#,
    );

    let response = testctx.request(
        TestRequest::get("/members/explode").header("accept", "text/html"),
    );
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        read_string(&response),
        "Internal Exception\n\n\
         Message: the manifest is corrupt\n\n\
         Previous error\n\n\
         Message: bad record\n"
    );

    testctx.teardown();
}

#[test]
fn test_constructor_failure() {
    let testctx = common::test_setup_with_config(
        "test_constructor_failure",
        r#"
            [resources.members]
            class = "Members"
            construct = { manifest = "vogon-fleet" }
        "#,
    );

    let error = testctx.request_json(
        TestRequest::get("/members/getplanets"),
        StatusCode::INTERNAL_SERVER_ERROR,
    );
    assert_eq!(error["error_code"], json!("Internal"));

    testctx.teardown();
}

#[test]
fn test_invoke() {
    let testctx = common::test_setup("test_invoke");
    let server = &testctx.server;

    let mut args = ValueMap::new();
    args.insert(String::from("PLANET"), json!("Sirius Tau"));
    let members = server.invoke("Members", "getFromPlanet", args).unwrap();
    assert_eq!(members[0]["name"], json!("Marvin"));

    let error = server.invoke("members", "getbyname", ValueMap::new());
    let error = error.unwrap_err();
    assert_eq!(error.status_code, StatusCode::BAD_REQUEST);
    assert_eq!(error.external_message, "Invalid parameters (missing \"name\").");

    let error = server.invoke("vogons", "poetry", ValueMap::new());
    assert_eq!(error.unwrap_err().status_code, StatusCode::NOT_FOUND);

    let resources = server.invoke("discover", "resources", ValueMap::new());
    let resources = resources.unwrap();
    assert!(resources["resources"]["members"].is_object());

    testctx.teardown();
}
