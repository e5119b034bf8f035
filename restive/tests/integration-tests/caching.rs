// Copyright 2025 Oxide Computer Company

//! Tests for cache headers and conditional requests.

use http::header;
use http::StatusCode;
use restive::test_util::TestRequest;

use crate::common;

fn header_str<'a>(
    response: &'a http::Response<bytes::Bytes>,
    name: header::HeaderName,
) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[test]
fn test_cache_headers() {
    let testctx = common::test_setup("test_cache_headers");

    let response = testctx.request(TestRequest::get("/members/getplanets"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CACHE_CONTROL),
        Some("max-age=600, must-revalidate")
    );
    let etag = header_str(&response, header::ETAG).unwrap();
    assert!(etag.starts_with('"') && etag.ends_with('"'), "{}", etag);
    assert!(header_str(&response, header::LAST_MODIFIED).is_some());

    // The same data in the same representation has the same entity tag...
    let again = testctx.request(TestRequest::get("/members/getplanets.json"));
    assert_eq!(header_str(&again, header::ETAG), Some(etag));

    // ... but not in another one.
    let xml = testctx.request(TestRequest::get("/members/getplanets.xml"));
    assert_ne!(header_str(&xml, header::ETAG), Some(etag));

    // POST responses are never cached.
    let response = testctx.request(TestRequest::post("/crew/getplanets"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-cache"));
    assert!(header_str(&response, header::ETAG).is_none());

    testctx.teardown();
}

#[test]
fn test_if_none_match() {
    let testctx = common::test_setup("test_if_none_match");

    let response = testctx.request(TestRequest::get("/members/gethumans"));
    let etag = header_str(&response, header::ETAG).unwrap().to_string();

    for (label, if_none_match) in [
        ("exact", etag.clone()),
        ("weak", format!("W/{}", etag)),
        ("list", format!("\"other\", {}", etag)),
        ("any", String::from("*")),
    ] {
        let response = testctx.request(
            TestRequest::get("/members/gethumans")
                .header("if-none-match", &if_none_match),
        );
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED, "{}", label);
        assert!(response.body().is_empty());
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(header_str(&response, header::ETAG), Some(etag.as_str()));
    }

    let response = testctx.request(
        TestRequest::get("/members/gethumans")
            .header("if-none-match", "\"something-else\""),
    );
    assert_eq!(response.status(), StatusCode::OK);

    // Whatever the representation, a matching tag means 304.
    for path in ["/members/gethumans.xml", "/members/gethumans.html"] {
        let response = testctx.request(TestRequest::get(path));
        let etag = header_str(&response, header::ETAG).unwrap().to_string();
        let response = testctx
            .request(TestRequest::get(path).header("if-none-match", &etag));
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED, "{}", path);
    }

    testctx.teardown();
}

#[test]
fn test_if_modified_since() {
    let testctx = common::test_setup("test_if_modified_since");

    let response = testctx.request(TestRequest::get("/members/getmanifest"));
    assert_eq!(
        header_str(&response, header::LAST_MODIFIED),
        Some("Tue, 14 Nov 2023 22:13:20 GMT")
    );

    for since in [
        "Tue, 14 Nov 2023 22:13:20 GMT",
        "Wed, 15 Nov 2023 00:00:00 GMT",
        "Tuesday, 14-Nov-23 22:13:20 GMT",
        "Tue Nov 14 22:13:20 2023",
    ] {
        let response = testctx.request(
            TestRequest::get("/members/getmanifest")
                .header("if-modified-since", since),
        );
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED, "{}", since);
    }

    for since in ["Tue, 14 Nov 2023 22:13:19 GMT", "yesterday"] {
        let response = testctx.request(
            TestRequest::get("/members/getmanifest")
                .header("if-modified-since", since),
        );
        assert_eq!(response.status(), StatusCode::OK, "{}", since);
    }

    testctx.teardown();
}

#[test]
fn test_conditional_disabled_in_debug_mode() {
    let config = format!("{}\n{}", "[server]\ndebug = true", DEBUG_RESOURCES);
    let testctx = common::test_setup_with_config(
        "test_conditional_disabled_in_debug_mode",
        &config,
    );

    let response = testctx.request(TestRequest::get("/members/getplanets"));
    let etag = header_str(&response, header::ETAG).unwrap().to_string();
    let response = testctx.request(
        TestRequest::get("/members/getplanets").header("if-none-match", &etag),
    );
    assert_eq!(response.status(), StatusCode::OK);

    testctx.teardown();
}

const DEBUG_RESOURCES: &str = r#"
[resources.members]
class = "Members"
"#;

#[test]
fn test_uncached_resource() {
    let testctx = common::test_setup_with_config(
        "test_uncached_resource",
        r#"
            [resources.members]
            class = "Members"
            maxAge = 0
        "#,
    );

    let response = testctx.request(TestRequest::get("/members/getplanets"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-cache"));

    // Errors for the resource inherit its lifetime.
    let response = testctx.request(TestRequest::get("/members/nosuch"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-cache"));

    // Errors attributable to no resource use the server default.
    let response = testctx.request(TestRequest::get("/nosuch/method"));
    assert_eq!(
        header_str(&response, header::CACHE_CONTROL),
        Some("max-age=3600, must-revalidate")
    );

    testctx.teardown();
}

#[test]
fn test_error_revalidation() {
    let testctx = common::test_setup("test_error_revalidation");

    let response = testctx.request(TestRequest::get("/members/nosuch"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        header_str(&response, header::CACHE_CONTROL),
        Some("max-age=600, must-revalidate")
    );
    let etag = header_str(&response, header::ETAG).unwrap().to_string();
    let request_id_header = header::HeaderName::from_static("x-request-id");
    let request_id = header_str(&response, request_id_header.clone())
        .unwrap()
        .to_string();

    // Each request gets its own id, but the entity tag only covers the error
    // itself, so a client holding the error can revalidate it.
    let again = testctx.request(TestRequest::get("/members/nosuch"));
    assert_eq!(header_str(&again, header::ETAG), Some(etag.as_str()));
    assert_ne!(
        header_str(&again, request_id_header),
        Some(request_id.as_str())
    );

    let response = testctx.request(
        TestRequest::get("/members/nosuch").header("if-none-match", &etag),
    );
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(response.body().is_empty());

    testctx.teardown();
}
