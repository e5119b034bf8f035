// Copyright 2025 Oxide Computer Company

//! Tests for what a server logs while handling requests.

use restive::test_util::TestRequest;

use crate::common;

#[test]
fn test_request_logging() {
    let testctx = common::test_setup("test_request_logging");
    let log_path = testctx.log_context.log_path().unwrap().to_owned();
    assert!(log_path.as_str().contains("test_request_logging"));

    testctx.request(TestRequest::get("/members/getplanets"));
    testctx.request(TestRequest::get("/nosuch/method"));

    let records = testctx.teardown_with_log();
    assert!(!log_path.exists());
    for record in &records {
        assert_eq!(record.name, "test_request_logging");
        assert_eq!(record.v, 0);
        assert_eq!(record.pid, std::process::id());
    }

    let messages: Vec<&str> = records.iter().map(|r| r.msg.as_str()).collect();
    let expected = [
        "registered resource",
        "registered resource",
        "server ready",
        "routed",
        "request completed",
        "request not routed",
        "request completed",
    ];
    assert_eq!(messages, expected);
}
