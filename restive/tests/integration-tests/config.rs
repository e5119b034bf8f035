// Copyright 2025 Oxide Computer Company

//! Tests for configuration files and the resource definitions they hold.

use camino::Utf8PathBuf;
use restive::test_util::read_config;
use restive::test_util::test_logger;
use restive::Config;
use restive::ConfigError;
use restive::ConfigServer;
use restive::Server;
use std::io::Write;
use tempfile::NamedTempFile;

use crate::common;

fn server_error(config: &str) -> String {
    let config = Config::from_toml(config).unwrap();
    Server::new(&config, &common::handlers(), &test_logger())
        .unwrap_err()
        .to_string()
}

#[test]
fn test_config_defaults() {
    let config: Config = read_config("defaults", "").unwrap();
    assert_eq!(config.server, ConfigServer::default());
    assert_eq!(config.server.base_url(), "");
    assert_eq!(config.server.scheme, "http");
    assert_eq!(config.server.default_max_age, 3600);
    assert!(!config.server.debug);
    assert!(config.resources.is_empty());

    let config: Config = read_config(
        "resource_defaults",
        "[resources.Members]\n",
    )
    .unwrap();
    let members = &config.resources["Members"];
    assert_eq!(members.class, None);
    assert_eq!(members.http_method, "GET");
    assert_eq!(members.max_age, 600);
}

#[test]
fn test_config_base_url() {
    for (given, expected) in [
        ("", ""),
        ("/", ""),
        ("api", "/api"),
        ("/api/", "/api"),
        ("/api/v1", "/api/v1"),
    ] {
        let config: Config = read_config(
            "base_url",
            &format!("[server]\nbaseUrl = \"{}\"", given),
        )
        .unwrap();
        assert_eq!(config.server.base_url(), expected, "{:?}", given);
    }
}

#[test]
fn test_config_bad_values() {
    let error = read_config::<Config>(
        "bad_max_age",
        "[resources.members]\nmaxAge = \"ten\"",
    )
    .unwrap_err()
    .to_string();
    println!("found error: {}", error);
    assert!(error.contains("invalid type: string \"ten\""));

    let error = read_config::<Config>("bad_debug", "[server]\ndebug = 3")
        .unwrap_err()
        .to_string();
    println!("found error: {}", error);
    assert!(error.contains("invalid type: integer `3`"));
}

#[test]
fn test_config_reserved_names() {
    for name in ["discover", "ui", "Discover", "UI"] {
        let error = server_error(&format!(
            "[resources.{}]\nclass = \"Members\"\nhttpMethod = \"POST\"",
            name
        ));
        assert_eq!(
            error,
            format!("resource name \"{}\" is reserved", name.to_lowercase())
        );
    }
}

#[test]
fn test_config_resource_errors() {
    assert_eq!(
        server_error("[resources.members]\n"),
        "resource \"members\": unknown handler class \"members\""
    );
    assert_eq!(
        server_error("[resources.members]\nclass = \"Vogons\""),
        "resource \"members\": unknown handler class \"Vogons\""
    );
    assert_eq!(
        server_error(
            "[resources.members]\nclass = \"Members\"\nhttpMethod = \"PATCH\""
        ),
        "resource \"members\": the resource HTTP method (PATCH) is not allowed"
    );
    assert_eq!(
        server_error("[resources.members]\nclass = \"Members\"\nmaxAge = -1"),
        "resource \"members\": max-age must be a non-negative integer (-1 \
         given)"
    );
    assert_eq!(
        server_error(
            "[resources.members]\nclass = \"Members\"\n\
             [resources.MEMBERS]\nclass = \"Members\""
        ),
        "resource \"members\" is defined more than once"
    );
}

#[test]
fn test_config_http_method_case() {
    let config = Config::from_toml(
        "[resources.crew]\nclass = \"Members\"\nhttpMethod = \"post\"",
    )
    .unwrap();
    let server =
        Server::new(&config, &common::handlers(), &test_logger()).unwrap();
    let crew = server.registry().get("crew").unwrap();
    assert_eq!(crew.http_method.as_str(), "POST");
    assert_eq!(crew.max_age, 0);
}

#[test]
fn test_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(common::MEMBERS_CONFIG.as_bytes()).unwrap();
    let path = Utf8PathBuf::try_from(file.path().to_path_buf()).unwrap();
    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.server.host.as_deref(), Some("restive.test"));
    assert_eq!(config.resources.len(), 2);

    let missing = path.with_extension("missing");
    match Config::from_file(&missing) {
        Err(ConfigError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_config_html_template() {
    let mut template = NamedTempFile::new().unwrap();
    template
        .write_all(b"<html><head></head><body><!-- {dynamic} --></body></html>")
        .unwrap();
    let path = template.path().to_str().unwrap().to_string();
    let config = format!(
        "[server]\nhtmlTemplate = \"{}\"\n{}",
        path.replace('\\', "\\\\"),
        "[resources.members]\nclass = \"Members\""
    );
    let testctx =
        common::test_setup_with_config("test_config_html_template", &config);
    let response = testctx.request(
        restive::test_util::TestRequest::get("/members/getplanets.html"),
    );
    let html = restive::test_util::read_string(&response);
    assert!(
        html.starts_with(
            "<html><head><script src=\"/ui\"></script>\n</head><body><ol>"
        ),
        "{}",
        html
    );
    testctx.teardown();

    let mut bad = NamedTempFile::new().unwrap();
    bad.write_all(b"<html></html>").unwrap();
    let error = server_error(&format!(
        "[server]\nhtmlTemplate = \"{}\"",
        bad.path().to_str().unwrap().replace('\\', "\\\\")
    ));
    assert!(error.starts_with("HTML template"), "{}", error);
}
