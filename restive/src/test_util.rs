// Copyright 2025 Oxide Computer Company
/*!
 * Automated testing facilities.  These are intended for use both by this crate
 * and dependents of this crate.
 */

use crate::config::Config;
use crate::handler::HandlerTable;
use crate::logging::ConfigLogging;
use crate::params::Value;
use crate::server::Server;
use bytes::Bytes;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use chrono::DateTime;
use chrono::Utc;
use http::header;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use slog::Logger;
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

/**
 * Returns a logger that drops everything, for tests that don't look at logs.
 */
pub fn test_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

/**
 * LogContext encapsulates the logger used by a test.  When the configuration
 * asks for a log file, the file is created in a temporary directory under a
 * name unique to the test.  If the test gets as far as calling
 * `cleanup_successful()`, the log file will be removed; otherwise it is kept
 * for inspection.
 */
pub struct LogContext {
    /** general-purpose logger */
    pub log: Logger,
    log_path: Option<Utf8PathBuf>,
}

impl LogContext {
    /**
     * Sets up a LogContext.  If `initial_config_logging` specifies a file-based
     * log (i.e., [`ConfigLogging::File`]), then the requested path _must_ be
     * the string `"UNUSED"` and it will be replaced with a file name (in a
     * temporary directory) containing `test_name` and other information to make
     * the filename likely to be unique across multiple runs (e.g., process id).
     */
    pub fn new(
        test_name: &str,
        initial_config_logging: &ConfigLogging,
    ) -> LogContext {
        let (log_path, log_config) = match initial_config_logging {
            ConfigLogging::File { level, path: dummy_path, if_exists } => {
                assert_eq!(
                    dummy_path, "UNUSED",
                    "for test suite logging configuration, when mode = \
                     \"file\" is used, the path MUST be the sentinel string \
                     \"UNUSED\".  It will be replaced with a unique path for \
                     each test."
                );
                let new_path = log_file_for_test(test_name);
                eprintln!("log file: {}", new_path);
                (
                    Some(new_path.clone()),
                    ConfigLogging::File {
                        level: level.clone(),
                        path: new_path,
                        if_exists: if_exists.clone(),
                    },
                )
            }
            other_config => (None, other_config.clone()),
        };

        let log = log_config.to_logger(test_name).unwrap();
        LogContext { log, log_path }
    }

    /** Path of the log file, if this is a file-based logger. */
    pub fn log_path(&self) -> Option<&Utf8Path> {
        self.log_path.as_deref()
    }

    /**
     * Flushes the log and returns its records, removing the log file.
     * Returns nothing if this is not a file-based logger.
     */
    pub fn read_and_cleanup(self) -> Vec<BunyanLogRecord> {
        let LogContext { log, log_path } = self;
        drop(log);
        let Some(log_path) = log_path else {
            return Vec::new();
        };
        let records = read_bunyan_log(&log_path);
        fs::remove_file(&log_path).unwrap();
        records
    }

    /**
     * Removes the log file, if this was a file-based logger.
     */
    pub fn cleanup_successful(self) {
        if let Some(ref log_path) = self.log_path {
            fs::remove_file(log_path).unwrap();
        }
    }
}

static TEST_SUITE_LOGGER_ID: AtomicU32 = AtomicU32::new(0);

/**
 * Returns a unique path name in a temporary directory that includes the given
 * `test_name`.
 */
pub fn log_file_for_test(test_name: &str) -> Utf8PathBuf {
    let arg0 = {
        let arg0path = std::env::args().next().unwrap();
        Path::new(&arg0path).file_name().unwrap().to_str().unwrap().to_string()
    };

    let mut pathbuf = Utf8PathBuf::try_from(std::env::temp_dir()).unwrap();
    let id = TEST_SUITE_LOGGER_ID.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    pathbuf.push(format!("{}-{}.{}.{}.log", arg0, test_name, pid, id));
    pathbuf
}

/**
 * Load an object of type `T` (usually a hunk of configuration) from the string
 * `contents`.  `label` is used as an identifying string in a log message.  It
 * should be unique for each test.
 */
pub fn read_config<T: DeserializeOwned + Debug>(
    label: &str,
    contents: &str,
) -> Result<T, toml::de::Error> {
    let result = toml::from_str(contents);
    eprintln!("config \"{}\": {:?}", label, result);
    result
}

/*
 * Bunyan testing facilities
 */

/**
 * Represents a Bunyan log record.  This form does not support any non-standard
 * fields.  "level" is not yet supported because we don't (yet) need it.
 */
#[derive(Deserialize)]
pub struct BunyanLogRecord {
    pub time: DateTime<Utc>,
    pub name: String,
    pub hostname: String,
    pub pid: u32,
    pub msg: String,
    pub v: usize,
}

/**
 * Read a file containing a Bunyan-format log, returning an array of records.
 */
pub fn read_bunyan_log<P: AsRef<Path>>(logpath: P) -> Vec<BunyanLogRecord> {
    let log_contents = fs::read_to_string(logpath).unwrap();
    log_contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str::<BunyanLogRecord>(line).unwrap())
        .collect()
}

/*
 * Request facilities
 */

/**
 * Builder for the `http::Request<Bytes>` values a [`Server`] handles.
 */
#[derive(Debug)]
pub struct TestRequest {
    builder: http::request::Builder,
    body: Bytes,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str) -> TestRequest {
        TestRequest {
            builder: http::Request::builder().method(method).uri(uri),
            body: Bytes::new(),
        }
    }

    pub fn get(uri: &str) -> TestRequest {
        TestRequest::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> TestRequest {
        TestRequest::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> TestRequest {
        TestRequest::new(Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> TestRequest {
        TestRequest::new(Method::DELETE, uri)
    }

    pub fn header(mut self, name: &str, value: &str) -> TestRequest {
        self.builder = self.builder.header(name, value);
        self
    }

    /** Sets the raw body.  The content type is whatever header was set. */
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> TestRequest {
        self.body = body.into();
        self
    }

    /** Sets a form-encoded body. */
    pub fn form(mut self, pairs: &[(&str, &str)]) -> TestRequest {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.builder = self.builder.header(
            header::CONTENT_TYPE,
            crate::http_util::CONTENT_TYPE_URL_ENCODED,
        );
        self.body = Bytes::from(body);
        self
    }

    /** Sets a JSON body. */
    pub fn json(mut self, body: &Value) -> TestRequest {
        self.builder = self
            .builder
            .header(header::CONTENT_TYPE, crate::http_util::CONTENT_TYPE_JSON);
        self.body = Bytes::from(body.to_string());
        self
    }

    pub fn build(self) -> http::Request<Bytes> {
        self.builder.body(self.body).expect("invalid test request")
    }
}

/**
 * TestContext manages a server built from a TOML configuration, along with
 * the logger it uses, for the common test-case pattern of building a server,
 * sending it requests, and tearing it down.
 */
pub struct TestContext {
    pub server: Server,
    pub log_context: LogContext,
}

impl TestContext {
    /**
     * Builds a server from `config` (TOML) and `handlers`.  The logging
     * configuration in `config`, if any, is replaced by `log_config`.
     */
    pub fn new(
        test_name: &str,
        config: &str,
        handlers: &HandlerTable,
        log_config: &ConfigLogging,
    ) -> TestContext {
        let config: Config = read_config(test_name, config).unwrap();
        let log_context = LogContext::new(test_name, log_config);
        let server =
            Server::new(&config, handlers, &log_context.log).unwrap();
        TestContext { server, log_context }
    }

    pub fn request(&self, request: TestRequest) -> http::Response<Bytes> {
        self.server.handle(&request.build())
    }

    /**
     * Sends `request`, asserts that the response has status `expected`, and
     * returns the response body parsed as JSON.
     */
    pub fn request_json(
        &self,
        request: TestRequest,
        expected: http::StatusCode,
    ) -> Value {
        let response = self.request(request);
        assert_eq!(response.status(), expected);
        read_json(&response)
    }

    pub fn teardown(self) {
        self.log_context.cleanup_successful();
    }

    /**
     * Shuts down the server and returns the records it logged.
     */
    pub fn teardown_with_log(self) -> Vec<BunyanLogRecord> {
        let TestContext { server, log_context } = self;
        drop(server);
        log_context.read_and_cleanup()
    }
}

/**
 * Parses the body of `response` as JSON.
 */
pub fn read_json<T: DeserializeOwned>(response: &http::Response<Bytes>) -> T {
    serde_json::from_slice(response.body()).unwrap_or_else(|error| {
        panic!(
            "response body is not valid JSON ({}): {:?}",
            error,
            String::from_utf8_lossy(response.body())
        )
    })
}

/**
 * Returns the body of `response` as a string.
 */
pub fn read_string(response: &http::Response<Bytes>) -> String {
    String::from_utf8(response.body().to_vec()).unwrap()
}
