// Copyright 2025 Oxide Computer Company

//! Cache validators: entity tags, HTTP dates, and conditional requests.

use crate::http_util::ContentType;
use crate::params::Value;
use base64::Engine;
use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;
use http::StatusCode;
use serde_json::json;
use sha1::Digest;
use sha1::Sha1;

/// Keys whose value, when present in a result object, is taken as the
/// result's modification time.  Checked in this order.
pub const LAST_MODIFIED_KEYS: [&str; 4] =
    ["lastModified", "lastmod", "modified", "last_modified"];

/// Computes the entity tag of a response.
///
/// The tag is a hash over the serialized data together with its content
/// type, so it is the same for structurally equal data rendered as the same
/// type and differs when either changes.  The result includes the quotes
/// required in the `ETag` header.
pub fn etag(data: &Value, content_type: ContentType) -> String {
    let subject = json!({ "contentType": content_type.mime(), "data": data });
    // Serializing a Value cannot fail: all of its keys are strings.
    let bytes = serde_json::to_vec(&subject).unwrap_or_default();
    let digest = Sha1::digest(&bytes);
    format!(
        "\"{}\"",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
    )
}

/// Formats a time as an HTTP date (IMF-fixdate).
pub fn format_http_date(when: &DateTime<Utc>) -> String {
    when.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses an HTTP date in any of the three formats HTTP/1.1 allows:
/// IMF-fixdate, RFC 850, and asctime.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(when) = DateTime::parse_from_rfc2822(value) {
        return Some(when.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Picks the modification time of a handler result.
///
/// If `data` is an object holding one of [`LAST_MODIFIED_KEYS`], its value
/// is read as a Unix timestamp (number or numeric string) or as a date
/// string.  Otherwise, or if the value can't be read, `now` is used.
pub fn guess_last_modified(data: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    let Value::Object(map) = data else {
        return now;
    };
    let Some(value) = LAST_MODIFIED_KEYS.iter().find_map(|k| map.get(*k))
    else {
        return now;
    };
    let parsed = match value {
        Value::Number(n) => n.as_i64().and_then(from_timestamp),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(seconds) => from_timestamp(seconds),
            Err(_) => parse_http_date(s).or_else(|| {
                DateTime::parse_from_rfc3339(s.trim())
                    .ok()
                    .map(|when| when.with_timezone(&Utc))
            }),
        },
        _ => None,
    };
    parsed.unwrap_or(now)
}

fn from_timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

/// Returns true if an `If-None-Match` header value matches `etag`.  Weak
/// tags compare equal to their strong counterparts.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let etag = etag.trim_start_matches("W/");
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/") == etag
    })
}

/// Decides whether a response may be replaced by 304 Not Modified.
///
/// Only responses with status 200 or 4xx qualify, and never in debug mode.
/// The client's copy is current if its `If-Modified-Since` is no earlier
/// than the response's modification time (at one-second resolution), or if
/// its `If-None-Match` names the response's entity tag.
pub fn is_not_modified(
    debug: bool,
    status: StatusCode,
    if_modified_since: Option<&DateTime<Utc>>,
    if_none_match: Option<&str>,
    last_modified: &DateTime<Utc>,
    etag: &str,
) -> bool {
    if debug || !(status == StatusCode::OK || status.is_client_error()) {
        return false;
    }
    let fresh_by_date = if_modified_since
        .map_or(false, |since| since.timestamp() >= last_modified.timestamp());
    let fresh_by_tag =
        if_none_match.map_or(false, |header| etag_matches(header, etag));
    fresh_by_date || fresh_by_tag
}
