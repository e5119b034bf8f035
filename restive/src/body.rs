// Copyright 2025 Oxide Computer Company

//! Decoding of request bodies and query strings into parameter maps.
//!
//! Form-encoded data and multipart parts are keyed by name; a key ending in
//! `[]` collects its values into a list under the key without brackets.  A
//! JSON body must be an object.  An XML body becomes a map of the root
//! element's children.

use crate::http_util::media_type_essence;
use crate::http_util::CONTENT_TYPE_JSON;
use crate::http_util::CONTENT_TYPE_MULTIPART_FORM_DATA;
use crate::http_util::CONTENT_TYPE_TEXT_XML;
use crate::http_util::CONTENT_TYPE_URL_ENCODED;
use crate::http_util::CONTENT_TYPE_XML;
use crate::params::Value;
use crate::params::ValueMap;
use crate::request::RequestError;
use base64::Engine;
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::json;

/// Decodes `application/x-www-form-urlencoded` data.  Bytes that are not
/// valid UTF-8 after percent-decoding are replaced, never dropped.
pub fn decode_pairs(data: &[u8]) -> ValueMap {
    let mut map = ValueMap::new();
    for (key, value) in form_urlencoded::parse(data) {
        insert_named(&mut map, &key, Value::String(value.into_owned()));
    }
    map
}

/// Decodes a request body according to its declared `Content-Type`.  An
/// empty body is no parameters whatever its type.
pub fn decode_body(
    content_type: Option<&str>,
    body: &Bytes,
) -> Result<ValueMap, RequestError> {
    if body.is_empty() {
        return Ok(ValueMap::new());
    }
    let Some(content_type) = content_type else {
        return Err(RequestError::UnsupportedContentType(String::from(
            "(none)",
        )));
    };
    match media_type_essence(content_type).as_str() {
        CONTENT_TYPE_URL_ENCODED => Ok(decode_pairs(body)),
        CONTENT_TYPE_JSON => decode_json(body),
        CONTENT_TYPE_XML | CONTENT_TYPE_TEXT_XML => decode_xml(body),
        CONTENT_TYPE_MULTIPART_FORM_DATA => {
            decode_multipart(content_type, body.clone())
        }
        other => Err(RequestError::UnsupportedContentType(other.to_string())),
    }
}

fn malformed<E: std::fmt::Display>(error: E) -> RequestError {
    RequestError::MalformedBody(error.to_string())
}

/// Adds `value` under `name`, collecting `name[]` keys into a list.
fn insert_named(map: &mut ValueMap, name: &str, value: Value) {
    match name.strip_suffix("[]") {
        Some(list_key) => {
            let entry = map
                .entry(list_key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(value),
                other => *other = value,
            }
        }
        None => {
            map.insert(name.to_string(), value);
        }
    }
}

fn decode_json(body: &[u8]) -> Result<ValueMap, RequestError> {
    match serde_json::from_slice::<Value>(body).map_err(malformed)? {
        Value::Object(map) => Ok(map),
        _ => Err(malformed("a JSON body must be an object")),
    }
}

/*
 * XML bodies: each child of the root element becomes one parameter.  An
 * element holding only text is a string, one with children is a map, and
 * repeated names collect into a list.  Attributes are ignored.
 */

/// An element being read: its name, the children seen so far, and its text.
struct XmlFrame {
    name: String,
    children: ValueMap,
    text: String,
}

impl XmlFrame {
    fn new(name: String) -> XmlFrame {
        XmlFrame { name, children: ValueMap::new(), text: String::new() }
    }

    fn into_value(self) -> Value {
        if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.children)
        }
    }
}

fn insert_repeated(map: &mut ValueMap, name: String, value: Value) {
    // Element values are strings or maps, so a list means a repeated name.
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

fn decode_xml(body: &[u8]) -> Result<ValueMap, RequestError> {
    let text = std::str::from_utf8(body).map_err(malformed)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlFrame> = Vec::new();
    let mut root: Option<Value> = None;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(malformed("an XML body has one root element"));
                }
                let name = String::from_utf8_lossy(start.local_name().as_ref())
                    .into_owned();
                stack.push(XmlFrame::new(name));
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.local_name().as_ref())
                    .into_owned();
                match stack.last_mut() {
                    Some(parent) => insert_repeated(
                        &mut parent.children,
                        name,
                        Value::String(String::new()),
                    ),
                    None if root.is_none() => {
                        root = Some(Value::String(String::new()))
                    }
                    None => {
                        return Err(malformed(
                            "an XML body has one root element",
                        ))
                    }
                }
            }
            Event::Text(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&content.unescape().map_err(malformed)?);
                }
            }
            Event::CData(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(malformed("unexpected closing tag"));
                };
                match stack.last_mut() {
                    Some(parent) => {
                        let name = frame.name.clone();
                        insert_repeated(
                            &mut parent.children,
                            name,
                            frame.into_value(),
                        );
                    }
                    None => root = Some(frame.into_value()),
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of XML body"));
    }
    match root {
        Some(Value::Object(map)) => Ok(map),
        Some(Value::String(text)) if text.is_empty() => Ok(ValueMap::new()),
        Some(_) => Err(malformed(
            "the root element of an XML body must contain elements",
        )),
        None => Err(malformed("an XML body must have a root element")),
    }
}

/*
 * Multipart bodies: each named part becomes one parameter.  A part without a
 * file name is its text; an uploaded file is a map of its file name, content
 * type, size, and base64-encoded data.  Parts without a name are skipped.
 */
fn decode_multipart(
    content_type: &str,
    body: Bytes,
) -> Result<ValueMap, RequestError> {
    let boundary = multer::parse_boundary(content_type).map_err(malformed)?;
    let stream =
        futures::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    // The whole body is already in memory, so the stream never waits.
    futures::executor::block_on(async move {
        let mut map = ValueMap::new();
        while let Some(field) = multipart.next_field().await.map_err(malformed)?
        {
            let name = field.name().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let part_type = field.content_type().map(|m| m.to_string());
            let data = field.bytes().await.map_err(malformed)?;
            let Some(name) = name else {
                continue;
            };
            let value = match file_name {
                Some(file_name) => json!({
                    "filename": file_name,
                    "content_type": part_type,
                    "size": data.len(),
                    "data": base64::engine::general_purpose::STANDARD
                        .encode(&data),
                }),
                None => {
                    Value::String(String::from_utf8_lossy(&data).into_owned())
                }
            };
            insert_named(&mut map, &name, value);
        }
        Ok::<_, RequestError>(map)
    })
}
