// Copyright 2025 Oxide Computer Company

//! Parameter values passed between requests, the router, and handlers.
//!
//! Values are `serde_json::Value`s: null, booleans, numbers, strings, ordered
//! lists, and string-keyed maps.  Query strings and form bodies only ever
//! produce strings (or lists of strings), so handler-side conversion with
//! [`BoundParams::take`] also accepts a string holding the JSON rendering of
//! the requested type, which is how `?limit=10` becomes a `u32`.

use crate::handler::HandlerError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

pub use serde_json::Value;

/// A string-keyed map of values, as decoded from a query string or a body.
pub type ValueMap = serde_json::Map<String, Value>;

/// The parameters bound to a method (or constructor) invocation, keyed by
/// declared parameter name and kept in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundParams {
    values: IndexMap<String, Value>,
}

impl BoundParams {
    pub fn new() -> BoundParams {
        BoundParams::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Removes the named parameter and converts it to `T`.
    ///
    /// A parameter that was never bound converts from `null`, so optional
    /// `Option<_>` parameters come back as `None`.  A conversion failure is a
    /// client error (400).
    pub fn take<T: DeserializeOwned>(
        &mut self,
        name: &str,
    ) -> Result<T, HandlerError> {
        let value = self.values.shift_remove(name).unwrap_or(Value::Null);
        convert_value(name, value)
    }

    /// Like [`BoundParams::take`], but an unbound parameter takes the value
    /// produced by `default` instead of `null`.
    pub fn take_or<T, F>(
        &mut self,
        name: &str,
        default: F,
    ) -> Result<T, HandlerError>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Value,
    {
        let value = self.values.shift_remove(name).unwrap_or_else(default);
        convert_value(name, value)
    }

    /// Returns the parameters as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for BoundParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        BoundParams { values: iter.into_iter().collect() }
    }
}

fn convert_value<T: DeserializeOwned>(
    name: &str,
    value: Value,
) -> Result<T, HandlerError> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(v) => Ok(v),
        Err(error) => {
            if let Value::String(s) = &value {
                if let Ok(v) = serde_json::from_str::<T>(s) {
                    return Ok(v);
                }
            }
            Err(HandlerError::bad_request(format!(
                "invalid value for parameter \"{}\": {}",
                name, error
            )))
        }
    }
}

/// Returns true if `value` carries no data: null, `false`, zero, an empty
/// string, or an empty list or map.  Used to choose between 200 and 204 for
/// non-GET responses.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
