//! Parameter resolution
//!
//! Turns validated module parameters into a flat [`DesiredConfig`]: unset
//! values are dropped recursively, request-relevant keys are selected, and
//! parameters whose name differs from the API field are renamed.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Remove `null` entries from objects, recursing into nested objects and arrays
pub fn filter_null_values(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, filter_null_values(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(filter_null_values).collect()),
        other => other,
    }
}

/// Desired field values for one resource, free of unset entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredConfig(Map<String, Value>);

impl DesiredConfig {
    /// Serialize typed parameters and drop every unset value
    pub fn from_params<T: Serialize>(params: &T) -> Result<Self> {
        match filter_null_values(serde_json::to_value(params)?) {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::Validation(format!(
                "parameters must be a mapping, got {}",
                other
            ))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        match filter_null_values(Value::Object(map)) {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Keep only the given keys
    pub fn select(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Drop the given keys
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Rename a parameter to the request field the API expects
    pub fn rename(mut self, from: &str, to: &str) -> Self {
        if let Some(value) = self.0.remove(from) {
            self.0.insert(to.to_string(), value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        if !value.is_null() {
            self.0.insert(key.to_string(), filter_null_values(value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Request body for create calls
    pub fn to_body(&self) -> Value {
        Value::Object(self.0.clone())
    }
}
