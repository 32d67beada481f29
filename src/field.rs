//! Field schemas and typed parameter extraction.
//!
//! A path declares a schema per field; at dispatch time the framework merges
//! the request body with path captures (captures win, because they originate
//! from the trusted path structure rather than arbitrary body content) and
//! hands handlers a [`FieldData`] for typed access. A value that is present
//! but shaped incorrectly for its declared type is a
//! [`BackendError::FieldDecode`] returned to the caller, never a panic.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::errors::{BackendError, Result};

/// The closed set of field types a schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Bool,
    Map,
}

impl FieldType {
    /// String representation of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Map => "map",
        }
    }

    /// The zero value of this type, used when a field has no value and no
    /// default.
    pub fn zero(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Int => Value::from(0i64),
            Self::Bool => Value::Bool(false),
            Self::Map => Value::Object(Map::new()),
        }
    }

    /// True when `value` already has the JSON shape this type declares.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::Map => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema for a single path field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Declared type of the field.
    pub field_type: FieldType,
    /// Optional default, used when no value is supplied. Must match the
    /// declared type; the backend builder validates this at construction.
    pub default: Option<Value>,
    /// Human-readable description.
    pub description: String,
}

impl FieldSchema {
    /// Create a schema of the given type with no default.
    pub fn new(field_type: FieldType) -> Self {
        Self { field_type, default: None, description: String::new() }
    }

    /// Set the default value.
    pub fn with_default<V: Into<Value>>(mut self, default: V) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the description.
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// The default value if set, otherwise the type's zero value.
    pub fn default_or_zero(&self) -> Value {
        match &self.default {
            Some(default) => default.clone(),
            None => self.field_type.zero(),
        }
    }
}

/// Merged request parameters checked against a path's field schemas.
///
/// `raw` holds body data with path captures already merged on top.
pub struct FieldData<'a> {
    raw: Map<String, Value>,
    schema: &'a BTreeMap<String, FieldSchema>,
}

impl<'a> FieldData<'a> {
    /// Create field data from merged raw values and a path's schema.
    pub fn new(raw: Map<String, Value>, schema: &'a BTreeMap<String, FieldSchema>) -> Self {
        Self { raw, schema }
    }

    /// Fetch `name`, coerced to its declared type.
    ///
    /// Returns the schema default (or the type's zero value) when no value
    /// was supplied. Requesting a field the path never declared is a backend
    /// programming error and surfaces as [`BackendError::Internal`].
    pub fn get(&self, name: &str) -> Result<Value> {
        let schema = self
            .schema
            .get(name)
            .ok_or_else(|| BackendError::internal(format!("unknown field: {}", name)))?;

        match self.raw.get(name) {
            Some(value) => coerce(name, value, schema.field_type),
            None => Ok(schema.default_or_zero()),
        }
    }

    /// Fetch `name` as a string.
    pub fn get_str(&self, name: &str) -> Result<String> {
        match self.get(name)? {
            Value::String(s) => Ok(s),
            _ => Err(decode_error(name, FieldType::String)),
        }
    }

    /// Fetch `name` as an integer.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        self.get(name)?
            .as_i64()
            .ok_or_else(|| decode_error(name, FieldType::Int))
    }

    /// Fetch `name` as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get(name)?
            .as_bool()
            .ok_or_else(|| decode_error(name, FieldType::Bool))
    }

    /// Fetch `name` as a map.
    pub fn get_map(&self, name: &str) -> Result<Map<String, Value>> {
        match self.get(name)? {
            Value::Object(map) => Ok(map),
            _ => Err(decode_error(name, FieldType::Map)),
        }
    }

    /// True when the caller supplied a value for `name` (as opposed to the
    /// schema default or zero value applying).
    pub fn contains(&self, name: &str) -> bool {
        self.raw.contains_key(name)
    }
}

fn decode_error(field: &str, expected: FieldType) -> BackendError {
    BackendError::FieldDecode { field: field.to_string(), expected: expected.as_str() }
}

/// Coerce a supplied value to the declared type.
///
/// String-encoded integers and booleans are accepted, since path captures
/// always arrive as strings. Anything else shaped wrongly is a typed
/// decoding error.
fn coerce(field: &str, value: &Value, field_type: FieldType) -> Result<Value> {
    if field_type.matches(value) {
        return Ok(value.clone());
    }

    if let Value::String(s) = value {
        match field_type {
            FieldType::Int => {
                if let Ok(n) = s.parse::<i64>() {
                    return Ok(Value::from(n));
                }
            }
            FieldType::Bool => {
                if let Ok(b) = s.parse::<bool>() {
                    return Ok(Value::Bool(b));
                }
            }
            _ => {}
        }
    }

    Err(decode_error(field, field_type))
}
