//! Runtime values bound into a report template.

use crate::error::{Result, TrxerError};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A value reachable from a template path
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    /// Convert serialized render data into template values.
    ///
    /// Report data only carries integers; non-integral numbers are rejected.
    pub fn from_json(json: JsonValue) -> Result<Self> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None => Err(TrxerError::template(format!(
                    "Non-integer numbers are not supported: {n}"
                ))),
            },
            JsonValue::String(s) => Ok(Value::String(s)),
            JsonValue::Array(arr) => arr
                .into_iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            JsonValue::Object(obj) => {
                let mut map = HashMap::with_capacity(obj.len());
                for (k, v) in obj {
                    map.insert(k, Value::from_json(v)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Falsy values: false, null, 0, "", [], {}
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(obj) => !obj.is_empty(),
        }
    }

    /// Text form for output tags. Only strings and integers have one.
    pub fn stringify(&self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(n) => Ok(n.to_string()),
            other => Err(TrxerError::template(format!(
                "Cannot output {} value",
                other.type_name()
            ))),
        }
    }

    /// Text form for function arguments, where null reads as ""
    pub fn stringify_argument(&self) -> Result<String> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => self.stringify(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}
