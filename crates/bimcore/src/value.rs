use crate::model::{ClashSet, Element, Model, QuantityReport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamic value flowing along graph edges.
///
/// This is the engine's Result type: every node produces exactly one
/// `Value`, cached per run. The serde representation is the editor's
/// tagged form `{ "type": ..., "value": ... }`, which is how consumers
/// distinguish payload shapes like elements vs clash results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
    Model(Model),
    Elements(Vec<Element>),
    ClashResults(ClashSet),
    Quantities(QuantityReport),
    /// Soft error sentinel: non-fatal, cached and passed downstream as
    /// ordinary data. Consumers are expected to recognize it.
    Error { message: String },
}

impl Value {
    pub fn soft_error(message: impl Into<String>) -> Self {
        Value::Error {
            message: message.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_soft_error(&self) -> bool {
        matches!(self, Value::Error { .. })
    }

    pub fn soft_error_message(&self) -> Option<&str> {
        match self {
            Value::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Value::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_elements(&self) -> Option<&[Element]> {
        match self {
            Value::Elements(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_clash_results(&self) -> Option<&ClashSet> {
        match self {
            Value::ClashResults(c) => Some(c),
            _ => None,
        }
    }

    /// Short human-readable description of the payload shape, used in
    /// logs and type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Model(_) => "model",
            Value::Elements(_) => "elements",
            Value::ClashResults(_) => "clashResults",
            Value::Quantities(_) => "quantities",
            Value::Error { .. } => "error",
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Model> for Value {
    fn from(m: Model) -> Self {
        Value::Model(m)
    }
}

impl From<Vec<Element>> for Value {
    fn from(e: Vec<Element>) -> Self {
        Value::Elements(e)
    }
}

impl From<ClashSet> for Value {
    fn from(c: ClashSet) -> Self {
        Value::ClashResults(c)
    }
}

impl From<QuantityReport> for Value {
    fn from(q: QuantityReport) -> Self {
        Value::Quantities(q)
    }
}
