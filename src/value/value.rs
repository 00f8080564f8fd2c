use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::time::Instant;

/// Raw or engineering value of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Boolean(bool),
    SInt64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Enumerated { value: i64, label: String },
    Timestamp(Instant),
    Aggregate(AggregateValue),
    Array(Vec<Value>),
}

/// Members of an aggregate value, in declaration order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateValue {
    members: Vec<(String, Value)>,
}

impl AggregateValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.members
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Replace a member in place, or append it when new
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.members.push((name, value)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<(String, Value)> for AggregateValue {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut agg = AggregateValue::new();
        for (name, value) in iter {
            agg.set(name, value);
        }
        agg
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::SInt64(_) => "sint64",
            Value::UInt64(_) => "uint64",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Enumerated { .. } => "enumerated",
            Value::Timestamp(_) => "timestamp",
            Value::Aggregate(_) => "aggregate",
            Value::Array(_) => "array",
        }
    }

    /// Map a client-supplied JSON document onto a value.
    ///
    /// Objects become aggregates; `null` has no counterpart and yields `None`.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;
        match json {
            Json::Null => None,
            Json::Bool(b) => Some(Value::Boolean(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::SInt64(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Value::UInt64(u))
                } else {
                    n.as_f64().map(Value::Double)
                }
            }
            Json::String(s) => Some(Value::String(s.clone())),
            Json::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Json::Object(map) => map
                .iter()
                .map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                .collect::<Option<AggregateValue>>()
                .map(Value::Aggregate),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::SInt64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Binary(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Enumerated { label, .. } => f.write_str(label),
            Value::Timestamp(t) => write!(f, "{}", t),
            Value::Aggregate(agg) => {
                f.write_str("{")?;
                for (i, (name, v)) in agg.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                f.write_str("}")
            }
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::SInt64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<AggregateValue> for Value {
    fn from(v: AggregateValue) -> Self {
        Value::Aggregate(v)
    }
}
