//! Runtime Values
//!
//! Typed values a task declares in its runtime block, with the coercion
//! rules backends rely on when extracting overrides.
//!
//! # Example JSON Runtime Block
//!
//! ```json
//! {
//!   "cpu": 4,
//!   "memory": "4 GiB",
//!   "docker": "ubuntu:22.04",
//!   "grid_queue": "all.q"
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared runtime values of a single task, keyed by attribute name.
pub type RuntimeValues = BTreeMap<String, Value>;

/// A value could not be coerced to the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce {found} to {expected}")]
pub struct CoercionError {
    pub expected: &'static str,
    pub found: String,
}

impl CoercionError {
    pub fn new(expected: &'static str, found: impl Into<String>) -> Self {
        Self {
            expected,
            found: found.into(),
        }
    }
}

/// A runtime value as declared by a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    /// Name of the value's type, as used in coercion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "None",
            Value::Boolean(_) => "Boolean",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
        }
    }

    /// Coerces to a string.
    ///
    /// Scalars convert to their textual form; `Null` and arrays fail.
    pub fn coerce_string(&self) -> Result<String, CoercionError> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            other => Err(CoercionError::new("String", other.type_name())),
        }
    }

    /// Coerces to an integer. Only `Int` values qualify.
    pub fn coerce_int(&self) -> Result<i64, CoercionError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(CoercionError::new("Int", other.type_name())),
        }
    }

    /// Coerces to a non-negative count (cpu, minutes).
    pub fn coerce_count(&self) -> Result<u64, CoercionError> {
        let value = self.coerce_int()?;
        u64::try_from(value).map_err(|_| CoercionError::new("non-negative Int", value.to_string()))
    }

    /// Interprets the value as a byte size.
    ///
    /// Integers are taken as bytes. Strings accept a number with an
    /// optional unit, e.g. `"4 GiB"`, `"512M"` or `"2G"`.
    pub fn coerce_byte_size(&self) -> Result<u64, CoercionError> {
        match self {
            Value::Int(i) if *i >= 0 => Ok(*i as u64),
            Value::String(s) => s
                .trim()
                .parse::<ByteSize>()
                .map(|size| size.as_u64())
                .map_err(|_| CoercionError::new("byte size", format!("String \"{}\"", s))),
            other => Err(CoercionError::new("byte size", other.type_name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
