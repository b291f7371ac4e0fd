//! Typed, fallible access to mapping members.
//!
//! Element documents are dynamically typed. These accessors perform exactly
//! two conversions: integers may be read as strings, and strings are trimmed
//! of surrounding whitespace. Nothing is ever coerced into a mapping or a
//! sequence. A `null` member is treated as if the key were absent.

use crate::{Node, Provenance, Value, ValueType};
use thiserror::Error;

/// Errors raised by typed access to a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    /// A required key is not present.
    #[error("{provenance}: Dictionary did not contain expected key '{key}'")]
    Missing { key: String, provenance: Provenance },

    /// A key is present but holds a value of the wrong type.
    #[error("{provenance}: Value of '{key}' is not of the expected type '{expected}', found '{actual}'")]
    WrongType {
        key: String,
        expected: ValueType,
        actual: ValueType,
        provenance: Provenance,
    },
}

impl AccessError {
    /// The location the error should be reported against.
    pub fn provenance(&self) -> &Provenance {
        match self {
            AccessError::Missing { provenance, .. } | AccessError::WrongType { provenance, .. } => {
                provenance
            }
        }
    }
}

impl Node {
    /// Read a member as a value of the expected type.
    ///
    /// Fails with [`AccessError::Missing`] if the key is absent and no
    /// default is given, or with [`AccessError::WrongType`] if the value
    /// cannot be read as `expected`.
    pub fn get_value(
        &self,
        key: &str,
        expected: ValueType,
        default: Option<Value>,
    ) -> Result<Value, AccessError> {
        match self.lookup(key, expected)? {
            Some(node) => Ok(coerce(node, expected)),
            None => default.ok_or_else(|| self.missing(key)),
        }
    }

    /// Read a required string member.
    pub fn get_string(&self, key: &str) -> Result<String, AccessError> {
        self.get_opt_string(key)?.ok_or_else(|| self.missing(key))
    }

    /// Read a string member, falling back to `default` when absent.
    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String, AccessError> {
        Ok(self
            .get_opt_string(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Read an optional string member.
    pub fn get_opt_string(&self, key: &str) -> Result<Option<String>, AccessError> {
        Ok(self
            .lookup(key, ValueType::String)?
            .and_then(Node::as_string))
    }

    /// Read an optional boolean member.
    pub fn get_opt_bool(&self, key: &str) -> Result<Option<bool>, AccessError> {
        Ok(self.lookup(key, ValueType::Bool)?.and_then(|node| match node.value {
            Value::Bool(b) => Some(b),
            _ => None,
        }))
    }

    /// Read a required mapping member, returning the member node.
    pub fn get_mapping(&self, key: &str) -> Result<&Node, AccessError> {
        self.get_opt_mapping(key)?.ok_or_else(|| self.missing(key))
    }

    /// Read an optional mapping member, returning the member node.
    pub fn get_opt_mapping(&self, key: &str) -> Result<Option<&Node>, AccessError> {
        self.lookup(key, ValueType::Mapping)
    }

    /// Read an optional sequence member, returning the member node.
    pub fn get_opt_sequence(&self, key: &str) -> Result<Option<&Node>, AccessError> {
        self.lookup(key, ValueType::Sequence)
    }

    /// Read this node itself as a string, applying the permitted coercions.
    ///
    /// Returns None for anything that is neither a string nor an integer.
    pub fn as_string(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Check the type of this node, reporting `key` as its name on failure.
    pub fn expect_type(&self, key: &str, expected: ValueType) -> Result<&Node, AccessError> {
        if accepts(expected, self.value_type()) {
            Ok(self)
        } else {
            Err(AccessError::WrongType {
                key: key.to_string(),
                expected,
                actual: self.value_type(),
                provenance: self.provenance.clone(),
            })
        }
    }

    fn lookup(&self, key: &str, expected: ValueType) -> Result<Option<&Node>, AccessError> {
        match self.get(key) {
            None => Ok(None),
            Some(node) if node.is_null() && expected != ValueType::Null => Ok(None),
            Some(node) => node.expect_type(key, expected).map(Some),
        }
    }

    fn missing(&self, key: &str) -> AccessError {
        AccessError::Missing {
            key: key.to_string(),
            provenance: self.provenance.clone(),
        }
    }
}

fn accepts(expected: ValueType, actual: ValueType) -> bool {
    expected == actual || (expected == ValueType::String && actual == ValueType::Int)
}

fn coerce(node: &Node, expected: ValueType) -> Value {
    match (expected, &node.value) {
        (ValueType::String, Value::String(s)) => Value::String(s.trim().to_string()),
        (ValueType::String, Value::Int(i)) => Value::String(i.to_string()),
        _ => node.value.clone(),
    }
}
