//! Document nodes with source location tracking.

use crate::Provenance;
use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// Ordered mapping of keys to nodes.
///
/// Declaration order is preserved so that anything derived from a document
/// (dependency lists, source lists, dumped configuration) is deterministic.
pub type Mapping = IndexMap<String, Node>;

/// A parsed document value with its source location.
///
/// Unlike a plain YAML tree, every node (including every mapping member and
/// every sequence element) owns a [`Provenance`]. Composition copies nodes
/// together with their provenance, so the location of a value is never lost
/// when it moves between documents.
///
/// ## Example
///
/// ```rust
/// use bst_yaml::parse_file;
///
/// let node = parse_file("kind: manual", "hello.bst").unwrap();
/// let kind = node.get("kind").unwrap();
/// assert_eq!(kind.provenance.to_string(), "hello.bst [line 1 column 6]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The value of this node
    pub value: Value,

    /// Where this node was declared
    pub provenance: Provenance,
}

/// The value held by a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

/// The type of a [`Value`], used in diagnostics and typed access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    String,
    Sequence,
    Mapping,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "boolean",
            ValueType::Int => "integer",
            ValueType::String => "string",
            ValueType::Sequence => "sequence",
            ValueType::Mapping => "mapping",
        }
    }

    /// Whether both types have a plain string surface representation.
    ///
    /// Integers are written exactly like strings in element documents (a
    /// branch named `1234` is still a branch name), so they are considered
    /// interchangeable wherever a type check is performed.
    pub fn is_string_like(&self) -> bool {
        matches!(self, ValueType::String | ValueType::Int)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::String(_) => ValueType::String,
            Value::Sequence(_) => ValueType::Sequence,
            Value::Mapping(_) => ValueType::Mapping,
        }
    }
}

impl Node {
    pub fn new(value: Value, provenance: Provenance) -> Self {
        Self { value, provenance }
    }

    pub fn null(provenance: Provenance) -> Self {
        Self::new(Value::Null, provenance)
    }

    pub fn string(value: impl Into<String>, provenance: Provenance) -> Self {
        Self::new(Value::String(value.into()), provenance)
    }

    pub fn sequence(items: Vec<Node>, provenance: Provenance) -> Self {
        Self::new(Value::Sequence(items), provenance)
    }

    pub fn mapping(entries: Mapping, provenance: Provenance) -> Self {
        Self::new(Value::Mapping(entries), provenance)
    }

    /// An empty mapping, the value of an empty document.
    pub fn empty_mapping(provenance: Provenance) -> Self {
        Self::mapping(Mapping::new(), provenance)
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.value, Value::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.value, Value::Sequence(_))
    }

    /// Check if this is a scalar value (not a sequence or mapping).
    pub fn is_scalar(&self) -> bool {
        !self.is_mapping() && !self.is_sequence()
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match &self.value {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match &mut self.value {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Get a mapping member by key.
    ///
    /// Returns None if this is not a mapping or the key is not present.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|entries| entries.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.as_mapping_mut().and_then(|entries| entries.get_mut(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a mapping member, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.as_mapping_mut()
            .and_then(|entries| entries.shift_remove(key))
    }

    /// Insert a mapping member, returning the node it replaced.
    ///
    /// Does nothing and returns None if this node is not a mapping.
    pub fn insert(&mut self, key: impl Into<String>, node: Node) -> Option<Node> {
        self.as_mapping_mut()
            .and_then(|entries| entries.insert(key.into(), node))
    }

    /// Number of members or elements (0 for scalars).
    pub fn len(&self) -> usize {
        match &self.value {
            Value::Sequence(items) => items.len(),
            Value::Mapping(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializes the plain value, without provenance.
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => serializer.collect_seq(items),
            Value::Mapping(entries) => serializer.collect_map(entries),
        }
    }
}
