//! Deep merge of one document into another.

use bst_yaml::{Mapping, Node, Provenance, Value, ValueType};
use thiserror::Error;

/// How leaves present on both sides of a composition are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositePolicy {
    /// The source value replaces the target value (and its provenance).
    Overwrite,

    /// Sequences are concatenated, target items first; other leaves are
    /// overwritten.
    ArrayAppend,

    /// The source may only add keys. A key present on both sides fails
    /// unless both values are mappings, which are merged key-wise.
    Strict,
}

/// Errors that can occur while compositing documents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositeError {
    /// A leaf would change type.
    #[error("Value at '{path}' is of type '{expected}', cannot composite a '{actual}' onto it")]
    Type {
        /// Dotted path of the offending key
        path: String,
        /// Type of the existing value
        expected: ValueType,
        /// Type of the incoming value
        actual: ValueType,
    },

    /// A strict composition tried to replace an existing key.
    #[error("{provenance}: Cannot override existing key '{path}'")]
    Override {
        /// Dotted path of the offending key
        path: String,
        /// Where the overriding value was declared
        provenance: Provenance,
    },
}

impl CompositeError {
    /// Dotted path of the key the composition failed on.
    pub fn path(&self) -> &str {
        match self {
            CompositeError::Type { path, .. } | CompositeError::Override { path, .. } => path,
        }
    }
}

/// Composite `source` into `target`.
///
/// Both nodes must be mappings. Keys missing from `target` are inserted as
/// deep copies of the source values; nested mappings are merged key-wise;
/// leaves present on both sides are combined according to `policy`.
///
/// When `typesafe` is set, replacing a leaf with a value of a different type
/// fails with [`CompositeError::Type`]. Strings and integers are
/// interchangeable, and a `null` on either side never conflicts. A mapping
/// can never be composited onto a non-mapping, whatever the flag.
///
/// On error, `target` may have been partially updated.
pub fn composite(
    target: &mut Node,
    source: &Node,
    policy: CompositePolicy,
    typesafe: bool,
) -> Result<(), CompositeError> {
    let actual = source.value_type();
    let expected = target.value_type();
    match (target.as_mapping_mut(), source.as_mapping()) {
        (Some(target_entries), Some(source_entries)) => {
            let mut path = Vec::new();
            composite_mapping(target_entries, source_entries, policy, typesafe, &mut path)
        }
        _ => Err(CompositeError::Type {
            path: String::new(),
            expected,
            actual,
        }),
    }
}

fn composite_mapping<'a>(
    target: &mut Mapping,
    source: &'a Mapping,
    policy: CompositePolicy,
    typesafe: bool,
    path: &mut Vec<&'a str>,
) -> Result<(), CompositeError> {
    for (key, source_value) in source {
        path.push(key);
        match target.get_mut(key.as_str()) {
            None => {
                target.insert(key.clone(), source_value.clone());
            }
            Some(target_value) => {
                composite_value(target_value, source_value, policy, typesafe, path)?;
            }
        }
        path.pop();
    }
    Ok(())
}

fn composite_value<'a>(
    target: &mut Node,
    source: &'a Node,
    policy: CompositePolicy,
    typesafe: bool,
    path: &mut Vec<&'a str>,
) -> Result<(), CompositeError> {
    if let (Some(target_entries), Value::Mapping(source_entries)) =
        (target.as_mapping_mut(), &source.value)
    {
        return composite_mapping(target_entries, source_entries, policy, typesafe, path);
    }

    if policy == CompositePolicy::Strict {
        return Err(CompositeError::Override {
            path: path.join("."),
            provenance: source.provenance.clone(),
        });
    }

    let expected = target.value_type();
    let actual = source.value_type();
    let mapping_onto_leaf = actual == ValueType::Mapping && expected != ValueType::Null;
    if mapping_onto_leaf || (typesafe && !compatible(expected, actual)) {
        return Err(CompositeError::Type {
            path: path.join("."),
            expected,
            actual,
        });
    }

    match (&mut target.value, &source.value) {
        (Value::Sequence(items), Value::Sequence(extra))
            if policy == CompositePolicy::ArrayAppend =>
        {
            items.extend(extra.iter().cloned());
        }
        _ => *target = source.clone(),
    }
    Ok(())
}

fn compatible(expected: ValueType, actual: ValueType) -> bool {
    expected == actual
        || expected == ValueType::Null
        || actual == ValueType::Null
        || (expected.is_string_like() && actual.is_string_like())
}
