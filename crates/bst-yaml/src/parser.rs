//! YAML parser that builds provenance-decorated [`Node`] trees.

use crate::{Error, Mapping, Node, Provenance, Result, Value};
use std::collections::HashMap;
use std::sync::Arc;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Parse YAML from a string, producing a [`Node`] tree.
///
/// Nodes are attributed to an anonymous `<string>` source. Only the first
/// document of a multi-document stream is parsed.
///
/// # Example
///
/// ```rust
/// use bst_yaml::parse;
///
/// let node = parse("kind: manual").unwrap();
/// assert!(node.is_mapping());
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid.
pub fn parse(content: &str) -> Result<Node> {
    parse_impl(content, "<string>")
}

/// Parse YAML from a string with an associated filename.
///
/// The filename is recorded in the provenance of every node.
///
/// # Example
///
/// ```rust
/// use bst_yaml::parse_file;
///
/// let node = parse_file("kind: manual", "elements/hello.bst").unwrap();
/// assert_eq!(&*node.provenance.file, "elements/hello.bst");
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid.
pub fn parse_file(content: &str, filename: &str) -> Result<Node> {
    parse_impl(content, filename)
}

/// Parse an element document: the top level must be a mapping.
///
/// An empty (or comment-only) document yields an empty mapping.
///
/// # Errors
///
/// Returns an error if the YAML is invalid or its top level is a sequence
/// or a scalar.
pub fn parse_document(content: &str, filename: &str) -> Result<Node> {
    let node = parse_impl(content, filename)?;
    match node.value {
        Value::Mapping(_) => Ok(node),
        Value::Null => Ok(Node::empty_mapping(node.provenance)),
        _ => Err(Error::InvalidStructure {
            message: format!(
                "Loading YAML file did not specify a dictionary, found a {}",
                node.value_type()
            ),
            provenance: node.provenance,
        }),
    }
}

fn parse_impl(content: &str, filename: &str) -> Result<Node> {
    let filename: Arc<str> = Arc::from(filename);
    let mut parser = Parser::new_from_str(content);
    let mut builder = NodeBuilder::new(Arc::clone(&filename));

    parser
        .load(&mut builder, false) // false = single document only
        .map_err(|err| Error::from_scan(&err, &filename))?;

    builder.result()
}

/// Builder that implements MarkedEventReceiver to construct Node trees.
struct NodeBuilder {
    filename: Arc<str>,

    /// Stack of collections being constructed
    stack: Vec<BuildNode>,

    /// Completed nodes registered under an anchor, for alias resolution
    anchors: HashMap<usize, Node>,

    /// The completed root node
    root: Option<Node>,

    /// First structural error encountered; events are ignored afterwards
    error: Option<Error>,
}

/// A collection being constructed during parsing.
enum BuildNode {
    Sequence {
        start: Provenance,
        anchor: usize,
        items: Vec<Node>,
    },

    Mapping {
        start: Provenance,
        anchor: usize,
        entries: Mapping,
        pending_key: Option<String>,
    },
}

impl NodeBuilder {
    fn new(filename: Arc<str>) -> Self {
        Self {
            filename,
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn result(self) -> Result<Node> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(self
            .root
            .unwrap_or_else(|| Node::empty_mapping(Provenance::file_start(self.filename))))
    }

    fn provenance(&self, marker: &Marker) -> Provenance {
        Provenance::from_marker(&self.filename, marker)
    }

    fn fail(&mut self, message: impl Into<String>, provenance: Provenance) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure {
                message: message.into(),
                provenance,
            });
        }
    }

    /// Whether the next scalar is a mapping key.
    fn awaiting_key(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(BuildNode::Mapping {
                pending_key: None,
                ..
            })
        )
    }

    fn register_anchor(&mut self, anchor: usize, node: &Node) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
    }

    fn push_complete(&mut self, node: Node) {
        let rejected = match self.stack.last_mut() {
            None => {
                self.root = Some(node);
                None
            }
            Some(BuildNode::Sequence { items, .. }) => {
                items.push(node);
                None
            }
            Some(BuildNode::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => {
                    entries.insert(key, node);
                    None
                }
                None => Some(node.provenance),
            },
        };

        if let Some(provenance) = rejected {
            self.fail("Only scalar mapping keys are supported", provenance);
        }
    }
}

impl MarkedEventReceiver for NodeBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor, _tag) => {
                if self.awaiting_key() {
                    let key_start = self.provenance(&marker);
                    if let Some(BuildNode::Mapping {
                        start,
                        entries,
                        pending_key,
                        ..
                    }) = self.stack.last_mut()
                    {
                        // Block mappings are marked at the colon after their first key
                        if entries.is_empty() && precedes(&key_start, start) {
                            *start = key_start;
                        }
                        *pending_key = Some(value);
                    }
                    return;
                }

                let node = Node::new(parse_scalar_value(&value, style), self.provenance(&marker));
                self.register_anchor(anchor, &node);
                self.push_complete(node);
            }

            Event::SequenceStart(anchor, _tag) => {
                if self.awaiting_key() {
                    self.fail("Only scalar mapping keys are supported", self.provenance(&marker));
                    return;
                }
                self.stack.push(BuildNode::Sequence {
                    start: self.provenance(&marker),
                    anchor,
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => {
                if let Some(BuildNode::Sequence {
                    start,
                    anchor,
                    items,
                }) = self.stack.pop()
                {
                    let node = Node::sequence(items, start);
                    self.register_anchor(anchor, &node);
                    self.push_complete(node);
                } else {
                    self.fail("Unbalanced sequence end", self.provenance(&marker));
                }
            }

            Event::MappingStart(anchor, _tag) => {
                if self.awaiting_key() {
                    self.fail("Only scalar mapping keys are supported", self.provenance(&marker));
                    return;
                }
                self.stack.push(BuildNode::Mapping {
                    start: self.provenance(&marker),
                    anchor,
                    entries: Mapping::new(),
                    pending_key: None,
                });
            }

            Event::MappingEnd => {
                if let Some(BuildNode::Mapping {
                    start,
                    anchor,
                    entries,
                    ..
                }) = self.stack.pop()
                {
                    let node = Node::mapping(entries, start);
                    self.register_anchor(anchor, &node);
                    self.push_complete(node);
                } else {
                    self.fail("Unbalanced mapping end", self.provenance(&marker));
                }
            }

            Event::Alias(anchor) => {
                if self.awaiting_key() {
                    self.fail("Only scalar mapping keys are supported", self.provenance(&marker));
                    return;
                }
                match self.anchors.get(&anchor).cloned() {
                    Some(node) => self.push_complete(node),
                    None => self.fail("Alias refers to an unknown anchor", self.provenance(&marker)),
                }
            }
        }
    }
}

fn precedes(a: &Provenance, b: &Provenance) -> bool {
    (a.line, a.col) < (b.line, b.col)
}

/// Infer the value of a scalar.
///
/// Quoted and block scalars are always strings. Plain scalars may be null,
/// booleans or integers; an integer is only recognized when it would print
/// back identically, so `007` stays the string it was written as.
fn parse_scalar_value(value: &str, style: TScalarStyle) -> Value {
    if !matches!(style, TScalarStyle::Plain) {
        return Value::String(value.to_string());
    }

    match value {
        "~" | "null" | "Null" | "NULL" | "" => return Value::Null,
        "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => {
            return Value::Bool(true);
        }
        "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
            return Value::Bool(false);
        }
        _ => {}
    }

    if let Ok(i) = value.parse::<i64>() {
        if i.to_string() == value {
            return Value::Int(i);
        }
    }

    Value::String(value.to_string())
}
