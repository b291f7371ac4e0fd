//! # bst-yaml
//!
//! YAML parsing with source location tracking, for element documents.
//!
//! Every value parsed from a document is a [`Node`]: a [`Value`] together
//! with the [`Provenance`] (file, line, column) it was declared at. The
//! provenance is a field of the node itself rather than a side table, so it
//! cannot be lost when nodes are copied from one document into another.
//!
//! ## Example
//!
//! ```rust
//! use bst_yaml::{parse_document, ValueType};
//!
//! let content = r#"
//! kind: autotools
//! config:
//!   configure-commands:
//!   - ./configure
//! "#;
//!
//! let doc = parse_document(content, "elements/hello.bst").unwrap();
//! assert_eq!(doc.get_string("kind").unwrap(), "autotools");
//! let config = doc.get_mapping("config").unwrap();
//! assert_eq!(config.value_type(), ValueType::Mapping);
//! ```

mod access;
mod error;
mod node;
mod parser;
mod provenance;

pub use access::AccessError;
pub use error::{Error, Result};
pub use node::{Mapping, Node, Value, ValueType};
pub use parser::{parse, parse_document, parse_file};
pub use provenance::Provenance;
