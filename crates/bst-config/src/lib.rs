//! Composition of element documents with source tracking.
//!
//! Element documents are assembled from several layers: the element file
//! itself, `include` fragments, architecture overlays and variant data.
//! [`composite`] merges one layer into another. Nested mappings are always
//! merged key-wise; what happens at the leaves is decided by a
//! [`CompositePolicy`].
//!
//! Every value copied from the source layer keeps the provenance it was
//! parsed with, so an error raised against the composed document still
//! points at the file which declared the value.
//!
//! # Example
//!
//! ```rust
//! use bst_config::{composite, CompositePolicy};
//! use bst_yaml::parse_file;
//!
//! let mut target = parse_file("flags: [-O2]\nprefix: /usr", "base.bst").unwrap();
//! let source = parse_file("flags: [-g]", "arch.yml").unwrap();
//!
//! composite(&mut target, &source, CompositePolicy::ArrayAppend, true).unwrap();
//! assert_eq!(target.get("flags").unwrap().len(), 2);
//! ```

mod composite;

pub use composite::{CompositeError, CompositePolicy, composite};
