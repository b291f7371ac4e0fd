//! Element loading for build pipelines.
//!
//! This crate turns a project directory of element documents into a fully
//! resolved, immutable dependency graph of [`MetaElement`]s:
//!
//! - every file reachable from a target is loaded, with `include` fragments
//!   and architecture overlays composed in,
//! - a single variant is chosen for every element, consistently across all
//!   of its consumers,
//! - stack elements are expanded into the elements they embed,
//! - cycles are rejected.
//!
//! Diagnostics carry the provenance (file, line and column) of the
//! declaration at fault. See [`Loader`] for an example.

mod arches;
mod element;
mod error;
mod graph;
mod includes;
mod loader;
mod meta;
mod options;
mod stack;
mod variants;

pub use element::{Dependency, DependencyType, LoadElement, Variant};
pub use error::{LoadError, LoadErrorCause, LoadErrorReason, Result};
pub use loader::{Loader, Ticker};
pub use meta::{MetaElement, MetaSource};
pub use options::LoaderOptions;
pub use variants::VariantError;
