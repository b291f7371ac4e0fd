/*
 * meta.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Immutable element graph handed to the build engine.
 */

use std::collections::HashMap;
use std::sync::Arc;

use bst_yaml::{Node, Provenance, Value, ValueType};
use indexmap::IndexMap;

use crate::element::LoadElement;
use crate::error::{LoadError, Result};

/// One source of an element.
#[derive(Debug, Clone)]
pub struct MetaSource {
    /// `<element>-<index>`
    pub name: String,

    pub element_name: String,

    /// Position of the source in its element's `sources`
    pub element_index: usize,

    pub kind: String,

    /// Directory the source is staged into, relative to the build root
    pub directory: Option<String>,

    /// Everything the source declared besides `kind` and `directory`
    pub config: Node,

    /// Where the source was declared
    pub provenance: Provenance,
}

/// A fully resolved element.
///
/// Elements are shared: every consumer of an element holds the same
/// `Arc<MetaElement>`.
#[derive(Debug)]
pub struct MetaElement {
    pub name: String,
    pub kind: String,

    /// The variant the element was resolved in
    pub variant: Option<String>,

    /// Where the element was declared
    pub provenance: Provenance,

    pub sources: Vec<MetaSource>,
    pub config: Node,
    pub variables: Node,
    pub environment: Node,
    pub environment_nocache: Vec<String>,
    pub public: Node,

    /// Elements needed to build this element
    pub build_dependencies: Vec<Arc<MetaElement>>,

    /// Elements needed to run this element
    pub dependencies: Vec<Arc<MetaElement>>,
}

impl MetaElement {
    /// Find an element by name among this element and everything it
    /// depends on.
    pub fn find(&self, name: &str) -> Option<&MetaElement> {
        if self.name == name {
            return Some(self);
        }
        self.build_dependencies
            .iter()
            .chain(&self.dependencies)
            .find_map(|dep| dep.find(name))
    }

    pub fn build_dependency_names(&self) -> Vec<&str> {
        self.build_dependencies.iter().map(|dep| dep.name.as_str()).collect()
    }

    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|dep| dep.name.as_str()).collect()
    }
}

/// Builds [`MetaElement`]s from resolved load elements, memoized by name.
pub(crate) struct MetaBuilder<'a> {
    elements: &'a IndexMap<String, LoadElement>,
    built: HashMap<String, Arc<MetaElement>>,
}

impl<'a> MetaBuilder<'a> {
    pub(crate) fn new(elements: &'a IndexMap<String, LoadElement>) -> Self {
        Self {
            elements,
            built: HashMap::new(),
        }
    }

    /// Build the element named `name` and, first, everything it depends on.
    ///
    /// The dependency graph must be acyclic.
    pub(crate) fn collect(&mut self, name: &str) -> Result<Arc<MetaElement>> {
        if let Some(meta) = self.built.get(name) {
            return Ok(Arc::clone(meta));
        }
        let elements = self.elements;
        let element = elements.get(name).ok_or_else(|| {
            LoadError::invalid_data(format!("Element '{}' was never loaded", name))
        })?;

        let mut data = element.data.clone();
        let sources = extract_sources(&mut data, name)?;

        let mut build_dependencies = Vec::new();
        let mut dependencies = Vec::new();
        for dep in &element.deps {
            let meta = self.collect(&dep.name)?;
            if dep.is_build() {
                build_dependencies.push(Arc::clone(&meta));
            }
            if dep.is_runtime() {
                dependencies.push(meta);
            }
        }

        let meta = Arc::new(MetaElement {
            name: element.name.clone(),
            kind: data.get_string("kind")?,
            variant: element.variant_name.clone(),
            provenance: data.provenance.clone(),
            sources,
            config: section(&data, "config")?,
            variables: section(&data, "variables")?,
            environment: section(&data, "environment")?,
            environment_nocache: string_list(&data, "environment-nocache")?,
            public: section(&data, "public")?,
            build_dependencies,
            dependencies,
        });
        self.built.insert(name.to_string(), Arc::clone(&meta));
        Ok(meta)
    }
}

/// A mapping member, or an empty mapping when absent.
fn section(data: &Node, key: &str) -> Result<Node> {
    Ok(data
        .get_opt_mapping(key)?
        .cloned()
        .unwrap_or_else(|| Node::empty_mapping(data.provenance.clone())))
}

fn string_list(data: &Node, key: &str) -> Result<Vec<String>> {
    let Some(list) = data.get_opt_sequence(key)? else {
        return Ok(Vec::new());
    };
    list.as_sequence()
        .unwrap_or_default()
        .iter()
        .map(|item| -> Result<String> {
            item.expect_type(key, ValueType::String)?;
            Ok(item.as_string().unwrap_or_default())
        })
        .collect()
}

/// Extract and strip the `sources` of an element document.
fn extract_sources(data: &mut Node, element_name: &str) -> Result<Vec<MetaSource>> {
    let Some(sources) = data.remove("sources") else {
        return Ok(Vec::new());
    };
    if sources.is_null() {
        return Ok(Vec::new());
    }
    sources.expect_type("sources", ValueType::Sequence)?;
    let Value::Sequence(items) = sources.value else {
        return Ok(Vec::new());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, mut item)| -> Result<MetaSource> {
            item.expect_type("sources", ValueType::Mapping)?;
            let kind = item.get_string("kind")?;
            let directory = item.get_opt_string("directory")?;
            item.remove("kind");
            item.remove("directory");
            Ok(MetaSource {
                name: format!("{}-{}", element_name, index),
                element_name: element_name.to_string(),
                element_index: index,
                kind,
                directory,
                provenance: item.provenance.clone(),
                config: item,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arches::Arches;
    use crate::element::DependencyScope;
    use crate::error::LoadErrorReason;
    use bst_yaml::parse_document;

    fn resolved(files: &[(&str, &str)]) -> IndexMap<String, LoadElement> {
        files
            .iter()
            .map(|(name, content)| {
                let filename = format!("{}.bst", name);
                let data = parse_document(content, &filename).unwrap();
                let mut element = LoadElement::from_document(
                    name.to_string(),
                    filename,
                    data,
                    DependencyScope::File,
                    &Arches::default(),
                )
                .unwrap();
                element.deps = element.deps_for_variant(None);
                (name.to_string(), element)
            })
            .collect()
    }

    #[test]
    fn test_sources_are_extracted() {
        let elements = resolved(&[(
            "hello",
            r#"
kind: autotools
sources:
- kind: tar
  url: https://example.com/hello.tar.gz
  ref: abc123
- kind: local
  path: files/patch
  directory: patches
config:
  configure-commands: [./configure]
"#,
        )]);

        let meta = MetaBuilder::new(&elements).collect("hello").unwrap();
        assert_eq!(meta.kind, "autotools");
        assert_eq!(meta.sources.len(), 2);

        let tar = &meta.sources[0];
        assert_eq!(tar.name, "hello-0");
        assert_eq!(tar.kind, "tar");
        assert_eq!(tar.directory, None);
        assert!(tar.config.get("kind").is_none());
        assert_eq!(tar.config.get_string("ref").unwrap(), "abc123");
        assert_eq!(tar.provenance.line, 4);

        let local = &meta.sources[1];
        assert_eq!(local.name, "hello-1");
        assert_eq!(local.directory.as_deref(), Some("patches"));
        assert!(local.config.get("directory").is_none());

        assert!(meta.config.contains_key("configure-commands"));
        assert!(meta.variables.is_empty());
    }

    #[test]
    fn test_dependency_types_split() {
        let elements = resolved(&[
            ("tool", "kind: manual"),
            ("lib", "kind: manual"),
            ("data", "kind: manual"),
            (
                "app",
                "kind: manual\ndepends:\n- filename: tool.bst\n  type: build\n- filename: data.bst\n  type: runtime\n- lib.bst",
            ),
        ]);

        let app = MetaBuilder::new(&elements).collect("app").unwrap();
        assert_eq!(app.build_dependency_names(), vec!["tool", "lib"]);
        assert_eq!(app.dependency_names(), vec!["data", "lib"]);
    }

    #[test]
    fn test_diamond_shares_instances() {
        let elements = resolved(&[
            ("base", "kind: manual"),
            ("left", "kind: manual\ndepends:\n- base.bst"),
            ("right", "kind: manual\ndepends:\n- base.bst"),
            ("top", "kind: manual\ndepends:\n- left.bst\n- right.bst"),
        ]);

        let top = MetaBuilder::new(&elements).collect("top").unwrap();
        let via_left = &top.build_dependencies[0].build_dependencies[0];
        let via_right = &top.build_dependencies[1].build_dependencies[0];
        assert!(Arc::ptr_eq(via_left, via_right));
        assert_eq!(top.find("base").map(|base| base.name.as_str()), Some("base"));
    }

    #[test]
    fn test_environment_nocache_must_be_strings() {
        let elements = resolved(&[(
            "app",
            "kind: manual\nenvironment:\n  MAKEFLAGS: -j8\nenvironment-nocache: [MAKEFLAGS]",
        )]);
        let app = MetaBuilder::new(&elements).collect("app").unwrap();
        assert_eq!(app.environment_nocache, vec!["MAKEFLAGS"]);
        assert_eq!(app.environment.get_string("MAKEFLAGS").unwrap(), "-j8");

        let elements = resolved(&[("app", "kind: manual\nenvironment-nocache: [[nested]]")]);
        let err = MetaBuilder::new(&elements).collect("app").unwrap_err();
        assert_eq!(err.reason(), LoadErrorReason::InvalidData);
    }

    #[test]
    fn test_source_kind_is_required() {
        let elements = resolved(&[("app", "kind: manual\nsources:\n- url: somewhere")]);
        let err = MetaBuilder::new(&elements).collect("app").unwrap_err();
        assert!(err.message().contains("expected key 'kind'"));
    }
}
