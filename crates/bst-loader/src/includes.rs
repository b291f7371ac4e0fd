/*
 * includes.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Splicing of `include` fragments into documents.
 */

use std::collections::HashMap;
use std::path::PathBuf;

use bst_config::{CompositePolicy, composite};
use bst_yaml::{Node, Provenance, Value, parse_document};

use crate::element::normalize_filename;
use crate::error::{LoadError, LoadErrorReason, Result};

/// Include processing for one load session.
///
/// Each fragment is read and parsed at most once per session. Fragments may
/// include further fragments.
#[derive(Debug)]
pub(crate) struct Includes {
    basedir: PathBuf,
    cache: HashMap<String, Node>,
}

impl Includes {
    pub(crate) fn new(basedir: PathBuf) -> Self {
        Self {
            basedir,
            cache: HashMap::new(),
        }
    }

    /// Remove the `include` key of `node` and splice in the fragments it names.
    ///
    /// A fragment may add keys and extend nested mappings, but never
    /// override a value `node` already declares.
    pub(crate) fn process(&mut self, node: &mut Node) -> Result<()> {
        let mut active = Vec::new();
        self.process_node(node, &mut active)
    }

    fn process_node(&mut self, node: &mut Node, active: &mut Vec<String>) -> Result<()> {
        let Some(include) = node.remove("include") else {
            return Ok(());
        };

        for (filename, provenance) in include_paths(&include)? {
            let fragment = self.fragment(&filename, &provenance, active)?;
            composite(node, &fragment, CompositePolicy::Strict, false).map_err(|err| {
                LoadError::composite(&provenance, &format!("Include '{}'", filename), err)
            })?;
        }
        Ok(())
    }

    fn fragment(
        &mut self,
        filename: &str,
        provenance: &Provenance,
        active: &mut Vec<String>,
    ) -> Result<Node> {
        if active.iter().any(|name| name == filename) {
            return Err(LoadError::new(
                LoadErrorReason::CircularDependency,
                format!(
                    "{}: Circular include of '{}' ({} -> {})",
                    provenance,
                    filename,
                    active.join(" -> "),
                    filename
                ),
            ));
        }
        if let Some(fragment) = self.cache.get(filename) {
            return Ok(fragment.clone());
        }

        let path = self.basedir.join(filename);
        let content = std::fs::read_to_string(&path).map_err(|err| {
            LoadError::new(
                LoadErrorReason::MissingFile,
                format!("{}: Could not find include file '{}'", provenance, filename),
            )
            .with_cause(err)
        })?;
        let mut fragment = parse_document(&content, filename).map_err(|err| {
            LoadError::new(
                LoadErrorReason::InvalidYaml,
                format!("{}: Failed to load '{}': {}", provenance, filename, err),
            )
            .with_cause(err)
        })?;

        active.push(filename.to_string());
        let processed = self.process_node(&mut fragment, active);
        active.pop();
        processed?;

        tracing::debug!(include = filename, "Loaded include fragment");
        self.cache.insert(filename.to_string(), fragment.clone());
        Ok(fragment)
    }
}

/// The fragments named by an `include` value: one path or a list of paths.
fn include_paths(include: &Node) -> Result<Vec<(String, Provenance)>> {
    let items: Vec<&Node> = match &include.value {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items.iter().collect(),
        _ => vec![include],
    };

    items
        .into_iter()
        .map(|item| match item.as_string() {
            Some(path) if !path.is_empty() => {
                Ok((normalize_filename(&path), item.provenance.clone()))
            }
            _ => Err(LoadError::invalid_data(format!(
                "{}: 'include' must be a path or a list of paths, found a {}",
                item.provenance,
                item.value_type()
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn doc(content: &str) -> Node {
        parse_document(content, "app.bst").unwrap()
    }

    #[test]
    fn test_fragment_is_spliced() {
        let dir = project(&[(
            "include/common.yml",
            "variables:\n  prefix: /usr\nconfig:\n  strip: true",
        )]);
        let mut includes = Includes::new(dir.path().to_path_buf());
        let mut node = doc("kind: manual\ninclude: include/common.yml\nconfig:\n  build: make");

        includes.process(&mut node).unwrap();

        assert!(node.get("include").is_none());
        let config = node.get("config").unwrap();
        assert_eq!(config.get_string("build").unwrap(), "make");
        assert_eq!(config.get_opt_bool("strip").unwrap(), Some(true));
        let prefix = node.get("variables").unwrap().get("prefix").unwrap();
        assert_eq!(&*prefix.provenance.file, "include/common.yml");
    }

    #[test]
    fn test_list_of_fragments_and_nesting() {
        let dir = project(&[
            ("a.yml", "include: b.yml\nvariables:\n  a: 1"),
            ("b.yml", "variables:\n  b: 2"),
            ("c.yml", "public:\n  c: 3"),
        ]);
        let mut includes = Includes::new(dir.path().to_path_buf());
        let mut node = doc("kind: manual\ninclude:\n- a.yml\n- ./c.yml");

        includes.process(&mut node).unwrap();

        let variables = node.get("variables").unwrap();
        assert_eq!(variables.len(), 2);
        assert!(node.get("public").unwrap().contains_key("c"));
        assert_eq!(includes.cache.len(), 3);
    }

    #[test]
    fn test_fragment_cannot_override() {
        let dir = project(&[("common.yml", "config:\n  build: ninja")]);
        let mut includes = Includes::new(dir.path().to_path_buf());
        let mut node = doc("kind: manual\ninclude: common.yml\nconfig:\n  build: make");

        let err = includes.process(&mut node).unwrap_err();
        assert_eq!(err.reason(), LoadErrorReason::IllegalComposite);
        insta::assert_snapshot!(
            err.to_string(),
            @"app.bst [line 2 column 9]: Include 'common.yml' tries to override existing key 'config.build'"
        );
    }

    #[test]
    fn test_missing_fragment() {
        let dir = project(&[]);
        let mut includes = Includes::new(dir.path().to_path_buf());
        let mut node = doc("kind: manual\ninclude: nowhere.yml");

        let err = includes.process(&mut node).unwrap_err();
        assert_eq!(err.reason(), LoadErrorReason::MissingFile);
        assert!(err.message().starts_with("app.bst [line 2 column 9]"));
    }

    #[test]
    fn test_malformed_fragment() {
        let dir = project(&[("frag.yml", "config:\na: [unclosed")]);
        let mut includes = Includes::new(dir.path().to_path_buf());
        let mut node = doc("kind: manual\ninclude: frag.yml");

        let err = includes.process(&mut node).unwrap_err();
        assert_eq!(err.reason(), LoadErrorReason::InvalidYaml);
        assert!(
            err.message()
                .starts_with("app.bst [line 2 column 9]: Failed to load 'frag.yml': frag.yml [line")
        );
    }

    #[test]
    fn test_circular_include() {
        let dir = project(&[("a.yml", "include: b.yml"), ("b.yml", "include: a.yml")]);
        let mut includes = Includes::new(dir.path().to_path_buf());
        let mut node = doc("kind: manual\ninclude: a.yml");

        let err = includes.process(&mut node).unwrap_err();
        assert_eq!(err.reason(), LoadErrorReason::CircularDependency);
        assert!(err.message().contains("a.yml -> b.yml -> a.yml"));
    }

    #[test]
    fn test_include_must_be_paths() {
        let dir = project(&[]);
        let mut includes = Includes::new(dir.path().to_path_buf());
        let mut node = doc("kind: manual\ninclude:\n  nested: map");

        let err = includes.process(&mut node).unwrap_err();
        assert_eq!(err.reason(), LoadErrorReason::InvalidData);
    }
}
