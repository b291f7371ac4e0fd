/*
 * element.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Load elements and the declarations they are built from.
 */

//! Load elements.
//!
//! A [`LoadElement`] is one element document after `include` and arch
//! processing, with its `depends` and `variants` declarations lifted out of
//! the document into [`Dependency`] and [`Variant`] values. Until variant
//! resolution commits a choice, `variant_name` is unset and `deps` is empty.

use std::collections::HashSet;
use std::path::{Component, Path};

use bst_yaml::{Node, Provenance, Value, ValueType};

use crate::arches::Arches;
use crate::error::{LoadError, Result};

pub(crate) const STACK_KIND: &str = "stack";

/// Whether a dependency is needed to build an element, to run it, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    Build,
    Runtime,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Build => "build",
            DependencyType::Runtime => "runtime",
        }
    }
}

impl TryFrom<&str> for DependencyType {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "build" => Ok(DependencyType::Build),
            "runtime" => Ok(DependencyType::Runtime),
            _ => Err(format!("Dependency type '{}' is not 'build' or 'runtime'", s)),
        }
    }
}

/// How the targets of dependency declarations are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DependencyScope {
    /// Project-relative filenames, in element files
    File,
    /// Names of sibling embeds, inside a stack
    Stack,
}

impl DependencyScope {
    fn target_key(&self) -> &'static str {
        match self {
            DependencyScope::File => "filename",
            DependencyScope::Stack => "name",
        }
    }
}

/// One dependency declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    /// Name of the declaring element
    pub owner: String,

    /// Name of the element depended on
    pub name: String,

    /// Variant explicitly requested by the declaration
    pub variant_name: Option<String>,

    /// Project-relative file; unset for dependencies between embeds
    pub filename: Option<String>,

    /// Unset means both build and runtime
    pub dep_type: Option<DependencyType>,

    /// Where the declaration was written
    pub provenance: Provenance,
}

impl Dependency {
    pub fn is_build(&self) -> bool {
        self.dep_type != Some(DependencyType::Runtime)
    }

    pub fn is_runtime(&self) -> bool {
        self.dep_type != Some(DependencyType::Build)
    }
}

/// One alternative configuration of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,

    /// Composited onto the element document when the variant is chosen
    pub data: Node,

    /// Dependencies in effect when the variant is chosen
    pub dependencies: Vec<Dependency>,

    pub provenance: Provenance,
}

/// One element, as loaded from its file (or synthesized from a stack).
#[derive(Debug, Clone)]
pub struct LoadElement {
    pub name: String,

    /// Project-relative file the element was declared in
    pub filename: String,

    pub kind: String,

    /// The document, without `include`, `arches`, `depends` or `variants`
    pub data: Node,

    /// Dependencies in effect whatever the variant
    pub base_deps: Vec<Dependency>,

    pub variants: Vec<Variant>,

    /// The chosen variant, once resolved
    pub variant_name: Option<String>,

    /// The resolved dependencies, once resolved
    pub deps: Vec<Dependency>,
}

impl LoadElement {
    /// Build an element from a document whose includes were processed.
    pub(crate) fn from_document(
        name: String,
        filename: String,
        mut data: Node,
        scope: DependencyScope,
        arches: &Arches,
    ) -> Result<Self> {
        let kind = data.get_string("kind")?;
        arches.apply(&mut data)?;
        let base_deps = extract_depends(&mut data, &name, scope)?;
        let variants = extract_variants(&mut data, &name, scope, arches)?;

        Ok(Self {
            name,
            filename,
            kind,
            data,
            base_deps,
            variants,
            variant_name: None,
            deps: Vec::new(),
        })
    }

    pub fn is_stack(&self) -> bool {
        self.kind == STACK_KIND
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.name == name)
    }

    /// The dependencies in effect when `variant` is chosen.
    ///
    /// A variant dependency replaces a base dependency on the same element.
    pub fn deps_for_variant(&self, variant: Option<&str>) -> Vec<Dependency> {
        let mut deps = self.base_deps.clone();
        if let Some(variant) = variant.and_then(|name| self.variant(name)) {
            for dep in &variant.dependencies {
                match deps.iter_mut().find(|existing| existing.name == dep.name) {
                    Some(existing) => *existing = dep.clone(),
                    None => deps.push(dep.clone()),
                }
            }
        }
        deps
    }

    /// Every dependency declaration, whatever the variant.
    pub fn declared_deps(&self) -> impl Iterator<Item = &Dependency> {
        self.base_deps
            .iter()
            .chain(self.variants.iter().flat_map(|variant| variant.dependencies.iter()))
    }
}

/// Derive the element name of a file: its base name without extension.
pub(crate) fn element_name(filename: &str, provenance: Option<&Provenance>) -> Result<String> {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            LoadError::invalid_data(with_provenance(
                provenance,
                format!("Cannot derive an element name from '{}'", filename),
            ))
        })
}

/// Normalize a project-relative path lexically: `.` components are dropped
/// and `..` folds into the component before it.
pub(crate) fn normalize_filename(filename: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(filename).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if parts.last().is_some_and(|last| last != "..") => {
                parts.pop();
            }
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}

pub(crate) fn with_provenance(provenance: Option<&Provenance>, message: String) -> String {
    match provenance {
        Some(provenance) => format!("{}: {}", provenance, message),
        None => message,
    }
}

/// Variant names are made of ASCII alphanumerics, `-` and `_`.
fn validate_variant_name(name: &str, provenance: &Provenance) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(LoadError::invalid_data(format!(
            "{}: Invalid variant name '{}'",
            provenance, name
        )))
    }
}

/// Remove `key` from a mapping, requiring a sequence if it is present.
fn take_sequence(data: &mut Node, key: &str) -> Result<Vec<Node>> {
    let Some(node) = data.remove(key) else {
        return Ok(Vec::new());
    };
    if node.is_null() {
        return Ok(Vec::new());
    }
    node.expect_type(key, ValueType::Sequence)?;
    Ok(match node.value {
        Value::Sequence(items) => items,
        _ => Vec::new(),
    })
}

/// Extract and strip the `depends` declarations of a document.
pub(crate) fn extract_depends(
    data: &mut Node,
    owner: &str,
    scope: DependencyScope,
) -> Result<Vec<Dependency>> {
    let mut deps: Vec<Dependency> = Vec::new();
    for item in take_sequence(data, "depends")? {
        let dep = parse_dependency(&item, owner, scope)?;
        // Files sharing a name are a conflict, reported when the second is loaded
        let duplicate = deps.iter().any(|existing| match scope {
            DependencyScope::File => existing.filename == dep.filename,
            DependencyScope::Stack => existing.name == dep.name,
        });
        if duplicate {
            return Err(LoadError::invalid_data(format!(
                "{}: Duplicate dependency on '{}'",
                dep.provenance, dep.name
            )));
        }
        deps.push(dep);
    }
    Ok(deps)
}

fn parse_dependency(item: &Node, owner: &str, scope: DependencyScope) -> Result<Dependency> {
    let provenance = item.provenance.clone();

    let (target, variant_name, dep_type) = match &item.value {
        Value::String(_) | Value::Int(_) => (item.as_string().unwrap_or_default(), None, None),
        Value::Mapping(entries) => {
            let target_key = scope.target_key();
            for (key, value) in entries {
                if key != target_key && key != "variant" && key != "type" {
                    return Err(LoadError::invalid_data(format!(
                        "{}: Unexpected key '{}' in dependency declaration",
                        value.provenance, key
                    )));
                }
            }

            let target = item.get_string(target_key)?;
            let variant_name = item.get_opt_string("variant")?;
            if let (Some(name), Some(node)) = (&variant_name, item.get("variant")) {
                validate_variant_name(name, &node.provenance)?;
            }
            let dep_type = match (item.get_opt_string("type")?, item.get("type")) {
                (Some(value), Some(node)) => Some(
                    DependencyType::try_from(value.as_str()).map_err(|message| {
                        LoadError::invalid_data(format!("{}: {}", node.provenance, message))
                    })?,
                ),
                _ => None,
            };
            (target, variant_name, dep_type)
        }
        _ => {
            return Err(LoadError::invalid_data(format!(
                "{}: Dependency must be a {} or a mapping, found a {}",
                provenance,
                scope.target_key(),
                item.value_type()
            )));
        }
    };

    let (name, filename) = match scope {
        DependencyScope::File => {
            if Path::new(&target).is_absolute() {
                return Err(LoadError::invalid_data(format!(
                    "{}: Dependency filename '{}' must be relative to the project directory",
                    provenance, target
                )));
            }
            let filename = normalize_filename(&target);
            (element_name(&filename, Some(&provenance))?, Some(filename))
        }
        DependencyScope::Stack => (target, None),
    };

    Ok(Dependency {
        owner: owner.to_string(),
        name,
        variant_name,
        filename,
        dep_type,
        provenance,
    })
}

/// Extract and strip the `variants` declarations of a document.
fn extract_variants(
    data: &mut Node,
    owner: &str,
    scope: DependencyScope,
    arches: &Arches,
) -> Result<Vec<Variant>> {
    let mut variants: Vec<Variant> = Vec::new();
    let mut seen = HashSet::new();

    for mut item in take_sequence(data, "variants")? {
        item.expect_type("variants", ValueType::Mapping)?;
        let name = item.get_string("variant")?;
        let provenance = item
            .get("variant")
            .map_or_else(|| item.provenance.clone(), |node| node.provenance.clone());
        validate_variant_name(&name, &provenance)?;
        if !seen.insert(name.clone()) {
            return Err(LoadError::invalid_data(format!(
                "{}: Variant '{}' is declared more than once",
                provenance, name
            )));
        }

        item.remove("variant");
        arches.apply(&mut item)?;
        let dependencies = extract_depends(&mut item, owner, scope)?;

        variants.push(Variant {
            name,
            data: item,
            dependencies,
            provenance,
        });
    }

    Ok(variants)
}
