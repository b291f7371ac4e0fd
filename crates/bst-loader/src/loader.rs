/*
 * loader.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Loading of an element graph from a project directory.
 */

//! The loader.
//!
//! A load runs in a fixed sequence of passes over one [`LoadSession`]:
//!
//! 1. every file reachable from the target is loaded, composing includes
//!    and arch overlays into each document,
//! 2. explicit variant requests are checked against the declared variants,
//! 3. a consistent variant is resolved for every reachable element,
//! 4. stacks are expanded into their embedded elements,
//! 5. the graph is checked for cycles and dependencies are ordered,
//! 6. the immutable [`MetaElement`] graph is built.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bst_yaml::{Node, parse_document};
use indexmap::IndexMap;

use crate::arches::Arches;
use crate::element::{
    Dependency, DependencyScope, LoadElement, STACK_KIND, element_name, normalize_filename,
    with_provenance,
};
use crate::error::{LoadError, LoadErrorReason, Result};
use crate::graph;
use crate::includes::Includes;
use crate::meta::{MetaBuilder, MetaElement};
use crate::options::LoaderOptions;
use crate::stack;
use crate::variants::{VariantResolver, apply_pool};

/// Callback invoked with the filename of every file as it is loaded.
pub type Ticker = Box<dyn FnMut(&str)>;

/// Loads element graphs.
///
/// # Example
///
/// ```rust,no_run
/// use bst_loader::{Loader, LoaderOptions};
///
/// let options = LoaderOptions::new("/path/to/project", "elements/app.bst")
///     .with_target_arch("x86_64");
/// let mut loader = Loader::new(options).with_ticker(|file| eprintln!("Loading {file}"));
///
/// let app = loader.load()?;
/// for dep in &app.build_dependencies {
///     println!("{} ({:?})", dep.name, dep.variant);
/// }
/// # Ok::<(), bst_loader::LoadError>(())
/// ```
pub struct Loader {
    options: LoaderOptions,
    ticker: Option<Ticker>,
}

impl Loader {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            options,
            ticker: None,
        }
    }

    /// Report progress through `ticker`.
    pub fn with_ticker(mut self, ticker: impl FnMut(&str) + 'static) -> Self {
        self.ticker = Some(Box::new(ticker));
        self
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load the target and everything it depends on.
    ///
    /// Every call starts from scratch: files are read again.
    pub fn load(&mut self) -> Result<Arc<MetaElement>> {
        let target = self.options.target.clone();
        if target.is_empty() || Path::new(&target).is_absolute() {
            return Err(LoadError::invalid_data(format!(
                "Target '{}' must be a path relative to the project directory",
                target
            )));
        }

        let basedir = std::path::absolute(&self.options.basedir).map_err(|err| {
            LoadError::new(
                LoadErrorReason::MissingFile,
                format!(
                    "Could not resolve project directory '{}'",
                    self.options.basedir.display()
                ),
            )
            .with_cause(err)
        })?;
        let arches = Arches::new(
            self.options.host_arch.as_deref(),
            self.options.effective_target_arch(),
        );

        let mut session = LoadSession::new(basedir, arches, self.ticker.take());
        let result = session.run(&target, self.options.variant.as_deref());
        self.ticker = session.ticker.take();
        result
    }
}

/// State owned by one load.
pub(crate) struct LoadSession {
    basedir: PathBuf,
    arches: Arches,
    includes: Includes,
    /// Files loaded so far, project-relative
    visited: HashSet<String>,
    /// Every element loaded or synthesized, by name
    elements: IndexMap<String, LoadElement>,
    ticker: Option<Ticker>,
}

impl LoadSession {
    fn new(basedir: PathBuf, arches: Arches, ticker: Option<Ticker>) -> Self {
        Self {
            includes: Includes::new(basedir.clone()),
            basedir,
            arches,
            visited: HashSet::new(),
            elements: IndexMap::new(),
            ticker,
        }
    }

    fn run(&mut self, target: &str, variant: Option<&str>) -> Result<Arc<MetaElement>> {
        let target = self.load_file(target, None)?;
        self.validate_variants(&target, variant)?;
        self.resolve_variants(&target, variant)?;
        self.expand_stacks(&target)?;

        graph::check_circular(&self.elements, std::slice::from_ref(&target))?;
        let reachable = graph::reachable(&self.elements, &target);
        graph::sort_dependencies(&mut self.elements, &reachable);

        let meta = MetaBuilder::new(&self.elements).collect(&target)?;
        tracing::info!(target = %target, elements = reachable.len(), "Loaded element graph");
        Ok(meta)
    }

    /// Load `filename` and, recursively, every file it declares a
    /// dependency on. Returns the element name of `filename`.
    fn load_file(&mut self, filename: &str, requester: Option<&Dependency>) -> Result<String> {
        let filename = normalize_filename(filename);
        let provenance = requester.map(|dep| &dep.provenance);
        let name = element_name(&filename, provenance)?;

        if self.visited.contains(&filename) {
            return Ok(name);
        }
        if let Some(existing) = self.elements.get(&name) {
            return Err(LoadError::new(
                LoadErrorReason::ConflictingName,
                with_provenance(
                    provenance,
                    format!(
                        "Tried to load file '{}' but existing file '{}' has the same name",
                        filename, existing.filename
                    ),
                ),
            ));
        }
        self.visited.insert(filename.clone());
        if let Some(ticker) = self.ticker.as_mut() {
            ticker(&filename);
        }

        let content = std::fs::read_to_string(self.basedir.join(&filename)).map_err(|err| {
            LoadError::new(
                LoadErrorReason::MissingFile,
                with_provenance(
                    provenance,
                    format!("Could not find file at path '{}'", filename),
                ),
            )
            .with_cause(err)
        })?;
        let mut data = parse_document(&content, &filename).map_err(|err| {
            let message = match provenance {
                Some(provenance) => {
                    format!("{}: Failed to load '{}': {}", provenance, filename, err)
                }
                None => err.to_string(),
            };
            LoadError::new(LoadErrorReason::InvalidYaml, message).with_cause(err)
        })?;

        self.includes.process(&mut data)?;
        if data.get_opt_string("kind")?.as_deref() == Some(STACK_KIND) {
            if let Some(embeds) = data.get_mut("embeds").and_then(Node::as_sequence_mut) {
                for embed in embeds.iter_mut().filter(|embed| embed.is_mapping()) {
                    self.includes.process(embed)?;
                }
            }
        }

        let element = LoadElement::from_document(
            name.clone(),
            filename.clone(),
            data,
            DependencyScope::File,
            &self.arches,
        )?;
        if let [variant] = element.variants.as_slice() {
            if !element.is_stack() {
                return Err(LoadError::invalid_data(format!(
                    "{}: Element '{}' declares a single variant, declare none or at least two",
                    variant.provenance, name
                )));
            }
        }

        tracing::debug!(filename = %filename, element = %name, "Loaded element");
        let deps: Vec<Dependency> = element.declared_deps().cloned().collect();
        self.elements.insert(name.clone(), element);

        for dep in &deps {
            if let Some(dep_filename) = &dep.filename {
                self.load_file(dep_filename, Some(dep))?;
            }
        }
        Ok(name)
    }

    /// Check that every explicitly requested variant is declared.
    fn validate_variants(&self, target: &str, variant: Option<&str>) -> Result<()> {
        if let (Some(variant), Some(element)) = (variant, self.elements.get(target)) {
            if element.variant(variant).is_none() {
                return Err(LoadError::invalid_data(format!(
                    "Element '{}' does not declare variant '{}'",
                    target, variant
                )));
            }
        }

        for element in self.elements.values() {
            for dep in element.declared_deps() {
                let (Some(requested), Some(other)) =
                    (&dep.variant_name, self.elements.get(&dep.name))
                else {
                    continue;
                };
                if other.variant(requested).is_none() {
                    return Err(LoadError::invalid_data(format!(
                        "{}: Element '{}' does not declare variant '{}'",
                        dep.provenance, dep.name, requested
                    )));
                }
            }
        }
        Ok(())
    }

    fn resolve_variants(&mut self, target: &str, variant: Option<&str>) -> Result<()> {
        let pool = VariantResolver::new(&self.elements).resolve(target, variant)?;
        apply_pool(&pool, &mut self.elements)
    }

    /// Expand every stack reachable from `target`.
    fn expand_stacks(&mut self, target: &str) -> Result<()> {
        let stacks: Vec<String> = graph::reachable(&self.elements, target)
            .into_iter()
            .filter(|name| self.elements.get(name).is_some_and(LoadElement::is_stack))
            .collect();

        for name in &stacks {
            let synthesized = stack::expand_stack(&mut self.elements, name, &self.arches)?;
            graph::check_circular(&self.elements, &synthesized)?;
        }
        Ok(())
    }
}
