/*
 * variants.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Project-wide variant resolution.
 */

//! Variant resolution.
//!
//! Every element reachable from the target must be built in exactly one
//! variant, whatever element pulled it in. The resolver searches for such an
//! assignment depth-first over a *pool* of element configurations. Each
//! dependency is tried with every variant it admits, in declaration order;
//! a candidate which conflicts with a configuration already in the pool is
//! abandoned for the next one. The first assignment which configures the
//! whole graph wins.
//!
//! A pool entry is only replaced by a later request for the same element
//! when that request names its variant explicitly. Once the search
//! succeeds, every entry in the pool is committed onto its element.

use std::fmt;

use bst_config::{CompositePolicy, composite};
use bst_yaml::Provenance;
use indexmap::IndexMap;

use crate::element::{Dependency, LoadElement};
use crate::error::{LoadError, Result};

/// A conflict found while configuring a candidate.
///
/// These are recoverable while another candidate remains to be tried.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantError {
    /// An element was requested in a variant it cannot have.
    Disagreement {
        /// The element whose variant is disputed
        element: String,
        /// The element holding the explicit request
        owner: String,
        /// The explicitly requested variant
        requested: String,
        /// The variant the conflicting candidate would choose
        candidate: Option<String>,
        /// Where the explicit request was declared
        provenance: Provenance,
    },

    /// An element depends on itself.
    Circular {
        element: String,
        provenance: Provenance,
    },

    /// A dependency names an element which was never loaded.
    Missing { dependency: Dependency },
}

impl fmt::Display for VariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantError::Disagreement {
                element,
                owner,
                requested,
                candidate,
                provenance,
            } => {
                write!(
                    f,
                    "{}: Variant disagreement occurred: '{}' requires variant '{}' of '{}', ",
                    provenance, owner, requested, element
                )?;
                match candidate {
                    Some(candidate) => write!(f, "which conflicts with variant '{}'", candidate),
                    None => write!(f, "which conflicts with its default variant"),
                }
            }
            VariantError::Circular {
                element,
                provenance,
            } => write!(
                f,
                "{}: Circular dependency detected for element '{}'",
                provenance, element
            ),
            VariantError::Missing { dependency } => write!(
                f,
                "{}: Dependency '{}' was never loaded",
                dependency.provenance, dependency.name
            ),
        }
    }
}

impl std::error::Error for VariantError {}

/// An element paired with a candidate variant.
#[derive(Debug, Clone)]
pub(crate) struct LoadElementConfig {
    /// The dependency that pulled the element in (unset for the target)
    pub dependency: Option<Dependency>,
    pub element: String,
    pub variant_name: Option<String>,
    /// Dependencies in effect for the candidate variant
    pub deps: Vec<Dependency>,
}

impl LoadElementConfig {
    pub(crate) fn new(
        dependency: Option<Dependency>,
        element: &LoadElement,
        variant_name: Option<String>,
    ) -> Self {
        let deps = element.deps_for_variant(variant_name.as_deref());
        Self {
            dependency,
            element: element.name.clone(),
            variant_name,
            deps,
        }
    }

    fn is_explicit(&self) -> bool {
        self.dependency
            .as_ref()
            .is_some_and(|dep| dep.variant_name.is_some())
    }

    /// Composite the chosen variant onto `element` and commit the choice.
    pub(crate) fn apply(&self, element: &mut LoadElement) -> Result<()> {
        if let Some(name) = &self.variant_name {
            if let Some(variant) = element.variants.iter().find(|v| &v.name == name) {
                composite(
                    &mut element.data,
                    &variant.data,
                    CompositePolicy::ArrayAppend,
                    true,
                )
                .map_err(|err| {
                    LoadError::composite(&variant.provenance, &format!("Variant '{}'", name), err)
                })?;
            }
        }
        element.variant_name = self.variant_name.clone();
        element.deps = self.deps.clone();
        Ok(())
    }
}

/// Element configurations chosen so far, keyed by element name.
pub(crate) type Pool = IndexMap<String, LoadElementConfig>;

/// The backtracking search over a fixed set of loaded elements.
pub(crate) struct VariantResolver<'a> {
    elements: &'a IndexMap<String, LoadElement>,
}

impl<'a> VariantResolver<'a> {
    pub(crate) fn new(elements: &'a IndexMap<String, LoadElement>) -> Self {
        Self { elements }
    }

    /// Find a consistent variant for every element reachable from `target`.
    ///
    /// When `variant` is unset, a target declaring variants is resolved in
    /// its first one.
    pub(crate) fn resolve(
        &self,
        target: &str,
        variant: Option<&str>,
    ) -> std::result::Result<Pool, VariantError> {
        let Some(element) = self.elements.get(target) else {
            return Ok(Pool::new());
        };
        let variant = variant
            .map(str::to_string)
            .or_else(|| element.variants.first().map(|v| v.name.clone()));

        let config = LoadElementConfig::new(None, element, variant);
        self.configure(config, &Pool::new())
    }

    /// Add `config` to a copy of `pool`, then configure its dependencies.
    pub(crate) fn configure(
        &self,
        config: LoadElementConfig,
        pool: &Pool,
    ) -> std::result::Result<Pool, VariantError> {
        for existing in pool.values() {
            for dep in existing.deps.iter().filter(|dep| dep.name == config.element) {
                if dep.owner == config.element {
                    return Err(VariantError::Circular {
                        element: config.element.clone(),
                        provenance: dep.provenance.clone(),
                    });
                }
                if let Some(requested) = &dep.variant_name {
                    if config.variant_name.as_ref() != Some(requested) {
                        return Err(VariantError::Disagreement {
                            element: config.element.clone(),
                            owner: dep.owner.clone(),
                            requested: requested.clone(),
                            candidate: config.variant_name.clone(),
                            provenance: dep.provenance.clone(),
                        });
                    }
                }
            }
        }

        let mut pool = pool.clone();
        if let Some(existing) = pool.get(&config.element) {
            // Already configured: only an explicit request replaces the entry
            if existing.variant_name == config.variant_name || !config.is_explicit() {
                return Ok(pool);
            }
        }

        let deps = config.deps.clone();
        pool.insert(config.element.clone(), config);
        self.configure_dependency_variants(&deps, pool)
    }

    /// Configure `deps` in order, backtracking over each one's candidates.
    pub(crate) fn configure_dependency_variants(
        &self,
        deps: &[Dependency],
        pool: Pool,
    ) -> std::result::Result<Pool, VariantError> {
        let Some((dep, remaining)) = deps.split_first() else {
            return Ok(pool);
        };

        let mut last_error = None;
        for candidate in self.candidates(dep)? {
            tracing::trace!(
                element = %candidate.element,
                variant = ?candidate.variant_name,
                "Trying variant candidate"
            );
            let attempt = self
                .configure(candidate, &pool)
                .and_then(|pool| self.configure_dependency_variants(remaining, pool));
            match attempt {
                Ok(pool) => return Ok(pool),
                Err(err) => {
                    tracing::trace!(element = %dep.name, reason = %err, "Variant candidate rejected");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| VariantError::Missing {
            dependency: dep.clone(),
        }))
    }

    /// The configurations `dep` admits, in the order they are tried.
    fn candidates(&self, dep: &Dependency) -> std::result::Result<Vec<LoadElementConfig>, VariantError> {
        let element = self
            .elements
            .get(&dep.name)
            .ok_or_else(|| VariantError::Missing {
                dependency: dep.clone(),
            })?;

        let names: Vec<Option<String>> = match &dep.variant_name {
            Some(name) => vec![Some(name.clone())],
            None if element.variants.is_empty() => vec![None],
            None => element
                .variants
                .iter()
                .map(|variant| Some(variant.name.clone()))
                .collect(),
        };

        Ok(names
            .into_iter()
            .map(|name| LoadElementConfig::new(Some(dep.clone()), element, name))
            .collect())
    }
}

/// Commit every configuration of a resolved pool onto its element.
pub(crate) fn apply_pool(pool: &Pool, elements: &mut IndexMap<String, LoadElement>) -> Result<()> {
    for config in pool.values() {
        if let Some(element) = elements.get_mut(&config.element) {
            config.apply(element)?;
        }
    }
    tracing::debug!(elements = pool.len(), "Committed variant choices");
    Ok(())
}
