/*
 * stack.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Expansion of stack elements into their embedded elements.
 */

//! Stack expansion.
//!
//! A stack declares its sub-elements inline under `embeds`. Each embed
//! becomes an element of its own, named `<stack>-<embed>`, which:
//!
//! - addresses its siblings by embed name in `depends`,
//! - is built in the variant the stack was resolved in,
//! - depends on everything the stack itself depends on.
//!
//! The stack in turn depends on every one of its embeds.

use std::collections::HashSet;

use bst_yaml::{Node, Provenance, ValueType};
use indexmap::IndexMap;

use crate::arches::Arches;
use crate::element::{Dependency, DependencyScope, LoadElement, STACK_KIND};
use crate::error::{LoadError, LoadErrorReason, Result};
use crate::variants::LoadElementConfig;

struct Embed {
    name: String,
    data: Node,
    provenance: Provenance,
}

/// Expand the stack named `name`, returning the names of the new elements.
pub(crate) fn expand_stack(
    elements: &mut IndexMap<String, LoadElement>,
    name: &str,
    arches: &Arches,
) -> Result<Vec<String>> {
    let Some(stack) = elements.get(name).cloned() else {
        return Ok(Vec::new());
    };

    let embeds = parse_embeds(&stack.data)?;
    let siblings: HashSet<&str> = embeds.iter().map(|embed| embed.name.as_str()).collect();

    let mut synthesized: Vec<LoadElement> = Vec::with_capacity(embeds.len());
    for embed in &embeds {
        let full_name = format!("{}-{}", stack.name, embed.name);
        if let Some(existing) = elements.get(&full_name) {
            return Err(conflict(embed, &full_name, &existing.filename));
        }
        if synthesized.iter().any(|element| element.name == full_name) {
            return Err(conflict(embed, &full_name, &stack.filename));
        }

        let mut element = LoadElement::from_document(
            full_name,
            stack.filename.clone(),
            embed.data.clone(),
            DependencyScope::Stack,
            arches,
        )?;

        for variant in &element.variants {
            if stack.variant(&variant.name).is_none() {
                return Err(LoadError::invalid_data(format!(
                    "{}: Embedded element '{}' declares variant '{}' which stack '{}' does not declare",
                    variant.provenance, embed.name, variant.name, stack.name
                )));
            }
        }

        let declared = element.base_deps.iter_mut().chain(
            element
                .variants
                .iter_mut()
                .flat_map(|variant| variant.dependencies.iter_mut()),
        );
        for dep in declared {
            if !siblings.contains(dep.name.as_str()) {
                return Err(LoadError::invalid_data(format!(
                    "{}: Embedded element '{}' depends on '{}', which is not embedded in stack '{}'",
                    dep.provenance, embed.name, dep.name, stack.name
                )));
            }
            dep.name = format!("{}-{}", stack.name, dep.name);
        }

        let variant = stack
            .variant_name
            .clone()
            .filter(|variant| element.variant(variant).is_some());
        let dependency = stack_dependency(&stack, &element, embed);
        let config = LoadElementConfig::new(Some(dependency), &element, variant);
        config.apply(&mut element)?;

        for dep in &stack.deps {
            if !element.deps.iter().any(|existing| existing.name == dep.name) {
                element.deps.push(Dependency {
                    owner: element.name.clone(),
                    ..dep.clone()
                });
            }
        }

        synthesized.push(element);
    }

    let mut names = Vec::with_capacity(synthesized.len());
    let mut stack_deps = Vec::with_capacity(synthesized.len());
    for (element, embed) in synthesized.into_iter().zip(&embeds) {
        stack_deps.push(stack_dependency(&stack, &element, embed));
        names.push(element.name.clone());
        elements.insert(element.name.clone(), element);
    }

    if let Some(stack) = elements.get_mut(name) {
        stack.data.remove("embeds");
        stack.deps.extend(stack_deps);
    }

    tracing::debug!(stack = name, embeds = names.len(), "Expanded stack");
    Ok(names)
}

/// The dependency of a stack on one of its embeds.
fn stack_dependency(stack: &LoadElement, element: &LoadElement, embed: &Embed) -> Dependency {
    Dependency {
        owner: stack.name.clone(),
        name: element.name.clone(),
        variant_name: stack.variant_name.clone(),
        filename: None,
        dep_type: None,
        provenance: embed.provenance.clone(),
    }
}

fn conflict(embed: &Embed, full_name: &str, other: &str) -> LoadError {
    LoadError::new(
        LoadErrorReason::ConflictingName,
        format!(
            "{}: Embedded element '{}' conflicts with an element of the same name from '{}'",
            embed.provenance, full_name, other
        ),
    )
}

fn parse_embeds(data: &Node) -> Result<Vec<Embed>> {
    let Some(embeds) = data.get_opt_sequence("embeds")? else {
        return Ok(Vec::new());
    };

    let mut parsed = Vec::new();
    for item in embeds.as_sequence().unwrap_or_default() {
        item.expect_type("embeds", ValueType::Mapping)?;
        let name = item.get_string("name")?;
        let kind = item.get_string("kind")?;
        if kind == STACK_KIND {
            return Err(LoadError::invalid_data(format!(
                "{}: Embedded element '{}' is a stack, stacks cannot be nested",
                item.provenance, name
            )));
        }

        let mut data = item.clone();
        data.remove("name");
        parsed.push(Embed {
            name,
            data,
            provenance: item.provenance.clone(),
        });
    }
    Ok(parsed)
}
