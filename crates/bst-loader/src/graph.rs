//! Walks over the resolved dependency graph.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::element::{Dependency, DependencyType, LoadElement, with_provenance};
use crate::error::{LoadError, LoadErrorReason, Result};

/// Names of the elements reachable from `start` through resolved
/// dependencies, `start` first, in depth-first order.
pub(crate) fn reachable(elements: &IndexMap<String, LoadElement>, start: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![start.to_string()];

    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(element) = elements.get(&name) {
            stack.extend(element.deps.iter().rev().map(|dep| dep.name.clone()));
        }
        order.push(name);
    }
    order
}

/// Fail if any element reachable from `starts` is on a cycle.
pub(crate) fn check_circular(
    elements: &IndexMap<String, LoadElement>,
    starts: &[String],
) -> Result<()> {
    let mut check = CycleCheck {
        elements,
        validated: HashSet::new(),
        path: Vec::new(),
    };
    for start in starts {
        check.visit(start, None)?;
    }
    Ok(())
}

struct CycleCheck<'a> {
    elements: &'a IndexMap<String, LoadElement>,
    /// Elements whose whole subgraph is known to be acyclic
    validated: HashSet<String>,
    /// The chain of elements currently being walked
    path: Vec<String>,
}

impl CycleCheck<'_> {
    fn visit(&mut self, name: &str, via: Option<&Dependency>) -> Result<()> {
        if self.validated.contains(name) {
            return Ok(());
        }
        if let Some(position) = self.path.iter().position(|entry| entry == name) {
            let mut chain = self.path[position..].to_vec();
            chain.push(name.to_string());
            return Err(LoadError::new(
                LoadErrorReason::CircularDependency,
                with_provenance(
                    via.map(|dep| &dep.provenance),
                    format!(
                        "Circular dependency detected at element '{}': {}",
                        name,
                        chain.join(" -> ")
                    ),
                ),
            ));
        }
        let Some(element) = self.elements.get(name) else {
            return Ok(());
        };

        self.path.push(name.to_string());
        for dep in &element.deps {
            self.visit(&dep.name, Some(dep))?;
        }
        self.path.pop();
        self.validated.insert(name.to_string());
        Ok(())
    }
}

/// Order the resolved dependencies of each of `names`.
///
/// A dependency which (transitively) depends on a sibling comes after that
/// sibling. Otherwise runtime-only dependencies come last, and ties are
/// broken by name. The graph must be acyclic.
pub(crate) fn sort_dependencies(elements: &mut IndexMap<String, LoadElement>, names: &[String]) {
    let mut closures = HashMap::new();
    for name in names {
        closure(elements, name, &mut closures);
    }

    for name in names {
        if let Some(element) = elements.get_mut(name) {
            let deps = std::mem::take(&mut element.deps);
            element.deps = order(deps, &closures);
        }
    }
}

/// Every element `name` depends on, directly or not.
fn closure(
    elements: &IndexMap<String, LoadElement>,
    name: &str,
    closures: &mut HashMap<String, HashSet<String>>,
) -> HashSet<String> {
    if let Some(known) = closures.get(name) {
        return known.clone();
    }
    closures.insert(name.to_string(), HashSet::new());

    let mut all = HashSet::new();
    if let Some(element) = elements.get(name) {
        for dep in &element.deps {
            all.insert(dep.name.clone());
            all.extend(closure(elements, &dep.name, closures));
        }
    }
    closures.insert(name.to_string(), all.clone());
    all
}

fn order(
    mut deps: Vec<Dependency>,
    closures: &HashMap<String, HashSet<String>>,
) -> Vec<Dependency> {
    let runtime_only = |dep: &Dependency| dep.dep_type == Some(DependencyType::Runtime);
    deps.sort_by(|a, b| (runtime_only(a), &a.name).cmp(&(runtime_only(b), &b.name)));

    let mut ordered = Vec::with_capacity(deps.len());
    while !deps.is_empty() {
        let next = deps
            .iter()
            .position(|dep| {
                let closure = closures.get(&dep.name);
                !deps.iter().any(|other| {
                    other.name != dep.name && closure.is_some_and(|all| all.contains(&other.name))
                })
            })
            .unwrap_or(0);
        ordered.push(deps.remove(next));
    }
    ordered
}
