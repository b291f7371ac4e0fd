//! Architecture-conditional overlays.
//!
//! A document may carry `host-arches` and `arches` mappings keyed by
//! architecture name. The overlay matching the host architecture, then the
//! one matching the target architecture, are composited onto the document
//! with [`CompositePolicy::ArrayAppend`]. Both keys are always removed.

use bst_config::{CompositePolicy, composite};
use bst_yaml::{Node, ValueType};

use crate::error::{LoadError, Result};

#[derive(Debug, Clone, Default)]
pub(crate) struct Arches {
    host: Option<String>,
    target: Option<String>,
}

impl Arches {
    pub(crate) fn new(host: Option<&str>, target: Option<&str>) -> Self {
        Self {
            host: host.map(str::to_string),
            target: target.map(str::to_string),
        }
    }

    pub(crate) fn apply(&self, node: &mut Node) -> Result<()> {
        apply_overlay(node, "host-arches", self.host.as_deref())?;
        apply_overlay(node, "arches", self.target.as_deref())
    }
}

fn apply_overlay(node: &mut Node, key: &str, arch: Option<&str>) -> Result<()> {
    let Some(overlays) = node.remove(key) else {
        return Ok(());
    };
    if overlays.is_null() {
        return Ok(());
    }
    overlays.expect_type(key, ValueType::Mapping)?;

    let Some(arch) = arch else {
        return Ok(());
    };
    if let Some(overlay) = overlays.get_opt_mapping(arch)? {
        tracing::trace!(key, arch, "Applying arch overlay");
        composite(node, overlay, CompositePolicy::ArrayAppend, true).map_err(|err| {
            LoadError::composite(&overlay.provenance, &format!("Arch {}", arch), err)
        })?;
    }
    Ok(())
}
