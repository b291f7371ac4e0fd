/*
 * options.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Options controlling a load.
 */

use std::path::PathBuf;

/// Options for a single [`Loader`](crate::Loader).
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Project directory every element path is relative to
    pub basedir: PathBuf,

    /// Target element file, relative to `basedir`
    pub target: String,

    /// Variant requested for the target (its first variant when unset)
    pub variant: Option<String>,

    /// Selects `host-arches.<id>` overlays
    pub host_arch: Option<String>,

    /// Selects `arches.<id>` overlays; falls back to `host_arch`
    pub target_arch: Option<String>,
}

impl LoaderOptions {
    pub fn new(basedir: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            basedir: basedir.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_host_arch(mut self, arch: impl Into<String>) -> Self {
        self.host_arch = Some(arch.into());
        self
    }

    pub fn with_target_arch(mut self, arch: impl Into<String>) -> Self {
        self.target_arch = Some(arch.into());
        self
    }

    /// The architecture `arches` overlays are selected with.
    pub fn effective_target_arch(&self) -> Option<&str> {
        self.target_arch.as_deref().or(self.host_arch.as_deref())
    }
}
