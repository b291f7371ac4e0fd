//! Helpers shared by the loader integration tests.

#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use bst_loader::{LoadError, Loader, LoaderOptions, MetaElement};
use tempfile::TempDir;

/// Write a project tree into a fresh temporary directory.
pub fn project(files: &[(&str, &str)]) -> TempDir {
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

pub fn options(dir: &TempDir, target: &str) -> LoaderOptions {
    LoaderOptions::new(dir.path(), target)
}

pub fn load_with(options: LoaderOptions) -> Result<Arc<MetaElement>, LoadError> {
    Loader::new(options).load()
}

pub fn load(dir: &TempDir, target: &str) -> Result<Arc<MetaElement>, LoadError> {
    load_with(options(dir, target))
}

/// Render the graph below `element`, one element per line.
pub fn outline(element: &MetaElement) -> String {
    let mut out = String::new();
    outline_into(element, 0, &mut out);
    out
}

fn outline_into(element: &MetaElement, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&element.name);
    if let Some(variant) = &element.variant {
        out.push_str(&format!(" [{}]", variant));
    }
    out.push('\n');
    for dep in &element.build_dependencies {
        outline_into(dep, depth + 1, out);
    }
}
