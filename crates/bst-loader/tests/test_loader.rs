/*
 * test_loader.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * End-to-end loading of element trees from disk.
 */

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use bst_loader::{LoadErrorReason, Loader};
use common::{load, load_with, options, outline, project};

#[test]
fn test_load_simple_graph() {
    let dir = project(&[
        ("base/gcc.bst", "kind: import"),
        ("zlib.bst", "kind: autotools\ndepends:\n- base/gcc.bst"),
        (
            "app.bst",
            "kind: manual\ndepends:\n- zlib.bst\n- filename: base/gcc.bst\n  type: build",
        ),
    ]);

    let app = load(&dir, "app.bst").unwrap();
    assert_eq!(app.name, "app");
    assert_eq!(app.kind, "manual");
    assert_eq!(app.variant, None);
    assert_eq!(app.build_dependency_names(), vec!["gcc", "zlib"]);
    assert_eq!(app.dependency_names(), vec!["zlib"]);
    insta::assert_snapshot!(outline(&app), @r"
    app
      gcc
      zlib
        gcc
    ");
}

#[test]
fn test_ticker_sees_every_file_once() {
    let dir = project(&[
        ("a.bst", "kind: manual\ndepends:\n- b.bst\n- c.bst"),
        ("b.bst", "kind: manual\ndepends:\n- c.bst"),
        ("c.bst", "kind: manual"),
    ]);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&seen);
    let mut loader =
        Loader::new(options(&dir, "a.bst")).with_ticker(move |file| recorder.borrow_mut().push(file.to_string()));

    loader.load().unwrap();
    assert_eq!(*seen.borrow(), vec!["a.bst", "b.bst", "c.bst"]);

    loader.load().unwrap();
    assert_eq!(seen.borrow().len(), 6);
}

#[test]
fn test_diamond_shares_instances() {
    let dir = project(&[
        ("base.bst", "kind: import"),
        ("left.bst", "kind: manual\ndepends:\n- base.bst"),
        ("right.bst", "kind: manual\ndepends:\n- base.bst"),
        ("top.bst", "kind: manual\ndepends:\n- left.bst\n- right.bst"),
    ]);

    let top = load(&dir, "top.bst").unwrap();
    let left = &top.build_dependencies[0];
    let right = &top.build_dependencies[1];
    assert_eq!((left.name.as_str(), right.name.as_str()), ("left", "right"));
    assert!(Arc::ptr_eq(
        &left.build_dependencies[0],
        &right.build_dependencies[0]
    ));
    assert!(Arc::ptr_eq(&left.dependencies[0], &left.build_dependencies[0]));
}

#[test]
fn test_dependencies_are_ordered() {
    let dir = project(&[
        ("zlib.bst", "kind: manual"),
        ("libpng.bst", "kind: manual\ndepends:\n- zlib.bst"),
        ("docs.bst", "kind: manual"),
        (
            "app.bst",
            "kind: manual\ndepends:\n- filename: docs.bst\n  type: runtime\n- libpng.bst\n- zlib.bst",
        ),
    ]);

    let app = load(&dir, "app.bst").unwrap();
    assert_eq!(app.build_dependency_names(), vec!["zlib", "libpng"]);
    assert_eq!(app.dependency_names(), vec!["zlib", "libpng", "docs"]);
}

#[test]
fn test_loading_is_deterministic() {
    let dir = project(&[
        ("c.bst", "kind: manual\nvariants:\n- variant: x\n- variant: y"),
        ("b.bst", "kind: manual\ndepends:\n- c.bst"),
        ("a.bst", "kind: manual\ndepends:\n- b.bst\n- c.bst"),
    ]);

    let first = outline(&load(&dir, "a.bst").unwrap());
    let second = outline(&load(&dir, "a.bst").unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_element_sections() {
    let dir = project(&[(
        "hello.bst",
        r#"
kind: autotools
sources:
- kind: git
  url: https://example.com/hello.git
  ref: 1234
variables:
  prefix: /usr
environment:
  CFLAGS: -O2
environment-nocache: [CFLAGS]
public:
  bst:
    integration-commands: [ldconfig]
config:
  install-commands:
  - make install
"#,
    )]);

    let hello = load(&dir, "hello.bst").unwrap();
    assert_eq!(hello.sources.len(), 1);
    assert_eq!(hello.sources[0].name, "hello-0");
    assert_eq!(hello.sources[0].config.get_string("ref").unwrap(), "1234");
    assert_eq!(hello.variables.get_string("prefix").unwrap(), "/usr");
    assert_eq!(hello.environment.get_string("CFLAGS").unwrap(), "-O2");
    assert_eq!(hello.environment_nocache, vec!["CFLAGS"]);
    assert!(hello.public.contains_key("bst"));
    assert_eq!(hello.provenance.to_string(), "hello.bst [line 2 column 0]");

    let config = serde_json::to_value(&hello.config).unwrap();
    assert_eq!(
        config,
        serde_json::json!({ "install-commands": ["make install"] })
    );
}

#[test]
fn test_includes_and_arches() {
    let dir = project(&[
        (
            "include/flags.yml",
            "variables:\n  flags: -O2\narches:\n  aarch64:\n    variables:\n      march: armv8-a",
        ),
        (
            "app.bst",
            r#"
kind: manual
include: include/flags.yml
config:
  build-commands: [make]
host-arches:
  x86_64:
    config:
      build-commands: [make check]
"#,
        ),
    ]);

    let app = load_with(
        options(&dir, "app.bst")
            .with_host_arch("x86_64")
            .with_target_arch("aarch64"),
    )
    .unwrap();

    assert_eq!(app.variables.get_string("flags").unwrap(), "-O2");
    assert_eq!(app.variables.get_string("march").unwrap(), "armv8-a");
    let commands = app.config.get("build-commands").unwrap();
    assert_eq!(commands.len(), 2);
    assert!(!app.config.contains_key("arches"));
}

#[test]
fn test_missing_dependency() {
    let dir = project(&[("app.bst", "kind: manual\ndepends:\n- missing.bst")]);

    let err = load(&dir, "app.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::MissingFile);
    assert_eq!(err.reason().code(), "missing-file");
    insta::assert_snapshot!(
        err.to_string(),
        @"app.bst [line 3 column 2]: Could not find file at path 'missing.bst'"
    );
}

#[test]
fn test_missing_target() {
    let dir = project(&[]);
    let err = load(&dir, "nope.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::MissingFile);
    assert_eq!(err.to_string(), "Could not find file at path 'nope.bst'");
}

#[test]
fn test_absolute_target_is_rejected() {
    let dir = project(&[("app.bst", "kind: manual")]);
    let absolute = dir.path().join("app.bst");
    let err = load(&dir, &absolute.to_string_lossy()).unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::InvalidData);
}

#[test]
fn test_malformed_dependency() {
    let dir = project(&[
        ("app.bst", "kind: manual\ndepends:\n- broken.bst"),
        ("broken.bst", "kind: [manual"),
    ]);

    let err = load(&dir, "app.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::InvalidYaml);
    assert!(err.message().starts_with("app.bst [line 3 column 2]: Failed to load 'broken.bst'"));
}

#[test]
fn test_document_must_be_a_mapping() {
    let dir = project(&[("app.bst", "- kind: manual")]);
    let err = load(&dir, "app.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::InvalidYaml);
}

#[test]
fn test_empty_document_needs_a_kind() {
    let dir = project(&[("app.bst", "# nothing here\n")]);
    let err = load(&dir, "app.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::InvalidData);
    insta::assert_snapshot!(
        err.to_string(),
        @"app.bst [line 1 column 0]: Dictionary did not contain expected key 'kind'"
    );
}

#[test]
fn test_conflicting_names() {
    let dir = project(&[
        ("one/lib.bst", "kind: manual"),
        ("two/lib.bst", "kind: manual"),
        ("app.bst", "kind: manual\ndepends:\n- one/lib.bst\n- two/lib.bst"),
    ]);

    let err = load(&dir, "app.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::ConflictingName);
    insta::assert_snapshot!(
        err.to_string(),
        @"app.bst [line 4 column 2]: Tried to load file 'two/lib.bst' but existing file 'one/lib.bst' has the same name"
    );
}

#[test]
fn test_same_file_through_different_spellings() {
    let dir = project(&[
        ("lib.bst", "kind: manual"),
        ("app.bst", "kind: manual\ndepends:\n- lib.bst\n- filename: ./lib.bst\n  type: build"),
    ]);

    let err = load(&dir, "app.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::InvalidData);
    assert!(err.message().contains("Duplicate dependency on 'lib'"));
}

#[test]
fn test_parent_components_name_the_same_file() {
    let dir = project(&[
        ("y.bst", "kind: manual"),
        ("b.bst", "kind: manual\ndepends:\n- y.bst"),
        ("app.bst", "kind: manual\ndepends:\n- sub/../y.bst\n- b.bst"),
    ]);

    let app = load(&dir, "app.bst").unwrap();
    assert_eq!(app.build_dependency_names(), vec!["y", "b"]);
    assert!(Arc::ptr_eq(
        &app.build_dependencies[0],
        &app.build_dependencies[1].build_dependencies[0]
    ));
}

#[test]
fn test_malformed_include() {
    let dir = project(&[
        ("frag.yml", "variables:\n  a: [unclosed"),
        ("app.bst", "kind: manual\ninclude: frag.yml"),
    ]);

    let err = load(&dir, "app.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::InvalidYaml);
    assert!(
        err.message()
            .starts_with("app.bst [line 2 column 9]: Failed to load 'frag.yml'")
    );
}

#[test]
fn test_circular_dependency() {
    let dir = project(&[
        ("a.bst", "kind: manual\ndepends:\n- b.bst"),
        ("b.bst", "kind: manual\ndepends:\n- a.bst"),
    ]);

    let err = load(&dir, "a.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::CircularDependency);
    insta::assert_snapshot!(
        err.to_string(),
        @"b.bst [line 3 column 2]: Circular dependency detected at element 'a': a -> b -> a"
    );
}

#[test]
fn test_self_dependency() {
    let dir = project(&[("a.bst", "kind: manual\ndepends:\n- a.bst")]);

    let err = load(&dir, "a.bst").unwrap_err();
    assert_eq!(err.reason(), LoadErrorReason::CircularDependency);
}

#[test]
fn test_diamond_is_not_circular() {
    let dir = project(&[
        ("d.bst", "kind: manual"),
        ("b.bst", "kind: manual\ndepends:\n- d.bst"),
        ("c.bst", "kind: manual\ndepends:\n- d.bst"),
        ("a.bst", "kind: manual\ndepends:\n- b.bst\n- c.bst\n- d.bst"),
    ]);

    let a = load(&dir, "a.bst").unwrap();
    assert_eq!(a.build_dependency_names(), vec!["d", "b", "c"]);
}
