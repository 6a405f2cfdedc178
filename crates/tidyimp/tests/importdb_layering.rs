// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Database layering over real directory trees.

use std::fs;
use std::path::Path;

use tidyimp::importdb::{contributor_files, resolve_path_spec, ImportDB};

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn known(db: &ImportDB) -> Vec<String> {
    db.known_imports.iter().map(|i| i.to_string()).collect()
}

#[test]
fn directory_contributors_in_sorted_order() {
    let tmp = tempfile::tempdir().unwrap();
    // b.py forgets what a.py contributed; c.py re-adds it. Sorted
    // traversal makes the layering deterministic.
    write(&tmp.path().join("a.py"), "import alpha\nimport beta\n");
    write(&tmp.path().join("b.py"), "__forget_imports__ = ['import alpha']\n");
    write(&tmp.path().join("c.py"), "import alpha\n");
    let files = contributor_files(&[tmp.path().to_path_buf()]);
    let db = ImportDB::from_files(&files).unwrap();
    assert_eq!(known(&db), ["import alpha", "import beta"]);
}

#[test]
fn forget_only_subtracts_earlier_layers() {
    let tmp = tempfile::tempdir().unwrap();
    write(&tmp.path().join("a.py"), "import alpha\n");
    write(&tmp.path().join("b.py"), "__forget_imports__ = ['import alpha']\n");
    let files = contributor_files(&[tmp.path().to_path_buf()]);
    let db = ImportDB::from_files(&files).unwrap();
    assert!(known(&db).is_empty());
    assert_eq!(db.forget_imports.len(), 1);
}

#[test]
fn nested_directories_are_recursed() {
    let tmp = tempfile::tempdir().unwrap();
    write(&tmp.path().join("top.py"), "import top\n");
    write(&tmp.path().join("nested/deep.py"), "import deep\n");
    let files = contributor_files(&[tmp.path().to_path_buf()]);
    let db = ImportDB::from_files(&files).unwrap();
    assert_eq!(known(&db), ["import deep", "import top"]);
}

#[test]
fn multiple_roots_layer_left_to_right() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    write(
        &first.path().join("base.py"),
        "import shared\n__canonical_imports__ = {'old.name': 'first.name'}\n",
    );
    write(
        &second.path().join("site.py"),
        "__forget_imports__ = ['import shared']\n__canonical_imports__ = {'old.name': 'second.name'}\n",
    );
    let mut files = contributor_files(&[first.path().to_path_buf()]);
    files.extend(contributor_files(&[second.path().to_path_buf()]));
    let db = ImportDB::from_files(&files).unwrap();
    assert!(known(&db).is_empty());
    assert_eq!(
        db.canonical_imports
            .get(&"old.name".parse().unwrap())
            .unwrap()
            .to_string(),
        "second.name"
    );
}

#[test]
fn ancestor_walk_finds_project_database() {
    let tmp = tempfile::tempdir().unwrap();
    let project = tmp.path().join("project");
    let src_dir = project.join("src");
    fs::create_dir_all(&src_dir).unwrap();
    write(
        &project.join(".tidyimp/imports.py"),
        "import projectlib\n",
    );
    let target = src_dir.join("module.py");
    let roots = resolve_path_spec(Some(".../.tidyimp"), &target).unwrap();
    let files = contributor_files(&roots);
    let db = ImportDB::from_files(&files).unwrap();
    assert_eq!(known(&db), ["import projectlib"]);
}

#[test]
fn shallower_layer_can_forget_deeper_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let project = tmp.path().join("project");
    let src_dir = project.join("src");
    fs::create_dir_all(&src_dir).unwrap();
    // Ancestors are walked deepest to shallowest, so the directory
    // database loads before the project one; the project-level forget
    // then subtracts the directory-level entry.
    write(&src_dir.join(".tidyimp/db.py"), "import inner\n");
    write(
        &project.join(".tidyimp/db.py"),
        "__forget_imports__ = ['import inner']\nimport outer\n",
    );
    let target = src_dir.join("module.py");
    let roots = resolve_path_spec(Some(".../.tidyimp"), &target).unwrap();
    let files = contributor_files(&roots);
    let db = ImportDB::from_files(&files).unwrap();
    assert_eq!(known(&db), ["import outer"]);
}

#[test]
fn vanished_contributor_is_absent() {
    let tmp = tempfile::tempdir().unwrap();
    write(&tmp.path().join("a.py"), "import alpha\n");
    let mut files = contributor_files(&[tmp.path().to_path_buf()]);
    files.push(tmp.path().join("gone-by-now.py"));
    let db = ImportDB::from_files(&files).unwrap();
    assert_eq!(known(&db), ["import alpha"]);
}

#[test]
fn empty_spec_yields_empty_database() {
    let roots = resolve_path_spec(Some("EMPTY"), Path::new(".")).unwrap();
    assert!(roots.is_empty());
    let db = ImportDB::from_files(&contributor_files(&roots)).unwrap();
    assert!(db.known_imports.is_empty());
    assert!(db.mandatory_imports.is_empty());
}
