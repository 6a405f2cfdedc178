// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! End-to-end rewriting scenarios.
//!
//! Each test drives a full pass over realistic module text and checks the
//! exact output, plus the idempotence property: running any pass twice
//! must produce byte-identical output.

use tidyimp::format::FormatParams;
use tidyimp::importclns::{ImportMap, ImportSet};
use tidyimp::importdb::ImportDB;
use tidyimp::importstmt::Import;
use tidyimp::probe::{ImportProbe, NullProbe};
use tidyimp::rewrite::{
    reformat_import_statements, replace_star_imports, tidy_imports, transform_imports, CancelFlag,
    TidyOptions,
};
use tidyimp_core::{DottedName, FileText};

fn tidy_with(src: &str, db: &ImportDB) -> tidyimp::rewrite::Rewritten {
    tidy_imports(
        &FileText::new(src),
        db,
        &FormatParams::default(),
        &TidyOptions::default(),
        &CancelFlag::new(),
    )
    .unwrap()
}

/// Scenario: tidy with a mandatory `print_function` adds the future
/// import; without it, only the unused import is removed.
#[test]
fn tidy_unused_and_mandatory_future() {
    let src = "import os, sys\nprint(os.getcwd())\n";

    let db = ImportDB::from_code(
        "__mandatory_imports__ = ['from __future__ import print_function']\n",
    )
    .unwrap();
    let out = tidy_with(src, &db);
    assert_eq!(
        out.output,
        "from __future__ import print_function\n\nimport os\n\nprint(os.getcwd())\n"
    );

    let out = tidy_with(src, &ImportDB::empty());
    assert_eq!(out.output, "import os\n\nprint(os.getcwd())\n");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.message.contains("removed unused 'import sys'")));
}

/// Scenario: a known database supplies `import re` for a bare `re.search`
/// usage.
#[test]
fn tidy_adds_known_import() {
    let db =
        ImportDB::from_code("from numpy import arange\nimport re\n").unwrap();
    let out = tidy_with("re.search(\"[a-z]+\", \"....hello...\")\n", &db);
    assert_eq!(
        out.output,
        "import re\n\nre.search(\"[a-z]+\", \"....hello...\")\n"
    );
}

/// Scenario: star imports are replaced by the probe's exports, sorted,
/// one alias per line when over the wrap width.
#[test]
fn replace_star_with_probed_exports() {
    struct Probe;
    impl ImportProbe for Probe {
        fn exports(&self, module: &DottedName) -> Option<ImportSet> {
            (module.to_string() == "foo.bar")
                .then(|| ImportSet::parse("from foo.bar import c, a, b\n").unwrap())
        }
        fn resolves(&self, _imp: &Import) -> Option<bool> {
            None
        }
    }

    let out = replace_star_imports(
        &FileText::new("from foo.bar import *\n"),
        &Probe,
        &FormatParams::default(),
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(out.output, "from foo.bar import (a, b, c)\n");

    // Over the wrap width: hanging indent, one alias per line.
    let narrow = FormatParams {
        max_line_length: 24,
        ..FormatParams::default()
    };
    let out = replace_star_imports(
        &FileText::new("from foo.bar import *\n"),
        &Probe,
        &narrow,
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(
        out.output,
        "from foo.bar import (a,\n    b,\n    c,\n    )\n"
    );
}

/// Scenario: transforming `numpy` to `numpy2` preserves the bound name so
/// the code body keeps working untouched.
#[test]
fn transform_preserves_references() {
    let map = ImportMap::from_pairs([("numpy".to_string(), "numpy2".to_string())]).unwrap();
    let out = transform_imports(
        &FileText::new("import numpy\nnumpy.arange(3)\n"),
        &map,
        &FormatParams::default(),
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(out.output, "import numpy2 as numpy\n\nnumpy.arange(3)\n");
}

/// Scenario: two identically named candidates and no preference leave the
/// name missing with an error-level diagnostic.
#[test]
fn ambiguous_candidates_stay_missing() {
    let db = ImportDB::from_code("from numpy import arange\nfrom pylab import arange\n").unwrap();
    let out = tidy_with("arange(3)\n", &db);
    assert_eq!(out.output, "arange(3)\n");
    assert!(!out.changed);
    assert!(out.has_errors());
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.message.contains("ambiguous name \"arange\"")));
}

/// Scenario: shebang, docstring, and blank line ahead of the imports are
/// preserved verbatim in their original positions.
#[test]
fn shebang_and_docstring_preserved() {
    let src = "#!/usr/bin/env python\n\"\"\"A docstring.\"\"\"\n\nimport sys\nimport os\n\nprint(os.path, sys.argv)\n";
    let out = reformat_import_statements(
        &FileText::new(src),
        &FormatParams::default(),
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(
        out.output,
        "#!/usr/bin/env python\n\"\"\"A docstring.\"\"\"\n\nimport os\nimport sys\n\nprint(os.path, sys.argv)\n"
    );
}

/// Idempotence: for a fixed (params, db, probe) triple, applying a pass
/// to its own output is the identity.
#[test]
fn passes_are_idempotent() {
    let sources = [
        "import os, sys\nprint(os.getcwd())\n",
        "#!/x\n'''doc'''\nimport b\nimport a\n\nuse(a, b)\n",
        "from m import x, y\nfrom m import z\nx, y, z\n",
        "import dead\n",
        "print('no imports at all')\n",
        "from pkg import *\n",
    ];
    let db = ImportDB::from_code(
        "import re\n__mandatory_imports__ = ['from __future__ import division']\n",
    )
    .unwrap();
    let params = FormatParams::default();
    for src in sources {
        let once = tidy_with(src, &db);
        let twice = tidy_with(&once.output, &db);
        assert_eq!(twice.output, once.output, "tidy not idempotent for {:?}", src);

        let once = reformat_import_statements(
            &FileText::new(src),
            &params,
            &CancelFlag::new(),
        )
        .unwrap();
        let twice = reformat_import_statements(
            &FileText::new(once.output.as_str()),
            &params,
            &CancelFlag::new(),
        )
        .unwrap();
        assert_eq!(
            twice.output, once.output,
            "reformat not idempotent for {:?}",
            src
        );
    }
}

/// Sort stability: pretty-printing is a pure function of the set, not of
/// insertion order.
#[test]
fn pretty_print_is_insertion_order_independent() {
    let a = ImportSet::parse("import zz\nfrom mm import x\nimport aa\n").unwrap();
    let b = ImportSet::parse("import aa\nimport zz\nfrom mm import x\n").unwrap();
    let params = FormatParams::default();
    assert_eq!(
        a.pretty_print(&params, false).unwrap(),
        b.pretty_print(&params, false).unwrap()
    );
}

/// The null probe leaves star imports alone, with a diagnostic.
#[test]
fn null_probe_star_is_left_with_diagnostic() {
    let out = replace_star_imports(
        &FileText::new("from foo.bar import *\n"),
        &NullProbe,
        &FormatParams::default(),
        &CancelFlag::new(),
    )
    .unwrap();
    assert!(!out.changed);
    assert_eq!(out.output, "from foo.bar import *\n");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.message.contains("couldn't enumerate exports")));
}

/// Cancellation returns the input unmodified and signals cancelled.
#[test]
fn cancellation_is_clean() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let out = tidy_imports(
        &FileText::new("import os, sys\n"),
        &ImportDB::empty(),
        &FormatParams::default(),
        &TidyOptions::default(),
        &cancel,
    )
    .unwrap();
    assert!(out.cancelled);
    assert_eq!(out.output, "import os, sys\n");
}

/// A syntax error aborts the file with a position.
#[test]
fn syntax_error_is_fatal_with_position() {
    let err = tidy_imports(
        &FileText::with_filename("x = 'oops\n", "bad.py"),
        &ImportDB::empty(),
        &FormatParams::default(),
        &TidyOptions::default(),
        &CancelFlag::new(),
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("bad.py:1:"), "got {:?}", msg);
}
