// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Automatic maintenance of Python import statements.
//!
//! tidyimp rewrites the import prologue of Python source files: it
//! reformats import statements, removes unused imports, adds known
//! imports for undefined names, enforces mandatory imports, and applies
//! canonical rename rules, preserving every byte it does not own.
//!
//! # Quick Start
//!
//! ```
//! use tidyimp::importdb::ImportDB;
//! use tidyimp::format::FormatParams;
//! use tidyimp::rewrite::{tidy_imports, CancelFlag, TidyOptions};
//! use tidyimp_core::FileText;
//!
//! let db = ImportDB::from_code("import re\n").unwrap();
//! let text = FileText::new("re.search('[a-z]+', 'hello')\n");
//! let result = tidy_imports(
//!     &text,
//!     &db,
//!     &FormatParams::default(),
//!     &TidyOptions::default(),
//!     &CancelFlag::new(),
//! )
//! .unwrap();
//! assert_eq!(result.output, "import re\n\nre.search('[a-z]+', 'hello')\n");
//! ```
//!
//! The heavy lifting lives in the sibling crates: `tidyimp-core` for
//! positions, text, and identifiers, and `tidyimp-python` for the
//! lossless parser and the scope analyzer.

pub mod cli;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod format;
pub mod importclns;
pub mod importdb;
pub mod importstmt;
pub mod output;
pub mod probe;
pub mod rewrite;

pub use diagnostics::{Diagnostic, Level};
pub use error::{ExitStatus, TidyError};
pub use format::{AlignImports, FormatParams, HangingIndent};
pub use importclns::{ImportMap, ImportSet};
pub use importdb::{DbCache, ImportDB};
pub use importstmt::{Import, ImportStatement};
pub use probe::{ImportProbe, NullProbe};
pub use rewrite::{
    canonicalize_imports, collect_imports, reformat_import_statements, remove_broken_imports,
    replace_star_imports, tidy_imports, transform_imports, CancelFlag, RemoveUnused, Rewritten,
    TidyOptions,
};
