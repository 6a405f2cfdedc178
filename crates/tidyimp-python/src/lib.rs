// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A lossless Python statement parser and scope analyzer.
//!
//! This crate parses Python source into a sequence of top-level statements
//! that round-trips byte-for-byte, and analyzes name usage to find free
//! (undefined) identifiers and unused imports.
//!
//! # Parsing
//!
//! ```
//! use tidyimp_python::Block;
//!
//! let block = Block::parse_str("import os\n\nprint(os.getcwd())\n").unwrap();
//! assert!(block.statements()[0].is_import());
//! // Losslessness: concatenating statement slices reproduces the input.
//! let joined: String = block
//!     .statements()
//!     .iter()
//!     .map(|s| block.stmt_text(s))
//!     .collect();
//! assert_eq!(joined, "import os\n\nprint(os.getcwd())\n");
//! ```
//!
//! # Scope analysis
//!
//! ```
//! use tidyimp_python::{analyze, Block};
//!
//! let block = Block::parse_str("import os, sys\nprint(os.getcwd())\n").unwrap();
//! let analysis = analyze(&block);
//! assert_eq!(analysis.unused.len(), 1);
//! assert_eq!(analysis.unused[0].name, "sys");
//! assert!(analysis.missing.is_empty());
//! ```

pub mod block;
pub mod scope;
pub mod tokenizer;

pub use block::{Block, ImportInfo, ImportedName, Statement, StatementKind, SyntaxError};
pub use scope::{analyze, analyze_with, Analysis, AnalysisOptions, MissingName, UnusedImport};
pub use tokenizer::{tokenize, TokError, TokKind, Token};
