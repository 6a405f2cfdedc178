// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Unified error type and exit-code mapping.
//!
//! ## Exit Code Mapping
//!
//! - `0`: success
//! - `1`: fatal error (unparseable source, I/O failure)
//! - `2`: usage error (owned by the argument parser)
//! - `100`: no changes were made but diagnostics were emitted

use std::path::PathBuf;

use thiserror::Error;
use tidyimp_core::FilePos;

/// Exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Fatal = 1,
    Usage = 2,
    /// No changes, but some diagnostics.
    Diagnostics = 100,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Unified error type for the import engine.
#[derive(Debug, Error)]
pub enum TidyError {
    /// Source could not be parsed; fatal to the current file.
    #[error("{}:{pos}: syntax error: {msg}", file_label(.file))]
    Syntax {
        file: Option<PathBuf>,
        pos: FilePos,
        msg: String,
    },

    /// A lookup the caller required to succeed failed.
    #[error("no such import: {0}")]
    NoSuchImport(String),

    /// A contributor file contained a malformed directive or rewrite rule.
    #[error("malformed import directive: {0}")]
    ImportFormat(String),

    /// A probe operation was needed but unavailable.
    #[error("import probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// Multiple known imports bind the same name.
    #[error("ambiguous import for {name}: candidates {candidates:?}")]
    AmbiguousImport {
        name: String,
        candidates: Vec<String>,
    },

    /// Tried to construct an import statement from non-import source.
    #[error("not an import statement: {0}")]
    NonImportStatement(String),

    /// An import set with conflicting bound names refused to render.
    #[error("conflicting imports: {0}")]
    ConflictingImports(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn file_label(file: &Option<PathBuf>) -> String {
    file.as_ref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string())
}

impl TidyError {
    /// Attach a filename to a syntax error produced without one.
    pub fn with_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            TidyError::Syntax { file: None, pos, msg } => TidyError::Syntax {
                file: Some(file.into()),
                pos,
                msg,
            },
            other => other,
        }
    }

    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::Fatal
    }
}

impl From<tidyimp_python::SyntaxError> for TidyError {
    fn from(err: tidyimp_python::SyntaxError) -> Self {
        TidyError::Syntax {
            file: None,
            pos: err.pos,
            msg: err.msg,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
