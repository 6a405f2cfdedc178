// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Machine-readable run reports.
//!
//! With `--json`, the CLI emits one [`RunReport`] describing every
//! processed file: whether it changed, and the diagnostics produced.

use serde::Serialize;

use crate::diagnostics::Diagnostic;

/// Schema version for the JSON output.
pub const SCHEMA_VERSION: u32 = 1;

/// Report for one processed file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub changed: bool,
    pub cancelled: bool,
    /// Set when the file failed outright (syntax error, I/O error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn failed(file: String, error: String) -> Self {
        Self {
            file,
            changed: false,
            cancelled: false,
            error: Some(error),
            diagnostics: Vec::new(),
        }
    }
}

/// Report for a whole run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub files: Vec<FileReport>,
    pub ok: bool,
}

impl RunReport {
    pub fn new(files: Vec<FileReport>) -> Self {
        let ok = files.iter().all(|f| f.error.is_none());
        Self {
            schema_version: SCHEMA_VERSION,
            files,
            ok,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("report serialization cannot fail")
    }
}

// ============================================================================
// Tests
// ============================================================================
