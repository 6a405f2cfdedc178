// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Structured diagnostics.
//!
//! Diagnostics are warnings and notices produced while rewriting; they
//! never abort a file. They render as `<file>:<line>:<col>: <level>:
//! <msg>` lines for stderr and serialize for the JSON report.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic line.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    #[serde(skip)]
    pub file: Option<PathBuf>,
    pub line: usize,
    pub col: usize,
    pub level: Level,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: Option<&Path>,
        line: usize,
        col: usize,
        level: Level,
        message: impl Into<String>,
    ) -> Self {
        let d = Self {
            file: file.map(Path::to_path_buf),
            line,
            col,
            level,
            message: message.into(),
        };
        // Mirror into the tracing stream for library consumers.
        match level {
            Level::Info => info!("{}", d),
            Level::Warning | Level::Error => warn!("{}", d),
        }
        d
    }

    pub fn info(file: Option<&Path>, line: usize, message: impl Into<String>) -> Self {
        Self::new(file, line, 1, Level::Info, message)
    }

    pub fn warning(file: Option<&Path>, line: usize, message: impl Into<String>) -> Self {
        Self::new(file, line, 1, Level::Warning, message)
    }

    pub fn error(file: Option<&Path>, line: usize, message: impl Into<String>) -> Self {
        Self::new(file, line, 1, Level::Error, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".to_string());
        write!(
            f,
            "{}:{}:{}: {}: {}",
            file, self.line, self.col, self.level, self.message
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
