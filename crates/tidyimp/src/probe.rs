// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The import probe interface.
//!
//! The rewriter never imports anything itself. Star-import expansion and
//! broken-import removal consult an [`ImportProbe`], an external
//! collaborator that answers semantic questions about importability. The
//! shipped [`NullProbe`] answers "unavailable" for everything, which makes
//! those passes diagnostics-only no-ops; a runtime-linked probe may give
//! real answers.

use tidyimp_core::DottedName;

use crate::importclns::ImportSet;
use crate::importstmt::Import;

/// Answers semantic questions about importability.
pub trait ImportProbe {
    /// The public names `module` exposes, as the import set that a star
    /// import of it would bring in, or `None` when the question cannot be
    /// answered.
    fn exports(&self, module: &DottedName) -> Option<ImportSet>;

    /// Whether importing `imp` would succeed in the intended environment,
    /// or `None` when the question cannot be answered.
    fn resolves(&self, imp: &Import) -> Option<bool>;
}

/// A probe that cannot answer anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProbe;

impl ImportProbe for NullProbe {
    fn exports(&self, _module: &DottedName) -> Option<ImportSet> {
        None
    }

    fn resolves(&self, _imp: &Import) -> Option<bool> {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_probe_answers_nothing() {
        let probe = NullProbe;
        assert!(probe.exports(&"os".parse().unwrap()).is_none());
        let imp = Import::parse("import os").unwrap();
        assert!(probe.resolves(&imp).is_none());
    }
}
