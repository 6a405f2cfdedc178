// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! `__future__` compiler flags.
//!
//! A [`CompilerFlags`] value is the union of the future directives declared
//! by a block's `from __future__ import ...` statements. Callers may require
//! an additional set (e.g. a mandatory `print_function`).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// The recognized `__future__` feature names, in declaration order.
const FEATURES: &[&str] = &[
    "nested_scopes",
    "generators",
    "division",
    "absolute_import",
    "with_statement",
    "print_function",
    "unicode_literals",
    "barry_as_FLUFL",
    "generator_stop",
    "annotations",
];

/// A bitset over the finite set of `__future__` directives.
///
/// # Example
///
/// ```
/// use tidyimp_core::CompilerFlags;
///
/// let f = CompilerFlags::from_name("division").unwrap()
///     | CompilerFlags::from_name("annotations").unwrap();
/// assert!(f.contains(CompilerFlags::from_name("division").unwrap()));
/// assert_eq!(f.names(), vec!["division", "annotations"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompilerFlags(u16);

impl CompilerFlags {
    /// The empty flag set.
    pub const EMPTY: CompilerFlags = CompilerFlags(0);

    /// Look up a flag by `__future__` feature name.
    pub fn from_name(name: &str) -> Option<Self> {
        FEATURES
            .iter()
            .position(|&f| f == name)
            .map(|i| CompilerFlags(1 << i))
    }

    /// Whether a string names a recognized future feature.
    pub fn is_feature_name(name: &str) -> bool {
        FEATURES.contains(&name)
    }

    /// Union of any number of flag sets.
    pub fn union<I: IntoIterator<Item = CompilerFlags>>(flags: I) -> Self {
        flags.into_iter().fold(Self::EMPTY, |a, b| a | b)
    }

    /// Whether every flag in `other` is also set in `self`.
    pub fn contains(self, other: CompilerFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flags are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The feature names set in this value, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        FEATURES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, &name)| name)
            .collect()
    }
}

impl BitOr for CompilerFlags {
    type Output = CompilerFlags;

    fn bitor(self, rhs: Self) -> Self {
        CompilerFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for CompilerFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CompilerFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompilerFlags({})", self.names().join("|"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_known() {
        assert!(CompilerFlags::from_name("print_function").is_some());
        assert!(CompilerFlags::from_name("annotations").is_some());
        assert!(CompilerFlags::from_name("not_a_feature").is_none());
    }

    #[test]
    fn union_and_contains() {
        let div = CompilerFlags::from_name("division").unwrap();
        let ann = CompilerFlags::from_name("annotations").unwrap();
        let both = div | ann;
        assert!(both.contains(div));
        assert!(both.contains(ann));
        assert!(!div.contains(both));
        assert_eq!(CompilerFlags::union([div, ann, div]), both);
    }

    #[test]
    fn empty() {
        assert!(CompilerFlags::EMPTY.is_empty());
        assert!(CompilerFlags::EMPTY.names().is_empty());
        assert!(!CompilerFlags::from_name("division").unwrap().is_empty());
    }

    #[test]
    fn names_in_declaration_order() {
        let f = CompilerFlags::from_name("annotations").unwrap()
            | CompilerFlags::from_name("division").unwrap();
        assert_eq!(f.names(), vec!["division", "annotations"]);
    }
}
