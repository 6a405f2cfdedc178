// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Python identifier validity and dotted names.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Python keywords. Soft keywords (`match`, `case`, `type`, `_`) are valid
/// identifiers and are not listed here.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Whether `s` is a Python keyword.
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.binary_search(&s).is_ok()
}

/// Whether `s` is a valid (non-keyword) Python identifier.
///
/// # Example
///
/// ```
/// use tidyimp_core::is_identifier;
///
/// assert!(is_identifier("foo"));
/// assert!(is_identifier("_f00"));
/// assert!(!is_identifier("foo+bar"));
/// assert!(!is_identifier("from"));
/// assert!(!is_identifier(""));
/// ```
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }
    !is_keyword(s)
}

/// Whether `s` is a valid dotted identifier such as `os.path.join`.
pub fn is_dotted_identifier(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

/// Error for strings that do not form a valid dotted name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid dotted name {0:?}")]
pub struct BadDottedNameError(pub String);

/// An ordered sequence of one or more identifier atoms, e.g. `os.path.join`.
///
/// Round-trips through its dotted string form. The final atom may be `"*"`,
/// which is how a star import's member is carried.
///
/// # Example
///
/// ```
/// use tidyimp_core::DottedName;
///
/// let name: DottedName = "os.path.join".parse().unwrap();
/// assert_eq!(name.to_string(), "os.path.join");
/// let prefixes: Vec<String> = name.prefixes().map(|p| p.to_string()).collect();
/// assert_eq!(prefixes, ["os", "os.path", "os.path.join"]);
/// assert!(name.startswith(&"os.path".parse().unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DottedName {
    parts: Vec<String>,
}

impl DottedName {
    /// Build from atom parts. Fails if any part is not a valid identifier
    /// (a final `"*"` atom is allowed).
    pub fn from_parts<I, S>(parts: I) -> Result<Self, BadDottedNameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() {
            return Err(BadDottedNameError(String::new()));
        }
        let last = parts.len() - 1;
        for (i, p) in parts.iter().enumerate() {
            let ok = is_identifier(p) || (i == last && p == "*");
            if !ok {
                return Err(BadDottedNameError(parts.join(".")));
            }
        }
        Ok(Self { parts })
    }

    /// The atoms of this name.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Always false; a dotted name has at least one atom.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The first atom.
    pub fn first(&self) -> &str {
        &self.parts[0]
    }

    /// The final atom.
    pub fn last(&self) -> &str {
        &self.parts[self.parts.len() - 1]
    }

    /// The name without its final atom, or `None` for a single atom.
    pub fn parent(&self) -> Option<DottedName> {
        if self.parts.len() > 1 {
            Some(DottedName {
                parts: self.parts[..self.parts.len() - 1].to_vec(),
            })
        } else {
            None
        }
    }

    /// Yield `a`, `a.b`, `a.b.c` for the name `a.b.c`.
    pub fn prefixes(&self) -> impl Iterator<Item = DottedName> + '_ {
        (1..=self.parts.len()).map(move |i| DottedName {
            parts: self.parts[..i].to_vec(),
        })
    }

    /// Whether `other` is a (non-strict) prefix of this name.
    pub fn startswith(&self, other: &DottedName) -> bool {
        self.parts.len() >= other.parts.len() && self.parts[..other.parts.len()] == other.parts
    }

    /// This name with `suffix` appended.
    pub fn join(&self, suffix: &DottedName) -> DottedName {
        let mut parts = self.parts.clone();
        parts.extend(suffix.parts.iter().cloned());
        DottedName { parts }
    }

    /// Replace the leading `prefix` atoms with `replacement`, if this name
    /// starts with `prefix`. Returns `None` when the prefix does not match.
    pub fn replace_prefix(&self, prefix: &DottedName, replacement: &DottedName) -> Option<Self> {
        if !self.startswith(prefix) {
            return None;
        }
        let mut parts = replacement.parts.clone();
        parts.extend(self.parts[prefix.parts.len()..].iter().cloned());
        Some(DottedName { parts })
    }
}

impl FromStr for DottedName {
    type Err = BadDottedNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_parts(s.split('.'))
    }
}

impl fmt::Display for DottedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> DottedName {
        s.parse().unwrap()
    }

    mod identifier_checks {
        use super::*;

        #[test]
        fn accepts_plain_names() {
            assert!(is_identifier("foo"));
            assert!(is_identifier("_private"));
            assert!(is_identifier("x2"));
        }

        #[test]
        fn rejects_keywords_and_junk() {
            assert!(!is_identifier("import"));
            assert!(!is_identifier("yield"));
            assert!(!is_identifier("2x"));
            assert!(!is_identifier("a-b"));
            assert!(!is_identifier(""));
        }

        #[test]
        fn soft_keywords_are_identifiers() {
            assert!(is_identifier("match"));
            assert!(is_identifier("case"));
            assert!(is_identifier("type"));
        }

        #[test]
        fn dotted() {
            assert!(is_dotted_identifier("foo.bar"));
            assert!(!is_dotted_identifier("foo..bar"));
            assert!(!is_dotted_identifier("foo.from"));
            assert!(!is_dotted_identifier("foo.bar."));
        }

        #[test]
        fn keyword_table_is_sorted() {
            let mut sorted = KEYWORDS.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, KEYWORDS);
        }
    }

    mod dotted_name {
        use super::*;

        #[test]
        fn roundtrip() {
            for s in ["a", "a.b.c", "os.path.join"] {
                assert_eq!(name(s).to_string(), s);
            }
        }

        #[test]
        fn rejects_invalid() {
            assert!("".parse::<DottedName>().is_err());
            assert!("a..b".parse::<DottedName>().is_err());
            assert!("a.class".parse::<DottedName>().is_err());
            assert!("*.a".parse::<DottedName>().is_err());
        }

        #[test]
        fn star_allowed_as_final_atom() {
            let n = name("foo.bar.*");
            assert_eq!(n.last(), "*");
        }

        #[test]
        fn prefixes() {
            let got: Vec<String> = name("aa.bb.cc").prefixes().map(|p| p.to_string()).collect();
            assert_eq!(got, ["aa", "aa.bb", "aa.bb.cc"]);
        }

        #[test]
        fn startswith() {
            assert!(name("a.b.c").startswith(&name("a.b")));
            assert!(name("a.b").startswith(&name("a.b")));
            assert!(!name("a.bb").startswith(&name("a.b")));
            assert!(!name("a").startswith(&name("a.b")));
        }

        #[test]
        fn replace_prefix() {
            assert_eq!(
                name("aa.bb.cc").replace_prefix(&name("aa.bb"), &name("xx.yy")),
                Some(name("xx.yy.cc"))
            );
            assert_eq!(name("aa.bb").replace_prefix(&name("zz"), &name("xx")), None);
        }

        #[test]
        fn parent() {
            assert_eq!(name("a.b.c").parent(), Some(name("a.b")));
            assert_eq!(name("a").parent(), None);
        }
    }
}
