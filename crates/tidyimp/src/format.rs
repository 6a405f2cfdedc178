// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Formatting parameters and the line-filling engine.

/// How the `import` keyword of from-imports is aligned within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignImports {
    /// A single space after the module name.
    #[default]
    Off,
    /// Align at the next tab stop (multiple of 8) after the longest
    /// `from M` in the group.
    TabStop,
    /// Align at a fixed column.
    Column(usize),
}

/// Multi-line layout for from-imports that do not fit on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HangingIndent {
    /// Hanging indent when wrapping is needed.
    #[default]
    Auto,
    /// Pack aliases under the open paren column.
    Never,
    /// Always use the hanging form for multi-alias from-imports.
    Always,
}

/// Formatting configuration for rendering import statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatParams {
    pub align_imports: AlignImports,
    /// Minimum spaces between `from` and the module name. At least 1.
    pub from_spaces: usize,
    /// Whether plain imports and from-imports form distinct groups.
    pub separate_from_imports: bool,
    /// Whether `from __future__` imports participate in alignment.
    pub align_future: bool,
    pub hanging_indent: HangingIndent,
    /// Target wrap width.
    pub max_line_length: usize,
    /// Column for continuation lines inside parentheses.
    pub indent_continuation: usize,
    /// Always parenthesize multi-import from statements.
    pub use_parens: bool,
}

impl Default for FormatParams {
    fn default() -> Self {
        Self {
            align_imports: AlignImports::Off,
            from_spaces: 1,
            separate_from_imports: true,
            align_future: false,
            hanging_indent: HangingIndent::Auto,
            max_line_length: 79,
            indent_continuation: 4,
            use_parens: true,
        }
    }
}

impl FormatParams {
    pub fn from_spaces(&self) -> usize {
        self.from_spaces.max(1)
    }
}

/// Fill `tokens` after `prefix` into at most `max_line_length`-wide lines.
///
/// Used for the packed (non-hanging) parenthesized form: continuation lines
/// are aligned under the character after the open paren.
///
/// ```text
/// from foo import (abc, defgh,
///                  ijkl, mnopq,
///                  rst)
/// ```
pub fn fill_packed(prefix: &str, tokens: &[String], max_line_length: usize) -> String {
    debug_assert!(!tokens.is_empty());
    let open_prefix = format!("{}(", prefix);
    let cont_prefix = " ".repeat(open_prefix.len());
    let mut lines: Vec<String> = vec![format!("{}{}", open_prefix, tokens[0])];
    for (k, token) in tokens.iter().enumerate().skip(1) {
        let is_last = k == tokens.len() - 1;
        let suffix = if is_last { ")" } else { "" };
        let current = lines.last_mut().expect("at least one line");
        if current.len() + 2 + token.len() + suffix.len() <= max_line_length {
            current.push_str(", ");
            current.push_str(token);
        } else {
            current.push(',');
            lines.push(format!("{}{}", cont_prefix, token));
        }
    }
    let mut out = lines.join("\n");
    out.push_str(")\n");
    out
}

/// The hanging parenthesized form: first alias on the prefix line, one
/// alias per continuation line at `indent`, trailing commas, closing paren
/// on its own line.
///
/// ```text
/// from foo.bar import (a,
///     b,
///     c,
///     )
/// ```
pub fn fill_hanging(prefix: &str, tokens: &[String], indent: usize) -> String {
    debug_assert!(!tokens.is_empty());
    let pad = " ".repeat(indent);
    let mut out = format!("{}({},\n", prefix, tokens[0]);
    for token in &tokens[1..] {
        out.push_str(&pad);
        out.push_str(token);
        out.push_str(",\n");
    }
    out.push_str(&pad);
    out.push_str(")\n");
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let p = FormatParams::default();
        assert_eq!(p.max_line_length, 79);
        assert_eq!(p.from_spaces(), 1);
        assert_eq!(p.align_imports, AlignImports::Off);
        assert!(p.use_parens);
    }

    #[test]
    fn from_spaces_clamped() {
        let p = FormatParams {
            from_spaces: 0,
            ..FormatParams::default()
        };
        assert_eq!(p.from_spaces(), 1);
    }

    #[test]
    fn packed_fits_on_two_lines() {
        let out = fill_packed(
            "from foo import ",
            &toks(&["abc", "defgh", "ijkl", "mnopq", "rst"]),
            32,
        );
        assert_eq!(
            out,
            "from foo import (abc, defgh,\n                 ijkl, mnopq,\n                 rst)\n"
        );
    }

    #[test]
    fn hanging_one_per_line() {
        let out = fill_hanging("from foo.bar import ", &toks(&["a", "b", "c"]), 4);
        assert_eq!(out, "from foo.bar import (a,\n    b,\n    c,\n    )\n");
    }
}
