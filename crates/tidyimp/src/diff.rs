// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Unified diff generation.
//!
//! Import rewriting edits one contiguous region near the top of a file,
//! so the diff is computed by trimming the common prefix and suffix lines
//! and emitting a single hunk with context.

const CONTEXT: usize = 3;

/// Generate a unified diff between two texts.
///
/// Returns an empty string when the texts are equal.
pub fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    if old == new {
        return String::new();
    }
    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

    let mut prefix = 0usize;
    while prefix < old_lines.len()
        && prefix < new_lines.len()
        && old_lines[prefix] == new_lines[prefix]
    {
        prefix += 1;
    }
    let mut suffix = 0usize;
    while suffix < old_lines.len() - prefix
        && suffix < new_lines.len() - prefix
        && old_lines[old_lines.len() - 1 - suffix] == new_lines[new_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let ctx_start = prefix.saturating_sub(CONTEXT);
    let old_changed_end = old_lines.len() - suffix;
    let new_changed_end = new_lines.len() - suffix;
    let old_ctx_end = (old_changed_end + CONTEXT).min(old_lines.len());
    let new_ctx_end = (new_changed_end + CONTEXT).min(new_lines.len());

    let old_count = old_ctx_end - ctx_start;
    let new_count = new_ctx_end - ctx_start;

    let mut out = String::new();
    out.push_str(&format!("--- {}\n", old_label));
    out.push_str(&format!("+++ {}\n", new_label));
    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        ctx_start + 1,
        old_count,
        ctx_start + 1,
        new_count
    ));
    for line in &old_lines[ctx_start..prefix] {
        push_line(&mut out, ' ', line);
    }
    for line in &old_lines[prefix..old_changed_end] {
        push_line(&mut out, '-', line);
    }
    for line in &new_lines[prefix..new_changed_end] {
        push_line(&mut out, '+', line);
    }
    for line in &old_lines[old_changed_end..old_ctx_end] {
        push_line(&mut out, ' ', line);
    }
    out
}

fn push_line(out: &mut String, marker: char, line: &str) {
    out.push(marker);
    if let Some(stripped) = line.strip_suffix('\n') {
        out.push_str(stripped);
        out.push('\n');
    } else {
        out.push_str(line);
        out.push_str("\n\\ No newline at end of file\n");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_texts_produce_empty_diff() {
        assert_eq!(unified_diff("a\nb\n", "a\nb\n", "a.py", "b.py"), "");
    }

    #[test]
    fn simple_change() {
        let diff = unified_diff("import os, sys\nx = 1\n", "import os\nx = 1\n", "a/f.py", "b/f.py");
        assert!(diff.starts_with("--- a/f.py\n+++ b/f.py\n"));
        assert!(diff.contains("-import os, sys\n"));
        assert!(diff.contains("+import os\n"));
        assert!(diff.contains(" x = 1\n"));
    }

    #[test]
    fn hunk_header_counts() {
        let diff = unified_diff("a\nb\nc\n", "a\nB\nc\n", "x", "y");
        assert!(diff.contains("@@ -1,3 +1,3 @@\n"), "got: {}", diff);
    }

    #[test]
    fn context_is_limited() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\nnine\n10\n";
        let new = "1\n2\n3\n4\n5\n6\n7\n8\nNINE\n10\n";
        let diff = unified_diff(old, new, "x", "y");
        // Three lines of context before the change; the early lines are
        // not included.
        assert!(!diff.contains(" 5\n"));
        assert!(diff.contains(" 6\n"));
        assert!(diff.contains("-nine\n"));
        assert!(diff.contains("+NINE\n"));
    }

    #[test]
    fn missing_terminal_newline_marked() {
        let diff = unified_diff("a\nb", "a\nc", "x", "y");
        assert!(diff.contains("\\ No newline at end of file\n"));
    }
}
