// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Source-to-source rewriting of the import prologue.
//!
//! The import prologue is the maximal leading region of a file made of
//! shebang, comments, blank lines, the module docstring, and top-level
//! import statements. It is the only region these passes edit; everything
//! else is preserved byte-for-byte. A comment line between imports ends
//! the prologue, so comments are never destroyed by the splice.
//!
//! Every pass is a linear parse -> analyze -> modify -> render -> splice
//! pipeline, is idempotent, checks a caller-supplied cancellation flag,
//! and reports problems as diagnostics rather than failures wherever the
//! file can still be processed.
//!
//! Import statements carrying a `# noqa` pragma are retained verbatim by
//! every pass: they are never reformatted, removed, or rewritten.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tidyimp_core::FileText;
use tidyimp_python::{analyze, Block, Statement};

use crate::diagnostics::{Diagnostic, Level};
use crate::error::TidyError;
use crate::format::FormatParams;
use crate::importclns::{ImportMap, ImportSet};
use crate::importdb::ImportDB;
use crate::importstmt::{Import, ImportStatement};
use crate::probe::ImportProbe;

// ============================================================================
// Cancellation
// ============================================================================

/// A cooperative cancellation flag checked between pipeline phases.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Pass results
// ============================================================================

/// The outcome of one rewriting pass over one file.
#[derive(Debug, Clone)]
pub struct Rewritten {
    /// The transformed text; equal to the input when nothing changed or
    /// the pass was cancelled.
    pub output: String,
    pub changed: bool,
    pub cancelled: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Rewritten {
    fn unchanged(text: &FileText) -> Self {
        Self {
            output: text.as_str().to_string(),
            changed: false,
            cancelled: false,
            diagnostics: Vec::new(),
        }
    }

    fn cancelled(text: &FileText) -> Self {
        Self {
            cancelled: true,
            ..Self::unchanged(text)
        }
    }

    /// Whether any diagnostic is error-level.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == Level::Error)
    }
}

/// Policy for removing unused imports during tidy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveUnused {
    /// Remove, except in `__init__.py` and import-library files, which
    /// commonly re-export.
    #[default]
    Automatic,
    Always,
    Never,
}

/// Options for [`tidy_imports`].
#[derive(Debug, Clone)]
pub struct TidyOptions {
    pub add_missing: bool,
    pub remove_unused: RemoveUnused,
    pub add_mandatory: bool,
    pub canonicalize: bool,
}

impl Default for TidyOptions {
    fn default() -> Self {
        Self {
            add_missing: true,
            remove_unused: RemoveUnused::Automatic,
            add_mandatory: true,
            canonicalize: true,
        }
    }
}

// ============================================================================
// Prologue
// ============================================================================

#[derive(Debug, Clone)]
struct PrologueImport {
    import: Import,
    line: usize,
}

#[derive(Debug)]
struct Prologue {
    /// Byte range replaced by the rendered import block.
    splice_start: usize,
    splice_end: usize,
    /// Non-pragma imports in source order.
    imports: Vec<PrologueImport>,
    /// Verbatim statement bodies carrying `# noqa`, in source order.
    noqa_stmts: Vec<String>,
    /// Lines of noqa statements, so unused reports can be matched.
    noqa_lines: Vec<usize>,
}

fn trivia_has_comment(trivia: &str) -> bool {
    trivia.contains('#')
}

/// Bytes of leading all-whitespace lines in `trivia`.
fn leading_blank_len(trivia: &str) -> usize {
    let mut len = 0usize;
    for line in trivia.split_inclusive('\n') {
        if line.trim().is_empty() && line.ends_with('\n') {
            len += line.len();
        } else {
            break;
        }
    }
    len
}

fn find_prologue(block: &Block) -> Option<Prologue> {
    let stmts = block.statements();
    let mut i = 0usize;
    while i < stmts.len() && (stmts[i].is_trivia() || stmts[i].is_docstring()) {
        i += 1;
    }
    if i >= stmts.len() || !stmts[i].is_import() {
        return None;
    }
    let splice_start = stmts[i].body_start;
    let mut prologue = Prologue {
        splice_start,
        splice_end: stmts[i].end,
        imports: Vec::new(),
        noqa_stmts: Vec::new(),
        noqa_lines: Vec::new(),
    };
    let mut take = |stmt: &Statement, prologue: &mut Prologue| {
        let info = stmt.import_info().expect("caller checked is_import");
        if info.has_noqa {
            prologue.noqa_stmts.push(block.stmt_body(stmt).to_string());
            prologue.noqa_lines.push(info.line);
        } else {
            for import in ImportStatement::from_info(info).imports() {
                prologue.imports.push(PrologueImport {
                    import,
                    line: info.line,
                });
            }
        }
    };
    take(&stmts[i], &mut prologue);
    let mut j = i + 1;
    while j < stmts.len()
        && stmts[j].is_import()
        && !trivia_has_comment(block.stmt_trivia(&stmts[j]))
    {
        take(&stmts[j], &mut prologue);
        prologue.splice_end = stmts[j].end;
        j += 1;
    }
    // Blank lines after the last import belong to the region and get
    // normalized by the splice.
    if j < stmts.len() {
        prologue.splice_end += leading_blank_len(block.stmt_trivia(&stmts[j]));
    }
    Some(prologue)
}

/// Where a fresh import block goes when the file has none: before the
/// first statement that is not leading trivia or a docstring.
fn insertion_point(block: &Block) -> usize {
    for stmt in block.statements() {
        if !stmt.is_trivia() && !stmt.is_docstring() {
            return stmt.body_start;
        }
    }
    block.text().as_str().len()
}

fn render_block(
    prologue: Option<&Prologue>,
    set: &ImportSet,
    params: &FormatParams,
) -> Result<String, TidyError> {
    let mut out = String::new();
    if let Some(p) = prologue {
        for stmt in &p.noqa_stmts {
            out.push_str(stmt);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    if !set.is_empty() {
        out.push_str(&set.pretty_print(params, false)?);
    }
    Ok(out)
}

/// Replace `start..end` of `src` with `replacement`, separated from any
/// following content by one blank line. The source's terminal-newline
/// convention is preserved.
fn splice(src: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(src.len() + replacement.len());
    out.push_str(&src[..start]);
    out.push_str(replacement);
    if !replacement.is_empty() && end < src.len() {
        out.push('\n');
    }
    out.push_str(&src[end..]);
    if !src.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}

fn parse_source(text: &FileText) -> Result<Block, TidyError> {
    Block::parse(text.clone()).map_err(|err| {
        let err = TidyError::from(err);
        match text.filename() {
            Some(f) => err.with_file(f),
            None => err,
        }
    })
}

fn finish(text: &FileText, output: String, diagnostics: Vec<Diagnostic>) -> Rewritten {
    let changed = output != text.as_str();
    Rewritten {
        output,
        changed,
        cancelled: false,
        diagnostics,
    }
}

// ============================================================================
// reformat
// ============================================================================

/// Reformat the import prologue: deduplicate, merge, group, sort, align.
/// Imports deeper in the file are not touched.
pub fn reformat_import_statements(
    text: &FileText,
    params: &FormatParams,
    cancel: &CancelFlag,
) -> Result<Rewritten, TidyError> {
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let block = parse_source(text)?;
    let Some(prologue) = find_prologue(&block) else {
        return Ok(Rewritten::unchanged(text));
    };
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let set = ImportSet::from_imports(
        prologue.imports.iter().map(|e| e.import.clone()),
        true,
    );
    let rendered = render_block(Some(&prologue), &set, params)?;
    let output = splice(
        text.as_str(),
        prologue.splice_start,
        prologue.splice_end,
        &rendered,
    );
    Ok(finish(text, output, Vec::new()))
}

// ============================================================================
// tidy
// ============================================================================

/// The composite operation: reformat, remove unused imports, add known
/// imports for missing names, enforce mandatory imports, canonicalize.
pub fn tidy_imports(
    text: &FileText,
    db: &ImportDB,
    params: &FormatParams,
    options: &TidyOptions,
    cancel: &CancelFlag,
) -> Result<Rewritten, TidyError> {
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let block = parse_source(text)?;
    let analysis = analyze(&block);
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let file = text.filename();
    let prologue = find_prologue(&block);
    let entries: Vec<PrologueImport> = prologue
        .as_ref()
        .map(|p| p.imports.clone())
        .unwrap_or_default();
    let mut set = ImportSet::from_imports(entries.iter().map(|e| e.import.clone()), true);
    let mut diagnostics = Vec::new();

    let remove_unused = match options.remove_unused {
        RemoveUnused::Always => true,
        RemoveUnused::Never => false,
        RemoveUnused::Automatic => !is_reexport_file(file),
    };
    if remove_unused {
        for unused in &analysis.unused {
            let entry = entries
                .iter()
                .find(|e| e.line == unused.line && e.import.bound_name() == unused.name);
            let Some(entry) = entry else {
                if prologue
                    .as_ref()
                    .is_some_and(|p| p.noqa_lines.contains(&unused.line))
                {
                    continue;
                }
                diagnostics.push(Diagnostic::warning(
                    file,
                    unused.line,
                    format!(
                        "unused import {:?} is not in the import prologue; not removing it",
                        unused.name
                    ),
                ));
                continue;
            };
            if db.mandatory_imports.contains(&entry.import) {
                continue;
            }
            // An identical import on another line may be the one that is
            // actually used; the reformat dedup already collapses them.
            let duplicate_used = entries.iter().any(|other| {
                other.import == entry.import
                    && other.line != entry.line
                    && !analysis
                        .unused
                        .iter()
                        .any(|u| u.line == other.line && u.name == unused.name)
            });
            if duplicate_used {
                continue;
            }
            if set.contains(&entry.import) {
                set = set.without_imports(&std::iter::once(entry.import.clone()).collect());
                diagnostics.push(Diagnostic::info(
                    file,
                    unused.line,
                    format!("removed unused '{}'", entry.import),
                ));
            }
        }
    }

    if options.add_missing {
        let mut added = ImportSet::new();
        for missing in &analysis.missing {
            let chosen = match db.resolve_bound(&missing.name) {
                Ok(chosen) => chosen,
                Err(TidyError::NoSuchImport(name)) => {
                    diagnostics.push(Diagnostic::new(
                        file,
                        missing.line,
                        missing.col,
                        Level::Warning,
                        format!("undefined name {:?} and no known import for it", name),
                    ));
                    continue;
                }
                Err(TidyError::AmbiguousImport { name, candidates }) => {
                    diagnostics.push(Diagnostic::new(
                        file,
                        missing.line,
                        missing.col,
                        Level::Error,
                        format!(
                            "ambiguous name {:?}: don't know which of [{}] to use",
                            name,
                            candidates
                                .iter()
                                .map(|c| format!("'{}'", c))
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    ));
                    continue;
                }
                Err(other) => return Err(other),
            };
            if set.contains(&chosen) || added.contains(&chosen) {
                continue;
            }
            diagnostics.push(Diagnostic::info(
                file,
                missing.line,
                format!("added '{}'", chosen),
            ));
            added = added.with_imports(&std::iter::once(chosen).collect());
        }
        set = set.with_imports(&added);
    }

    if options.add_mandatory {
        for imp in db.mandatory_imports.iter() {
            if !set.contains(imp) {
                diagnostics.push(Diagnostic::info(
                    file,
                    1,
                    format!("added mandatory '{}'", imp),
                ));
                set = set.with_imports(&std::iter::once(imp.clone()).collect());
            }
        }
    }

    if options.canonicalize && !db.canonical_imports.is_empty() {
        set = rewrite_set(&set, &db.canonical_imports, file, "canonicalized", &mut diagnostics);
    }

    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let rendered = render_block(prologue.as_ref(), &set, params)?;
    let output = match &prologue {
        Some(p) => splice(text.as_str(), p.splice_start, p.splice_end, &rendered),
        None if rendered.is_empty() => text.as_str().to_string(),
        None => {
            let point = insertion_point(&block);
            let src = text.as_str();
            let mut out = String::with_capacity(src.len() + rendered.len());
            out.push_str(&src[..point]);
            if point == src.len() && !src.is_empty() && !src.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&rendered);
            if point < src.len() {
                out.push('\n');
            }
            out.push_str(&src[point..]);
            out
        }
    };
    Ok(finish(text, output, diagnostics))
}

fn is_reexport_file(file: Option<&Path>) -> bool {
    let Some(file) = file else {
        return false;
    };
    if file.file_name().is_some_and(|n| n == "__init__.py") {
        return true;
    }
    file.components()
        .any(|c| c.as_os_str().to_str().is_some_and(|s| s == ".tidyimp"))
}

// ============================================================================
// star replacement and broken-import removal
// ============================================================================

/// Replace `from M import *` in the prologue with the explicit names the
/// probe reports, alphabetically sorted. Relative and unprobeable star
/// imports are left unchanged with a diagnostic.
pub fn replace_star_imports(
    text: &FileText,
    probe: &dyn ImportProbe,
    params: &FormatParams,
    cancel: &CancelFlag,
) -> Result<Rewritten, TidyError> {
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let block = parse_source(text)?;
    let Some(prologue) = find_prologue(&block) else {
        return Ok(Rewritten::unchanged(text));
    };
    let file = text.filename();
    let mut diagnostics = Vec::new();
    let mut new_imports: Vec<Import> = Vec::new();
    let mut modified = false;
    for entry in &prologue.imports {
        if !entry.import.is_star() {
            new_imports.push(entry.import.clone());
            continue;
        }
        if entry.import.level() > 0 {
            diagnostics.push(Diagnostic::warning(
                file,
                entry.line,
                format!(
                    "can't replace star imports in a relative import: '{}'",
                    entry.import
                ),
            ));
            new_imports.push(entry.import.clone());
            continue;
        }
        let module = entry
            .import
            .from_module()
            .expect("star imports always have a module");
        match probe.exports(&module) {
            None => {
                diagnostics.push(Diagnostic::warning(
                    file,
                    entry.line,
                    format!(
                        "couldn't enumerate exports of '{}'; leaving '{}' unchanged",
                        module, entry.import
                    ),
                ));
                new_imports.push(entry.import.clone());
            }
            Some(exports) if exports.is_empty() => {
                diagnostics.push(Diagnostic::warning(
                    file,
                    entry.line,
                    format!(
                        "found nothing to import from '{}'; leaving '{}' unchanged",
                        module, entry.import
                    ),
                ));
                new_imports.push(entry.import.clone());
            }
            Some(exports) => {
                diagnostics.push(Diagnostic::info(
                    file,
                    entry.line,
                    format!("replaced '{}' with {} imports", entry.import, exports.len()),
                ));
                new_imports.extend(exports.iter().cloned());
                modified = true;
            }
        }
    }
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    if !modified {
        return Ok(Rewritten {
            diagnostics,
            ..Rewritten::unchanged(text)
        });
    }
    let set = ImportSet::from_imports(new_imports, true);
    let rendered = render_block(Some(&prologue), &set, params)?;
    let output = splice(
        text.as_str(),
        prologue.splice_start,
        prologue.splice_end,
        &rendered,
    );
    Ok(finish(text, output, diagnostics))
}

/// Drop prologue imports the probe says do not resolve. Unanswerable
/// imports are kept with a diagnostic.
pub fn remove_broken_imports(
    text: &FileText,
    probe: &dyn ImportProbe,
    params: &FormatParams,
    cancel: &CancelFlag,
) -> Result<Rewritten, TidyError> {
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let block = parse_source(text)?;
    let Some(prologue) = find_prologue(&block) else {
        return Ok(Rewritten::unchanged(text));
    };
    let file = text.filename();
    let mut diagnostics = Vec::new();
    let mut kept: Vec<Import> = Vec::new();
    let mut unavailable = false;
    let mut modified = false;
    for entry in &prologue.imports {
        match probe.resolves(&entry.import) {
            Some(false) => {
                diagnostics.push(Diagnostic::info(
                    file,
                    entry.line,
                    format!("removed broken '{}'", entry.import),
                ));
                modified = true;
            }
            Some(true) => kept.push(entry.import.clone()),
            None => {
                unavailable = true;
                kept.push(entry.import.clone());
            }
        }
    }
    if unavailable {
        diagnostics.push(Diagnostic::warning(
            file,
            1,
            "import probe unavailable for some imports; they were left unchanged",
        ));
    }
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    if !modified {
        return Ok(Rewritten {
            diagnostics,
            ..Rewritten::unchanged(text)
        });
    }
    let set = ImportSet::from_imports(kept, true);
    let rendered = render_block(Some(&prologue), &set, params)?;
    let output = splice(
        text.as_str(),
        prologue.splice_start,
        prologue.splice_end,
        &rendered,
    );
    Ok(finish(text, output, diagnostics))
}

// ============================================================================
// transform and canonicalize
// ============================================================================

fn rewrite_set(
    set: &ImportSet,
    map: &ImportMap,
    file: Option<&Path>,
    verb: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> ImportSet {
    let mut out = Vec::new();
    for imp in set.iter() {
        let rewritten = map.rewrite(imp);
        if &rewritten != imp {
            diagnostics.push(Diagnostic::info(
                file,
                1,
                format!("{} '{}' to '{}'", verb, imp, rewritten),
            ));
        }
        out.push(rewritten);
    }
    ImportSet::from_imports(out, true)
}

/// Rewrite prologue imports whose fullname has a prefix in `map`,
/// preserving bound names. Code outside the prologue is untouched.
pub fn transform_imports(
    text: &FileText,
    map: &ImportMap,
    params: &FormatParams,
    cancel: &CancelFlag,
) -> Result<Rewritten, TidyError> {
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    let block = parse_source(text)?;
    let Some(prologue) = find_prologue(&block) else {
        return Ok(Rewritten::unchanged(text));
    };
    let mut diagnostics = Vec::new();
    let set = ImportSet::from_imports(prologue.imports.iter().map(|e| e.import.clone()), true);
    let set = rewrite_set(&set, map, text.filename(), "transformed", &mut diagnostics);
    if cancel.is_cancelled() {
        return Ok(Rewritten::cancelled(text));
    }
    if diagnostics.is_empty() {
        return Ok(Rewritten::unchanged(text));
    }
    let rendered = render_block(Some(&prologue), &set, params)?;
    let output = splice(
        text.as_str(),
        prologue.splice_start,
        prologue.splice_end,
        &rendered,
    );
    Ok(finish(text, output, diagnostics))
}

/// [`transform_imports`] driven by the database's canonical rules.
pub fn canonicalize_imports(
    text: &FileText,
    db: &ImportDB,
    params: &FormatParams,
    cancel: &CancelFlag,
) -> Result<Rewritten, TidyError> {
    transform_imports(text, &db.canonical_imports, params, cancel)
}

// ============================================================================
// collect
// ============================================================================

/// Gather all top-level imports of the given sources into one set.
pub fn collect_imports(texts: &[FileText], ignore_nonimports: bool) -> Result<ImportSet, TidyError> {
    let mut set = ImportSet::new();
    for text in texts {
        let block = parse_source(text)?;
        let file_set = ImportSet::from_block(&block, ignore_nonimports).map_err(|e| match text
            .filename()
        {
            Some(f) => e.with_file(f),
            None => e,
        })?;
        set = set.with_imports(&file_set);
    }
    Ok(set)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::NullProbe;
    use tidyimp_core::DottedName;

    fn reformat(src: &str) -> String {
        reformat_import_statements(&FileText::new(src), &FormatParams::default(), &CancelFlag::new())
            .unwrap()
            .output
    }

    fn tidy(src: &str, db: &ImportDB) -> Rewritten {
        tidy_imports(
            &FileText::new(src),
            db,
            &FormatParams::default(),
            &TidyOptions::default(),
            &CancelFlag::new(),
        )
        .unwrap()
    }

    mod prologue {
        use super::*;

        #[test]
        fn reformat_merges_and_sorts() {
            let out = reformat(
                "from foo import bar2 as bar2x, bar1\nimport foo.bar4\n\nprint(1)\n",
            );
            assert_eq!(
                out,
                "import foo.bar4\n\nfrom foo import (bar1, bar2 as bar2x)\n\nprint(1)\n"
            );
        }

        #[test]
        fn no_imports_is_unchanged() {
            let src = "x = 1\ny = 2\n";
            assert_eq!(reformat(src), src);
        }

        #[test]
        fn shebang_and_docstring_preserved() {
            let src = "#!/usr/bin/env python\n\"\"\"Doc.\"\"\"\n\nimport sys\nimport os\n\nprint(os, sys)\n";
            let out = reformat(src);
            assert_eq!(
                out,
                "#!/usr/bin/env python\n\"\"\"Doc.\"\"\"\n\nimport os\nimport sys\n\nprint(os, sys)\n"
            );
        }

        #[test]
        fn comment_between_imports_ends_prologue() {
            let src = "import b\nimport a\n# boundary comment\nimport z\nprint(a, b, z)\n";
            let out = reformat(src);
            assert_eq!(
                out,
                "import a\nimport b\n\n# boundary comment\nimport z\nprint(a, b, z)\n"
            );
        }

        #[test]
        fn deeper_imports_untouched() {
            let src = "import os\n\nx = 1\nimport zz\nimport aa\n";
            let out = reformat(src);
            assert!(out.contains("import zz\nimport aa\n"));
        }

        #[test]
        fn blank_lines_normalized() {
            let out = reformat("import os\n\n\n\nprint(os)\n");
            assert_eq!(out, "import os\n\nprint(os)\n");
        }

        #[test]
        fn noqa_statement_kept_verbatim() {
            let src = "import weird_effects  # noqa\nimport b\nimport a\nprint(a, b)\n";
            let out = reformat(src);
            assert_eq!(
                out,
                "import weird_effects  # noqa\nimport a\nimport b\n\nprint(a, b)\n"
            );
        }

        #[test]
        fn reformat_is_idempotent() {
            for src in [
                "import b\nimport a\nprint(a, b)\n",
                "from m import x, y\n\n\ncode()\n",
                "#!/x\n'''doc'''\nimport b\nimport a\n\ncode()\n",
                "import only\n",
            ] {
                let once = reformat(src);
                assert_eq!(reformat(&once), once, "not idempotent for {:?}", src);
            }
        }
    }

    mod tidy {
        use super::*;

        #[test]
        fn removes_unused_and_keeps_used() {
            let r = tidy("import os, sys\nprint(os.getcwd())\n", &ImportDB::empty());
            assert_eq!(r.output, "import os\n\nprint(os.getcwd())\n");
            assert!(r.changed);
            assert!(r
                .diagnostics
                .iter()
                .any(|d| d.message.contains("removed unused 'import sys'")));
        }

        #[test]
        fn adds_known_import_for_missing_name() {
            let db = ImportDB::from_code("from numpy import arange\nimport re\n").unwrap();
            let r = tidy("re.search('[a-z]+', 'hello')\n", &db);
            assert_eq!(r.output, "import re\n\nre.search('[a-z]+', 'hello')\n");
        }

        #[test]
        fn mandatory_future_import_added() {
            let db = ImportDB::from_code(
                "__mandatory_imports__ = ['from __future__ import print_function']\n",
            )
            .unwrap();
            let r = tidy("import os, sys\nprint(os.getcwd())\n", &db);
            assert_eq!(
                r.output,
                "from __future__ import print_function\n\nimport os\n\nprint(os.getcwd())\n"
            );
        }

        #[test]
        fn ambiguous_name_stays_missing_with_error() {
            let db =
                ImportDB::from_code("from numpy import arange\nfrom pylab import arange\n").unwrap();
            let r = tidy("arange(3)\n", &db);
            assert_eq!(r.output, "arange(3)\n");
            assert!(r.has_errors());
        }

        #[test]
        fn preferred_import_breaks_ties() {
            let db = ImportDB::from_code(
                "from numpy import arange\nfrom pylab import arange\n\
                 __preferred_imports__ = ['from numpy import arange']\n",
            )
            .unwrap();
            let r = tidy("arange(3)\n", &db);
            assert_eq!(r.output, "from numpy import arange\n\narange(3)\n");
        }

        #[test]
        fn unknown_name_warns() {
            let r = tidy("mystery_name\n", &ImportDB::empty());
            assert!(!r.changed);
            assert!(r
                .diagnostics
                .iter()
                .any(|d| d.message.contains("undefined name \"mystery_name\"")));
        }

        #[test]
        fn canonical_rules_applied() {
            let db =
                ImportDB::from_code("__canonical_imports__ = {'bad.old': 'good.new'}\n").unwrap();
            let r = tidy("from bad.old import thing\nthing()\n", &db);
            assert_eq!(r.output, "from good.new import thing\n\nthing()\n");
        }

        #[test]
        fn noqa_import_never_removed() {
            let r = tidy("import sideeffect  # noqa\nprint(1)\n", &ImportDB::empty());
            // The statement is kept verbatim; only the separating blank
            // line is normalized.
            assert_eq!(r.output, "import sideeffect  # noqa\n\nprint(1)\n");
        }

        #[test]
        fn unused_removal_skipped_for_init_py() {
            let text = FileText::with_filename("from pkg.mod import api\n", "pkg/__init__.py");
            let r = tidy_imports(
                &text,
                &ImportDB::empty(),
                &FormatParams::default(),
                &TidyOptions::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert_eq!(r.output, "from pkg.mod import api\n");
        }

        #[test]
        fn star_import_suppresses_missing() {
            let r = tidy("from os.path import *\njoin('a', 'b')\n", &ImportDB::empty());
            assert_eq!(r.output, "from os.path import *\n\njoin('a', 'b')\n");
            assert!(!r.has_errors());
        }

        #[test]
        fn duplicate_import_collapsed_not_lost() {
            let r = tidy("import os\nimport os\nos.getcwd()\n", &ImportDB::empty());
            assert_eq!(r.output, "import os\n\nos.getcwd()\n");
        }

        #[test]
        fn tidy_is_idempotent() {
            let db = ImportDB::from_code(
                "import re\n__mandatory_imports__ = ['from __future__ import division']\n",
            )
            .unwrap();
            let src = "import os, sys\nre.search('x', 'y')\nprint(os.getcwd())\n";
            let once = tidy(src, &db);
            let twice = tidy(&once.output, &db);
            assert_eq!(twice.output, once.output);
        }

        #[test]
        fn cancellation_returns_input() {
            let cancel = CancelFlag::new();
            cancel.cancel();
            let r = tidy_imports(
                &FileText::new("import os, sys\n"),
                &ImportDB::empty(),
                &FormatParams::default(),
                &TidyOptions::default(),
                &cancel,
            )
            .unwrap();
            assert!(r.cancelled);
            assert!(!r.changed);
            assert_eq!(r.output, "import os, sys\n");
        }
    }

    mod star_and_broken {
        use super::*;

        struct FakeProbe;

        impl ImportProbe for FakeProbe {
            fn exports(&self, module: &DottedName) -> Option<ImportSet> {
                if module.to_string() == "foo.bar" {
                    Some(ImportSet::parse("from foo.bar import c, a, b\n").unwrap())
                } else {
                    None
                }
            }

            fn resolves(&self, imp: &Import) -> Option<bool> {
                Some(imp.fullname().first() != "brokenpkg")
            }
        }

        #[test]
        fn star_replaced_sorted() {
            let r = replace_star_imports(
                &FileText::new("from foo.bar import *\na, b, c\n"),
                &FakeProbe,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert_eq!(r.output, "from foo.bar import (a, b, c)\n\na, b, c\n");
        }

        #[test]
        fn unprobeable_star_left_with_diagnostic() {
            let r = replace_star_imports(
                &FileText::new("from mystery import *\n"),
                &FakeProbe,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert!(!r.changed);
            assert!(r
                .diagnostics
                .iter()
                .any(|d| d.message.contains("couldn't enumerate exports")));
        }

        #[test]
        fn null_probe_makes_passes_noops() {
            let src = "from foo.bar import *\nimport os\nos\n";
            let r = replace_star_imports(
                &FileText::new(src),
                &NullProbe,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert!(!r.changed);
            let r = remove_broken_imports(
                &FileText::new(src),
                &NullProbe,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert!(!r.changed);
        }

        #[test]
        fn broken_import_removed() {
            let r = remove_broken_imports(
                &FileText::new("import brokenpkg\nimport os\nos\n"),
                &FakeProbe,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert_eq!(r.output, "import os\n\nos\n");
        }
    }

    mod transform {
        use super::*;

        #[test]
        fn module_rename_preserves_bound_name() {
            let map = ImportMap::from_pairs([("numpy".to_string(), "numpy2".to_string())]).unwrap();
            let r = transform_imports(
                &FileText::new("import numpy\nnumpy.arange(3)\n"),
                &map,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert_eq!(r.output, "import numpy2 as numpy\n\nnumpy.arange(3)\n");
        }

        #[test]
        fn member_rename() {
            let map = ImportMap::from_pairs([("m.x".to_string(), "m.y.z".to_string())]).unwrap();
            let r = transform_imports(
                &FileText::new("from m import x\nx()\n"),
                &map,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert_eq!(r.output, "from m.y import z as x\n\nx()\n");
        }

        #[test]
        fn transform_is_idempotent_when_rule_reapplies() {
            let map = ImportMap::from_pairs([("aa".to_string(), "bb".to_string())]).unwrap();
            let text = FileText::new("import aa\naa.f()\n");
            let once = transform_imports(&text, &map, &FormatParams::default(), &CancelFlag::new())
                .unwrap();
            let twice = transform_imports(
                &FileText::new(once.output.as_str()),
                &map,
                &FormatParams::default(),
                &CancelFlag::new(),
            )
            .unwrap();
            assert_eq!(once.output, twice.output);
        }
    }

    mod collect {
        use super::*;

        #[test]
        fn collects_across_files() {
            let texts = vec![
                FileText::new("import os\nx = 1\n"),
                FileText::new("from sys import argv\n"),
            ];
            let set = collect_imports(&texts, true).unwrap();
            assert_eq!(set.len(), 2);
        }

        #[test]
        fn strict_mode_rejects_code() {
            let texts = vec![FileText::new("import os\nx = 1\n")];
            assert!(collect_imports(&texts, false).is_err());
        }
    }
}
