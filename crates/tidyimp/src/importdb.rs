// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The import database: known, mandatory, canonical, and forgotten
//! imports, layered across contributor files.
//!
//! ## Contributor file format
//!
//! A contributor is valid Python. Recognized top-level constructs:
//!
//! - import statements, which add to `known_imports`;
//! - `__mandatory_imports__ = [<strings>]`
//! - `__forget_imports__ = [<strings>]`
//! - `__canonical_imports__ = {<str>: <str>, ...}`
//! - `__preferred_imports__ = [<strings>]`
//!
//! Each listed string parses as an import statement or dotted identifier.
//! Any other top-level statement is ignored with a warning.
//!
//! ## Merge order
//!
//! Contributors are processed left-to-right, statement by statement. A
//! `__forget_imports__` directive subtracts matching entries from what has
//! accumulated so far; later contributions are unaffected. The canonical
//! map merges with last-writer-wins.
//!
//! ## Path resolution
//!
//! The database path is a list of entries separated by the OS path
//! separator. Entries must start with `/`, `./`, `~/`, or `.../`. A bare
//! `-` expands in place to the default list. A `.../<name>` entry expands
//! to `<ancestor>/<name>` for every ancestor of the target file on the
//! same filesystem, deepest first. Directories contribute every `*.py`
//! file recursively in stable sorted order.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;

use tidyimp_core::DottedName;
use tidyimp_python::tokenizer::{string_body, tokenize, TokKind};
use tidyimp_python::Block;

use crate::error::TidyError;
use crate::importclns::{ImportMap, ImportSet};
use crate::importstmt::{Import, ImportStatement};

/// Environment variable naming the database path.
pub const PATH_ENV: &str = "TIDYIMP_PATH";

/// Sentinel path entry that expands to the default list.
pub const DEFAULT_SENTINEL: &str = "-";

/// Path spec value meaning "intentionally no database".
pub const EMPTY_SENTINEL: &str = "EMPTY";

fn default_path_entries() -> Vec<String> {
    vec![".../.tidyimp".to_string(), "~/.tidyimp".to_string()]
}

// ============================================================================
// ImportDB
// ============================================================================

/// A database of known, mandatory, canonical imports.
#[derive(Debug, Clone, Default)]
pub struct ImportDB {
    /// Candidates when resolving a missing name.
    pub known_imports: ImportSet,
    /// Imports that must appear in every tidied file.
    pub mandatory_imports: ImportSet,
    /// Rewrite rules applied by tidy/canonicalize.
    pub canonical_imports: ImportMap,
    /// Everything that was forgotten, for reporting.
    pub forget_imports: ImportSet,
    /// Per-bound-name override among ambiguous known imports.
    pub preferred_imports: BTreeMap<String, Import>,
}

impl ImportDB {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a single contributor's source code.
    pub fn from_code(source: &str) -> Result<Self, TidyError> {
        let block = Block::parse_str(source)?;
        Self::from_blocks(&[block])
    }

    /// Load from contributor blocks, layered left-to-right.
    pub fn from_blocks(blocks: &[Block]) -> Result<Self, TidyError> {
        let mut db = ImportDB::empty();
        for block in blocks {
            let file = block.text().filename().map(Path::to_path_buf);
            for stmt in block.statements() {
                if stmt.is_trivia() || stmt.is_docstring() {
                    continue;
                }
                if let Some(info) = stmt.import_info() {
                    let imports = ImportStatement::from_info(info).imports();
                    db.known_imports =
                        db.known_imports.with_imports(&imports.into_iter().collect());
                    continue;
                }
                let body = block.stmt_body(stmt);
                match parse_directive(body) {
                    Ok(Some(directive)) => db.apply(directive)?,
                    Ok(None) => {
                        warn!(
                            file = %file.as_deref().unwrap_or(Path::new("<input>")).display(),
                            "ignoring non-import statement in import library: {}",
                            body.lines().next().unwrap_or("").trim()
                        );
                    }
                    Err(err) => {
                        return Err(match file {
                            Some(f) => err.with_file(f),
                            None => err,
                        })
                    }
                }
            }
        }
        Ok(db)
    }

    /// Load from contributor files. Files that vanished since the scan are
    /// treated as absent.
    pub fn from_files(files: &[PathBuf]) -> Result<Self, TidyError> {
        let mut blocks = Vec::new();
        for file in files {
            let source = match std::fs::read_to_string(file) {
                Ok(s) => s,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            let text = tidyimp_core::FileText::with_filename(source, file);
            let block = Block::parse(text).map_err(|e| TidyError::from(e).with_file(file))?;
            blocks.push(block);
        }
        debug!(contributors = blocks.len(), "loading import database");
        Self::from_blocks(&blocks)
    }

    /// Build the database for a target file, resolving `spec` (or the
    /// default path when `None`).
    pub fn for_target(target: &Path, spec: Option<&str>) -> Result<Self, TidyError> {
        let roots = resolve_path_spec(spec, target)?;
        let files = contributor_files(&roots);
        Self::from_files(&files)
    }

    fn apply(&mut self, directive: Directive) -> Result<(), TidyError> {
        match directive {
            Directive::Mandatory(entries) => {
                let set: ImportSet = parse_import_entries(&entries)?.into_iter().collect();
                self.mandatory_imports = self.mandatory_imports.with_imports(&set);
            }
            Directive::Forget(entries) => {
                let set: ImportSet = parse_import_entries(&entries)?.into_iter().collect();
                self.known_imports = self.known_imports.without_imports(&set);
                self.mandatory_imports = self.mandatory_imports.without_imports(&set);
                self.canonical_imports = self.canonical_imports.without_imports(&set);
                self.preferred_imports
                    .retain(|_, imp| !set.contains(imp));
                self.forget_imports = self.forget_imports.with_imports(&set);
            }
            Directive::Canonical(pairs) => {
                let map = ImportMap::from_pairs(pairs)?;
                self.canonical_imports.merge(&map);
            }
            Directive::Preferred(entries) => {
                for imp in parse_import_entries(&entries)? {
                    self.preferred_imports
                        .insert(imp.bound_name().to_string(), imp);
                }
            }
        }
        Ok(())
    }

    /// Known imports that bind `name`, in deterministic order.
    pub fn lookup_bound(&self, name: &str) -> Vec<Import> {
        self.known_imports
            .by_import_as()
            .remove(name)
            .unwrap_or_default()
    }

    /// The preferred import for a bound name, if configured.
    pub fn preferred(&self, name: &str) -> Option<&Import> {
        self.preferred_imports.get(name)
    }

    /// Resolve a bound name to the single import to use for it.
    ///
    /// With several candidates, the preferred import breaks the tie;
    /// otherwise the lookup fails with [`TidyError::AmbiguousImport`].
    pub fn resolve_bound(&self, name: &str) -> Result<Import, TidyError> {
        let candidates = self.lookup_bound(name);
        match candidates.len() {
            0 => Err(TidyError::NoSuchImport(name.to_string())),
            1 => Ok(candidates.into_iter().next().expect("length checked")),
            _ => match self.preferred(name) {
                Some(preferred) => Ok(preferred.clone()),
                None => Err(TidyError::AmbiguousImport {
                    name: name.to_string(),
                    candidates: candidates.iter().map(|c| c.to_string()).collect(),
                }),
            },
        }
    }
}

fn parse_import_entries(entries: &[String]) -> Result<Vec<Import>, TidyError> {
    let mut out = Vec::new();
    for entry in entries {
        let stmt = ImportStatement::parse(entry).or_else(|_| {
            Import::parse(entry).and_then(|imp| ImportStatement::from_imports(vec![imp]))
        });
        match stmt {
            Ok(stmt) => out.extend(stmt.imports()),
            Err(_) => {
                return Err(TidyError::ImportFormat(format!(
                    "cannot parse import entry {:?}",
                    entry
                )))
            }
        }
    }
    Ok(out)
}

// ============================================================================
// Directive parsing
// ============================================================================

enum Directive {
    Mandatory(Vec<String>),
    Forget(Vec<String>),
    Canonical(Vec<(String, String)>),
    Preferred(Vec<String>),
}

/// Parse a recognized `__x__ = ...` assignment. Returns `Ok(None)` for
/// statements that are not recognized directives, `Err` for recognized
/// directives with malformed payloads.
fn parse_directive(body: &str) -> Result<Option<Directive>, TidyError> {
    let Ok(tokens) = tokenize(body) else {
        return Ok(None);
    };
    let sig: Vec<_> = tokens
        .iter()
        .filter(|t| {
            !matches!(
                t.kind,
                TokKind::Comment
                    | TokKind::Nl
                    | TokKind::Newline
                    | TokKind::Indent
                    | TokKind::Dedent
                    | TokKind::EndMarker
            )
        })
        .collect();
    let (name, rest) = match sig.split_first() {
        Some((name, rest)) if name.kind == TokKind::Name => match rest.split_first() {
            Some((eq, rest)) if eq.kind == TokKind::Op && eq.text(body) == "=" => {
                (name.text(body), rest)
            }
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };
    match name {
        "__mandatory_imports__" => Ok(Some(Directive::Mandatory(parse_string_list(body, rest)?))),
        "__forget_imports__" => Ok(Some(Directive::Forget(parse_string_list(body, rest)?))),
        "__preferred_imports__" => Ok(Some(Directive::Preferred(parse_string_list(body, rest)?))),
        "__canonical_imports__" => Ok(Some(Directive::Canonical(parse_string_map(body, rest)?))),
        _ => Ok(None),
    }
}

fn parse_string_list(
    src: &str,
    tokens: &[&tidyimp_python::Token],
) -> Result<Vec<String>, TidyError> {
    let mut out = Vec::new();
    let mut iter = tokens.iter().peekable();
    match iter.next() {
        Some(t) if t.kind == TokKind::Op && matches!(t.text(src), "[" | "(") => {}
        Some(t) if t.kind == TokKind::String => {
            // A bare string is accepted as a one-element list.
            out.push(string_body(t.text(src)).to_string());
            return Ok(out);
        }
        _ => {
            return Err(TidyError::ImportFormat(
                "expected a list of strings".to_string(),
            ))
        }
    }
    for t in iter {
        match t.kind {
            TokKind::String => out.push(string_body(t.text(src)).to_string()),
            TokKind::Op if matches!(t.text(src), "," | "]" | ")") => {}
            _ => {
                return Err(TidyError::ImportFormat(format!(
                    "unexpected token {:?} in import list",
                    t.text(src)
                )))
            }
        }
    }
    Ok(out)
}

fn parse_string_map(
    src: &str,
    tokens: &[&tidyimp_python::Token],
) -> Result<Vec<(String, String)>, TidyError> {
    let mut out = Vec::new();
    let mut iter = tokens.iter();
    match iter.next() {
        Some(t) if t.kind == TokKind::Op && t.text(src) == "{" => {}
        _ => {
            return Err(TidyError::ImportFormat(
                "expected a dict of strings".to_string(),
            ))
        }
    }
    let mut pending_key: Option<String> = None;
    let mut expect_value = false;
    for t in iter {
        match t.kind {
            TokKind::String => {
                let s = string_body(t.text(src)).to_string();
                if expect_value {
                    let key = pending_key.take().expect("key precedes value");
                    out.push((key, s));
                    expect_value = false;
                } else if pending_key.is_none() {
                    pending_key = Some(s);
                } else {
                    return Err(TidyError::ImportFormat(
                        "missing ':' between dict entries".to_string(),
                    ));
                }
            }
            TokKind::Op if t.text(src) == ":" => expect_value = true,
            TokKind::Op if matches!(t.text(src), "," | "}") => {}
            _ => {
                return Err(TidyError::ImportFormat(format!(
                    "unexpected token {:?} in import map",
                    t.text(src)
                )))
            }
        }
    }
    if pending_key.is_some() {
        return Err(TidyError::ImportFormat(
            "dangling key in import map".to_string(),
        ));
    }
    Ok(out)
}

// ============================================================================
// Path resolution
// ============================================================================

/// Expand a database path spec into root paths.
///
/// Entries are separated by the OS path separator and must start with
/// `/`, `./`, `~/`, or `.../`.
pub fn resolve_path_spec(spec: Option<&str>, target: &Path) -> Result<Vec<PathBuf>, TidyError> {
    let raw: Vec<String> = match spec {
        None | Some("") => default_path_entries(),
        Some(s) if s == EMPTY_SENTINEL => return Ok(Vec::new()),
        Some(s) => {
            let mut entries: Vec<String> = s
                .split(path_sep())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if let Some(idx) = entries.iter().position(|e| e == DEFAULT_SENTINEL) {
                entries.splice(idx..idx + 1, default_path_entries());
            }
            entries
        }
    };
    let target_dir = nearest_dir(target);
    let mut out: Vec<PathBuf> = Vec::new();
    for entry in raw {
        if !(entry.starts_with('/')
            || entry.starts_with("./")
            || entry.starts_with("~/")
            || entry.starts_with(".../"))
        {
            return Err(TidyError::ImportFormat(format!(
                "{} entries should start with / or ./ or ~/ or .../ (got {:?})",
                PATH_ENV, entry
            )));
        }
        if let Some(suffix) = entry.strip_prefix(".../") {
            for ancestor in ancestors_on_same_device(&target_dir) {
                out.push(ancestor.join(suffix));
            }
        } else if let Some(suffix) = entry.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                out.push(PathBuf::from(home).join(suffix));
            }
        } else {
            out.push(PathBuf::from(entry));
        }
    }
    out.dedup();
    Ok(out)
}

fn path_sep() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

fn nearest_dir(target: &Path) -> PathBuf {
    let mut dir = if target.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        target.to_path_buf()
    };
    while !dir.is_dir() {
        match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => dir = parent.to_path_buf(),
            _ => return PathBuf::from("."),
        }
    }
    dir
}

#[cfg(unix)]
fn device_of(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| m.dev())
}

#[cfg(not(unix))]
fn device_of(_path: &Path) -> Option<u64> {
    Some(0)
}

/// Existing ancestors of `dir` on the same filesystem as the first
/// existing ancestor, deepest first.
fn ancestors_on_same_device(dir: &Path) -> Vec<PathBuf> {
    let mut result = Vec::new();
    let mut device = None;
    let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    for ancestor in start.ancestors() {
        let Some(dev) = device_of(ancestor) else {
            continue;
        };
        match device {
            None => device = Some(dev),
            Some(d) if d != dev => break,
            _ => {}
        }
        result.push(ancestor.to_path_buf());
    }
    result
}

/// Every contributor file under the given roots: explicit files verbatim,
/// directories recursively for `*.py`, in stable byte-wise sorted order.
pub fn contributor_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for root in roots {
        let Ok(meta) = std::fs::metadata(root) else {
            continue;
        };
        if meta.is_file() {
            out.push(root.clone());
            continue;
        }
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|e| e == "py")
            {
                out.push(entry.path().to_path_buf());
            }
        }
    }
    out
}

// ============================================================================
// DbCache
// ============================================================================

/// An explicit cache of loaded databases, keyed by (target directory,
/// path spec). Callers that want process-wide caching hold one of these;
/// the database itself has no global state.
#[derive(Debug, Default)]
pub struct DbCache {
    entries: HashMap<(PathBuf, String), Arc<ImportDB>>,
}

impl DbCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the database for a target, reusing a previous load for the
    /// same (directory, spec) key.
    pub fn get_or_load(
        &mut self,
        target: &Path,
        spec: Option<&str>,
    ) -> Result<Arc<ImportDB>, TidyError> {
        let key = (nearest_dir(target), spec.unwrap_or("").to_string());
        if let Some(db) = self.entries.get(&key) {
            return Ok(db.clone());
        }
        let db = Arc::new(ImportDB::for_target(target, spec)?);
        self.entries.insert(key, db.clone());
        Ok(db)
    }

    /// Drop all cached databases.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod directives {
        use super::*;

        #[test]
        fn loads_known_mandatory_forget_canonical() {
            let db = ImportDB::from_code(
                "import foo, bar as barf\n\
                 from xx import yy\n\
                 __mandatory_imports__ = ['__future__.division', 'import aa.bb.cc as dd']\n\
                 __forget_imports__ = ['from xx import yy', 'from xx import zz']\n\
                 __canonical_imports__ = {'bad.baad': 'good.goood'}\n",
            )
            .unwrap();
            let known: Vec<String> = db.known_imports.iter().map(|i| i.to_string()).collect();
            assert_eq!(known, ["import bar as barf", "import foo"]);
            let mandatory: Vec<String> =
                db.mandatory_imports.iter().map(|i| i.to_string()).collect();
            assert_eq!(
                mandatory,
                ["from __future__ import division", "from aa.bb import cc as dd"]
            );
            assert_eq!(
                db.canonical_imports
                    .get(&"bad.baad".parse().unwrap())
                    .unwrap()
                    .to_string(),
                "good.goood"
            );
            assert_eq!(db.forget_imports.len(), 2);
        }

        #[test]
        fn preferred_imports() {
            let db = ImportDB::from_code(
                "from numpy import arange\nfrom pylab import arange\n\
                 __preferred_imports__ = ['from numpy import arange']\n",
            )
            .unwrap();
            assert_eq!(
                db.preferred("arange").unwrap().to_string(),
                "from numpy import arange"
            );
        }

        #[test]
        fn unknown_assignment_ignored() {
            let db = ImportDB::from_code("import os\nsomething_else = [1]\n").unwrap();
            assert_eq!(db.known_imports.len(), 1);
        }

        #[test]
        fn malformed_directive_rejected() {
            assert!(matches!(
                ImportDB::from_code("__forget_imports__ = [42]\n"),
                Err(TidyError::ImportFormat(_))
            ));
            assert!(matches!(
                ImportDB::from_code("__canonical_imports__ = ['not', 'a', 'dict']\n"),
                Err(TidyError::ImportFormat(_))
            ));
        }

        #[test]
        fn lookup_bound() {
            let db = ImportDB::from_code("import re\nfrom numpy import arange\n").unwrap();
            assert_eq!(db.lookup_bound("re").len(), 1);
            assert_eq!(db.lookup_bound("arange").len(), 1);
            assert!(db.lookup_bound("nothing").is_empty());
        }

        #[test]
        fn resolve_bound() {
            let db = ImportDB::from_code(
                "import re\nfrom numpy import arange\nfrom pylab import arange\n",
            )
            .unwrap();
            assert_eq!(db.resolve_bound("re").unwrap().to_string(), "import re");
            assert!(matches!(
                db.resolve_bound("nothing"),
                Err(TidyError::NoSuchImport(_))
            ));
            assert!(matches!(
                db.resolve_bound("arange"),
                Err(TidyError::AmbiguousImport { .. })
            ));
        }
    }

    mod layering {
        use super::*;

        fn blocks(sources: &[&str]) -> Vec<Block> {
            sources
                .iter()
                .map(|s| Block::parse_str(s).unwrap())
                .collect()
        }

        #[test]
        fn later_forget_removes_earlier_entries() {
            let db = ImportDB::from_blocks(&blocks(&[
                "import aa\nimport bb\n",
                "__forget_imports__ = ['import aa']\n",
            ]))
            .unwrap();
            let known: Vec<String> = db.known_imports.iter().map(|i| i.to_string()).collect();
            assert_eq!(known, ["import bb"]);
        }

        #[test]
        fn forget_does_not_affect_later_adds() {
            let db = ImportDB::from_blocks(&blocks(&[
                "__forget_imports__ = ['import aa']\n",
                "import aa\n",
            ]))
            .unwrap();
            assert_eq!(db.known_imports.len(), 1);
        }

        #[test]
        fn forget_of_unknown_is_noop() {
            let db = ImportDB::from_blocks(&blocks(&[
                "import aa\n",
                "__forget_imports__ = ['import zz']\n",
            ]))
            .unwrap();
            assert_eq!(db.known_imports.len(), 1);
        }

        #[test]
        fn forget_matches_full_identity() {
            // Forgetting `import foo.bar` must not remove an unrelated
            // import that merely binds `foo`.
            let db = ImportDB::from_blocks(&blocks(&[
                "import foo.bar\nfrom baz import foo\n",
                "__forget_imports__ = ['import foo.bar']\n",
            ]))
            .unwrap();
            let known: Vec<String> = db.known_imports.iter().map(|i| i.to_string()).collect();
            assert_eq!(known, ["from baz import foo"]);
        }

        #[test]
        fn canonical_last_writer_wins() {
            let db = ImportDB::from_blocks(&blocks(&[
                "__canonical_imports__ = {'a.b': 'first.target'}\n",
                "__canonical_imports__ = {'a.b': 'second.target'}\n",
            ]))
            .unwrap();
            assert_eq!(
                db.canonical_imports
                    .get(&"a.b".parse().unwrap())
                    .unwrap()
                    .to_string(),
                "second.target"
            );
        }
    }

    mod paths {
        use super::*;
        use std::fs;

        #[test]
        fn entries_must_be_anchored() {
            let err = resolve_path_spec(Some("relative/path"), Path::new("."));
            assert!(err.is_err());
        }

        #[test]
        fn empty_sentinel() {
            let roots = resolve_path_spec(Some("EMPTY"), Path::new(".")).unwrap();
            assert!(roots.is_empty());
        }

        #[test]
        fn dash_expands_to_default() {
            let roots =
                resolve_path_spec(Some(&format!("/abs{}-", path_sep())), Path::new(".")).unwrap();
            // The absolute entry survives and the defaults are spliced in
            // after it.
            assert_eq!(roots[0], PathBuf::from("/abs"));
            assert!(roots.len() > 1);
        }

        #[test]
        fn tripledot_walks_ancestors_deepest_first() {
            let tmp = tempfile::tempdir().unwrap();
            let deep = tmp.path().join("a/b");
            fs::create_dir_all(&deep).unwrap();
            let roots = resolve_path_spec(Some(".../.tidyimp"), &deep).unwrap();
            let canon = deep.canonicalize().unwrap();
            assert_eq!(roots[0], canon.join(".tidyimp"));
            assert_eq!(roots[1], canon.parent().unwrap().join(".tidyimp"));
        }

        #[test]
        fn contributor_files_sorted_and_recursive() {
            let tmp = tempfile::tempdir().unwrap();
            fs::create_dir_all(tmp.path().join("sub")).unwrap();
            fs::write(tmp.path().join("b.py"), "import os\n").unwrap();
            fs::write(tmp.path().join("a.py"), "import sys\n").unwrap();
            fs::write(tmp.path().join("sub/c.py"), "import re\n").unwrap();
            fs::write(tmp.path().join("ignored.txt"), "").unwrap();
            let files = contributor_files(&[tmp.path().to_path_buf()]);
            let names: Vec<String> = files
                .iter()
                .map(|f| {
                    f.strip_prefix(tmp.path())
                        .unwrap()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
            assert_eq!(names, ["a.py", "b.py", "sub/c.py"]);
        }

        #[test]
        fn vanished_files_are_absent() {
            let tmp = tempfile::tempdir().unwrap();
            let gone = tmp.path().join("gone.py");
            let db = ImportDB::from_files(&[gone]).unwrap();
            assert!(db.known_imports.is_empty());
        }

        #[test]
        fn cache_reuses_loads() {
            let tmp = tempfile::tempdir().unwrap();
            fs::write(tmp.path().join("db.py"), "import os\n").unwrap();
            let spec = tmp.path().to_string_lossy().into_owned();
            let mut cache = DbCache::new();
            let target = tmp.path().join("code.py");
            let a = cache.get_or_load(&target, Some(&spec)).unwrap();
            let b = cache.get_or_load(&target, Some(&spec)).unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            cache.invalidate();
            let c = cache.get_or_load(&target, Some(&spec)).unwrap();
            assert!(!Arc::ptr_eq(&a, &c));
        }
    }
}
