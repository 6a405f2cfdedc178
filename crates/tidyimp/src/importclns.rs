// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Import collections: [`ImportSet`] and [`ImportMap`].
//!
//! An `ImportSet` is an unordered, duplicate-free set of imports with
//! derived indexes by bound name and by fullname. Rendering groups the set
//! into `__future__` imports, plain imports, and from-imports, with
//! deterministic ordering independent of insertion order.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use tidyimp_core::{CompilerFlags, DottedName};
use tidyimp_python::Block;

use crate::error::TidyError;
use crate::format::{AlignImports, FormatParams};
use crate::importstmt::{Import, ImportStatement};

// ============================================================================
// ImportSet
// ============================================================================

/// A set of imports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportSet {
    imports: BTreeSet<Import>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from imports. With `ignore_shadowed`, a later import binding
    /// the same name as an earlier one replaces it; star imports are all
    /// kept.
    pub fn from_imports<I: IntoIterator<Item = Import>>(imports: I, ignore_shadowed: bool) -> Self {
        if !ignore_shadowed {
            return Self {
                imports: imports.into_iter().collect(),
            };
        }
        let mut by_name: BTreeMap<String, Import> = BTreeMap::new();
        let mut stars: BTreeSet<Import> = BTreeSet::new();
        for imp in imports {
            if imp.is_star() {
                stars.insert(imp);
            } else {
                by_name.insert(imp.bound_name().to_string(), imp);
            }
        }
        let mut set: BTreeSet<Import> = by_name.into_values().collect();
        set.extend(stars);
        Self { imports: set }
    }

    /// Collect the top-level imports of a block.
    ///
    /// With `ignore_nonimports` false, any non-trivia non-import statement
    /// is an error.
    pub fn from_block(block: &Block, ignore_nonimports: bool) -> Result<Self, TidyError> {
        let mut imports = Vec::new();
        for stmt in block.statements() {
            if let Some(info) = stmt.import_info() {
                imports.extend(ImportStatement::from_info(info).imports());
            } else if stmt.is_trivia() || stmt.is_docstring() || ignore_nonimports {
                continue;
            } else {
                return Err(TidyError::NonImportStatement(
                    block.stmt_body(stmt).trim().to_string(),
                ));
            }
        }
        Ok(Self::from_imports(imports, false))
    }

    /// Parse source containing only import statements.
    pub fn parse(source: &str) -> Result<Self, TidyError> {
        Self::from_block(&Block::parse_str(source)?, false)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn contains(&self, imp: &Import) -> bool {
        self.imports.contains(imp)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter()
    }

    /// Union with another set.
    pub fn with_imports(&self, other: &ImportSet) -> ImportSet {
        let mut imports = self.imports.clone();
        imports.extend(other.imports.iter().cloned());
        ImportSet { imports }
    }

    /// This set without the given imports. A star-form removal
    /// (`from M import *`) removes every from-import under `M`.
    pub fn without_imports(&self, removals: &ImportSet) -> ImportSet {
        if removals.is_empty() {
            return self.clone();
        }
        let star_modules: Vec<DottedName> = removals
            .iter()
            .filter(|imp| imp.is_star())
            .filter_map(|imp| imp.from_module())
            .collect();
        let imports = self
            .imports
            .iter()
            .filter(|imp| {
                if removals.contains(imp) {
                    return false;
                }
                if !star_modules.is_empty() {
                    if let Some(module) = imp.from_module() {
                        if star_modules.iter().any(|m| module.startswith(m)) {
                            return false;
                        }
                    }
                }
                true
            })
            .cloned()
            .collect();
        ImportSet { imports }
    }

    /// Keep only the imports matching a predicate.
    pub fn filter(&self, pred: impl Fn(&Import) -> bool) -> ImportSet {
        ImportSet {
            imports: self.imports.iter().filter(|i| pred(i)).cloned().collect(),
        }
    }

    /// Index from bound name to the imports that bind it.
    pub fn by_import_as(&self) -> BTreeMap<String, Vec<Import>> {
        let mut map: BTreeMap<String, Vec<Import>> = BTreeMap::new();
        for imp in &self.imports {
            map.entry(imp.bound_name().to_string())
                .or_default()
                .push(imp.clone());
        }
        map
    }

    /// Index from fullname to the imports carrying it.
    pub fn by_fullname(&self) -> BTreeMap<DottedName, Vec<Import>> {
        let mut map: BTreeMap<DottedName, Vec<Import>> = BTreeMap::new();
        for imp in &self.imports {
            map.entry(imp.fullname().clone())
                .or_default()
                .push(imp.clone());
        }
        map
    }

    /// Names bound by more than one import. Star imports never conflict.
    pub fn conflicting_names(&self) -> Vec<String> {
        self.by_import_as()
            .into_iter()
            .filter(|(name, imports)| name != "*" && imports.len() > 1)
            .map(|(name, _)| name)
            .collect()
    }

    /// Union of `__future__` flags.
    pub fn flags(&self) -> CompilerFlags {
        CompilerFlags::union(self.imports.iter().map(|i| i.flags()))
    }

    /// Canonicalized statements in render order: future imports first,
    /// then plain imports sorted by lowercased fullname, then from-imports
    /// sorted by lowercased module.
    pub fn statements(&self) -> Vec<ImportStatement> {
        let mut future: Vec<Import> = Vec::new();
        let mut plain: Vec<Import> = Vec::new();
        let mut from_groups: BTreeMap<(String, usize, String), (Vec<Import>, Vec<Import>)> =
            BTreeMap::new();
        for imp in &self.imports {
            if imp.is_future() {
                future.push(imp.clone());
                continue;
            }
            let split = imp.split();
            match split.module {
                None => plain.push(imp.clone()),
                Some(module) => {
                    let key = (module.to_lowercase(), split.level, module);
                    let entry = from_groups.entry(key).or_default();
                    if imp.is_star() {
                        entry.0.push(imp.clone());
                    } else {
                        entry.1.push(imp.clone());
                    }
                }
            }
        }
        let mut out = Vec::new();
        if !future.is_empty() {
            future.sort_by_key(|i| i.split().member.to_lowercase());
            out.push(ImportStatement::from_imports(future).expect("same module"));
        }
        plain.sort_by_key(|i| (i.fullname().to_string().to_lowercase(), i.fullname().clone()));
        for imp in plain {
            out.push(ImportStatement::from_imports(vec![imp]).expect("single import"));
        }
        for (_, (stars, mut rest)) in from_groups {
            for star in stars {
                out.push(ImportStatement::from_imports(vec![star]).expect("single import"));
            }
            if !rest.is_empty() {
                rest.sort_by_key(|i| {
                    let split = i.split();
                    (
                        split
                            .import_as
                            .clone()
                            .unwrap_or_else(|| split.member.clone())
                            .to_lowercase(),
                        split.member,
                    )
                });
                out.push(ImportStatement::from_imports(rest).expect("same module"));
            }
        }
        out
    }

    /// Pretty-print the whole set.
    ///
    /// Groups are separated by a blank line: future imports always form
    /// their own group; plain and from-imports are separated only when
    /// `separate_from_imports` is set.
    pub fn pretty_print(
        &self,
        params: &FormatParams,
        allow_conflicts: bool,
    ) -> Result<String, TidyError> {
        if !allow_conflicts {
            let conflicts = self.conflicting_names();
            if !conflicts.is_empty() {
                let detail = conflicts
                    .iter()
                    .map(|name| {
                        let candidates = self
                            .by_import_as()
                            .remove(name)
                            .unwrap_or_default()
                            .iter()
                            .map(|i| i.fullname().to_string())
                            .join(", ");
                        format!("{:?} imported as {:?}", candidates, name)
                    })
                    .join("; ");
                return Err(TidyError::ConflictingImports(detail));
            }
        }
        let statements = self.statements();
        let import_column = self.import_column(&statements, params);
        let mut sections: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_kind: Option<u8> = None;
        for stmt in &statements {
            let kind = if stmt.is_future() {
                0u8
            } else if stmt.fromname().is_none() || !params.separate_from_imports {
                1
            } else {
                2
            };
            if current_kind.is_some() && current_kind != Some(kind) {
                sections.push(std::mem::take(&mut current));
            }
            current_kind = Some(kind);
            let col = if stmt.is_future() && !params.align_future {
                None
            } else {
                import_column
            };
            current.push_str(&stmt.render_aligned(params, col));
        }
        if !current.is_empty() {
            sections.push(current);
        }
        Ok(sections.join("\n"))
    }

    /// The column the `import` keyword aligns at, per `align_imports`.
    fn import_column(
        &self,
        statements: &[ImportStatement],
        params: &FormatParams,
    ) -> Option<usize> {
        match params.align_imports {
            AlignImports::Off => None,
            AlignImports::Column(col) => Some(col),
            AlignImports::TabStop => {
                let from_spaces = params.from_spaces();
                let max_from = statements
                    .iter()
                    .filter(|s| params.align_future || !s.is_future())
                    .filter_map(|s| s.from_part(from_spaces))
                    .map(|part| part.len())
                    .max()?;
                Some((max_from / 8 + 1) * 8)
            }
        }
    }
}

impl fmt::Display for ImportSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pretty_print(&FormatParams::default(), true) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl FromIterator<Import> for ImportSet {
    fn from_iter<I: IntoIterator<Item = Import>>(iter: I) -> Self {
        Self::from_imports(iter, false)
    }
}

// ============================================================================
// ImportMap
// ============================================================================

/// A map from import fullname to fullname, used for rewrite rules.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportMap {
    map: BTreeMap<DottedName, DottedName>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, TidyError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            let key: DottedName = k
                .parse()
                .map_err(|_| TidyError::ImportFormat(format!("invalid rewrite key {:?}", k)))?;
            let value: DottedName = v
                .parse()
                .map_err(|_| TidyError::ImportFormat(format!("invalid rewrite value {:?}", v)))?;
            map.insert(key, value);
        }
        Ok(Self { map })
    }

    /// Merge another map into this one; the other map wins on overlap.
    pub fn merge(&mut self, other: &ImportMap) {
        for (k, v) in &other.map {
            self.map.insert(k.clone(), v.clone());
        }
    }

    pub fn insert(&mut self, key: DottedName, value: DottedName) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &DottedName) -> Option<&DottedName> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DottedName, &DottedName)> {
        self.map.iter()
    }

    /// Rewrite an import by the most specific matching rule, if any.
    pub fn rewrite(&self, imp: &Import) -> Import {
        let mut rules: Vec<(&DottedName, &DottedName)> = self.map.iter().collect();
        rules.sort_by_key(|(k, _)| std::cmp::Reverse(k.len()));
        for (old, new) in rules {
            if imp.fullname().startswith(old) {
                let replaced = imp.replace(old, new);
                if &replaced != imp {
                    return replaced;
                }
            }
        }
        imp.clone()
    }

    /// Drop rules whose key or value names an import in `removals`.
    pub fn without_imports(&self, removals: &ImportSet) -> ImportMap {
        let removed: BTreeSet<&DottedName> = removals.iter().map(|i| i.fullname()).collect();
        ImportMap {
            map: self
                .map
                .iter()
                .filter(|(k, v)| !removed.contains(k) && !removed.contains(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
