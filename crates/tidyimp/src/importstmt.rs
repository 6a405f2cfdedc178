// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The import statement model.
//!
//! An [`Import`] is the desire to bind one name: `{fullname, import_as,
//! level}`. An [`ImportStatement`] is a non-empty collection of imports
//! sharing the same `(level, from_module)`, rendering as one physical
//! `from M import a, b as c` or `import x` line.
//!
//! `import foo.bar as baz` is canonicalized to `from foo import bar as
//! baz`; the two forms bind the same name to the same module.

use std::fmt;

use tidyimp_core::{CompilerFlags, DottedName};
use tidyimp_python::{Block, ImportInfo};

use crate::error::TidyError;
use crate::format::{fill_hanging, fill_packed, FormatParams, HangingIndent};

// ============================================================================
// Import
// ============================================================================

/// A single import binding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Import {
    fullname: DottedName,
    import_as: Option<String>,
    level: usize,
}

/// The token-level split of an import:
/// `from [dots]<module> import <member> as <import_as>`.
///
/// `module` is `None` for the plain `import <member>` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSplit {
    pub module: Option<String>,
    pub level: usize,
    pub member: String,
    pub import_as: Option<String>,
}

impl Import {
    /// Construct an import. An alias equal to a single-atom fullname is
    /// normalized away (`import foo as foo` is `import foo`).
    pub fn from_parts(fullname: DottedName, import_as: Option<String>, level: usize) -> Self {
        let import_as = match import_as {
            Some(alias)
                if level == 0 && fullname.len() == 1 && alias == fullname.first() =>
            {
                None
            }
            other => other,
        };
        Self {
            fullname,
            import_as,
            level,
        }
    }

    /// Parse a dotted identifier as the desire to import it:
    /// `"foo.bar.baz"` means `from foo.bar import baz`.
    pub fn from_identifier(name: &str) -> Result<Self, TidyError> {
        let fullname: DottedName = name
            .parse()
            .map_err(|_| TidyError::ImportFormat(format!("invalid identifier {:?}", name)))?;
        let import_as = if fullname.len() > 1 {
            Some(fullname.last().to_string())
        } else {
            None
        };
        Ok(Self::from_parts(fullname, import_as, 0))
    }

    /// Parse a source string that is either an import statement with a
    /// single alias, or a dotted identifier.
    pub fn parse(source: &str) -> Result<Self, TidyError> {
        if tidyimp_core::idents::is_dotted_identifier(source.trim()) {
            return Self::from_identifier(source.trim());
        }
        let stmt = ImportStatement::parse(source)?;
        let imports = stmt.imports();
        if imports.len() != 1 {
            return Err(TidyError::ImportFormat(format!(
                "expected 1 import, got {} in {:?}",
                imports.len(),
                source
            )));
        }
        Ok(imports.into_iter().next().expect("length checked"))
    }

    pub fn fullname(&self) -> &DottedName {
        &self.fullname
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn import_as(&self) -> Option<&str> {
        self.import_as.as_deref()
    }

    /// The name this import introduces into the namespace: the alias if
    /// present, else the first atom of the fullname.
    pub fn bound_name(&self) -> &str {
        self.import_as
            .as_deref()
            .unwrap_or_else(|| self.fullname.first())
    }

    /// Whether this is a `from M import *`.
    pub fn is_star(&self) -> bool {
        self.fullname.last() == "*"
    }

    /// Token-level split form.
    pub fn split(&self) -> ImportSplit {
        match &self.import_as {
            None if self.level == 0 => ImportSplit {
                module: None,
                level: 0,
                member: self.fullname.to_string(),
                import_as: None,
            },
            _ => {
                let member = self.fullname.last().to_string();
                if self.level == 0 && self.fullname.len() == 1 {
                    // `import foo as f`
                    ImportSplit {
                        module: None,
                        level: 0,
                        member,
                        import_as: self.import_as.clone(),
                    }
                } else {
                    let module = self
                        .fullname
                        .parent()
                        .map(|p| p.to_string())
                        .unwrap_or_default();
                    let import_as = match &self.import_as {
                        Some(alias) if *alias != member => Some(alias.clone()),
                        _ => None,
                    };
                    ImportSplit {
                        module: Some(module),
                        level: self.level,
                        member,
                        import_as,
                    }
                }
            }
        }
    }

    /// The module a from-import pulls from, when there is one.
    pub fn from_module(&self) -> Option<DottedName> {
        match self.split().module {
            Some(m) if !m.is_empty() => m.parse().ok(),
            _ => None,
        }
    }

    /// If this is a `__future__` import, the flag it declares.
    pub fn flags(&self) -> CompilerFlags {
        let split = self.split();
        if split.module.as_deref() == Some("__future__") && self.level == 0 {
            CompilerFlags::from_name(&split.member).unwrap_or(CompilerFlags::EMPTY)
        } else {
            CompilerFlags::EMPTY
        }
    }

    pub fn is_future(&self) -> bool {
        self.level == 0 && self.fullname.first() == "__future__" && self.fullname.len() > 1
    }

    /// Rewrite a dotted prefix of the fullname, preserving the original
    /// bound name by setting an alias where needed.
    ///
    /// ```
    /// use tidyimp::importstmt::Import;
    ///
    /// let imp = Import::parse("import numpy").unwrap();
    /// let out = imp.replace(&"numpy".parse().unwrap(), &"numpy2".parse().unwrap());
    /// assert_eq!(out.to_string(), "import numpy2 as numpy");
    ///
    /// let imp = Import::parse("from aa import bb").unwrap();
    /// let out = imp.replace(&"aa.bb".parse().unwrap(), &"xx.yy".parse().unwrap());
    /// assert_eq!(out.to_string(), "from xx import yy as bb");
    /// ```
    pub fn replace(&self, prefix: &DottedName, replacement: &DottedName) -> Import {
        if self.level != 0 || self.is_star() {
            return self.clone();
        }
        let Some(new_fullname) = self.fullname.replace_prefix(prefix, replacement) else {
            return self.clone();
        };
        let old_bound = self.bound_name().to_string();
        let import_as = match &self.import_as {
            Some(alias) => Some(alias.clone()),
            // A plain import binds its first atom; keep it plain when the
            // rewrite leaves that atom alone, alias it otherwise.
            None if new_fullname.first() == old_bound => None,
            None => Some(old_bound),
        };
        Import::from_parts(new_fullname, import_as, 0)
    }

    /// Render as a single-statement line without a trailing newline.
    pub fn pretty(&self) -> String {
        ImportStatement::from_imports(vec![self.clone()])
            .expect("one import always forms a statement")
            .render(&FormatParams {
                max_line_length: usize::MAX,
                ..FormatParams::default()
            })
            .trim_end()
            .to_string()
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

// ============================================================================
// ImportStatement
// ============================================================================

/// A non-empty ordered collection of imports sharing `(level, module)`,
/// rendering as one physical statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// `None` for plain `import ...`; `Some((level, module))` for
    /// from-imports, where `module` may be empty (`from . import x`).
    fromname: Option<(usize, String)>,
    /// `(member, alias)` pairs. Members are dotted for plain imports.
    aliases: Vec<(String, Option<String>)>,
}

impl ImportStatement {
    /// Parse a single import statement from source.
    pub fn parse(source: &str) -> Result<Self, TidyError> {
        let block = Block::parse_str(source)?;
        let mut imports = None;
        for stmt in block.statements() {
            match (&imports, stmt.import_info()) {
                (None, Some(info)) => imports = Some(info.clone()),
                (Some(_), Some(_)) => {
                    return Err(TidyError::NonImportStatement(format!(
                        "expected a single import statement, got several in {:?}",
                        source
                    )))
                }
                _ if stmt.is_trivia() => {}
                _ => {
                    return Err(TidyError::NonImportStatement(source.trim().to_string()));
                }
            }
        }
        match imports {
            Some(info) => Ok(Self::from_info(&info)),
            None => Err(TidyError::NonImportStatement(source.trim().to_string())),
        }
    }

    /// Build from the parser's import details.
    pub fn from_info(info: &ImportInfo) -> Self {
        let fromname = if info.is_from {
            Some((info.level, info.module.clone()))
        } else {
            None
        };
        let aliases = info
            .names
            .iter()
            .map(|n| (n.name.clone(), n.alias.clone()))
            .collect();
        Self { fromname, aliases }
    }

    /// Build from imports, which must all share the same `(level, module)`.
    pub fn from_imports(imports: Vec<Import>) -> Result<Self, TidyError> {
        let Some(first) = imports.first() else {
            return Err(TidyError::NonImportStatement(
                "empty import list".to_string(),
            ));
        };
        let first_split = first.split();
        let key = (first_split.module.clone(), first_split.level);
        let mut aliases = Vec::with_capacity(imports.len());
        for imp in &imports {
            let split = imp.split();
            if (split.module.clone(), split.level) != key {
                return Err(TidyError::NonImportStatement(format!(
                    "inconsistent modules in one statement: {:?} vs {:?}",
                    key.0, split.module
                )));
            }
            aliases.push((split.member, split.import_as));
        }
        let fromname = key.0.map(|module| (key.1, module));
        Ok(Self { fromname, aliases })
    }

    /// The constituent imports.
    pub fn imports(&self) -> Vec<Import> {
        let mut out = Vec::with_capacity(self.aliases.len());
        for (member, alias) in &self.aliases {
            let imp = match &self.fromname {
                None => {
                    let fullname: DottedName =
                        member.parse().expect("members are validated at parse");
                    Import::from_parts(fullname, alias.clone(), 0)
                }
                Some((level, module)) => {
                    let fullname: DottedName = if module.is_empty() {
                        member.parse().expect("members are validated at parse")
                    } else {
                        let m: DottedName =
                            module.parse().expect("modules are validated at parse");
                        m.join(&member.parse().expect("members are validated at parse"))
                    };
                    let bound = alias.clone().unwrap_or_else(|| member.clone());
                    Import::from_parts(fullname, Some(bound), *level)
                }
            };
            out.push(imp);
        }
        out
    }

    /// Whether this is a from-import, and of which module.
    pub fn fromname(&self) -> Option<(usize, &str)> {
        self.fromname.as_ref().map(|(l, m)| (*l, m.as_str()))
    }

    pub fn is_future(&self) -> bool {
        matches!(&self.fromname, Some((0, m)) if m == "__future__")
    }

    pub fn is_star(&self) -> bool {
        self.aliases.iter().any(|(m, _)| m == "*")
    }

    /// Union of `__future__` flags declared by this statement.
    pub fn flags(&self) -> CompilerFlags {
        CompilerFlags::union(self.imports().iter().map(|i| i.flags()))
    }

    /// The `from M` part including leading dots, for width computation.
    pub fn from_part(&self, from_spaces: usize) -> Option<String> {
        self.fromname.as_ref().map(|(level, module)| {
            format!("from{}{}{}", " ".repeat(from_spaces), ".".repeat(*level), module)
        })
    }

    /// Render with the given parameters.
    ///
    /// `import_column`, when given, is the column the `import` keyword is
    /// padded to; a `from` part that is already past the column wraps with
    /// a backslash.
    pub fn render_aligned(&self, params: &FormatParams, import_column: Option<usize>) -> String {
        let from_spaces = if self.is_future() && !params.align_future {
            1
        } else {
            params.from_spaces()
        };
        let mut s0 = String::new();
        let mut s = String::new();
        if let Some(from_part) = self.from_part(from_spaces) {
            s = format!("{} ", from_part);
            if let Some(col) = import_column {
                if s.len() > col {
                    s0 = format!("{} \\\n", from_part);
                    s = " ".repeat(col);
                } else {
                    while s.len() < col {
                        s.push(' ');
                    }
                }
            }
        }
        s.push_str("import ");
        let tokens: Vec<String> = self
            .aliases
            .iter()
            .map(|(member, alias)| match alias {
                Some(a) => format!("{} as {}", member, a),
                None => member.clone(),
            })
            .collect();
        let body = self.fill(&s, &tokens, params);
        format!("{}{}", s0, body)
    }

    /// Render with default alignment.
    pub fn render(&self, params: &FormatParams) -> String {
        self.render_aligned(params, None)
    }

    fn fill(&self, prefix: &str, tokens: &[String], params: &FormatParams) -> String {
        let max = params.max_line_length;
        let one_line = format!("{}{}", prefix, tokens.join(", "));
        let is_from = self.fromname.is_some();
        // Plain imports and star imports never wrap.
        if !is_from || self.is_star() {
            return format!("{}\n", one_line);
        }
        let force_parens = params.use_parens && tokens.len() > 1;
        if !force_parens && one_line.len() <= max {
            return format!("{}\n", one_line);
        }
        if force_parens {
            let parenthesized = format!("{}({})", prefix, tokens.join(", "));
            if parenthesized.len() <= max
                && params.hanging_indent != HangingIndent::Always
            {
                return format!("{}\n", parenthesized);
            }
        }
        match params.hanging_indent {
            HangingIndent::Never => fill_packed(prefix, tokens, max),
            HangingIndent::Auto | HangingIndent::Always => {
                fill_hanging(prefix, tokens, params.indent_continuation)
            }
        }
    }
}

impl fmt::Display for ImportStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.render(&FormatParams {
            max_line_length: usize::MAX,
            use_parens: false,
            ..FormatParams::default()
        });
        f.write_str(rendered.trim_end())
    }
}

// ============================================================================
// Tests
// ============================================================================
