// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Lossless split of a Python module into top-level statements.
//!
//! A [`Block`] is an ordered sequence of [`Statement`]s parsed from one
//! [`FileText`]. Every byte of input is attributed to exactly one
//! statement's slice: comment and blank lines directly preceding a
//! statement are owned by that statement as leading trivia, and trailing
//! trivia at end of file forms a final trivia-only statement.
//! Concatenating all statement slices reproduces the input byte-for-byte.
//!
//! Statements are classified as trivia, docstring (a string-literal
//! expression), import, or code. The import classification is the
//! `is_top_level_import_statement` predicate: it is true only for bare
//! `import` / `from ... import` statements at module scope. Decorated,
//! indented, or conditionally-wrapped imports parse as code because they
//! are part of a compound statement's slice.

use tidyimp_core::{CompilerFlags, FilePos, FileText};

use thiserror::Error;
use tracing::debug;

use crate::tokenizer::{tokenize, TokKind, Token};

/// A syntax error with the position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {pos}: {msg}")]
pub struct SyntaxError {
    pub pos: FilePos,
    pub msg: String,
}

impl SyntaxError {
    fn new(pos: FilePos, msg: impl Into<String>) -> Self {
        Self {
            pos,
            msg: msg.into(),
        }
    }
}

impl From<crate::tokenizer::TokError> for SyntaxError {
    fn from(err: crate::tokenizer::TokError) -> Self {
        SyntaxError::new(err.pos(), err.to_string())
    }
}

/// A name imported by an import statement, with its optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// The imported name. Dotted for plain imports, a single identifier
    /// (or `*`) for from-imports.
    pub name: String,
    /// The alias from an `as` clause.
    pub alias: Option<String>,
}

/// Parsed details of a single import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// True for `from ... import ...`, false for plain `import ...`.
    pub is_from: bool,
    /// Module of a from-import; empty for `from . import x` and for
    /// plain imports.
    pub module: String,
    /// Number of leading dots of a relative import.
    pub level: usize,
    /// The imported names. For a star import this is a single `*` entry.
    pub names: Vec<ImportedName>,
    /// Whether this is `from M import *`.
    pub is_star: bool,
    /// 1-indexed line of the statement body.
    pub line: usize,
    /// Whether the statement carries a `# noqa` comment.
    pub has_noqa: bool,
}

/// Classification of a top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Only comments and blank lines.
    Trivia,
    /// A string-literal expression statement.
    Docstring,
    /// A bare top-level import statement.
    Import(ImportInfo),
    /// Anything else.
    Code,
}

/// One top-level statement, spanning `start..end` bytes of the source.
/// The leading trivia occupies `start..body_start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub start: usize,
    pub body_start: usize,
    pub end: usize,
    pub kind: StatementKind,
}

impl Statement {
    /// Whether this is a bare top-level import statement.
    pub fn is_import(&self) -> bool {
        matches!(self.kind, StatementKind::Import(_))
    }

    /// Whether this statement is only comments and blank lines.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, StatementKind::Trivia)
    }

    /// Whether this is a string-literal expression statement.
    pub fn is_docstring(&self) -> bool {
        matches!(self.kind, StatementKind::Docstring)
    }

    /// The parsed import, when this is an import statement.
    pub fn import_info(&self) -> Option<&ImportInfo> {
        match &self.kind {
            StatementKind::Import(info) => Some(info),
            _ => None,
        }
    }
}

/// An ordered sequence of top-level statements parsed from one text.
#[derive(Debug, Clone)]
pub struct Block {
    text: FileText,
    tokens: Vec<Token>,
    statements: Vec<Statement>,
}

impl Block {
    /// Parse source text into a block.
    pub fn parse(text: FileText) -> Result<Block, SyntaxError> {
        let tokens = tokenize(text.as_str())?;
        let statements = split_statements(text.as_str(), &tokens)?;
        debug!(
            statements = statements.len(),
            "parsed block{}",
            text.filename()
                .map(|f| format!(" for {}", f.display()))
                .unwrap_or_default()
        );
        Ok(Block {
            text,
            tokens,
            statements,
        })
    }

    /// Parse a plain string.
    pub fn parse_str(src: &str) -> Result<Block, SyntaxError> {
        Self::parse(FileText::new(src))
    }

    /// The underlying text.
    pub fn text(&self) -> &FileText {
        &self.text
    }

    /// The token stream the block was split from.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The top-level statements.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Full source slice of a statement, leading trivia included.
    pub fn stmt_text(&self, stmt: &Statement) -> &str {
        self.text.slice(stmt.start, stmt.end)
    }

    /// A statement's leading trivia.
    pub fn stmt_trivia(&self, stmt: &Statement) -> &str {
        self.text.slice(stmt.start, stmt.body_start)
    }

    /// A statement's body, without leading trivia.
    pub fn stmt_body(&self, stmt: &Statement) -> &str {
        self.text.slice(stmt.body_start, stmt.end)
    }

    /// Union of the `__future__` flags declared by this block's imports.
    pub fn flags(&self) -> CompilerFlags {
        let mut flags = CompilerFlags::EMPTY;
        for stmt in &self.statements {
            if let Some(info) = stmt.import_info() {
                if info.is_from && info.level == 0 && info.module == "__future__" {
                    for name in &info.names {
                        if let Some(flag) = CompilerFlags::from_name(&name.name) {
                            flags |= flag;
                        }
                    }
                }
            }
        }
        flags
    }
}

// ============================================================================
// Statement splitting
// ============================================================================

struct OpenStmt {
    body_start: usize,
    first_tok: usize,
    last_newline_end: usize,
    is_decorator: bool,
}

/// Keywords that continue a compound statement after a dedent to level 0.
fn continues_compound(word: &str) -> bool {
    matches!(word, "elif" | "else" | "except" | "finally")
}

fn split_statements(src: &str, tokens: &[Token]) -> Result<Vec<Statement>, SyntaxError> {
    let mut statements = Vec::new();
    let mut region_start = 0usize;
    let mut level = 0usize;
    let mut open: Option<OpenStmt> = None;

    // Next token that is not a comment or non-logical newline.
    let peek_sig = |from: usize| -> Option<&Token> {
        tokens[from..]
            .iter()
            .find(|t| !matches!(t.kind, TokKind::Comment | TokKind::Nl))
    };
    // Same, but also skipping indentation tokens.
    let peek_sig_deep = |from: usize| -> Option<&Token> {
        tokens[from..].iter().find(|t| {
            !matches!(
                t.kind,
                TokKind::Comment | TokKind::Nl | TokKind::Indent | TokKind::Dedent
            )
        })
    };

    let mut i = 0usize;
    while i < tokens.len() {
        let tok = &tokens[i];
        match tok.kind {
            TokKind::Indent => level += 1,
            TokKind::Dedent => {
                level -= 1;
                if level == 0 {
                    if let Some(o) = open.take() {
                        let keep = peek_sig(i + 1).is_some_and(|t| {
                            t.kind == TokKind::Name && continues_compound(t.text(src))
                        });
                        if keep {
                            open = Some(o);
                        } else {
                            let stmt = close_statement(src, tokens, region_start, o)?;
                            region_start = stmt.end;
                            statements.push(stmt);
                        }
                    }
                }
            }
            TokKind::Newline => {
                if let Some(o) = open.as_mut() {
                    o.last_newline_end = tok.end;
                    if level == 0 {
                        let next = peek_sig(i + 1);
                        let suite_follows = next.is_some_and(|t| t.kind == TokKind::Indent);
                        let decorated_follows = o.is_decorator
                            && peek_sig_deep(i + 1).is_some_and(|t| {
                                (t.kind == TokKind::Name
                                    && matches!(t.text(src), "def" | "class" | "async"))
                                    || (t.kind == TokKind::Op && t.text(src) == "@")
                            });
                        if !suite_follows && !decorated_follows {
                            let o = open.take().expect("statement is open");
                            let stmt = close_statement(src, tokens, region_start, o)?;
                            region_start = stmt.end;
                            statements.push(stmt);
                        }
                    }
                }
            }
            TokKind::Comment | TokKind::Nl => {}
            TokKind::EndMarker => {
                if let Some(o) = open.take() {
                    let stmt = close_statement(src, tokens, region_start, o)?;
                    region_start = stmt.end;
                    statements.push(stmt);
                }
            }
            _ => {
                if level == 0 && open.is_none() {
                    open = Some(OpenStmt {
                        body_start: tok.start,
                        first_tok: i,
                        last_newline_end: tok.end,
                        is_decorator: tok.kind == TokKind::Op && tok.text(src) == "@",
                    });
                }
            }
        }
        i += 1;
    }

    if region_start < src.len() || (src.is_empty() && statements.is_empty()) {
        statements.push(Statement {
            start: region_start,
            body_start: src.len(),
            end: src.len(),
            kind: StatementKind::Trivia,
        });
    }
    Ok(statements)
}

fn close_statement(
    src: &str,
    tokens: &[Token],
    region_start: usize,
    open: OpenStmt,
) -> Result<Statement, SyntaxError> {
    let end = open.last_newline_end;
    let kind = classify(src, tokens, open.first_tok, end)?;
    Ok(Statement {
        start: region_start,
        body_start: open.body_start,
        end,
        kind,
    })
}

fn classify(
    src: &str,
    tokens: &[Token],
    first_tok: usize,
    end: usize,
) -> Result<StatementKind, SyntaxError> {
    // Tokens belonging to this statement's body.
    let body: Vec<&Token> = tokens[first_tok..]
        .iter()
        .take_while(|t| t.start < end)
        .collect();
    let sig: Vec<&Token> = body
        .iter()
        .copied()
        .filter(|t| {
            !matches!(
                t.kind,
                TokKind::Comment | TokKind::Nl | TokKind::Newline | TokKind::Indent | TokKind::Dedent
            )
        })
        .collect();
    let Some(first) = sig.first() else {
        return Ok(StatementKind::Trivia);
    };
    if first.kind == TokKind::Name {
        let word = first.text(src);
        if word == "import" || word == "from" {
            // A semicolon makes this a multi-statement line; leave it as code.
            let has_semicolon = sig
                .iter()
                .any(|t| t.kind == TokKind::Op && t.text(src) == ";");
            if !has_semicolon {
                let has_noqa = body.iter().any(|t| {
                    t.kind == TokKind::Comment && is_noqa_comment(t.text(src))
                });
                let info = parse_import(src, &sig, has_noqa)?;
                return Ok(StatementKind::Import(info));
            }
        }
    }
    if sig.iter().all(|t| t.kind == TokKind::String) {
        return Ok(StatementKind::Docstring);
    }
    Ok(StatementKind::Code)
}

/// Whether a comment is a `# noqa` pragma. Unrecognized comments are not
/// pragmatic.
pub fn is_noqa_comment(comment: &str) -> bool {
    let body = comment.trim_start_matches('#').trim_start();
    let lower = body.to_ascii_lowercase();
    lower == "noqa" || lower.starts_with("noqa:") || lower.starts_with("noqa ")
}

// ============================================================================
// Import statement parsing
// ============================================================================

struct TokCursor<'a, 't> {
    src: &'a str,
    toks: &'t [&'t Token],
    i: usize,
}

impl<'a, 't> TokCursor<'a, 't> {
    fn peek(&self) -> Option<Token> {
        self.toks.get(self.i).map(|t| **t)
    }

    fn peek_text(&self) -> Option<&'a str> {
        self.peek().map(|t| t.text(self.src))
    }

    fn bump(&mut self) {
        if self.i < self.toks.len() {
            self.i += 1;
        }
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.peek_text() == Some(text) {
            self.i += 1;
            true
        } else {
            false
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(t) if t.kind == TokKind::Name => {
                let text = t.text(self.src).to_string();
                self.i += 1;
                Ok(text)
            }
            Some(t) => Err(SyntaxError::new(
                t.pos(),
                format!("expected {}, got {:?}", what, t.text(self.src)),
            )),
            None => Err(SyntaxError::new(
                FilePos::start(),
                format!("expected {}, got end of statement", what),
            )),
        }
    }

    fn err_here(&self, msg: impl Into<String>) -> SyntaxError {
        match self.peek() {
            Some(t) => SyntaxError::new(t.pos(), msg),
            None => SyntaxError::new(FilePos::start(), msg),
        }
    }

    /// A dotted name: `a.b.c`.
    fn dotted_name(&mut self) -> Result<String, SyntaxError> {
        let mut name = self.expect_name("module name")?;
        while self.eat(".") {
            name.push('.');
            name.push_str(&self.expect_name("name after '.'")?);
        }
        Ok(name)
    }

    /// Optional `as <name>` clause.
    fn as_clause(&mut self) -> Result<Option<String>, SyntaxError> {
        if self.peek_text() == Some("as") {
            self.i += 1;
            Ok(Some(self.expect_name("name after 'as'")?))
        } else {
            Ok(None)
        }
    }
}

fn parse_import(src: &str, sig: &[&Token], has_noqa: bool) -> Result<ImportInfo, SyntaxError> {
    let line = sig[0].line;
    let mut c = TokCursor { src, toks: sig, i: 0 };
    if c.eat("import") {
        let mut names = Vec::new();
        loop {
            let name = c.dotted_name()?;
            let alias = c.as_clause()?;
            names.push(ImportedName { name, alias });
            if !c.eat(",") {
                break;
            }
        }
        if c.peek().is_some() {
            return Err(c.err_here("unexpected token in import statement"));
        }
        return Ok(ImportInfo {
            is_from: false,
            module: String::new(),
            level: 0,
            names,
            is_star: false,
            line,
            has_noqa,
        });
    }
    if !c.eat("from") {
        return Err(c.err_here("expected 'import' or 'from'"));
    }
    let mut level = 0usize;
    loop {
        match c.peek_text() {
            Some(".") => {
                level += 1;
                c.bump();
            }
            Some("...") => {
                level += 3;
                c.bump();
            }
            _ => break,
        }
    }
    let module = if c.peek_text() == Some("import") {
        if level == 0 {
            return Err(c.err_here("missing module name in from-import"));
        }
        String::new()
    } else {
        c.dotted_name()?
    };
    if !c.eat("import") {
        return Err(c.err_here("expected 'import'"));
    }
    if c.eat("*") {
        if c.peek().is_some() {
            return Err(c.err_here("unexpected token after '*'"));
        }
        return Ok(ImportInfo {
            is_from: true,
            module,
            level,
            names: vec![ImportedName {
                name: "*".to_string(),
                alias: None,
            }],
            is_star: true,
            line,
            has_noqa,
        });
    }
    let parenthesized = c.eat("(");
    let mut names = Vec::new();
    loop {
        if parenthesized && c.peek_text() == Some(")") {
            break;
        }
        let name = c.expect_name("imported name")?;
        let alias = c.as_clause()?;
        names.push(ImportedName { name, alias });
        if !c.eat(",") {
            break;
        }
    }
    if parenthesized && !c.eat(")") {
        return Err(c.err_here("expected ')'"));
    }
    if c.peek().is_some() {
        return Err(c.err_here("unexpected token in import statement"));
    }
    if names.is_empty() {
        return Err(c.err_here("empty import list"));
    }
    Ok(ImportInfo {
        is_from: true,
        module,
        level,
        names,
        is_star: false,
        line,
        has_noqa,
    })
}

// ============================================================================
// Tests
// ============================================================================
