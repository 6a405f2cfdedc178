// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Scope analysis: free names and unused imports.
//!
//! The analyzer walks a parsed [`Block`] and computes:
//!
//! - `missing`: identifiers read at a position not covered by a binding in
//!   any enclosing lexical scope (and not a builtin), and
//! - `unused`: imports whose bound name is never read.
//!
//! # Scoping Rules
//!
//! - Module, class, function (including lambda), and comprehension scopes.
//! - A name bound anywhere in a function body is local to that function.
//! - Class bindings are invisible to nested functions: a function scope is
//!   pushed onto a stack from which class scopes have been filtered out.
//! - Loads inside function bodies are deferred until the whole module has
//!   been scanned, so forward references to later module-level bindings
//!   resolve. The local scope is snapshotted at the load site, so a load
//!   before a local store still counts as undefined.
//! - `global` and `nonlocal` declarations redirect stores.
//! - A `from M import *` anywhere suppresses all missing-name reporting,
//!   because any free name might come from `M`. Explicit imports still
//!   count as used when their names are read.
//!
//! Annotations contribute reads, including string-form forward references
//! and f-string interpolations. Names referenced in braces inside string
//! literals (`"{name}"`) mark imports as soft-used so they are never
//! reported unused; with [`AnalysisOptions::docstring_xrefs`] they are also
//! resolved against the module scope and unresolved ones reported.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use crate::block::Block;
use crate::tokenizer::{is_fstring, string_body, tokenize, TokKind};

// ============================================================================
// Public API
// ============================================================================

/// Options for scope analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Resolve `{name}` docstring references against the module scope and
    /// report the unresolved ones in [`Analysis::bad_doc_references`].
    pub docstring_xrefs: bool,
}

/// A free name, with the position of its first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingName {
    pub name: String,
    pub line: usize,
    pub col: usize,
}

/// An import whose bound name is never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedImport {
    /// The bound name the import introduces.
    pub name: String,
    /// 1-indexed line of the import statement.
    pub line: usize,
}

/// Result of analyzing a block.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Free names, ordered by first occurrence.
    pub missing: Vec<MissingName>,
    /// Imports bound but never read, ordered by line.
    pub unused: Vec<UnusedImport>,
    /// Whether the block contains a star import.
    pub has_star_import: bool,
    /// Unresolved docstring references, when requested.
    pub bad_doc_references: Vec<MissingName>,
}

/// Analyze a block with default options.
pub fn analyze(block: &Block) -> Analysis {
    analyze_with(block, &AnalysisOptions::default())
}

/// Analyze a block.
pub fn analyze_with(block: &Block, opts: &AnalysisOptions) -> Analysis {
    Analyzer::new(block).run(opts)
}

// ============================================================================
// Scopes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Class,
    Function,
    Comprehension,
}

#[derive(Debug, Clone, Default)]
struct ScopeData {
    kind: Option<ScopeKind>,
    /// Binding name to the index of the import that created it, if any.
    bindings: HashMap<String, Option<usize>>,
    globals: HashSet<String>,
    nonlocals: HashSet<String>,
}

type ScopeRef = Rc<RefCell<ScopeData>>;

fn new_scope(kind: ScopeKind) -> ScopeRef {
    Rc::new(RefCell::new(ScopeData {
        kind: Some(kind),
        ..ScopeData::default()
    }))
}

fn scope_kind(scope: &ScopeRef) -> ScopeKind {
    scope.borrow().kind.unwrap_or(ScopeKind::Module)
}

#[derive(Debug)]
struct ImportBinding {
    name: String,
    line: usize,
    is_star: bool,
    is_future: bool,
    used: bool,
}

struct Deferred {
    name: String,
    line: usize,
    col: usize,
    stack: Vec<ScopeRef>,
}

// ============================================================================
// Token view
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Tok<'a> {
    kind: TokKind,
    text: &'a str,
    line: usize,
    col: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct ExprCtx {
    /// Inside call parentheses: `name=` is a keyword argument, not a read.
    in_call: bool,
    /// Inside an annotation: string literals are forward references.
    in_annotation: bool,
}

fn is_open(t: &Tok<'_>) -> bool {
    t.kind == TokKind::Op && matches!(t.text, "(" | "[" | "{")
}

fn is_close(t: &Tok<'_>) -> bool {
    t.kind == TokKind::Op && matches!(t.text, ")" | "]" | "}")
}

fn is_op<'a>(t: &Tok<'a>, text: &str) -> bool {
    t.kind == TokKind::Op && t.text == text
}

fn is_name<'a>(t: &Tok<'a>, text: &str) -> bool {
    t.kind == TokKind::Name && t.text == text
}

/// Keywords that are skipped when walking expressions.
fn skip_in_expr(word: &str) -> bool {
    matches!(
        word,
        "and" | "as" | "async" | "await" | "else" | "for" | "from" | "if" | "in" | "is" | "not"
            | "or" | "yield" | "None" | "True" | "False"
    )
}

const AUG_OPS: &[&str] = &[
    "+=", "-=", "*=", "/=", "//=", "%=", "**=", ">>=", "<<=", "&=", "|=", "^=", "@=",
];

fn find_matching_close(span: &[Tok<'_>], open_idx: usize) -> usize {
    let mut depth = 0usize;
    for (i, t) in span.iter().enumerate().skip(open_idx) {
        if is_open(t) {
            depth += 1;
        } else if is_close(t) {
            depth -= 1;
            if depth == 0 {
                return i;
            }
        }
    }
    span.len().saturating_sub(1)
}

// ============================================================================
// Analyzer
// ============================================================================

struct Analyzer<'a> {
    toks: Vec<Tok<'a>>,
    i: usize,
    scopes: Vec<ScopeRef>,
    imports: Vec<ImportBinding>,
    deferred: Vec<Deferred>,
    missing: BTreeMap<String, (usize, usize)>,
    soft_used: HashSet<String>,
    /// `(name, line, col)` of brace references, for doc-xref checking.
    brace_refs: Vec<(String, usize, usize)>,
    star: bool,
    func_depth: usize,
}

fn brace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex"))
}

impl<'a> Analyzer<'a> {
    fn new(block: &'a Block) -> Self {
        let src = block.text().as_str();
        let toks: Vec<Tok<'a>> = block
            .tokens()
            .iter()
            .filter(|t| !matches!(t.kind, TokKind::Comment | TokKind::Nl))
            .map(|t| Tok {
                kind: t.kind,
                text: t.text(src),
                line: t.line,
                col: t.col,
            })
            .collect();
        let mut analyzer = Analyzer {
            toks,
            i: 0,
            scopes: vec![new_scope(ScopeKind::Module)],
            imports: Vec::new(),
            deferred: Vec::new(),
            missing: BTreeMap::new(),
            soft_used: HashSet::new(),
            brace_refs: Vec::new(),
            star: false,
            func_depth: 0,
        };
        // Soft uses: brace references in any string literal.
        for t in block.tokens() {
            if t.kind == TokKind::String {
                let text = t.text(src);
                for cap in brace_re().captures_iter(string_body(text)) {
                    let name = cap[1].to_string();
                    analyzer.soft_used.insert(name.clone());
                    analyzer.brace_refs.push((name, t.line, t.col));
                }
            }
        }
        analyzer
    }

    fn run(mut self, opts: &AnalysisOptions) -> Analysis {
        while !self.at_end() {
            self.walk_statement();
        }
        let deferred = std::mem::take(&mut self.deferred);
        for d in deferred {
            self.check_load(&d.name, d.line, d.col, &d.stack);
        }
        let mut analysis = Analysis {
            has_star_import: self.star,
            ..Analysis::default()
        };
        if !self.star {
            let mut missing: Vec<MissingName> = self
                .missing
                .iter()
                .map(|(name, &(line, col))| MissingName {
                    name: name.clone(),
                    line,
                    col,
                })
                .collect();
            missing.sort_by_key(|m| (m.line, m.col));
            analysis.missing = missing;
        }
        let mut unused: Vec<UnusedImport> = self
            .imports
            .iter()
            .filter(|imp| {
                !imp.used && !imp.is_star && !imp.is_future && !self.soft_used.contains(&imp.name)
            })
            .map(|imp| UnusedImport {
                name: imp.name.clone(),
                line: imp.line,
            })
            .collect();
        unused.sort_by(|a, b| (a.line, &a.name).cmp(&(b.line, &b.name)));
        analysis.unused = unused;
        if opts.docstring_xrefs {
            let module = self.scopes[0].borrow();
            let mut seen = HashSet::new();
            for (name, line, col) in &self.brace_refs {
                if module.bindings.contains_key(name) || is_builtin(name) {
                    continue;
                }
                if seen.insert(name.clone()) {
                    analysis.bad_doc_references.push(MissingName {
                        name: name.clone(),
                        line: *line,
                        col: *col,
                    });
                }
            }
        }
        analysis
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn cur(&self) -> Tok<'a> {
        self.toks[self.i.min(self.toks.len() - 1)]
    }

    fn at_end(&self) -> bool {
        self.cur().kind == TokKind::EndMarker
    }

    fn bump(&mut self) {
        if !self.at_end() {
            self.i += 1;
        }
    }

    /// Tokens from the cursor up to (not including) the logical newline or a
    /// top-level `;`. The cursor ends after a `;`, or on the newline.
    fn span_until_newline(&mut self) -> (usize, usize) {
        let start = self.i;
        while !self.at_end() {
            let t = self.cur();
            if t.kind == TokKind::Newline {
                return (start, self.i);
            }
            if is_op(&t, ";") {
                let end = self.i;
                self.bump();
                return (start, end);
            }
            self.bump();
        }
        (start, self.i)
    }

    /// Tokens from the cursor up to a `:` at bracket depth zero; the colon
    /// is consumed. Stops at a newline as a safety net for bad input.
    fn span_until_colon(&mut self) -> (usize, usize) {
        let start = self.i;
        let mut depth = 0usize;
        while !self.at_end() {
            let t = self.cur();
            if t.kind == TokKind::Newline && depth == 0 {
                return (start, self.i);
            }
            if is_open(&t) {
                depth += 1;
            } else if is_close(&t) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && is_op(&t, ":") {
                let end = self.i;
                self.bump();
                return (start, end);
            }
            self.bump();
        }
        (start, self.i)
    }

    /// The inner span of a bracketed group starting at the cursor. The
    /// cursor ends past the closing bracket.
    fn group_inner(&mut self) -> (usize, usize) {
        debug_assert!(is_open(&self.cur()));
        let mut depth = 0usize;
        let start = self.i + 1;
        while !self.at_end() {
            let t = self.cur();
            if is_open(&t) {
                depth += 1;
            } else if is_close(&t) {
                depth -= 1;
                if depth == 0 {
                    let end = self.i;
                    self.bump();
                    return (start, end);
                }
            }
            self.bump();
        }
        (start, self.i)
    }

    fn slice(&self, range: (usize, usize)) -> Vec<Tok<'a>> {
        self.toks[range.0..range.1].to_vec()
    }

    // ------------------------------------------------------------------
    // Scope operations
    // ------------------------------------------------------------------

    fn store(&mut self, name: &str) {
        self.store_import(name, None)
    }

    fn store_import(&mut self, name: &str, import_idx: Option<usize>) {
        let top = self.scopes.last().expect("scope stack is never empty");
        let target = {
            let data = top.borrow();
            if data.globals.contains(name) {
                self.scopes[0].clone()
            } else if data.nonlocals.contains(name) {
                self.scopes[..self.scopes.len() - 1]
                    .iter()
                    .rev()
                    .find(|s| scope_kind(s) == ScopeKind::Function)
                    .cloned()
                    .unwrap_or_else(|| top.clone())
            } else {
                top.clone()
            }
        };
        target.borrow_mut().bindings.insert(name.to_string(), import_idx);
    }

    fn load(&mut self, name: String, line: usize, col: usize) {
        trace!(name = %name, line, "load");
        if self.func_depth > 0 {
            let stack = self.snapshot();
            self.deferred.push(Deferred {
                name,
                line,
                col,
                stack,
            });
        } else {
            let stack = self.scopes.clone();
            self.check_load(&name, line, col, &stack);
        }
    }

    /// Clone the stack, deep-copying the innermost scope so later local
    /// stores do not retroactively satisfy this load. Outer scopes stay
    /// aliased on purpose: they may legitimately be filled in later.
    fn snapshot(&self) -> Vec<ScopeRef> {
        let mut stack = self.scopes.clone();
        let top = stack.last().expect("scope stack is never empty");
        let cloned = Rc::new(RefCell::new(top.borrow().clone()));
        *stack.last_mut().expect("scope stack is never empty") = cloned;
        stack
    }

    fn check_load(&mut self, name: &str, line: usize, col: usize, stack: &[ScopeRef]) {
        let first = name.split('.').next().expect("split yields one part");
        for scope in stack.iter().rev() {
            if let Some(&binding) = scope.borrow().bindings.get(first) {
                if let Some(idx) = binding {
                    self.imports[idx].used = true;
                }
                return;
            }
        }
        if is_builtin(first) {
            return;
        }
        self.missing
            .entry(first.to_string())
            .or_insert((line, col));
    }

    /// Push a function scope: class scopes are filtered out, so class-body
    /// bindings stay invisible to nested functions.
    fn push_function_scope(&mut self) -> Vec<ScopeRef> {
        let saved = self.scopes.clone();
        self.scopes
            .retain(|s| scope_kind(s) != ScopeKind::Class);
        self.scopes.push(new_scope(ScopeKind::Function));
        self.func_depth += 1;
        saved
    }

    fn pop_function_scope(&mut self, saved: Vec<ScopeRef>) {
        self.func_depth -= 1;
        self.scopes = saved;
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn walk_statement(&mut self) {
        let t = self.cur();
        match t.kind {
            TokKind::Newline | TokKind::Indent | TokKind::Dedent => {
                self.bump();
                return;
            }
            TokKind::EndMarker => return,
            _ => {}
        }
        if t.kind == TokKind::Op && t.text == "@" {
            self.bump();
            let span = self.span_until_newline();
            let span = self.slice(span);
            self.walk_expr(&span, ExprCtx::default());
            return;
        }
        if t.kind == TokKind::Name {
            match t.text {
                "def" => return self.walk_def(),
                "class" => return self.walk_class(),
                "async" => {
                    self.bump();
                    return self.walk_statement();
                }
                "if" | "elif" | "while" => {
                    self.bump();
                    let header = self.span_until_colon();
                    let header = self.slice(header);
                    self.walk_expr(&header, ExprCtx::default());
                    return self.walk_suite();
                }
                "else" | "try" | "finally" => {
                    self.bump();
                    let _ = self.span_until_colon();
                    return self.walk_suite();
                }
                "for" => return self.walk_for(),
                "with" => return self.walk_with(),
                "except" => return self.walk_except(),
                "global" | "nonlocal" => return self.walk_scope_decl(t.text),
                "import" | "from" => return self.walk_import(),
                "del" | "return" | "assert" | "raise" | "yield" | "await" => {
                    self.bump();
                    let span = self.span_until_newline();
                    let span = self.slice(span);
                    self.walk_expr(&span, ExprCtx::default());
                    return;
                }
                "pass" | "break" | "continue" => {
                    let _ = self.span_until_newline();
                    return;
                }
                "match" => {
                    if self.looks_like_match_statement() {
                        return self.walk_match();
                    }
                }
                _ => {}
            }
        }
        self.walk_simple_stmt();
    }

    fn walk_suite(&mut self) {
        if self.cur().kind == TokKind::Newline {
            self.bump();
            if self.cur().kind == TokKind::Indent {
                self.bump();
                while !self.at_end() && self.cur().kind != TokKind::Dedent {
                    self.walk_statement();
                }
                if self.cur().kind == TokKind::Dedent {
                    self.bump();
                }
            }
        } else {
            // Inline suite: simple statements separated by `;`.
            while !self.at_end() && self.cur().kind != TokKind::Newline {
                self.walk_statement();
            }
            if self.cur().kind == TokKind::Newline {
                self.bump();
            }
        }
    }

    fn walk_def(&mut self) {
        self.bump(); // def
        let mut type_params = Vec::new();
        let mut param_names = Vec::new();
        let name_tok = self.cur();
        if name_tok.kind == TokKind::Name {
            self.store(name_tok.text);
            self.bump();
        }
        if is_op(&self.cur(), "[") {
            let inner = self.group_inner();
            let inner = self.slice(inner);
            for t in &inner {
                if t.kind == TokKind::Name && !skip_in_expr(t.text) {
                    type_params.push(t.text.to_string());
                }
            }
        }
        if is_op(&self.cur(), "(") {
            let inner = self.group_inner();
            let inner = self.slice(inner);
            self.walk_params(&inner, &mut param_names);
        }
        if is_op(&self.cur(), "->") {
            self.bump();
            let ret = self.span_until_colon();
            let ret = self.slice(ret);
            self.walk_annotation(&ret);
        } else {
            let _ = self.span_until_colon();
        }
        let saved = self.push_function_scope();
        for p in &type_params {
            self.store(p);
        }
        for p in param_names.clone() {
            self.store(&p);
        }
        self.walk_suite();
        self.pop_function_scope(saved);
    }

    /// Parameter list of a `def` or `lambda`. Annotations and defaults are
    /// evaluated in the enclosing scope; the names are collected for the
    /// function scope the caller is about to push.
    fn walk_params(&mut self, span: &[Tok<'a>], names: &mut Vec<String>) {
        for part in split_top_level(span, ",") {
            let mut part = part;
            while part
                .first()
                .is_some_and(|t| is_op(t, "*") || is_op(t, "**") || is_op(t, "/"))
            {
                part = &part[1..];
            }
            let Some(first) = part.first() else { continue };
            if first.kind != TokKind::Name {
                continue;
            }
            names.push(first.text.to_string());
            let rest = &part[1..];
            // `name : annotation = default`
            let ann_end = rest
                .iter()
                .position(|t| is_op(t, "="))
                .unwrap_or(rest.len());
            if rest.first().is_some_and(|t| is_op(t, ":")) {
                self.walk_annotation(&rest[1..ann_end]);
            }
            if ann_end < rest.len() {
                self.walk_expr(&rest[ann_end + 1..], ExprCtx::default());
            }
        }
    }

    fn walk_class(&mut self) {
        self.bump(); // class
        let name_tok = self.cur();
        let class_name = if name_tok.kind == TokKind::Name {
            self.bump();
            Some(name_tok.text.to_string())
        } else {
            None
        };
        if is_op(&self.cur(), "[") {
            let _ = self.group_inner();
        }
        if is_op(&self.cur(), "(") {
            let inner = self.group_inner();
            let inner = self.slice(inner);
            self.walk_expr(
                &inner,
                ExprCtx {
                    in_call: true,
                    ..ExprCtx::default()
                },
            );
        }
        let _ = self.span_until_colon();
        self.scopes.push(new_scope(ScopeKind::Class));
        self.walk_suite();
        self.scopes.pop();
        // The class name is visible to what follows, not to its own body.
        if let Some(name) = class_name {
            self.store(&name);
        }
    }

    fn walk_for(&mut self) {
        self.bump(); // for
        let target_start = self.i;
        let mut depth = 0usize;
        while !self.at_end() {
            let t = self.cur();
            if is_open(&t) {
                depth += 1;
            } else if is_close(&t) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && is_name(&t, "in") {
                break;
            } else if t.kind == TokKind::Newline {
                break;
            }
            self.bump();
        }
        let targets = self.slice((target_start, self.i));
        self.bump(); // in
        let iter = self.span_until_colon();
        let iter = self.slice(iter);
        self.walk_expr(&iter, ExprCtx::default());
        self.walk_targets(&targets);
        self.walk_suite();
    }

    fn walk_with(&mut self) {
        self.bump(); // with
        let header = self.span_until_colon();
        let mut header = self.slice(header);
        // Parenthesized with-items: strip the outer group when it wraps the
        // whole header and carries top-level `as` or `,` inside.
        if header.first().is_some_and(|t| is_op(t, "("))
            && find_matching_close(&header, 0) == header.len() - 1
        {
            let inner = header[1..header.len() - 1].to_vec();
            let has_item_syntax = split_top_level(&inner, ",").len() > 1
                || inner.iter().any(|t| is_name(t, "as"));
            if has_item_syntax {
                header = inner;
            }
        }
        for item in split_top_level(&header, ",") {
            if let Some(as_idx) = find_top_level(item, |t| is_name(t, "as")) {
                let (expr, target) = item.split_at(as_idx);
                self.walk_expr(expr, ExprCtx::default());
                self.walk_targets(&target[1..]);
            } else {
                self.walk_expr(item, ExprCtx::default());
            }
        }
        self.walk_suite();
    }

    fn walk_except(&mut self) {
        self.bump(); // except
        if is_op(&self.cur(), "*") {
            self.bump();
        }
        let header = self.span_until_colon();
        let header = self.slice(header);
        if let Some(as_idx) = find_top_level(&header, |t| is_name(t, "as")) {
            self.walk_expr(&header[..as_idx], ExprCtx::default());
            if let Some(name) = header.get(as_idx + 1) {
                if name.kind == TokKind::Name {
                    self.store(name.text);
                }
            }
        } else {
            self.walk_expr(&header, ExprCtx::default());
        }
        self.walk_suite();
    }

    fn walk_scope_decl(&mut self, which: &str) {
        self.bump();
        let span = self.span_until_newline();
        let span = self.slice(span);
        let top = self.scopes.last().expect("scope stack is never empty");
        let mut data = top.borrow_mut();
        for t in &span {
            if t.kind == TokKind::Name {
                if which == "global" {
                    data.globals.insert(t.text.to_string());
                } else {
                    data.nonlocals.insert(t.text.to_string());
                }
            }
        }
    }

    fn walk_import(&mut self) {
        let span = self.span_until_newline();
        let span = self.slice(span);
        let line = span[0].line;
        let mut c = 1usize;
        let next_name = |span: &[Tok<'a>], c: &mut usize| -> Option<String> {
            let t = span.get(*c)?;
            if t.kind == TokKind::Name {
                *c += 1;
                Some(t.text.to_string())
            } else {
                None
            }
        };
        if is_name(&span[0], "import") {
            loop {
                let Some(first) = next_name(&span, &mut c) else { break };
                let mut bound = first.clone();
                // Skip the rest of a dotted name.
                while span.get(c).is_some_and(|t| is_op(t, ".")) {
                    c += 1;
                    let _ = next_name(&span, &mut c);
                }
                if span.get(c).is_some_and(|t| is_name(t, "as")) {
                    c += 1;
                    if let Some(alias) = next_name(&span, &mut c) {
                        bound = alias;
                    }
                }
                self.register_import(&bound, line, false, false);
                if span.get(c).is_some_and(|t| is_op(t, ",")) {
                    c += 1;
                } else {
                    break;
                }
            }
            return;
        }
        // from-import
        while span
            .get(c)
            .is_some_and(|t| is_op(t, ".") || is_op(t, "..."))
        {
            c += 1;
        }
        let mut module = String::new();
        while span.get(c).is_some_and(|t| t.kind == TokKind::Name) && !is_name(&span[c], "import") {
            if !module.is_empty() {
                module.push('.');
            }
            module.push_str(span[c].text);
            c += 1;
            if span.get(c).is_some_and(|t| is_op(t, ".")) {
                c += 1;
            }
        }
        if span.get(c).is_some_and(|t| is_name(t, "import")) {
            c += 1;
        }
        let is_future = module == "__future__";
        if span.get(c).is_some_and(|t| is_op(t, "*")) {
            self.register_import("*", line, true, false);
            return;
        }
        if span.get(c).is_some_and(|t| is_op(t, "(")) {
            c += 1;
        }
        loop {
            let Some(member) = next_name(&span, &mut c) else { break };
            let mut bound = member;
            if span.get(c).is_some_and(|t| is_name(t, "as")) {
                c += 1;
                if let Some(alias) = next_name(&span, &mut c) {
                    bound = alias;
                }
            }
            self.register_import(&bound, line, false, is_future);
            if span.get(c).is_some_and(|t| is_op(t, ",")) {
                c += 1;
            } else {
                break;
            }
        }
    }

    fn register_import(&mut self, bound: &str, line: usize, is_star: bool, is_future: bool) {
        let idx = self.imports.len();
        self.imports.push(ImportBinding {
            name: bound.to_string(),
            line,
            is_star,
            is_future,
            used: false,
        });
        if is_star {
            self.star = true;
        } else {
            self.store_import(bound, Some(idx));
        }
    }

    fn looks_like_match_statement(&self) -> bool {
        // `match EXPR:` followed by an indented suite whose first token is
        // `case`. Anything else is the soft keyword used as a plain name.
        let mut depth = 0usize;
        let mut j = self.i + 1;
        let mut colon = None;
        while j < self.toks.len() {
            let t = &self.toks[j];
            if t.kind == TokKind::Newline || t.kind == TokKind::EndMarker {
                break;
            }
            if is_open(t) {
                depth += 1;
            } else if is_close(t) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && is_op(t, ":") {
                colon = Some(j);
            }
            j += 1;
        }
        let Some(colon) = colon else { return false };
        if colon + 1 != j {
            return false;
        }
        matches!(
            (self.toks.get(j + 1), self.toks.get(j + 2)),
            (Some(ind), Some(case))
                if ind.kind == TokKind::Indent && is_name(case, "case")
        )
    }

    fn walk_match(&mut self) {
        self.bump(); // match
        let header = self.span_until_colon();
        let header = self.slice(header);
        self.walk_expr(&header, ExprCtx::default());
        // Suite of case clauses.
        if self.cur().kind == TokKind::Newline {
            self.bump();
        }
        if self.cur().kind != TokKind::Indent {
            return;
        }
        self.bump();
        while !self.at_end() && self.cur().kind != TokKind::Dedent {
            if is_name(&self.cur(), "case") {
                self.bump();
                let header = self.span_until_colon();
                let header = self.slice(header);
                if let Some(if_idx) = find_top_level(&header, |t| is_name(t, "if")) {
                    self.walk_pattern(&header[..if_idx]);
                    self.walk_expr(&header[if_idx + 1..], ExprCtx::default());
                } else {
                    self.walk_pattern(&header);
                }
                self.walk_suite();
            } else {
                self.walk_statement();
            }
        }
        if self.cur().kind == TokKind::Dedent {
            self.bump();
        }
    }

    /// Match patterns: bare names capture (store), dotted names are value
    /// patterns (load), class patterns load the class and recurse.
    fn walk_pattern(&mut self, span: &[Tok<'a>]) {
        let mut i = 0usize;
        let mut after_as = false;
        while i < span.len() {
            let t = &span[i];
            if t.kind == TokKind::Name {
                if is_name(t, "as") {
                    after_as = true;
                    i += 1;
                    continue;
                }
                if skip_in_expr(t.text) {
                    i += 1;
                    continue;
                }
                let mut j = i + 1;
                let mut chain = t.text.to_string();
                while j + 1 < span.len() && is_op(&span[j], ".") && span[j + 1].kind == TokKind::Name
                {
                    chain.push('.');
                    chain.push_str(span[j + 1].text);
                    j += 2;
                }
                let dotted = j > i + 1;
                let called = span.get(j).is_some_and(|t| is_op(t, "("));
                if after_as {
                    self.store(t.text);
                    after_as = false;
                } else if span.get(j).is_some_and(|t| is_op(t, "=")) {
                    // Keyword sub-pattern name inside a class pattern.
                    j += 1;
                } else if dotted || called {
                    self.load(chain, t.line, t.col);
                } else {
                    self.store(t.text);
                }
                i = j;
            } else if is_open(t) {
                let m = find_matching_close(span, i);
                self.walk_pattern(&span[i + 1..m]);
                i = m + 1;
            } else {
                i += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Simple statements and expressions
    // ------------------------------------------------------------------

    fn walk_simple_stmt(&mut self) {
        let span = self.span_until_newline();
        let span = self.slice(span);
        if span.is_empty() {
            return;
        }
        // Locate top-level assignment structure, guarding against lambda
        // bodies (whose `=` defaults and `:` do not delimit the statement).
        let mut depth = 0usize;
        let mut in_lambda = false;
        let mut eq_positions: Vec<usize> = Vec::new();
        let mut aug_pos: Option<usize> = None;
        let mut ann_colon: Option<usize> = None;
        for (idx, t) in span.iter().enumerate() {
            if is_open(t) {
                depth += 1;
            } else if is_close(t) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 {
                if is_name(t, "lambda") {
                    in_lambda = true;
                } else if in_lambda {
                    if is_op(t, ":") {
                        in_lambda = false;
                    }
                } else if is_op(t, "=") {
                    eq_positions.push(idx);
                } else if t.kind == TokKind::Op && AUG_OPS.contains(&t.text) && aug_pos.is_none() {
                    aug_pos = Some(idx);
                } else if is_op(t, ":") && ann_colon.is_none() && eq_positions.is_empty() {
                    ann_colon = Some(idx);
                }
            }
        }
        if let Some(pos) = aug_pos {
            let (target, value) = span.split_at(pos);
            if is_all_target(target) {
                self.collect_export_names(&value[1..]);
            }
            self.walk_expr(&value[1..], ExprCtx::default());
            self.walk_expr(target, ExprCtx::default());
            self.walk_targets(target);
            return;
        }
        if let Some(colon) = ann_colon {
            // Annotated assignment: `target : annotation [= value]`.
            let target = &span[..colon];
            let rest = &span[colon + 1..];
            let eq = rest.iter().enumerate().position(|(k, t)| {
                is_op(t, "=") && top_level_at(rest, k)
            });
            let ann_end = eq.unwrap_or(rest.len());
            self.walk_annotation(&rest[..ann_end]);
            if let Some(eq) = eq {
                self.walk_expr(&rest[eq + 1..], ExprCtx::default());
            }
            self.walk_targets(target);
            return;
        }
        if !eq_positions.is_empty() {
            let value_start = eq_positions[eq_positions.len() - 1] + 1;
            if is_all_target(&span[..eq_positions[0]]) {
                self.collect_export_names(&span[value_start..]);
            }
            self.walk_expr(&span[value_start..], ExprCtx::default());
            let mut seg_start = 0usize;
            for &eq in &eq_positions {
                self.walk_targets(&span[seg_start..eq]);
                seg_start = eq + 1;
            }
            return;
        }
        self.walk_expr(&span, ExprCtx::default());
    }

    /// Names listed as strings in an `__all__` assignment are exports:
    /// imports matching them are soft-used.
    fn collect_export_names(&mut self, span: &[Tok<'a>]) {
        for t in span {
            if t.kind == TokKind::String && !is_fstring(t.text) {
                let body = string_body(t.text);
                if !body.is_empty() && body.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    self.soft_used.insert(body.to_string());
                }
            }
        }
    }

    fn walk_targets(&mut self, span: &[Tok<'a>]) {
        for part in split_top_level(span, ",") {
            let mut part = part;
            while part.first().is_some_and(|t| is_op(t, "*")) {
                part = &part[1..];
            }
            if part.is_empty() {
                continue;
            }
            if part.len() == 1 && part[0].kind == TokKind::Name {
                if !skip_in_expr(part[0].text) {
                    self.store(part[0].text);
                }
                continue;
            }
            if is_open(&part[0]) && find_matching_close(part, 0) == part.len() - 1 {
                let inner = part[1..part.len() - 1].to_vec();
                self.walk_targets(&inner);
                continue;
            }
            // Attribute or subscript target: the base is a read.
            self.walk_expr(part, ExprCtx::default());
        }
    }

    fn walk_annotation(&mut self, span: &[Tok<'a>]) {
        self.walk_expr(
            span,
            ExprCtx {
                in_annotation: true,
                ..ExprCtx::default()
            },
        );
    }

    fn walk_expr(&mut self, span: &[Tok<'a>], ctx: ExprCtx) {
        let mut i = 0usize;
        while i < span.len() {
            let t = &span[i];
            match t.kind {
                TokKind::Name => {
                    if is_name(t, "lambda") {
                        i = self.walk_lambda(span, i);
                        continue;
                    }
                    if skip_in_expr(t.text) {
                        i += 1;
                        continue;
                    }
                    let mut j = i + 1;
                    let mut chain = t.text.to_string();
                    while j + 1 < span.len()
                        && is_op(&span[j], ".")
                        && span[j + 1].kind == TokKind::Name
                    {
                        chain.push('.');
                        chain.push_str(span[j + 1].text);
                        j += 2;
                    }
                    let next = span.get(j);
                    let prev = if i == 0 { None } else { span.get(i - 1) };
                    let kwarg_position = ctx.in_call
                        && j == i + 1
                        && next.is_some_and(|t| is_op(t, "="))
                        && (prev.is_none() || prev.is_some_and(|t| is_op(t, ",")));
                    if kwarg_position {
                        i = j + 1;
                        continue;
                    }
                    if next.is_some_and(|t| is_op(t, ":=")) {
                        self.store(t.text);
                        i = j + 1;
                        continue;
                    }
                    self.load(chain, t.line, t.col);
                    i = j;
                }
                TokKind::String => {
                    if ctx.in_annotation {
                        self.load_names_in(string_body(t.text), t.line, t.col);
                    } else if is_fstring(t.text) {
                        self.walk_fstring(t.text, t.line, t.col);
                    }
                    i += 1;
                }
                TokKind::Op if is_open(t) => {
                    let m = find_matching_close(span, i);
                    let inner = &span[i + 1..m];
                    if has_top_level_for(inner) {
                        self.walk_comprehension(inner);
                    } else {
                        let prev = if i == 0 { None } else { span.get(i - 1) };
                        let in_call = t.text == "("
                            && prev.is_some_and(|p| {
                                (p.kind == TokKind::Name && !skip_in_expr(p.text))
                                    || is_op(p, ")")
                                    || is_op(p, "]")
                                    || p.kind == TokKind::String
                            });
                        self.walk_expr(
                            inner,
                            ExprCtx {
                                in_call,
                                in_annotation: ctx.in_annotation,
                            },
                        );
                    }
                    i = m + 1;
                }
                _ => i += 1,
            }
        }
    }

    /// Walk a lambda starting at `span[i]`; returns the index just past its
    /// body. The body extends to the next top-level comma or the end of the
    /// span.
    fn walk_lambda(&mut self, span: &[Tok<'a>], i: usize) -> usize {
        let mut depth = 0usize;
        let mut colon = None;
        for (k, t) in span.iter().enumerate().skip(i + 1) {
            if is_open(t) {
                depth += 1;
            } else if is_close(t) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && is_op(t, ":") {
                colon = Some(k);
                break;
            }
        }
        let Some(colon) = colon else { return span.len() };
        let mut body_end = span.len();
        let mut depth = 0usize;
        for (k, t) in span.iter().enumerate().skip(colon + 1) {
            if is_open(t) {
                depth += 1;
            } else if is_close(t) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && is_op(t, ",") {
                body_end = k;
                break;
            }
        }
        let params = span[i + 1..colon].to_vec();
        let mut names = Vec::new();
        self.walk_params(&params, &mut names);
        let saved = self.push_function_scope();
        for name in &names {
            self.store(name);
        }
        let body = span[colon + 1..body_end].to_vec();
        self.walk_expr(&body, ExprCtx::default());
        self.pop_function_scope(saved);
        body_end
    }

    /// A comprehension body: bind all `for` targets into a fresh scope,
    /// then walk the whole span in that scope.
    fn walk_comprehension(&mut self, span: &[Tok<'a>]) {
        self.scopes.push(new_scope(ScopeKind::Comprehension));
        let mut depth = 0usize;
        let mut k = 0usize;
        while k < span.len() {
            let t = &span[k];
            if is_open(t) {
                depth += 1;
            } else if is_close(t) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && is_name(t, "for") {
                // Bind targets between `for` and its `in`.
                let start = k + 1;
                let mut j = start;
                let mut d2 = 0usize;
                while j < span.len() {
                    let u = &span[j];
                    if is_open(u) {
                        d2 += 1;
                    } else if is_close(u) {
                        d2 = d2.saturating_sub(1);
                    } else if d2 == 0 && is_name(u, "in") {
                        break;
                    }
                    j += 1;
                }
                let targets = span[start..j].to_vec();
                self.walk_targets(&targets);
                k = j;
                continue;
            }
            k += 1;
        }
        self.walk_expr(span, ExprCtx::default());
        self.scopes.pop();
    }

    /// Extract `{...}` interpolation expressions from an f-string and walk
    /// the names they read.
    fn walk_fstring(&mut self, text: &str, line: usize, col: usize) {
        let body = string_body(text);
        let bytes: Vec<char> = body.chars().collect();
        let mut i = 0usize;
        while i < bytes.len() {
            if bytes[i] == '{' {
                if bytes.get(i + 1) == Some(&'{') {
                    i += 2;
                    continue;
                }
                let mut depth = 1usize;
                let mut j = i + 1;
                let mut expr_end = None;
                while j < bytes.len() {
                    match bytes[j] {
                        '{' | '[' | '(' => depth += 1,
                        '}' | ']' | ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        ':' | '!' | '=' if depth == 1 && expr_end.is_none() => {
                            expr_end = Some(j);
                        }
                        _ => {}
                    }
                    j += 1;
                }
                let end = expr_end.unwrap_or(j.min(bytes.len()));
                let expr: String = bytes[i + 1..end.min(bytes.len())].iter().collect();
                self.load_names_in(&expr, line, col);
                i = j + 1;
            } else {
                i += 1;
            }
        }
    }

    /// Tokenize a code fragment and treat its dotted names as reads. Used
    /// for string-form annotations and f-string interpolations.
    fn load_names_in(&mut self, code: &str, line: usize, col: usize) {
        let Ok(toks) = tokenize(code) else { return };
        let mut i = 0usize;
        while i < toks.len() {
            let t = &toks[i];
            if t.kind == TokKind::Name {
                let text = t.text(code);
                if skip_in_expr(text) || text == "lambda" {
                    i += 1;
                    continue;
                }
                let mut chain = text.to_string();
                let mut j = i + 1;
                while j + 1 < toks.len()
                    && toks[j].kind == TokKind::Op
                    && toks[j].text(code) == "."
                    && toks[j + 1].kind == TokKind::Name
                {
                    chain.push('.');
                    chain.push_str(toks[j + 1].text(code));
                    j += 2;
                }
                // `name=` inside a call fragment is a keyword argument.
                let is_kwarg = j == i + 1
                    && toks
                        .get(j)
                        .is_some_and(|t| t.kind == TokKind::Op && t.text(code) == "=");
                if !is_kwarg {
                    self.load(chain, line, col);
                }
                i = j;
            } else {
                i += 1;
            }
        }
    }
}

// ============================================================================
// Span helpers
// ============================================================================

fn top_level_at(span: &[Tok<'_>], idx: usize) -> bool {
    let mut depth = 0usize;
    for (k, t) in span.iter().enumerate() {
        if k == idx {
            return depth == 0;
        }
        if is_open(t) {
            depth += 1;
        } else if is_close(t) {
            depth = depth.saturating_sub(1);
        }
    }
    false
}

fn split_top_level<'s, 'a>(span: &'s [Tok<'a>], sep: &str) -> Vec<&'s [Tok<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (k, t) in span.iter().enumerate() {
        if is_open(t) {
            depth += 1;
        } else if is_close(t) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && t.kind == TokKind::Op && t.text == sep {
            parts.push(&span[start..k]);
            start = k + 1;
        }
    }
    if start < span.len() {
        parts.push(&span[start..]);
    } else if span.is_empty() {
        // No parts.
    }
    parts
}

fn find_top_level<'a>(span: &[Tok<'a>], pred: impl Fn(&Tok<'a>) -> bool) -> Option<usize> {
    let mut depth = 0usize;
    for (k, t) in span.iter().enumerate() {
        if is_open(t) {
            depth += 1;
        } else if is_close(t) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && pred(t) {
            return Some(k);
        }
    }
    None
}

fn has_top_level_for(span: &[Tok<'_>]) -> bool {
    find_top_level(span, |t| is_name(t, "for")).is_some()
}

fn is_all_target(span: &[Tok<'_>]) -> bool {
    span.len() == 1 && span[0].kind == TokKind::Name && span[0].text == "__all__"
}

// ============================================================================
// Builtins
// ============================================================================

/// Python builtins; free names matching these are never missing.
static BUILTINS: &[&str] = &[
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
    "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError", "BufferError", "BytesWarning",
    "ChildProcessError", "ConnectionAbortedError", "ConnectionError", "ConnectionRefusedError",
    "ConnectionResetError", "DeprecationWarning", "EOFError", "Ellipsis", "EncodingWarning",
    "EnvironmentError", "Exception", "ExceptionGroup", "False", "FileExistsError",
    "FileNotFoundError", "FloatingPointError", "FutureWarning", "GeneratorExit", "IOError",
    "ImportError", "ImportWarning", "IndentationError", "IndexError", "InterruptedError",
    "IsADirectoryError", "KeyError", "KeyboardInterrupt", "LookupError", "MemoryError",
    "ModuleNotFoundError", "NameError", "None", "NotADirectoryError", "NotImplemented",
    "NotImplementedError", "OSError", "OverflowError", "PendingDeprecationWarning",
    "PermissionError", "ProcessLookupError", "RecursionError", "ReferenceError", "ResourceWarning",
    "RuntimeError", "RuntimeWarning", "StopAsyncIteration", "StopIteration", "SyntaxError",
    "SyntaxWarning", "SystemError", "SystemExit", "TabError", "TimeoutError", "True", "TypeError",
    "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError", "UnicodeError",
    "UnicodeTranslateError", "UnicodeWarning", "UserWarning", "ValueError", "Warning",
    "ZeroDivisionError", "__build_class__", "__builtins__", "__debug__", "__doc__", "__file__",
    "__import__", "__loader__", "__name__", "__package__", "__spec__", "abs", "aiter", "all",
    "anext", "any", "ascii", "bin", "bool", "breakpoint", "bytearray", "bytes", "callable", "chr",
    "classmethod", "compile", "complex", "copyright", "credits", "delattr", "dict", "dir",
    "divmod", "enumerate", "eval", "exec", "exit", "filter", "float", "format", "frozenset",
    "getattr", "globals", "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance",
    "issubclass", "iter", "len", "license", "list", "locals", "map", "max", "memoryview", "min",
    "next", "object", "oct", "open", "ord", "pow", "print", "property", "quit", "range", "repr",
    "reversed", "round", "set", "setattr", "slice", "sorted", "staticmethod", "str", "sum",
    "super", "tuple", "type", "vars", "zip",
];

fn is_builtin(name: &str) -> bool {
    BUILTINS.binary_search(&name).is_ok()
}

// ============================================================================
// Tests
// ============================================================================
