// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tokenizer for Python source code.
//!
//! Produces the classic Python token stream: `NAME`, `NUMBER`, `STRING`,
//! `OP`, `COMMENT`, logical `NEWLINE` vs. non-logical `NL`, `INDENT` /
//! `DEDENT`, and a final `ENDMARKER`. Implicit line joining inside
//! brackets, explicit backslash continuation, and all string prefixes
//! (including f-strings and triple quotes) are handled. Tokens carry byte
//! spans into the source, so the stream attributes every significant byte.

use tidyimp_core::FilePos;

use thiserror::Error;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokKind {
    /// Identifier or keyword.
    Name,
    /// Numeric literal.
    Number,
    /// String literal, including prefix and quotes.
    String,
    /// Operator or delimiter.
    Op,
    /// A `#` comment, not including the trailing newline.
    Comment,
    /// Logical end of a statement line.
    Newline,
    /// Non-logical newline (blank line, comment line, or inside brackets).
    Nl,
    /// Indentation increased. Zero-width.
    Indent,
    /// Indentation decreased. Zero-width.
    Dedent,
    /// End of input. Zero-width.
    EndMarker,
}

/// A token with its byte span and start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokKind,
    /// Byte offset of the first byte.
    pub start: usize,
    /// Byte offset one past the last byte.
    pub end: usize,
    /// 1-indexed line of the first byte.
    pub line: usize,
    /// 1-indexed column of the first byte.
    pub col: usize,
}

impl Token {
    /// The token's source text.
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    /// The token's start position.
    pub fn pos(&self) -> FilePos {
        FilePos::new(self.line, self.col)
    }
}

/// Tokenizer errors, each carrying the offending position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokError {
    #[error("unterminated string literal starting at {pos}")]
    UnterminatedString { pos: FilePos },
    #[error("unmatched {bracket:?} at {pos}")]
    UnmatchedBracket { bracket: char, pos: FilePos },
    #[error("inconsistent indentation at {pos}")]
    BadIndent { pos: FilePos },
    #[error("unexpected character {ch:?} at {pos}")]
    UnexpectedChar { ch: char, pos: FilePos },
}

impl TokError {
    /// The position the error points at.
    pub fn pos(&self) -> FilePos {
        match self {
            TokError::UnterminatedString { pos }
            | TokError::UnmatchedBracket { pos, .. }
            | TokError::BadIndent { pos }
            | TokError::UnexpectedChar { pos, .. } => *pos,
        }
    }
}

/// Multi-character operators, longest first so maximal munch works.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "!=", ">=", "<=", "==", "->", "+=", "-=", "*=", "/=", "%=",
    "@=", "&=", "|=", "^=", ":=", "**", "//", "<<", ">>",
];

const SINGLE_OPS: &str = "+-*/%@&|^~<>=()[]{},:.;";

/// Tokenize Python source.
///
/// # Example
///
/// ```
/// use tidyimp_python::{tokenize, TokKind};
///
/// let toks = tokenize("x = 1\n").unwrap();
/// let kinds: Vec<TokKind> = toks.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     [TokKind::Name, TokKind::Op, TokKind::Number, TokKind::Newline, TokKind::EndMarker]
/// );
/// ```
pub fn tokenize(src: &str) -> Result<Vec<Token>, TokError> {
    Tokenizer::new(src).run()
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    line_start: usize,
    /// Open brackets with their positions, for error reporting and depth.
    brackets: Vec<(char, FilePos)>,
    indents: Vec<usize>,
    at_line_begin: bool,
    seen_significant: bool,
    toks: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            line_start: 0,
            brackets: Vec::new(),
            indents: vec![0],
            at_line_begin: true,
            seen_significant: false,
            toks: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, off: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(off)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(ch)
    }

    fn cur_pos(&self) -> FilePos {
        FilePos::new(self.line, self.col_at(self.pos))
    }

    fn col_at(&self, offset: usize) -> usize {
        self.src[self.line_start..offset].chars().count() + 1
    }

    fn push(&mut self, kind: TokKind, start: usize, line: usize, col: usize) {
        self.toks.push(Token {
            kind,
            start,
            end: self.pos,
            line,
            col,
        });
    }

    fn push_here(&mut self, kind: TokKind) {
        let pos = self.cur_pos();
        self.toks.push(Token {
            kind,
            start: self.pos,
            end: self.pos,
            line: pos.line,
            col: pos.col,
        });
    }

    fn run(mut self) -> Result<Vec<Token>, TokError> {
        loop {
            if self.at_line_begin && self.brackets.is_empty() {
                self.handle_indentation()?;
            }
            let start = self.pos;
            let line = self.line;
            let col = self.col_at(self.pos);
            let Some(ch) = self.peek() else {
                break;
            };
            match ch {
                ' ' | '\t' | '\x0c' => {
                    self.bump();
                }
                '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    let logical = self.brackets.is_empty() && self.seen_significant;
                    self.push(
                        if logical { TokKind::Newline } else { TokKind::Nl },
                        start,
                        line,
                        col,
                    );
                    self.seen_significant = false;
                    self.at_line_begin = self.brackets.is_empty();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    self.push(TokKind::Comment, start, line, col);
                }
                '\\' => {
                    // Explicit line continuation: backslash then end of line.
                    if matches!(self.peek_at(1), Some('\n') | Some('\r') | None) {
                        self.bump(); // backslash
                        if self.peek() == Some('\r') {
                            self.bump();
                        }
                        if self.peek() == Some('\n') {
                            self.bump();
                        }
                        // Continuation line: no indentation processing.
                    } else {
                        return Err(TokError::UnexpectedChar {
                            ch: '\\',
                            pos: self.cur_pos(),
                        });
                    }
                }
                '\'' | '"' => {
                    self.scan_string(start, line, col)?;
                    self.seen_significant = true;
                }
                c if c.is_alphabetic() || c == '_' => {
                    self.scan_name_or_prefixed_string(start, line, col)?;
                    self.seen_significant = true;
                }
                c if c.is_ascii_digit() => {
                    self.scan_number();
                    self.push(TokKind::Number, start, line, col);
                    self.seen_significant = true;
                }
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.scan_number();
                    self.push(TokKind::Number, start, line, col);
                    self.seen_significant = true;
                }
                _ => {
                    self.scan_operator(start, line, col)?;
                    self.seen_significant = true;
                }
            }
        }
        if let Some(&(bracket, pos)) = self.brackets.first() {
            return Err(TokError::UnmatchedBracket { bracket, pos });
        }
        if self.seen_significant {
            // Final line without a terminating newline.
            self.push_here(TokKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push_here(TokKind::Dedent);
        }
        self.push_here(TokKind::EndMarker);
        Ok(self.toks)
    }

    fn handle_indentation(&mut self) -> Result<(), TokError> {
        let mut col = 0usize;
        loop {
            match self.peek() {
                Some(' ') => {
                    col += 1;
                    self.bump();
                }
                Some('\t') => {
                    col = col / 8 * 8 + 8;
                    self.bump();
                }
                Some('\x0c') => {
                    col = 0;
                    self.bump();
                }
                _ => break,
            }
        }
        self.at_line_begin = false;
        // Blank and comment-only lines never affect the indent stack.
        if matches!(self.peek(), None | Some('\n') | Some('\r') | Some('#')) {
            return Ok(());
        }
        let top = *self.indents.last().expect("indent stack is never empty");
        if col > top {
            self.indents.push(col);
            self.push_here(TokKind::Indent);
        } else if col < top {
            while *self.indents.last().expect("indent stack is never empty") > col {
                self.indents.pop();
                self.push_here(TokKind::Dedent);
            }
            if *self.indents.last().expect("indent stack is never empty") != col {
                return Err(TokError::BadIndent {
                    pos: self.cur_pos(),
                });
            }
        }
        Ok(())
    }

    fn scan_name_or_prefixed_string(
        &mut self,
        start: usize,
        line: usize,
        col: usize,
    ) -> Result<(), TokError> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let word = &self.src[start..self.pos];
        let is_string_prefix = word.len() <= 2
            && word.chars().all(|c| "rbufRBUF".contains(c))
            && matches!(self.peek(), Some('\'') | Some('"'));
        if is_string_prefix {
            self.scan_string(start, line, col)
        } else {
            self.push(TokKind::Name, start, line, col);
            Ok(())
        }
    }

    /// Scan a string literal; `start` covers any prefix letters already
    /// consumed. The cursor is at the opening quote.
    fn scan_string(&mut self, start: usize, line: usize, col: usize) -> Result<(), TokError> {
        let err_pos = FilePos::new(line, col);
        let quote = self.bump().expect("caller checked the quote");
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
            let mut run = 0usize;
            loop {
                match self.bump() {
                    None => return Err(TokError::UnterminatedString { pos: err_pos }),
                    Some('\\') => {
                        run = 0;
                        self.bump();
                    }
                    Some(c) if c == quote => {
                        run += 1;
                        if run == 3 {
                            break;
                        }
                    }
                    Some(_) => run = 0,
                }
            }
        } else {
            loop {
                match self.peek() {
                    None | Some('\n') => {
                        return Err(TokError::UnterminatedString { pos: err_pos });
                    }
                    Some('\\') => {
                        self.bump();
                        self.bump();
                    }
                    Some(c) if c == quote => {
                        self.bump();
                        break;
                    }
                    Some(_) => {
                        self.bump();
                    }
                }
            }
        }
        self.push(TokKind::String, start, line, col);
        Ok(())
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        if self.peek() == Some('0')
            && matches!(
                self.peek_at(1),
                Some('x') | Some('X') | Some('o') | Some('O') | Some('b') | Some('B')
            )
        {
            self.bump();
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
            return;
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' || c == '.' {
                self.bump();
            } else if (c == 'e' || c == 'E')
                && self.pos > start
                && matches!(
                    self.peek_at(1),
                    Some(d) if d.is_ascii_digit() || d == '+' || d == '-'
                )
            {
                self.bump(); // e
                self.bump(); // sign or digit
            } else if c == 'j' || c == 'J' {
                self.bump();
                break;
            } else {
                break;
            }
        }
    }

    fn scan_operator(&mut self, start: usize, line: usize, col: usize) -> Result<(), TokError> {
        for op in OPERATORS {
            if self.src[self.pos..].starts_with(op) {
                for _ in 0..op.chars().count() {
                    self.bump();
                }
                self.push(TokKind::Op, start, line, col);
                return Ok(());
            }
        }
        let ch = self.peek().expect("caller checked non-empty");
        if SINGLE_OPS.contains(ch) {
            let pos = self.cur_pos();
            match ch {
                '(' | '[' | '{' => self.brackets.push((ch, pos)),
                ')' | ']' | '}' => {
                    let expected = match ch {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match self.brackets.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => return Err(TokError::UnmatchedBracket { bracket: ch, pos }),
                    }
                }
                _ => {}
            }
            self.bump();
            self.push(TokKind::Op, start, line, col);
            Ok(())
        } else {
            Err(TokError::UnexpectedChar {
                ch,
                pos: self.cur_pos(),
            })
        }
    }
}

/// Whether a string token's text is an f-string literal.
pub fn is_fstring(text: &str) -> bool {
    text.chars()
        .take_while(|c| *c != '\'' && *c != '"')
        .any(|c| c == 'f' || c == 'F')
}

/// The body of a string token: text between the quotes.
pub fn string_body(text: &str) -> &str {
    let Some(quote_idx) = text.find(['\'', '"']) else {
        return "";
    };
    let quote = text.as_bytes()[quote_idx];
    let rest = &text[quote_idx..];
    let (open_len, close_len) = if rest.len() >= 6
        && rest.as_bytes()[1] == quote
        && rest.as_bytes()[2] == quote
    {
        (3, 3)
    } else {
        (1, 1)
    };
    let inner = &rest[open_len..];
    &inner[..inner.len().saturating_sub(close_len)]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokKind> {
        tokenize(src).unwrap().iter().map(|t| t.kind).collect()
    }

    fn texts(src: &str) -> Vec<String> {
        tokenize(src)
            .unwrap()
            .iter()
            .map(|t| t.text(src).to_string())
            .collect()
    }

    mod basics {
        use super::*;

        #[test]
        fn simple_assignment() {
            assert_eq!(
                kinds("x = 1\n"),
                [
                    TokKind::Name,
                    TokKind::Op,
                    TokKind::Number,
                    TokKind::Newline,
                    TokKind::EndMarker
                ]
            );
        }

        #[test]
        fn newline_synthesized_at_eof() {
            assert_eq!(
                kinds("x = 1"),
                [
                    TokKind::Name,
                    TokKind::Op,
                    TokKind::Number,
                    TokKind::Newline,
                    TokKind::EndMarker
                ]
            );
        }

        #[test]
        fn blank_lines_are_nl() {
            assert_eq!(
                kinds("\n\nx\n"),
                [
                    TokKind::Nl,
                    TokKind::Nl,
                    TokKind::Name,
                    TokKind::Newline,
                    TokKind::EndMarker
                ]
            );
        }

        #[test]
        fn comment_line_is_not_logical() {
            assert_eq!(
                kinds("# hello\nx\n"),
                [
                    TokKind::Comment,
                    TokKind::Nl,
                    TokKind::Name,
                    TokKind::Newline,
                    TokKind::EndMarker
                ]
            );
        }

        #[test]
        fn trailing_comment_keeps_logical_newline() {
            assert_eq!(
                kinds("x = 1  # c\n"),
                [
                    TokKind::Name,
                    TokKind::Op,
                    TokKind::Number,
                    TokKind::Comment,
                    TokKind::Newline,
                    TokKind::EndMarker
                ]
            );
        }

        #[test]
        fn token_positions() {
            let toks = tokenize("a = 1\nbb = 2\n").unwrap();
            assert_eq!((toks[0].line, toks[0].col), (1, 1));
            let bb = toks.iter().find(|t| t.text("a = 1\nbb = 2\n") == "bb").unwrap();
            assert_eq!((bb.line, bb.col), (2, 1));
        }
    }

    mod indentation {
        use super::*;

        #[test]
        fn indent_dedent_pairing() {
            let ks = kinds("def f():\n    pass\n");
            assert_eq!(
                ks,
                [
                    TokKind::Name,
                    TokKind::Name,
                    TokKind::Op,
                    TokKind::Op,
                    TokKind::Op,
                    TokKind::Newline,
                    TokKind::Indent,
                    TokKind::Name,
                    TokKind::Newline,
                    TokKind::Dedent,
                    TokKind::EndMarker
                ]
            );
        }

        #[test]
        fn comment_lines_do_not_dedent() {
            let src = "if x:\n    a\n# comment\n    b\n";
            let ks = kinds(src);
            // A single Indent/Dedent pair despite the column-0 comment.
            assert_eq!(ks.iter().filter(|k| **k == TokKind::Indent).count(), 1);
            assert_eq!(ks.iter().filter(|k| **k == TokKind::Dedent).count(), 1);
        }

        #[test]
        fn inconsistent_indent_rejected() {
            let err = tokenize("if x:\n        a\n  b\n").unwrap_err();
            assert!(matches!(err, TokError::BadIndent { .. }));
        }

        #[test]
        fn dedents_flushed_at_eof() {
            let ks = kinds("if x:\n    if y:\n        a\n");
            assert_eq!(ks.iter().filter(|k| **k == TokKind::Dedent).count(), 2);
        }
    }

    mod continuation {
        use super::*;

        #[test]
        fn backslash_joins_lines() {
            let ks = kinds("x = 1 + \\\n    2\n");
            assert_eq!(ks.iter().filter(|k| **k == TokKind::Newline).count(), 1);
            assert!(!ks.contains(&TokKind::Indent));
        }

        #[test]
        fn brackets_join_lines() {
            let ks = kinds("x = (1 +\n     2)\n");
            assert_eq!(ks.iter().filter(|k| **k == TokKind::Newline).count(), 1);
            assert_eq!(ks.iter().filter(|k| **k == TokKind::Nl).count(), 1);
            assert!(!ks.contains(&TokKind::Indent));
        }

        #[test]
        fn unmatched_open_bracket() {
            assert!(matches!(
                tokenize("x = (1\n").unwrap_err(),
                TokError::UnmatchedBracket { bracket: '(', .. }
            ));
        }

        #[test]
        fn unmatched_close_bracket() {
            assert!(matches!(
                tokenize("x = 1)\n").unwrap_err(),
                TokError::UnmatchedBracket { bracket: ')', .. }
            ));
        }
    }

    mod strings {
        use super::*;

        #[test]
        fn single_and_double() {
            let ts = texts("x = 'a' \"b\"\n");
            assert!(ts.contains(&"'a'".to_string()));
            assert!(ts.contains(&"\"b\"".to_string()));
        }

        #[test]
        fn prefixed() {
            for src in ["r'a\\b'", "b'a'", "rb'a'", "f'{x}'", "F'{x}'", "u'a'"] {
                let full = format!("y = {}\n", src);
                let toks = tokenize(&full).unwrap();
                assert!(
                    toks.iter()
                        .any(|t| t.kind == TokKind::String && t.text(&full) == src),
                    "missing string token for {}",
                    src
                );
            }
        }

        #[test]
        fn triple_quoted_spans_lines() {
            let src = "s = '''\nline2\n'''\n";
            let toks = tokenize(src).unwrap();
            let s = toks.iter().find(|t| t.kind == TokKind::String).unwrap();
            assert_eq!(s.text(src), "'''\nline2\n'''");
        }

        #[test]
        fn escaped_quote() {
            let src = "s = 'a\\'b'\n";
            let toks = tokenize(src).unwrap();
            assert_eq!(
                toks.iter().filter(|t| t.kind == TokKind::String).count(),
                1
            );
        }

        #[test]
        fn unterminated() {
            assert!(matches!(
                tokenize("s = 'abc\n").unwrap_err(),
                TokError::UnterminatedString { .. }
            ));
            assert!(matches!(
                tokenize("s = '''abc\n").unwrap_err(),
                TokError::UnterminatedString { .. }
            ));
        }

        #[test]
        fn body_extraction() {
            assert_eq!(string_body("'abc'"), "abc");
            assert_eq!(string_body("'''ab'''"), "ab");
            assert_eq!(string_body("rb'xy'"), "xy");
            assert!(is_fstring("f'{x}'"));
            assert!(is_fstring("rF'{x}'"));
            assert!(!is_fstring("r'{x}'"));
        }
    }

    mod numbers_and_ops {
        use super::*;

        #[test]
        fn number_forms() {
            for src in ["1", "1_000", "0x1f", "0b101", "0o17", "3.14", "1e5", "1e-5", "2j", ".5"] {
                let full = format!("x = {}\n", src);
                let toks = tokenize(&full).unwrap();
                assert!(
                    toks.iter()
                        .any(|t| t.kind == TokKind::Number && t.text(&full) == src),
                    "missing number token for {}",
                    src
                );
            }
        }

        #[test]
        fn multi_char_operators() {
            for op in ["**", "//", "->", ":=", "==", "!=", "<=", ">=", "**=", "...", "@="] {
                let full = format!("a {} b\n", op);
                let toks = tokenize(&full).unwrap();
                assert!(
                    toks.iter().any(|t| t.kind == TokKind::Op && t.text(&full) == op),
                    "missing op token for {}",
                    op
                );
            }
        }

        #[test]
        fn unexpected_char() {
            assert!(matches!(
                tokenize("a ? b\n").unwrap_err(),
                TokError::UnexpectedChar { ch: '?', .. }
            ));
        }
    }
}
