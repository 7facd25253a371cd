// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Error-tolerant recursive descent parser for SNIL.
//!
//! The parser pulls tokens lazily from the [`Lexer`] and builds a green
//! [`Cst`] directly. It is designed for editor use:
//!
//! - **Error recovery is mandatory**: the parser always produces a tree
//!   covering every byte of the input.
//! - **One diagnostic per recovery event**: after reporting, the rest of
//!   the line is wrapped in an `ErrorNode` silently.
//! - **Synchronization points**: the end of the current line for
//!   statement-level errors; the next `@label` line or end of file for an
//!   unterminated block.
//! - **Bounded nesting**: blocks and expressions deeper than the configured
//!   limit are skipped as one `ErrorNode`.
//!
//! # Statement Dispatch
//!
//! A line's first significant token decides the statement. An identifier
//! needs one more token of lookahead:
//!
//! | Next token | Statement |
//! |------------|-----------|
//! | `:` | dialogue line |
//! | `=` | assignment |
//! | `(` | call statement |
//! | anything else | error line |
//!
//! # Usage
//!
//! ```
//! use snil_core::source_analysis::parse;
//!
//! let parsed = parse("if ready\n  Alice: Go!\nendif\n");
//! assert!(parsed.diagnostics().is_empty());
//! assert_eq!(parsed.cst().items().len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use ecow::EcoString;

use crate::cst::{Cst, GreenElement, SyntaxKind, TreeBuilder, element_len};
use crate::source_analysis::{Diagnostic, DiagnosticCode, Lexer, Span, Token, TokenKind};

mod expressions;
mod statements;

#[cfg(test)]
mod property_tests;

/// Maximum nesting depth for blocks and expressions.
///
/// Keeps recursion bounded on adversarial input such as `((((...))))` or a
/// thousand nested `if`s. 64 is generous for any real script.
pub const MAX_NESTING_DEPTH: usize = 64;

// ============================================================================
// Public API
// ============================================================================

/// The result of parsing a whole script.
#[derive(Debug, Clone)]
pub struct Parse {
    cst: Cst,
    diagnostics: Vec<Diagnostic>,
}

impl Parse {
    /// The tree.
    #[must_use]
    pub fn cst(&self) -> &Cst {
        &self.cst
    }

    /// Parse diagnostics with absolute spans, in positional order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Splits into tree and diagnostics.
    #[must_use]
    pub fn into_parts(self) -> (Cst, Vec<Diagnostic>) {
        (self.cst, self.diagnostics)
    }
}

/// Parses a complete script with the default nesting limit.
#[must_use]
pub fn parse(source: &str) -> Parse {
    parse_with_max_depth(source, MAX_NESTING_DEPTH)
}

/// Parses a complete script with an explicit nesting limit.
#[must_use]
pub fn parse_with_max_depth(source: &str, max_nesting_depth: usize) -> Parse {
    let mut parser = ItemParser::new(source, 0, 0, max_nesting_depth);
    let mut elements = Vec::new();
    let mut diagnostics = Vec::new();
    let mut offset = 0;
    while let Some(items) = parser.next_items() {
        for item in items {
            diagnostics.extend(item.diagnostics.iter().map(|d| d.offset_by(offset)));
            offset += element_len(&item.element);
            elements.push(item.element);
        }
    }
    diagnostics.sort_by(Diagnostic::cmp_position);
    Parse {
        cst: Cst::from_items(elements),
        diagnostics,
    }
}

/// One top-level element plus the parse diagnostics raised inside it,
/// with spans relative to the element start.
#[derive(Debug, Clone)]
pub(crate) struct ParsedItem {
    pub(crate) element: GreenElement,
    pub(crate) diagnostics: Arc<[Diagnostic]>,
}

/// Parses top-level items one at a time, starting at any line start.
///
/// The incremental controller uses this to re-parse only the region around
/// an edit and to stop as soon as the new item boundaries line up with the
/// old ones again.
pub(crate) struct ItemParser<'src> {
    parser: Parser<'src>,
}

impl<'src> ItemParser<'src> {
    /// Starts at `offset`, which must be a line start on line `line`.
    pub(crate) fn new(source: &'src str, offset: u32, line: u32, max_nesting_depth: usize) -> Self {
        Self {
            parser: Parser::new(Lexer::resume(source, offset, line), max_nesting_depth),
        }
    }

    /// Offset of the next unparsed byte.
    pub(crate) fn offset(&mut self) -> u32 {
        self.parser.current_span().start()
    }

    /// Returns true if the next item would start at a line start.
    pub(crate) fn at_line_start(&mut self) -> bool {
        self.parser.at_line_start()
    }

    /// Parses the next top-level statement (or blank line).
    ///
    /// Returns `None` at end of input. A statement yields one item; a blank
    /// line yields its raw whitespace and newline tokens.
    pub(crate) fn next_items(&mut self) -> Option<Vec<ParsedItem>> {
        if self.parser.current_kind().is_eof() {
            return None;
        }
        let start = self.offset();
        self.parser.parse_top_level_item();
        let elements = self.parser.builder.finish_items();
        let diagnostics = std::mem::take(&mut self.parser.diagnostics);

        let mut starts = Vec::with_capacity(elements.len());
        let mut offset = start;
        for element in &elements {
            starts.push(offset);
            offset += element_len(element);
        }
        let mut owned: Vec<Vec<Diagnostic>> = vec![Vec::new(); elements.len()];
        for diagnostic in diagnostics {
            let index = starts
                .partition_point(|&s| s <= diagnostic.span.start())
                .saturating_sub(1);
            if let Some(bucket) = owned.get_mut(index) {
                bucket.push(diagnostic.relative_to(starts[index]));
            }
        }
        let items = elements
            .into_iter()
            .zip(owned)
            .map(|(element, diagnostics)| ParsedItem {
                element,
                diagnostics: diagnostics.into(),
            })
            .collect();
        Some(items)
    }
}

// ============================================================================
// Parser state
// ============================================================================

/// Where a block body stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockExit {
    /// One of the requested terminator keywords leads the next line.
    Terminator(crate::source_analysis::Keyword),
    /// An `end` closing an enclosing function.
    EnclosingEnd,
    /// A `@label` line (labels only live at top level).
    Label,
    /// End of input.
    Eof,
}

/// What the first significant token of a line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum LineLeader {
    Blank,
    Eof,
    Keyword(crate::source_analysis::Keyword),
    Label,
    Other,
}

/// The parser state.
pub(super) struct Parser<'src> {
    lexer: Lexer<'src>,
    lookahead: VecDeque<Token>,
    eof: Option<Token>,
    pub(super) builder: TreeBuilder,
    pub(super) diagnostics: Vec<Diagnostic>,
    nesting_depth: usize,
    max_nesting_depth: usize,
    /// Number of enclosing `func` bodies.
    pub(super) function_depth: usize,
    /// A diagnostic was already reported for the current line.
    recovering: bool,
}

impl<'src> Parser<'src> {
    fn new(lexer: Lexer<'src>, max_nesting_depth: usize) -> Self {
        Self {
            lexer,
            lookahead: VecDeque::new(),
            eof: None,
            builder: TreeBuilder::default(),
            diagnostics: Vec::new(),
            nesting_depth: 0,
            max_nesting_depth,
            function_depth: 0,
            recovering: false,
        }
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            match self.lexer.next() {
                Some(token) => self.lookahead.push_back(token),
                None => break,
            }
        }
    }

    /// The `n`th raw token ahead (0 = current), EOF past the end.
    pub(super) fn nth(&mut self, n: usize) -> &Token {
        self.fill(n);
        if n < self.lookahead.len() {
            &self.lookahead[n]
        } else {
            let lexer = &self.lexer;
            self.eof.get_or_insert_with(|| lexer.eof_token())
        }
    }

    pub(super) fn current_kind(&mut self) -> &TokenKind {
        self.nth(0).kind()
    }

    pub(super) fn current_span(&mut self) -> Span {
        self.nth(0).span()
    }

    /// Returns true if the current token is the first on its line.
    pub(super) fn at_line_start(&mut self) -> bool {
        self.nth(0).position().column == 0
    }

    /// The `n`th token ahead that is not whitespace.
    pub(super) fn significant(&mut self, n: usize) -> &TokenKind {
        let index = self.significant_index(n);
        self.nth(index).kind()
    }

    fn significant_index(&mut self, n: usize) -> usize {
        let mut remaining = n;
        let mut index = 0;
        loop {
            let kind = self.nth(index).kind();
            if kind.is_eof() {
                return index;
            }
            if *kind != TokenKind::Whitespace {
                if remaining == 0 {
                    return index;
                }
                remaining -= 1;
            }
            index += 1;
        }
    }

    /// Moves the current token into the tree. A no-op at end of input.
    pub(super) fn bump(&mut self) {
        self.fill(0);
        if let Some(token) = self.lookahead.pop_front() {
            self.builder.token(&token);
        }
    }

    /// Moves any blanks into the tree.
    pub(super) fn eat_blanks(&mut self) {
        while *self.current_kind() == TokenKind::Whitespace {
            self.bump();
        }
    }

    /// Classifies the line starting at the current token.
    pub(super) fn line_leader(&mut self) -> LineLeader {
        match self.significant(0) {
            TokenKind::Newline => LineLeader::Blank,
            TokenKind::Eof => LineLeader::Eof,
            TokenKind::Keyword(keyword) => LineLeader::Keyword(*keyword),
            TokenKind::Directive(name) if name == "@label" => LineLeader::Label,
            _ => LineLeader::Other,
        }
    }

    // ========================================================================
    // Error Handling & Recovery
    // ========================================================================

    /// Reports a diagnostic unless one was already reported on this line.
    pub(super) fn error(&mut self, code: DiagnosticCode, message: impl Into<EcoString>, span: Span) {
        if !self.recovering {
            self.diagnostics.push(Diagnostic::new(code, message, span));
        }
        self.recovering = true;
    }

    /// Reports a diagnostic for a whole construct (not a line-level event).
    pub(super) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Reports the lexical error carried by the current token.
    pub(super) fn lexical_error(&mut self) {
        let span = self.current_span();
        match self.current_kind().clone() {
            TokenKind::Unknown(text) => self.error(
                DiagnosticCode::UnknownChar,
                format!("unknown character `{text}`"),
                span,
            ),
            TokenKind::UnterminatedString(_) => self.error(
                DiagnosticCode::UnterminatedString,
                "unterminated string: missing closing `\"` before end of line",
                span,
            ),
            other => self.error(
                DiagnosticCode::UnexpectedToken,
                format!("unexpected {}", other.describe()),
                span,
            ),
        }
    }

    /// Ends a statement line: an optional trailing comment, then the
    /// newline. Anything else left on the line is wrapped in an
    /// `ErrorNode`, reported only if nothing was reported for this line yet.
    pub(super) fn finish_line(&mut self) {
        self.eat_blanks();
        if matches!(self.current_kind(), TokenKind::Comment(_)) {
            self.bump();
            self.eat_blanks();
        }
        if !matches!(self.current_kind(), TokenKind::Newline | TokenKind::Eof) {
            if self.current_kind().is_error() {
                self.lexical_error();
            } else {
                let span = self.current_span();
                let found = self.current_kind().describe();
                self.error(
                    DiagnosticCode::UnexpectedToken,
                    format!("unexpected {found}, expected end of line"),
                    span,
                );
            }
            self.builder.start_node(SyntaxKind::ErrorNode);
            self.skip_to_line_end();
            self.builder.finish_node();
        }
        if *self.current_kind() == TokenKind::Newline {
            self.bump();
        }
        self.recovering = false;
    }

    /// Bumps tokens up to (not including) the newline.
    pub(super) fn skip_to_line_end(&mut self) {
        while !matches!(self.current_kind(), TokenKind::Newline | TokenKind::Eof) {
            self.bump();
        }
    }

    /// Wraps the whole current line in an `ErrorNode` with one diagnostic
    /// at its first significant token.
    pub(super) fn error_line(&mut self, code: DiagnosticCode, message: impl Into<EcoString>) {
        self.builder.start_node(SyntaxKind::ErrorNode);
        self.eat_blanks();
        let span = self.current_span();
        self.error(code, message, span);
        self.skip_to_line_end();
        if *self.current_kind() == TokenKind::Newline {
            self.bump();
        }
        self.builder.finish_node();
        self.recovering = false;
    }

    /// Enters one nesting level, reporting if the limit is exhausted.
    pub(super) fn enter_nesting(&mut self) -> bool {
        if self.nesting_exhausted() {
            let span = self.current_span();
            let max = self.max_nesting_depth;
            self.error(
                DiagnosticCode::NestingTooDeep,
                format!("nesting is too deep (maximum {max} levels)"),
                span,
            );
            return false;
        }
        self.nesting_depth += 1;
        true
    }

    /// Leaves a nesting level (pair with [`Self::enter_nesting`]).
    pub(super) fn leave_nesting(&mut self) {
        debug_assert!(
            self.nesting_depth > 0,
            "leave_nesting called without matching enter_nesting"
        );
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
    }

    pub(super) fn nesting_exhausted(&self) -> bool {
        self.nesting_depth >= self.max_nesting_depth
    }

    pub(super) fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }
}
