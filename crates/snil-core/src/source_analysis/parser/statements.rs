// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Statement and block parsing.
//!
//! Every statement spans whole lines: its node starts with the line's
//! leading blanks and ends with its newline. Blocks (`if`/`elif`/`else`
//! bodies and `func` bodies) are `Block` nodes holding statement lines.

use crate::cst::SyntaxKind;
use crate::source_analysis::{Diagnostic, DiagnosticCode, Keyword, Span, TokenKind};

use super::{BlockExit, LineLeader, Parser};

impl Parser<'_> {
    // ========================================================================
    // Top level
    // ========================================================================

    /// Parses one top-level statement or blank line.
    pub(super) fn parse_top_level_item(&mut self) {
        match self.line_leader() {
            LineLeader::Blank => self.bump_blank_line(),
            LineLeader::Eof => self.eat_blanks(),
            _ => self.parse_statement(),
        }
    }

    /// Blank lines stay raw tokens of their parent.
    fn bump_blank_line(&mut self) {
        self.eat_blanks();
        if *self.current_kind() == TokenKind::Newline {
            self.bump();
        }
    }

    /// Parses one statement line (or a whole block construct).
    pub(super) fn parse_statement(&mut self) {
        let first = self.significant(0).clone();
        match first {
            TokenKind::Directive(_) => self.parse_directive(),
            TokenKind::Comment(_) => self.parse_comment_line(),
            TokenKind::Keyword(Keyword::If) => self.parse_conditional(),
            TokenKind::Keyword(Keyword::Func) => self.parse_function_def(),
            TokenKind::Keyword(keyword @ (Keyword::Elif | Keyword::Else)) => self.error_line(
                DiagnosticCode::UnmatchedElse,
                format!("`{keyword}` without a matching `if`"),
            ),
            TokenKind::Keyword(Keyword::Endif) => self.error_line(
                DiagnosticCode::UnmatchedEndif,
                "`endif` without a matching `if`",
            ),
            TokenKind::Keyword(Keyword::End) => self.error_line(
                DiagnosticCode::UnmatchedEnd,
                "`end` without a matching `func`",
            ),
            TokenKind::Identifier(name) => match self.significant(1).clone() {
                TokenKind::Colon => self.parse_dialogue(),
                TokenKind::Operator(op) if op == "=" => self.parse_assignment(),
                TokenKind::LeftParen => self.parse_call_statement(),
                other => self.error_line(
                    DiagnosticCode::UnexpectedToken,
                    format!(
                        "expected `:`, `=` or `(` after `{name}`, found {}",
                        other.describe()
                    ),
                ),
            },
            TokenKind::DialogueText(_) | TokenKind::String(_) => self.parse_narration(),
            TokenKind::Unknown(text) => self.error_line(
                DiagnosticCode::UnknownChar,
                format!("unknown character `{text}`"),
            ),
            TokenKind::UnterminatedString(_) => self.error_line(
                DiagnosticCode::UnterminatedString,
                "unterminated string: missing closing `\"` before end of line",
            ),
            other => self.error_line(
                DiagnosticCode::UnexpectedToken,
                format!("unexpected {} at start of line", other.describe()),
            ),
        }
    }

    // ========================================================================
    // Simple statements
    // ========================================================================

    /// `@name arg arg ...`; arguments are kept as raw tokens.
    fn parse_directive(&mut self) {
        self.builder.start_node(SyntaxKind::Directive);
        self.eat_blanks();
        self.bump();
        loop {
            self.eat_blanks();
            let kind = self.current_kind();
            if kind.is_line_end() {
                break;
            }
            if kind.is_error() {
                self.lexical_error();
                break;
            }
            self.bump();
        }
        self.finish_line();
        self.builder.finish_node();
    }

    fn parse_comment_line(&mut self) {
        self.builder.start_node(SyntaxKind::CommentNode);
        self.eat_blanks();
        self.bump();
        self.finish_line();
        self.builder.finish_node();
    }

    /// `Speaker: text`
    fn parse_dialogue(&mut self) {
        self.builder.start_node(SyntaxKind::DialogueLine);
        self.eat_blanks();
        self.bump();
        self.eat_blanks();
        self.bump();
        self.eat_blanks();
        if matches!(self.current_kind(), TokenKind::DialogueText(_)) {
            self.bump();
        }
        self.finish_line();
        self.builder.finish_node();
    }

    /// A narration line: free text or a quoted string.
    fn parse_narration(&mut self) {
        self.builder.start_node(SyntaxKind::DialogueLine);
        self.eat_blanks();
        self.bump();
        self.finish_line();
        self.builder.finish_node();
    }

    /// `name = expr`
    fn parse_assignment(&mut self) {
        self.builder.start_node(SyntaxKind::Assignment);
        self.eat_blanks();
        self.bump();
        self.eat_blanks();
        let equals = self.current_span();
        self.bump();
        self.eat_blanks();
        if self.current_kind().is_line_end() {
            self.error(
                DiagnosticCode::ExpectedExpression,
                "expected an expression after `=`",
                equals,
            );
        } else {
            self.parse_expression();
        }
        self.finish_line();
        self.builder.finish_node();
    }

    /// `name(args)` on its own line.
    fn parse_call_statement(&mut self) {
        self.builder.start_node(SyntaxKind::FunctionCall);
        self.eat_blanks();
        self.bump();
        self.eat_blanks();
        self.parse_arg_list();
        self.finish_line();
        self.builder.finish_node();
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Parses statement lines into a `Block` node until a terminator.
    ///
    /// The terminator line itself is left for the caller.
    pub(super) fn parse_block(&mut self, terminators: &[Keyword]) -> BlockExit {
        self.builder.start_node(SyntaxKind::Block);
        let exit = loop {
            match self.line_leader() {
                LineLeader::Blank => self.bump_blank_line(),
                LineLeader::Eof => {
                    self.eat_blanks();
                    break BlockExit::Eof;
                }
                LineLeader::Label => break BlockExit::Label,
                LineLeader::Keyword(keyword) if terminators.contains(&keyword) => {
                    break BlockExit::Terminator(keyword);
                }
                LineLeader::Keyword(Keyword::End) if self.function_depth > 0 => {
                    break BlockExit::EnclosingEnd;
                }
                _ => self.parse_statement(),
            }
        };
        self.builder.finish_node();
        exit
    }

    /// `if cond ... [elif cond ...]* [else ...] endif`
    fn parse_conditional(&mut self) {
        if self.nesting_exhausted() {
            self.skip_nested_construct();
            return;
        }
        self.enter_nesting();

        let checkpoint = self.builder.checkpoint();
        self.builder.start_node(SyntaxKind::ConditionalBlock);

        let if_span = self.parse_branch_header();
        let mut exit = self.parse_block(&[Keyword::Elif, Keyword::Else, Keyword::Endif]);
        self.builder.finish_node();

        let balanced = loop {
            match exit {
                BlockExit::Terminator(Keyword::Elif) => {
                    self.parse_branch_header();
                    exit = self.parse_block(&[Keyword::Elif, Keyword::Else, Keyword::Endif]);
                    self.builder.finish_node();
                }
                BlockExit::Terminator(Keyword::Else) => {
                    self.builder.start_node(SyntaxKind::Branch);
                    self.eat_blanks();
                    self.bump();
                    self.finish_line();
                    exit = self.parse_block(&[Keyword::Endif]);
                    self.builder.finish_node();
                }
                BlockExit::Terminator(Keyword::Endif) => {
                    self.eat_blanks();
                    self.bump();
                    self.finish_line();
                    break true;
                }
                _ => break false,
            }
        };
        self.builder.finish_node();

        if !balanced {
            self.builder.start_node_at(checkpoint, SyntaxKind::ErrorNode);
            self.builder.finish_node();
            self.report(
                Diagnostic::new(
                    DiagnosticCode::UnbalancedBlock,
                    "`if` block is missing its `endif`",
                    if_span,
                )
                .with_hint("close the block with `endif`"),
            );
        }
        self.leave_nesting();
    }

    /// Opens a `Branch` node and parses an `if`/`elif` header line.
    ///
    /// Returns the keyword span; the caller closes the branch.
    fn parse_branch_header(&mut self) -> Span {
        self.builder.start_node(SyntaxKind::Branch);
        self.eat_blanks();
        let keyword_span = self.current_span();
        let keyword = self.current_kind().clone();
        self.bump();
        self.eat_blanks();
        if self.current_kind().is_line_end() {
            let name = match keyword {
                TokenKind::Keyword(keyword) => keyword.as_str(),
                _ => "if",
            };
            self.error(
                DiagnosticCode::MissingCondition,
                format!("`{name}` needs a condition"),
                keyword_span,
            );
        } else {
            self.parse_expression();
        }
        self.finish_line();
        keyword_span
    }

    /// `func name(params) ... end`
    fn parse_function_def(&mut self) {
        if self.nesting_exhausted() {
            self.skip_nested_construct();
            return;
        }
        self.enter_nesting();

        let checkpoint = self.builder.checkpoint();
        self.builder.start_node(SyntaxKind::FunctionDef);
        self.eat_blanks();
        let func_span = self.current_span();
        self.bump();
        self.eat_blanks();

        if matches!(self.current_kind(), TokenKind::Identifier(_)) {
            self.bump();
            self.eat_blanks();
            if *self.current_kind() == TokenKind::LeftParen {
                self.parse_param_list();
            } else {
                let span = self.current_span();
                self.error(
                    DiagnosticCode::ExpectedToken,
                    "expected `(` after the function name",
                    span,
                );
            }
        } else {
            let span = self.current_span();
            self.error(
                DiagnosticCode::ExpectedToken,
                "expected a function name after `func`",
                span,
            );
        }
        self.finish_line();

        self.function_depth += 1;
        let exit = self.parse_block(&[Keyword::End]);
        self.function_depth -= 1;

        let balanced = exit == BlockExit::Terminator(Keyword::End);
        if balanced {
            self.eat_blanks();
            self.bump();
            self.finish_line();
        }
        self.builder.finish_node();

        if !balanced {
            self.builder.start_node_at(checkpoint, SyntaxKind::ErrorNode);
            self.builder.finish_node();
            self.report(
                Diagnostic::new(
                    DiagnosticCode::UnbalancedBlock,
                    "`func` block is missing its `end`",
                    func_span,
                )
                .with_hint("close the function with `end`"),
            );
        }
        self.leave_nesting();
    }

    /// `(a, b, c)` in a function header.
    fn parse_param_list(&mut self) {
        self.builder.start_node(SyntaxKind::ParamList);
        self.bump();
        self.eat_blanks();
        if *self.current_kind() == TokenKind::RightParen {
            self.bump();
        } else {
            loop {
                if !matches!(self.current_kind(), TokenKind::Identifier(_)) {
                    let span = self.current_span();
                    self.error(DiagnosticCode::ExpectedToken, "expected a parameter name", span);
                    break;
                }
                self.bump();
                self.eat_blanks();
                match self.current_kind() {
                    TokenKind::Comma => {
                        self.bump();
                        self.eat_blanks();
                    }
                    TokenKind::RightParen => {
                        self.bump();
                        break;
                    }
                    _ => {
                        let span = self.current_span();
                        self.error(
                            DiagnosticCode::ExpectedToken,
                            "expected `,` or `)` in parameter list",
                            span,
                        );
                        break;
                    }
                }
            }
        }
        self.builder.finish_node();
    }

    /// Skips a block construct that would exceed the nesting limit.
    ///
    /// The whole construct, up to its balancing closer, becomes one
    /// `ErrorNode` with a single diagnostic. Nothing inside is parsed.
    fn skip_nested_construct(&mut self) {
        self.builder.start_node(SyntaxKind::ErrorNode);
        self.eat_blanks();
        let span = self.current_span();
        let max = self.max_nesting_depth();
        self.report(Diagnostic::new(
            DiagnosticCode::NestingTooDeep,
            format!("blocks are nested too deeply (maximum {max} levels)"),
            span,
        ));

        let mut depth = 0usize;
        loop {
            match self.line_leader() {
                LineLeader::Eof => break,
                LineLeader::Label if depth > 0 => break,
                LineLeader::Keyword(Keyword::If | Keyword::Func) => depth += 1,
                LineLeader::Keyword(Keyword::Endif | Keyword::End) => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
            self.skip_to_line_end();
            if *self.current_kind() == TokenKind::Newline {
                self.bump();
            }
            if depth == 0 {
                break;
            }
        }
        self.builder.finish_node();
    }
}
