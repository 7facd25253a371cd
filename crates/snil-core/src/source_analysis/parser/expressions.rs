// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression parsing for SNIL.
//!
//! Binary operators use Pratt parsing. Precedence, lowest first:
//!
//! | Level | Operators | Node | Associativity |
//! |-------|-----------|------|---------------|
//! | 1 | `or` | `BinaryExpr` | Left |
//! | 3 | `and` | `BinaryExpr` | Left |
//! | 10 | `==` `!=` `<` `>` `<=` `>=` | `Comparison` | None |
//! | 30 | `+` `-` | `BinaryExpr` | Left |
//! | 40 | `*` `/` | `BinaryExpr` | Left |
//! | 50 | unary `not` `-` | `UnaryExpr` | Prefix |
//!
//! Atoms are literals, variable references, calls `name(args)` and
//! parenthesized expressions.

use crate::cst::SyntaxKind;
use crate::source_analysis::{DiagnosticCode, Keyword, TokenKind};

use super::Parser;

/// Binding power for binary operators (Pratt parsing).
///
/// Higher values bind tighter. Left-associative operators have
/// `right == left + 1`.
#[derive(Debug, Clone, Copy)]
struct BindingPower {
    left: u8,
    right: u8,
}

impl BindingPower {
    const fn left_assoc(precedence: u8) -> Self {
        Self {
            left: precedence,
            right: precedence + 1,
        }
    }
}

/// Binding power of unary prefix operators.
const UNARY: u8 = 50;

/// Gets the binding power and node kind for a binary operator token.
///
/// Returns `None` for anything that cannot continue an expression.
fn binary_binding_power(kind: &TokenKind) -> Option<(BindingPower, SyntaxKind)> {
    match kind {
        TokenKind::Keyword(Keyword::Or) => Some((BindingPower::left_assoc(1), SyntaxKind::BinaryExpr)),
        TokenKind::Keyword(Keyword::And) => {
            Some((BindingPower::left_assoc(3), SyntaxKind::BinaryExpr))
        }
        TokenKind::Operator(op) => match op.as_str() {
            "==" | "!=" | "<" | ">" | "<=" | ">=" => {
                Some((BindingPower::left_assoc(10), SyntaxKind::Comparison))
            }
            "+" | "-" => Some((BindingPower::left_assoc(30), SyntaxKind::BinaryExpr)),
            "*" | "/" => Some((BindingPower::left_assoc(40), SyntaxKind::BinaryExpr)),
            _ => None,
        },
        _ => None,
    }
}

impl Parser<'_> {
    // ========================================================================
    // Expression Parsing
    // ========================================================================

    /// Parses any expression starting at the current (significant) token.
    ///
    /// Uses `stacker::maybe_grow` so the nesting limit, not the thread's
    /// stack size, bounds how deep the recursion goes.
    pub(super) fn parse_expression(&mut self) {
        // 32 KiB red zone, 256 KiB new segment. The nesting limit caps
        // recursion, so few segments are ever needed.
        stacker::maybe_grow(32 * 1024, 256 * 1024, || {
            self.parse_expression_bp(0);
        });
    }

    /// Pratt loop: parses operators binding at least as tight as `min_bp`.
    fn parse_expression_bp(&mut self, min_bp: u8) {
        let checkpoint = self.builder.checkpoint();
        self.parse_unary();
        if self.builder.tokens_since(checkpoint) == 0 {
            // No operand; an operator here would have nothing to its left.
            return;
        }

        let mut after_comparison = false;
        loop {
            let Some((bp, node)) = binary_binding_power(self.significant(0)) else {
                break;
            };
            if bp.left < min_bp {
                break;
            }
            if node == SyntaxKind::Comparison && after_comparison {
                self.eat_blanks();
                let span = self.current_span();
                self.error(
                    DiagnosticCode::UnexpectedToken,
                    "comparison operators cannot be chained; combine them with `and`",
                    span,
                );
                break;
            }
            after_comparison = node == SyntaxKind::Comparison;

            self.builder.start_node_at(checkpoint, node);
            self.eat_blanks();
            self.bump();
            self.eat_blanks();
            self.parse_expression_bp(bp.right);
            self.builder.finish_node();
        }
    }

    /// Parses `not x`, `-x` or an atom.
    fn parse_unary(&mut self) {
        let is_prefix = match self.current_kind() {
            TokenKind::Keyword(Keyword::Not) => true,
            TokenKind::Operator(op) => op == "-",
            _ => false,
        };
        if !is_prefix {
            self.parse_primary();
            return;
        }
        if !self.enter_nesting() {
            return;
        }
        self.builder.start_node(SyntaxKind::UnaryExpr);
        self.bump();
        self.eat_blanks();
        self.parse_expression_bp(UNARY);
        self.builder.finish_node();
        self.leave_nesting();
    }

    /// Parses an atom.
    ///
    /// On error nothing is consumed; the statement's line end wraps the
    /// leftovers in an `ErrorNode`.
    fn parse_primary(&mut self) {
        match self.current_kind().clone() {
            TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::Keyword(Keyword::True | Keyword::False) => self.bump(),
            TokenKind::Identifier(_) => {
                if *self.significant(1) == TokenKind::LeftParen {
                    self.parse_call_expression();
                } else {
                    self.bump();
                }
            }
            TokenKind::LeftParen => self.parse_paren_expression(),
            TokenKind::Unknown(_) | TokenKind::UnterminatedString(_) => self.lexical_error(),
            other => {
                let span = self.current_span();
                self.error(
                    DiagnosticCode::ExpectedExpression,
                    format!("expected an expression, found {}", other.describe()),
                    span,
                );
            }
        }
    }

    /// `name(args)` inside an expression.
    fn parse_call_expression(&mut self) {
        if !self.enter_nesting() {
            return;
        }
        self.builder.start_node(SyntaxKind::FunctionCall);
        self.bump();
        self.eat_blanks();
        self.parse_arg_list();
        self.builder.finish_node();
        self.leave_nesting();
    }

    /// `( expr )`
    fn parse_paren_expression(&mut self) {
        if !self.enter_nesting() {
            return;
        }
        self.builder.start_node(SyntaxKind::ParenExpr);
        self.bump();
        self.eat_blanks();
        self.parse_expression();
        self.eat_blanks();
        if *self.current_kind() == TokenKind::RightParen {
            self.bump();
        } else {
            let span = self.current_span();
            self.error(DiagnosticCode::ExpectedToken, "expected `)`", span);
        }
        self.builder.finish_node();
        self.leave_nesting();
    }

    /// `(a, b, c)` in a call. The current token must be `(`.
    pub(super) fn parse_arg_list(&mut self) {
        self.builder.start_node(SyntaxKind::ArgList);
        self.bump();
        self.eat_blanks();
        if *self.current_kind() == TokenKind::RightParen {
            self.bump();
        } else {
            loop {
                self.parse_expression();
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
                            "expected `,` or `)` in argument list",
                            span,
                        );
                        break;
                    }
                }
            }
        }
        self.builder.finish_node();
    }
}

#[cfg(test)]
mod tests {
    use crate::cst::SyntaxKind;
    use crate::source_analysis::parse;

    /// The expression node of the first statement `x = <expr>`.
    fn expression_kind_tree(source: &str) -> Vec<SyntaxKind> {
        let parsed = parse(source);
        assert!(parsed.diagnostics().is_empty(), "{:?}", parsed.diagnostics());
        let statement = parsed.cst().root().children().next().unwrap();
        statement.descendants().skip(1).map(|node| node.kind()).collect()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            expression_kind_tree("x = 1 + 2 * 3\n"),
            vec![SyntaxKind::BinaryExpr, SyntaxKind::BinaryExpr]
        );
        let parsed = parse("x = 1 + 2 * 3\n");
        let outer = parsed.cst().root().children().next().unwrap().children().next().unwrap();
        assert_eq!(outer.text(), "1 + 2 * 3");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let parsed = parse("x = a or b and c\n");
        let outer = parsed.cst().root().children().next().unwrap().children().next().unwrap();
        assert_eq!(outer.kind(), SyntaxKind::BinaryExpr);
        let inner = outer.children().next().unwrap();
        assert_eq!(inner.text(), "b and c");
    }

    #[test]
    fn unary_binds_tightest() {
        assert_eq!(
            expression_kind_tree("x = not a == b\n"),
            vec![SyntaxKind::Comparison, SyntaxKind::UnaryExpr]
        );
        assert_eq!(
            expression_kind_tree("x = -1 * 2\n"),
            vec![SyntaxKind::BinaryExpr, SyntaxKind::UnaryExpr]
        );
    }

    #[test]
    fn comparison_below_arithmetic() {
        assert_eq!(
            expression_kind_tree("x = a + 1 >= b * 2\n"),
            vec![SyntaxKind::Comparison, SyntaxKind::BinaryExpr, SyntaxKind::BinaryExpr]
        );
    }

    #[test]
    fn nested_calls_and_parens() {
        assert_eq!(
            expression_kind_tree("x = f(1, (g(2)))\n"),
            vec![
                SyntaxKind::FunctionCall,
                SyntaxKind::ArgList,
                SyntaxKind::ParenExpr,
                SyntaxKind::FunctionCall,
                SyntaxKind::ArgList,
            ]
        );
    }

    #[test]
    fn empty_argument_list() {
        assert_eq!(
            expression_kind_tree("x = f()\n"),
            vec![SyntaxKind::FunctionCall, SyntaxKind::ArgList]
        );
    }
}
