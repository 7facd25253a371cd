// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexing and parsing for SNIL scripts.
//!
//! **DDD Context:** Source Analysis
//!
//! # Lexical Analysis
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s. Every
//! byte of the input belongs to exactly one token (blanks and newlines
//! included), so the tree built from them reproduces the source exactly.
//! SNIL is line-structured: the first non-blank character of a line decides
//! how the rest of it is tokenized.
//!
//! ```
//! use snil_core::source_analysis::{Lexer, TokenKind};
//!
//! let tokens: Vec<_> = Lexer::new("Alice: Hi!").collect();
//! assert_eq!(tokens.len(), 4); // Alice, :, blank, text
//! assert!(matches!(tokens[3].kind(), TokenKind::DialogueText(_)));
//! ```
//!
//! # Parsing
//!
//! The [`parse`] function builds a concrete syntax tree
//! ([`Cst`](crate::cst::Cst)) plus diagnostics. Binary operator precedence
//! uses Pratt parsing.
//!
//! # Error Handling
//!
//! The lexer never fails: invalid input becomes [`TokenKind::Unknown`] or
//! [`TokenKind::UnterminatedString`] tokens, which the parser turns into
//! [`Diagnostic`]s.

mod diagnostic;
mod lexer;
mod line_index;
mod parser;
mod span;
mod token;

// Property-based tests for the lexer
#[cfg(test)]
mod lexer_property_tests;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use lexer::{Lexer, lex, lex_with_eof};
pub use line_index::{LineIndex, Position};
pub use parser::{MAX_NESTING_DEPTH, Parse, parse, parse_with_max_depth};
pub use span::Span;
pub use token::{Keyword, Token, TokenKind};

pub(crate) use lexer::string_content;
pub(crate) use parser::{ItemParser, ParsedItem};
