// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token types for SNIL lexical analysis.
//!
//! Unlike a trivia-carrying lexer, blanks, newlines and comments are real
//! tokens here: the tokens of a script partition its text exactly, which is
//! what lets the CST reproduce the input byte for byte and lets incremental
//! re-lexing restart at any line start.

use ecow::EcoString;

use super::{Position, Span};

/// Reserved words.
///
/// `if elif else endif func end` are recognised at line start; the rest only
/// appear inside expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    If,
    Elif,
    Else,
    Endif,
    Func,
    End,
    And,
    Or,
    Not,
    True,
    False,
}

impl Keyword {
    /// All keywords in completion order.
    pub const ALL: [Self; 11] = [
        Self::If,
        Self::Elif,
        Self::Else,
        Self::Endif,
        Self::Func,
        Self::End,
        Self::And,
        Self::Or,
        Self::Not,
        Self::True,
        Self::False,
    ];

    /// Looks up a keyword by its spelling.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|keyword| keyword.as_str() == word)
    }

    /// The keyword's spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::Endif => "endif",
            Self::Func => "func",
            Self::End => "end",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::True => "true",
            Self::False => "false",
        }
    }

    /// Keywords that open, continue or close a block when they lead a line.
    #[must_use]
    pub const fn is_statement_keyword(self) -> bool {
        matches!(
            self,
            Self::If | Self::Elif | Self::Else | Self::Endif | Self::Func | Self::End
        )
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of token, not including source location.
///
/// Payload strings are [`EcoString`]s so tokens are cheap to clone into the
/// green tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // === Line leaders ===
    /// A directive name including the `@`: `@character`
    Directive(EcoString),

    /// Free text of a dialogue or narration line, trailing blanks trimmed.
    DialogueText(EcoString),

    /// A line comment including the leading `//`.
    Comment(EcoString),

    // === Code ===
    /// A reserved word.
    Keyword(Keyword),

    /// An identifier: `Alice`, `trust_level`
    Identifier(EcoString),

    /// A number literal: `3`, `0.5`
    Number(EcoString),

    /// A double-quoted string; the payload is the unescaped content.
    String(EcoString),

    /// An operator: `= == != < <= > >= + - * /`
    Operator(EcoString),

    /// `:`
    Colon,

    /// `(`
    LeftParen,

    /// `)`
    RightParen,

    /// `,`
    Comma,

    // === Layout ===
    /// A run of blanks (spaces, tabs, lone carriage returns).
    Whitespace,

    /// `\n` or `\r\n`.
    Newline,

    // === Errors ===
    /// A character that starts no token.
    Unknown(EcoString),

    /// A string missing its closing quote; the payload is the content so far.
    UnterminatedString(EcoString),

    /// End of file (never stored in the CST).
    Eof,
}

impl TokenKind {
    /// Blanks and newlines: tokens the parser steps over inside a line.
    #[must_use]
    pub const fn is_layout(&self) -> bool {
        matches!(self, Self::Whitespace | Self::Newline)
    }

    /// Tokens that end a statement line.
    #[must_use]
    pub const fn is_line_end(&self) -> bool {
        matches!(self, Self::Newline | Self::Eof | Self::Comment(_))
    }

    /// Returns `true` if this is the end-of-file marker.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Returns `true` for lexical error tokens.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Unknown(_) | Self::UnterminatedString(_))
    }

    /// Returns true if the token is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Self::Keyword(k) if *k == keyword)
    }

    /// Returns true if the token is the given operator.
    #[must_use]
    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self, Self::Operator(o) if o == op)
    }

    /// Returns the identifier name, if this is an identifier.
    #[must_use]
    pub fn identifier(&self) -> Option<&EcoString> {
        match self {
            Self::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// A short human-readable description for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Directive(name) => format!("directive `{name}`"),
            Self::DialogueText(_) => "dialogue text".to_string(),
            Self::Comment(_) => "comment".to_string(),
            Self::Keyword(keyword) => format!("keyword `{keyword}`"),
            Self::Identifier(name) => format!("identifier `{name}`"),
            Self::Number(n) => format!("number `{n}`"),
            Self::String(_) => "string".to_string(),
            Self::Operator(op) => format!("`{op}`"),
            Self::Colon => "`:`".to_string(),
            Self::LeftParen => "`(`".to_string(),
            Self::RightParen => "`)`".to_string(),
            Self::Comma => "`,`".to_string(),
            Self::Whitespace => "whitespace".to_string(),
            Self::Newline => "end of line".to_string(),
            Self::Unknown(text) => format!("unknown character `{text}`"),
            Self::UnterminatedString(_) => "unterminated string".to_string(),
            Self::Eof => "end of file".to_string(),
        }
    }
}

/// A token with its source location.
///
/// The raw `text` is kept alongside the classified kind so the CST can
/// reproduce the input exactly (string tokens keep their quotes and escapes).
///
/// # Examples
///
/// ```
/// use snil_core::source_analysis::{Position, Span, Token, TokenKind};
///
/// let token = Token::new(
///     TokenKind::Identifier("Alice".into()),
///     Span::new(0, 5),
///     "Alice",
///     Position::new(0, 0),
/// );
/// assert_eq!(token.text(), "Alice");
/// assert_eq!(token.span().len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    span: Span,
    text: EcoString,
    position: Position,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, span: Span, text: impl Into<EcoString>, position: Position) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
            position,
        }
    }

    /// Returns the kind of this token.
    #[must_use]
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Returns the byte span.
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Returns the raw source text.
    #[must_use]
    pub fn text(&self) -> &EcoString {
        &self.text
    }

    /// Line/column of the first byte.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Splits the token into its kind and raw text.
    #[must_use]
    pub fn into_parts(self) -> (TokenKind, EcoString) {
        (self.kind, self.text)
    }
}
