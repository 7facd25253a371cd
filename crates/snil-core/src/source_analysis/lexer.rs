// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for SNIL scripts.
//!
//! SNIL is line structured: what a line contains is decided by its first
//! non-blank character, so the lexer carries a small per-line mode. A line
//! opening with `@name` or a statement keyword switches to code mode; an
//! identifier followed by `:` is a speaker and the rest of the line is
//! dialogue text; other lines are narration.
//!
//! # Design Principles
//!
//! - **Total coverage**: tokens partition the input. Blanks and newlines
//!   are tokens, so concatenating token texts reproduces the source.
//! - **Error recovery**: never panic on malformed input; emit
//!   [`TokenKind::Unknown`] or [`TokenKind::UnterminatedString`].
//! - **Lazy and restartable**: the lexer is an [`Iterator`], and
//!   [`Lexer::resume`] restarts at any line start with no other state.
//!
//! # Example
//!
//! ```
//! use snil_core::source_analysis::{Lexer, TokenKind};
//!
//! let kinds: Vec<_> = Lexer::new("Alice: Hi!").map(|t| t.kind().clone()).collect();
//! assert_eq!(kinds[0], TokenKind::Identifier("Alice".into()));
//! assert_eq!(kinds[1], TokenKind::Colon);
//! assert_eq!(kinds[3], TokenKind::DialogueText("Hi!".into()));
//! ```

use ecow::EcoString;

use super::{Keyword, Position, Span, Token, TokenKind};

/// What the rest of the current line may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineMode {
    /// Nothing but blanks seen on this line yet.
    Start,
    /// Identifiers, literals, operators.
    Code,
    /// A speaker identifier was emitted; a `:` follows.
    Speaker,
    /// Everything up to the newline is text.
    Text,
}

/// A lazy lexer over SNIL source.
///
/// # Error Recovery
///
/// The lexer never fails. Characters that start no token become one-char
/// [`TokenKind::Unknown`] tokens and strings missing a closing quote stop at
/// the end of their line.
pub struct Lexer<'src> {
    source: &'src str,
    position: usize,
    line: u32,
    line_start: usize,
    mode: LineMode,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("position", &self.position)
            .field("line", &self.line)
            .field("mode", &self.mode)
            .finish()
    }
}

impl<'src> Lexer<'src> {
    /// Creates a lexer positioned at the start of `source`.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self::resume(source, 0, 0)
    }

    /// Creates a lexer that starts at `offset`, which must be a line start
    /// (0 or just after a `\n`) on line `line`.
    ///
    /// Lexing from a line start needs no other state, so the tokens produced
    /// are identical to the suffix of a full lex from the beginning.
    #[must_use]
    pub fn resume(source: &'src str, offset: u32, line: u32) -> Self {
        let position = offset as usize;
        debug_assert!(
            position == 0 || source.as_bytes().get(position - 1) == Some(&b'\n'),
            "lexer resumed away from a line start"
        );
        Self {
            source,
            position,
            line,
            line_start: position,
            mode: LineMode::Start,
        }
    }

    /// The byte offset of the next token.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    pub fn offset(&self) -> u32 {
        self.position as u32
    }

    /// Returns true when the next token begins a line.
    #[must_use]
    pub fn at_line_start(&self) -> bool {
        self.position == self.line_start
    }

    /// The line/column of the next token.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    pub fn position(&self) -> Position {
        Position::new(self.line, (self.position - self.line_start) as u32)
    }

    /// The end-of-file token for this source.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    pub fn eof_token(&self) -> Token {
        let end = self.source.len();
        let line_start = self.source.rfind('\n').map_or(0, |i| i + 1);
        let line = self.source.matches('\n').count() as u32;
        Token::new(
            TokenKind::Eof,
            Span::empty(end as u32),
            EcoString::new(),
            Position::new(line, (end - line_start) as u32),
        )
    }

    fn rest(&self) -> &'src str {
        &self.source[self.position..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Blanks are spaces, tabs and any `\r` that does not start a `\r\n`.
    fn at_blank(&self) -> bool {
        match self.peek_char() {
            Some(' ' | '\t') => true,
            Some('\r') => self.peek_char_n(1) != Some('\n'),
            _ => false,
        }
    }

    fn at_newline(&self) -> bool {
        let rest = self.rest();
        rest.starts_with('\n') || rest.starts_with("\r\n")
    }

    fn at_comment(&self) -> bool {
        self.rest().starts_with("//")
    }

    /// Offset of the end of the current line's content (before `\r\n`/`\n`).
    fn content_end(&self) -> usize {
        let rest = self.rest();
        match rest.find('\n') {
            Some(i) if i > 0 && rest.as_bytes()[i - 1] == b'\r' => self.position + i - 1,
            Some(i) => self.position + i,
            None => self.source.len(),
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize) -> Token {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "source files over 4GB are not supported"
        )]
        let column = (start - self.line_start) as u32;
        let span = Span::from(start..self.position);
        Token::new(
            kind,
            span,
            &self.source[start..self.position],
            Position::new(self.line, column),
        )
    }

    fn lex_whitespace(&mut self) -> Token {
        let start = self.position;
        while self.at_blank() {
            self.advance();
        }
        self.make_token(TokenKind::Whitespace, start)
    }

    fn lex_newline(&mut self) -> Token {
        let start = self.position;
        if self.peek_char() == Some('\r') {
            self.advance();
        }
        self.advance();
        let token = self.make_token(TokenKind::Newline, start);
        self.line += 1;
        self.line_start = self.position;
        self.mode = LineMode::Start;
        token
    }

    fn lex_comment(&mut self) -> Token {
        let start = self.position;
        self.position = self.content_end();
        let text = EcoString::from(&self.source[start..self.position]);
        self.make_token(TokenKind::Comment(text), start)
    }

    fn lex_text(&mut self) -> Token {
        let start = self.position;
        self.position = self.content_end();
        let text = EcoString::from(self.source[start..self.position].trim_end());
        self.mode = LineMode::Text;
        self.make_token(TokenKind::DialogueText(text), start)
    }

    fn scan_word(&mut self) -> &'src str {
        let start = self.position;
        self.advance_while(is_identifier_char);
        &self.source[start..self.position]
    }

    /// Returns the character after `word_end` and any blanks.
    fn char_after_blanks(&self, word_end: usize) -> (Option<char>, Option<char>) {
        let mut chars = self.source[word_end..]
            .chars()
            .skip_while(|c| matches!(c, ' ' | '\t'));
        (chars.next(), chars.next())
    }

    /// Classifies a line by its first non-blank character.
    fn lex_line_start(&mut self, c: char) -> Token {
        if c == '@' {
            self.mode = LineMode::Code;
            let start = self.position;
            self.advance();
            if self.peek_char().is_some_and(is_identifier_start) {
                self.advance_while(is_identifier_char);
                let name = EcoString::from(&self.source[start..self.position]);
                return self.make_token(TokenKind::Directive(name), start);
            }
            return self.make_token(TokenKind::Unknown("@".into()), start);
        }

        if is_identifier_start(c) {
            let start = self.position;
            let word_end = start + self.source[start..]
                .find(|c: char| !is_identifier_char(c))
                .unwrap_or(self.source.len() - start);
            let word = &self.source[start..word_end];

            if Keyword::from_word(word).is_some_and(Keyword::is_statement_keyword) {
                self.mode = LineMode::Code;
                return self.lex_code(c);
            }

            return match self.char_after_blanks(word_end) {
                (Some(':'), _) => {
                    self.scan_word();
                    self.mode = LineMode::Speaker;
                    self.make_token(TokenKind::Identifier(word.into()), start)
                }
                (Some('/'), Some('/')) => self.lex_text(),
                (Some('=' | '(' | '<' | '>' | '+' | '-' | '*' | '/'), _) | (Some('!'), Some('=')) => {
                    self.mode = LineMode::Code;
                    self.lex_code(c)
                }
                _ => self.lex_text(),
            };
        }

        if c == '"' || c.is_ascii_digit() {
            self.mode = LineMode::Code;
            return self.lex_code(c);
        }

        self.lex_text()
    }

    fn lex_code(&mut self, c: char) -> Token {
        let start = self.position;

        if is_identifier_start(c) {
            let word = self.scan_word();
            let kind = match Keyword::from_word(word) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier(word.into()),
            };
            return self.make_token(kind, start);
        }

        if c.is_ascii_digit() {
            self.advance_while(|c| c.is_ascii_digit());
            if self.peek_char() == Some('.') && self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                self.advance_while(|c| c.is_ascii_digit());
            }
            let text = EcoString::from(&self.source[start..self.position]);
            return self.make_token(TokenKind::Number(text), start);
        }

        if c == '"' {
            return self.lex_string();
        }

        self.advance();
        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '=' | '<' | '>' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                }
                TokenKind::Operator(self.source[start..self.position].into())
            }
            '!' if self.peek_char() == Some('=') => {
                self.advance();
                TokenKind::Operator("!=".into())
            }
            '+' | '-' | '*' | '/' => TokenKind::Operator(c.to_string().into()),
            other => TokenKind::Unknown(other.to_string().into()),
        };
        self.make_token(kind, start)
    }

    fn lex_string(&mut self) -> Token {
        let start = self.position;
        self.advance();
        let terminated = loop {
            if self.peek_char().is_none() || self.at_newline() {
                break false;
            }
            match self.advance() {
                Some('"') => break true,
                Some('\\') if self.peek_char().is_some() && !self.at_newline() => {
                    self.advance();
                }
                Some(_) => {}
                None => break false,
            }
        };
        let content = string_content(&self.source[start..self.position]);
        let kind = if terminated {
            TokenKind::String(content)
        } else {
            TokenKind::UnterminatedString(content)
        };
        self.make_token(kind, start)
    }

    /// Produces the next token, or `None` at end of input.
    fn next_token(&mut self) -> Option<Token> {
        let c = self.peek_char()?;

        if self.at_newline() {
            return Some(self.lex_newline());
        }
        if self.at_blank() {
            return Some(self.lex_whitespace());
        }

        let token = match self.mode {
            LineMode::Text => self.lex_text(),
            _ if self.at_comment() => self.lex_comment(),
            LineMode::Start => self.lex_line_start(c),
            LineMode::Speaker if c == ':' => {
                let start = self.position;
                self.advance();
                self.mode = LineMode::Text;
                self.make_token(TokenKind::Colon, start)
            }
            LineMode::Speaker | LineMode::Code => {
                self.mode = LineMode::Code;
                self.lex_code(c)
            }
        };
        Some(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lexes the whole source (without the EOF token).
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Lexes the whole source and appends the EOF token.
#[must_use]
pub fn lex_with_eof(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens: Vec<Token> = lexer.by_ref().collect();
    tokens.push(lexer.eof_token());
    tokens
}

/// The unescaped content of a string token's raw text, with or without
/// its closing quote.
///
/// `\n`, `\t`, `\"` and `\\` are unescaped; any other escape keeps its
/// backslash.
pub(crate) fn string_content(raw: &str) -> EcoString {
    let mut content = String::new();
    let mut chars = raw.strip_prefix('"').unwrap_or(raw).chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('n') => content.push('\n'),
                Some('t') => content.push('\t'),
                Some('"') => content.push('"'),
                Some('\\') => content.push('\\'),
                Some(other) => {
                    content.push('\\');
                    content.push(other);
                }
                None => content.push('\\'),
            },
            other => content.push(other),
        }
    }
    content.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind().clone()).collect()
    }

    fn significant(source: &str) -> Vec<TokenKind> {
        kinds(source).into_iter().filter(|k| !k.is_layout()).collect()
    }

    #[test]
    fn speaker_line() {
        assert_eq!(
            kinds("Alice: Hello there!  \n"),
            vec![
                TokenKind::Identifier("Alice".into()),
                TokenKind::Colon,
                TokenKind::Whitespace,
                TokenKind::DialogueText("Hello there!".into()),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn speaker_with_blank_before_colon() {
        assert_eq!(
            significant("Bob : ok"),
            vec![
                TokenKind::Identifier("Bob".into()),
                TokenKind::Colon,
                TokenKind::DialogueText("ok".into()),
            ]
        );
    }

    #[test]
    fn dialogue_text_keeps_operators_and_slashes() {
        assert_eq!(
            significant("Alice: a == b // not a comment"),
            vec![
                TokenKind::Identifier("Alice".into()),
                TokenKind::Colon,
                TokenKind::DialogueText("a == b // not a comment".into()),
            ]
        );
    }

    #[test]
    fn narration_line() {
        assert_eq!(
            kinds("The rain kept falling."),
            vec![TokenKind::DialogueText("The rain kept falling.".into())]
        );
    }

    #[test]
    fn directive_line() {
        assert_eq!(
            significant("@character Alice \"Alice Liddell\" global"),
            vec![
                TokenKind::Directive("@character".into()),
                TokenKind::Identifier("Alice".into()),
                TokenKind::String("Alice Liddell".into()),
                TokenKind::Identifier("global".into()),
            ]
        );
    }

    #[test]
    fn lone_at_is_unknown() {
        assert_eq!(
            significant("@ 3"),
            vec![TokenKind::Unknown("@".into()), TokenKind::Number("3".into())]
        );
    }

    #[test]
    fn conditional_header() {
        assert_eq!(
            significant("if trust >= 2 and not angry"),
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Identifier("trust".into()),
                TokenKind::Operator(">=".into()),
                TokenKind::Number("2".into()),
                TokenKind::Keyword(Keyword::And),
                TokenKind::Keyword(Keyword::Not),
                TokenKind::Identifier("angry".into()),
            ]
        );
    }

    #[test]
    fn assignment_and_call_lines() {
        assert_eq!(
            significant("score = score + 1.5"),
            vec![
                TokenKind::Identifier("score".into()),
                TokenKind::Operator("=".into()),
                TokenKind::Identifier("score".into()),
                TokenKind::Operator("+".into()),
                TokenKind::Number("1.5".into()),
            ]
        );
        assert_eq!(
            significant("greet(\"hi\", 2)"),
            vec![
                TokenKind::Identifier("greet".into()),
                TokenKind::LeftParen,
                TokenKind::String("hi".into()),
                TokenKind::Comma,
                TokenKind::Number("2".into()),
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn identifier_followed_by_double_slash_is_narration() {
        assert_eq!(
            kinds("wait // later"),
            vec![TokenKind::DialogueText("wait // later".into())]
        );
    }

    #[test]
    fn comment_line_and_trailing_comment() {
        assert_eq!(
            kinds("// note\n"),
            vec![TokenKind::Comment("// note".into()), TokenKind::Newline]
        );
        assert_eq!(
            significant("x = 1 // set"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("=".into()),
                TokenKind::Number("1".into()),
                TokenKind::Comment("// set".into()),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            significant(r#"x = "a\"b\\c\n""#)[2],
            TokenKind::String("a\"b\\c\n".into())
        );
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        let tokens = lex("x = \"open\ny = 1");
        let unterminated = tokens
            .iter()
            .find(|t| matches!(t.kind(), TokenKind::UnterminatedString(_)))
            .unwrap();
        assert_eq!(unterminated.text(), "\"open");
        assert!(tokens.iter().any(|t| *t.kind() == TokenKind::Identifier("y".into())));
    }

    #[test]
    fn unknown_character_in_code() {
        assert_eq!(
            significant("x = 1 # 2"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("=".into()),
                TokenKind::Number("1".into()),
                TokenKind::Unknown("#".into()),
                TokenKind::Number("2".into()),
            ]
        );
    }

    #[test]
    fn crlf_is_one_newline_token() {
        let tokens = lex("Alice: hi\r\nBob: yo");
        let newline = tokens.iter().find(|t| *t.kind() == TokenKind::Newline).unwrap();
        assert_eq!(newline.text(), "\r\n");
        assert_eq!(tokens[3].kind(), &TokenKind::DialogueText("hi".into()));
        assert_eq!(tokens.last().unwrap().position(), Position::new(1, 5));
    }

    #[test]
    fn tokens_partition_the_input() {
        let source = "  if x == \"a\" // c\r\n\tAlice:  hi \n@jump End\n\n?!";
        let rebuilt: String = lex(source).iter().map(|t| t.text().as_str()).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn resume_matches_full_lex_suffix() {
        let source = "Alice: one\nif x\n  y = 2\nendif\n";
        let full = lex(source);
        let offset = source.find("if").unwrap();
        let resumed: Vec<_> = Lexer::resume(source, u32::try_from(offset).unwrap(), 1).collect();
        let suffix: Vec<_> = full
            .into_iter()
            .filter(|t| t.span().start() as usize >= offset)
            .collect();
        assert_eq!(resumed, suffix);
    }

    #[test]
    fn eof_token_position() {
        let tokens = lex_with_eof("a\nbc");
        let eof = tokens.last().unwrap();
        assert!(eof.kind().is_eof());
        assert_eq!(eof.span(), Span::empty(4));
        assert_eq!(eof.position(), Position::new(1, 2));
    }
}
