// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Completion provider for the language service.
//!
//! **DDD Context:** Language Service
//!
//! Suggests completions at the cursor based on what the current line holds
//! so far:
//! - After `@`: directive names
//! - As the `@jump` target or the last `@choice` argument: labels
//! - At the start of a line: statement keywords, characters (inserted as
//!   `Name: `), variables and functions
//! - Inside an expression: variables, functions and value keywords
//!
//! Candidates are filtered by the word before the cursor, ignoring case,
//! and ordered by kind then name.
//!
//! # Performance
//!
//! Lexes the current line only; must respond in <50ms.

use crate::language_service::{AnalysisSnapshot, Completion, CompletionKind};
use crate::semantic_analysis::{Symbol, SymbolKind};
use crate::source_analysis::{Keyword, Lexer, Position, Token, TokenKind};

/// What the cursor is completing, with the typed prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context<'a> {
    Directive(&'a str),
    Label(&'a str),
    LineStart(&'a str),
    Code(&'a str),
    Nothing,
}

/// Computes completions at `position`.
///
/// # Examples
///
/// ```
/// use snil_core::language_service::analyze;
/// use snil_core::queries::completion_provider::compute_completions;
/// use snil_core::source_analysis::Position;
///
/// let snapshot = analyze("@character Alice\nA");
/// let completions = compute_completions(&snapshot, Position::new(1, 1));
/// assert_eq!(completions.len(), 1);
/// assert_eq!(completions[0].insert_text, "Alice: ");
/// ```
#[must_use]
pub fn compute_completions(snapshot: &AnalysisSnapshot, position: Position) -> Vec<Completion> {
    let lines = snapshot.line_index();
    let (Some(offset), Some(line_start)) = (lines.offset(position), lines.line_start(position.line))
    else {
        return Vec::new();
    };
    let Some(line) = snapshot.text().get(line_start as usize..offset as usize) else {
        return Vec::new();
    };

    let (prefix, mut completions) = match context(line) {
        Context::Directive(prefix) => (prefix, directive_completions(snapshot)),
        Context::Label(prefix) => (prefix, label_completions(snapshot)),
        Context::LineStart(prefix) => {
            let mut completions: Vec<_> = Keyword::ALL
                .into_iter()
                .filter(|keyword| keyword.is_statement_keyword())
                .map(|keyword| Completion::new(keyword.as_str(), CompletionKind::Keyword))
                .collect();
            completions.extend(symbol_completions(snapshot, offset, true));
            (prefix, completions)
        }
        Context::Code(prefix) => {
            let mut completions: Vec<_> = [
                Keyword::True,
                Keyword::False,
                Keyword::And,
                Keyword::Or,
                Keyword::Not,
            ]
            .into_iter()
            .map(|keyword| Completion::new(keyword.as_str(), CompletionKind::Keyword))
            .collect();
            completions.extend(symbol_completions(snapshot, offset, false));
            (prefix, completions)
        }
        Context::Nothing => return Vec::new(),
    };

    let prefix = prefix.to_lowercase();
    completions.retain(|completion| completion.name.to_lowercase().starts_with(&prefix));
    completions.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
    completions.dedup_by(|a, b| a.kind == b.kind && a.name == b.name);
    completions
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Classifies the text between the line start and the cursor.
fn context(line: &str) -> Context<'_> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    if let Some(name) = trimmed.strip_prefix('@') {
        if name.chars().all(is_word_char) {
            return Context::Directive(name);
        }
    }
    if trimmed.chars().all(is_word_char) {
        return Context::LineStart(trimmed);
    }

    let tokens: Vec<Token> = Lexer::new(line)
        .filter(|token| !token.kind().is_layout())
        .collect();
    let (prefix, before) = match tokens.split_last() {
        Some((last, rest))
            if last.span().end() as usize == line.len()
                && matches!(last.kind(), TokenKind::Identifier(_) | TokenKind::Keyword(_)) =>
        {
            (&line[last.span().as_range()], rest)
        }
        _ => ("", tokens.as_slice()),
    };

    let outside_code = before.iter().any(|token| {
        matches!(
            token.kind(),
            TokenKind::DialogueText(_)
                | TokenKind::Comment(_)
                | TokenKind::Colon
                | TokenKind::UnterminatedString(_)
        )
    });
    if outside_code {
        return Context::Nothing;
    }

    match before.first().map(Token::kind) {
        Some(TokenKind::Directive(name)) => match (name.as_str(), before) {
            ("@jump", [_]) => Context::Label(prefix),
            ("@choice", [_, text]) if matches!(text.kind(), TokenKind::String(_)) => {
                Context::Label(prefix)
            }
            _ => Context::Nothing,
        },
        Some(TokenKind::Keyword(Keyword::Func)) => Context::Nothing,
        _ => Context::Code(prefix),
    }
}

fn directive_completions(snapshot: &AnalysisSnapshot) -> Vec<Completion> {
    snapshot
        .config()
        .directive_names()
        .map(|name| Completion::new(name, CompletionKind::Directive))
        .collect()
}

fn label_completions(snapshot: &AnalysisSnapshot) -> Vec<Completion> {
    snapshot
        .model()
        .scopes()
        .symbols()
        .filter(|(_, symbol)| symbol.kind == SymbolKind::Label)
        .map(|(_, symbol)| Completion::new(symbol.name.clone(), CompletionKind::Label))
        .collect()
}

/// Symbols visible at `offset`. Characters are offered only at a line
/// start, where they begin a dialogue line.
fn symbol_completions(
    snapshot: &AnalysisSnapshot,
    offset: u32,
    line_start: bool,
) -> Vec<Completion> {
    let scopes = snapshot.model().scopes();
    scopes
        .visible_symbols(scopes.scope_at(offset), offset)
        .into_iter()
        .map(|id| scopes.symbol(id))
        .filter_map(|symbol| symbol_completion(symbol, line_start))
        .collect()
}

fn symbol_completion(symbol: &Symbol, line_start: bool) -> Option<Completion> {
    let name = &symbol.name;
    let completion = match symbol.kind {
        SymbolKind::Character if line_start => {
            Completion::new(name.clone(), CompletionKind::Character)
                .with_insert_text(format!("{name}: "))
        }
        SymbolKind::Variable => Completion::new(name.clone(), CompletionKind::Variable),
        SymbolKind::Function => Completion::new(name.clone(), CompletionKind::Function)
            .with_insert_text(format!("{name}(")),
        SymbolKind::Character | SymbolKind::Label => return None,
    };
    Some(completion.with_detail(symbol.signature()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::language_service::{analyze, analyze_with_config};

    fn at_end(text: &str) -> Vec<Completion> {
        let snapshot = analyze(text);
        let end = snapshot
            .line_index()
            .position(u32::try_from(text.len()).unwrap())
            .unwrap();
        compute_completions(&snapshot, end)
    }

    fn names(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn context_classification() {
        assert_eq!(context("@ch"), Context::Directive("ch"));
        assert_eq!(context("  "), Context::LineStart(""));
        assert_eq!(context("  Al"), Context::LineStart("Al"));
        assert_eq!(context("@jump "), Context::Label(""));
        assert_eq!(context("@choice \"Go\" En"), Context::Label("En"));
        assert_eq!(context("@character Al"), Context::Nothing);
        assert_eq!(context("x = fo"), Context::Code("fo"));
        assert_eq!(context("if x > 1 an"), Context::Code("an"));
        assert_eq!(context("Al: he"), Context::Nothing);
        assert_eq!(context("x = \"ab"), Context::Nothing);
        assert_eq!(context("func gr"), Context::Nothing);
    }

    #[test]
    fn directives_after_at() {
        let completions = at_end("@");
        assert_eq!(completions.len(), 12);
        assert_eq!(completions[0].name, "background");
        assert!(completions.iter().all(|c| c.kind == CompletionKind::Directive));
        assert_eq!(names(&at_end("@CH")), vec!["character", "choice"]);
    }

    #[test]
    fn extra_directives_are_offered() {
        let config = AnalysisConfig {
            extra_directives: vec!["shake".into()],
            ..AnalysisConfig::default()
        };
        let snapshot = analyze_with_config("@sh", config);
        let completions = compute_completions(&snapshot, Position::new(0, 3));
        assert_eq!(names(&completions), vec!["shake", "show"]);
    }

    #[test]
    fn labels_after_jump_and_choice() {
        let text = "@label Intro\n@label Outro\n";
        assert_eq!(names(&at_end(&format!("{text}@jump "))), vec!["Intro", "Outro"]);
        assert_eq!(names(&at_end(&format!("{text}@jump o"))), vec!["Outro"]);
        assert_eq!(
            names(&at_end(&format!("{text}@choice \"Leave\" I"))),
            vec!["Intro"]
        );
    }

    #[test]
    fn line_start_offers_keywords_and_symbols() {
        let completions = at_end("@character Alice\nx = 1\nfunc greet()\nend\n");
        assert_eq!(
            names(&completions),
            vec!["elif", "else", "end", "endif", "func", "if", "Alice", "x", "greet"]
        );
        let alice = &completions[6];
        assert_eq!(alice.kind, CompletionKind::Character);
        assert_eq!(alice.insert_text, "Alice: ");
        assert_eq!(alice.detail.as_deref(), Some("character Alice"));
    }

    #[test]
    fn code_context_offers_values() {
        let completions = at_end("x = 1\nfunc greet()\nend\ny = g");
        assert_eq!(names(&completions), vec!["greet"]);
        assert_eq!(completions[0].insert_text, "greet(");
        assert_eq!(names(&at_end("x = 1\ny = t")), vec!["true"]);
    }

    #[test]
    fn parameters_are_visible_inside_their_function() {
        let snapshot = analyze("func greet(name)\n  x = na\nend\n");
        let completions = compute_completions(&snapshot, Position::new(1, 8));
        assert_eq!(names(&completions), vec!["name"]);
        assert_eq!(completions[0].kind, CompletionKind::Variable);
    }

    #[test]
    fn nothing_in_dialogue_or_out_of_range() {
        assert!(at_end("@character Al\nAl: he").is_empty());
        let snapshot = analyze("x = 1\n");
        assert!(compute_completions(&snapshot, Position::new(4, 0)).is_empty());
    }
}
