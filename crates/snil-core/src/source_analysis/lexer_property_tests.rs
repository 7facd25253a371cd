// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the SNIL lexer.
//!
//! These tests use `proptest` to verify lexer invariants over generated inputs:
//!
//! 1. **Lexer never panics** on arbitrary input
//! 2. **Total coverage**: token texts concatenate to the input and spans are
//!    contiguous
//! 3. **No empty tokens**
//! 4. **EOF is always last** for `lex_with_eof`
//! 5. **Restartable**: resuming at any line start reproduces the suffix
//! 6. **Valid lines produce no error tokens**
//!
//! **DDD Context:** Source Analysis

use proptest::prelude::*;

use super::lexer::{Lexer, lex, lex_with_eof};

// ============================================================================
// Generators
// ============================================================================

/// Lines that lex without error tokens.
const VALID_LINES: &[&str] = &[
    "@character Alice \"Alice\" global",
    "@var trust 0",
    "@label Ending",
    "@jump Ending",
    "@choice \"Stay\" Ending",
    "Alice: Hello there!",
    "The door creaks open.",
    "if trust >= 2 and not angry",
    "elif trust == 1",
    "else",
    "endif",
    "func greet(name)",
    "end",
    "greet(\"Bob\")",
    "trust = trust + 1",
    "// a comment",
    "",
    "   ",
];

fn valid_line() -> impl Strategy<Value = String> {
    prop::sample::select(VALID_LINES).prop_map(std::string::ToString::to_string)
}

/// Scripts assembled from valid lines with mixed line endings.
fn valid_script() -> impl Strategy<Value = String> {
    prop::collection::vec((valid_line(), prop::bool::ANY), 0..20).prop_map(|lines| {
        lines
            .into_iter()
            .map(|(line, crlf)| format!("{line}{}", if crlf { "\r\n" } else { "\n" }))
            .collect()
    })
}

/// Arbitrary text biased towards SNIL's line structure.
fn script_like() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            valid_line(),
            "\\PC{0,40}",
            Just("\"unterminated".to_string()),
            Just("x = ".to_string()),
        ],
        0..20,
    )
    .prop_map(|lines| lines.join("\n"))
}

// ============================================================================
// Property tests
// ============================================================================

/// Default is 512 cases; override via `PROPTEST_CASES` env var for nightly runs.
fn proptest_config() -> ProptestConfig {
    let default = ProptestConfig::default();
    ProptestConfig {
        cases: default.cases.max(512),
        ..default
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    /// Property 1: Lexer never panics on arbitrary string input.
    #[test]
    fn lexer_never_panics(input in "\\PC{0,500}") {
        let _tokens = lex_with_eof(&input);
    }

    /// Property 2: token texts and spans partition the input.
    #[test]
    fn tokens_cover_input(input in "\\PC{0,500}") {
        let tokens = lex(&input);
        let mut expected_start = 0u32;
        let mut rebuilt = String::with_capacity(input.len());
        for token in &tokens {
            prop_assert_eq!(
                token.span().start(),
                expected_start,
                "gap or overlap before {:?} in {:?}",
                token.kind(),
                input,
            );
            prop_assert_eq!(token.span().len() as usize, token.text().len());
            expected_start = token.span().end();
            rebuilt.push_str(token.text());
        }
        prop_assert_eq!(rebuilt, input);
    }

    /// Property 2b: coverage also holds for script-shaped input.
    #[test]
    fn tokens_cover_script_like_input(input in script_like()) {
        let rebuilt: String = lex(&input).iter().map(|t| t.text().as_str()).collect();
        prop_assert_eq!(rebuilt, input);
    }

    /// Property 3: every token consumes at least one byte.
    #[test]
    fn no_empty_tokens(input in "\\PC{0,300}") {
        for token in lex(&input) {
            prop_assert!(!token.span().is_empty(), "empty token {:?} in {:?}", token, input);
        }
    }

    /// Property 4: lex_with_eof always ends with EOF at the end of input.
    #[test]
    fn eof_always_last(input in "\\PC{0,300}") {
        let tokens = lex_with_eof(&input);
        let last = tokens.last();
        prop_assert!(last.is_some_and(|t| t.kind().is_eof()));
        let input_len = u32::try_from(input.len()).unwrap_or(u32::MAX);
        prop_assert!(last.is_some_and(|t| t.span().start() == input_len));
    }

    /// Property 5: resuming at a line start reproduces the full lex suffix.
    #[test]
    fn resume_at_line_start_matches(input in script_like(), pick in any::<prop::sample::Index>()) {
        let line_starts: Vec<(usize, usize)> = std::iter::once(0)
            .chain(input.match_indices('\n').map(|(i, _)| i + 1))
            .enumerate()
            .collect();
        let (line, offset) = line_starts[pick.index(line_starts.len())];
        let full: Vec<_> = lex(&input)
            .into_iter()
            .filter(|t| t.span().start() as usize >= offset)
            .collect();
        let resumed: Vec<_> = Lexer::resume(
            &input,
            u32::try_from(offset).unwrap_or(u32::MAX),
            u32::try_from(line).unwrap_or(u32::MAX),
        )
        .collect();
        prop_assert_eq!(resumed, full);
    }

    /// Property 6: valid scripts produce no error tokens.
    #[test]
    fn valid_scripts_lex_cleanly(input in valid_script()) {
        for token in lex(&input) {
            prop_assert!(!token.kind().is_error(), "error token {:?} in {:?}", token, input);
        }
    }
}
