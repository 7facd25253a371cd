// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the SNIL parser.
//!
//! These tests use `proptest` to verify parser invariants over generated inputs:
//!
//! 1. **Parser never panics** and the tree's text is exactly the input
//! 2. **Diagnostic spans within input**
//! 3. **Error nodes produce diagnostics**: an `ErrorNode` implies at least
//!    one error diagnostic
//! 4. **Deterministic**: parsing twice gives equal results
//! 5. **Valid scripts parse cleanly**
//!
//! **DDD Context:** Source Analysis

use proptest::prelude::*;

use crate::cst::SyntaxKind;
use crate::source_analysis::parse;

// ============================================================================
// Generators
// ============================================================================

/// Well-formed script fragments; any sequence of them parses without
/// diagnostics.
const FRAGMENTS: &[&str] = &[
    "@character Alice \"Alice\" global",
    "@var trust 0",
    "@label Ending",
    "@jump Ending",
    "@choice \"Stay\" Ending",
    "Alice: Hello there!",
    "  Bob: Indented reply.",
    "The wind howls outside.",
    "\"Quoted narration\"",
    "trust = trust + 1",
    "ready = not angry and trust >= 2",
    "greet(\"Bob\", 2 * (trust - 1))",
    "// a comment",
    "if trust >= 2\n  Alice: Welcome.\nendif",
    "if a\n  x = 1\nelif b or c\n  x = 2\nelse\n  x = 3\nendif",
    "func greet(name, times)\n  Alice: Hi!\n  if times > 1\n    Alice: Again!\n  endif\nend",
    "",
    "   ",
];

/// Broken or partial lines that exercise recovery.
const BROKEN: &[&str] = &[
    "if",
    "if x",
    "elif y",
    "else",
    "endif",
    "func",
    "func f(",
    "end",
    "x = ",
    "x = (1 +",
    "x == 1",
    "Alice Bob",
    "greet(1 2)",
    "\"unterminated",
    "x = # 3",
    "@",
    "a < b < c",
];

fn valid_script() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..15)
        .prop_map(|lines| lines.iter().map(|line| format!("{line}\n")).collect())
}

/// Mixes valid fragments, broken lines and random text.
fn near_valid_script() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => prop::sample::select(FRAGMENTS).prop_map(str::to_string),
            3 => prop::sample::select(BROKEN).prop_map(str::to_string),
            1 => "\\PC{0,30}",
        ],
        0..20,
    )
    .prop_map(|lines| lines.join("\n"))
}

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

    /// Property 1: the parser never panics and loses no text.
    #[test]
    fn parser_never_panics(input in "\\PC{0,400}") {
        let parsed = parse(&input);
        prop_assert_eq!(parsed.cst().text(), input);
    }

    /// Property 1b: same for script-shaped input.
    #[test]
    fn tree_text_is_input(input in near_valid_script()) {
        let parsed = parse(&input);
        prop_assert_eq!(parsed.cst().text(), input.as_str());
        let len = u32::try_from(input.len()).unwrap_or(u32::MAX);
        prop_assert_eq!(parsed.cst().len(), len);
    }

    /// Property 2: diagnostic spans lie within the input.
    #[test]
    fn diagnostic_spans_within_input(input in near_valid_script()) {
        let len = u32::try_from(input.len()).unwrap_or(u32::MAX);
        for diagnostic in parse(&input).diagnostics() {
            prop_assert!(diagnostic.span.start() <= diagnostic.span.end());
            prop_assert!(
                diagnostic.span.end() <= len,
                "span {:?} out of bounds for {:?}",
                diagnostic.span,
                input,
            );
        }
    }

    /// Property 3: every `ErrorNode` is explained by an error diagnostic.
    #[test]
    fn error_nodes_have_diagnostics(input in near_valid_script()) {
        let parsed = parse(&input);
        let has_error_node = parsed
            .cst()
            .root()
            .descendants()
            .any(|node| node.kind() == SyntaxKind::ErrorNode);
        if has_error_node {
            prop_assert!(
                parsed.diagnostics().iter().any(|d| d.is_error()),
                "error node without diagnostics in {:?}",
                input,
            );
        }
    }

    /// Property 4: parsing is deterministic.
    #[test]
    fn parsing_is_deterministic(input in near_valid_script()) {
        let first = parse(&input);
        let second = parse(&input);
        prop_assert_eq!(first.cst(), second.cst());
        prop_assert_eq!(first.diagnostics(), second.diagnostics());
    }

    /// Property 5: well-formed scripts produce no diagnostics and no
    /// error nodes.
    #[test]
    fn valid_scripts_parse_cleanly(input in valid_script()) {
        let parsed = parse(&input);
        prop_assert!(parsed.diagnostics().is_empty(), "{:?} in {:?}", parsed.diagnostics(), input);
        prop_assert!(
            !parsed.cst().root().descendants().any(|node| node.kind() == SyntaxKind::ErrorNode)
        );
    }
}
