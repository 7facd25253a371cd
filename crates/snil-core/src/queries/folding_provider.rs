// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Folding ranges.
//!
//! **DDD Context:** Language Service
//!
//! `func`..`end` and `if`..`endif` fold at any depth, unbalanced ones up to
//! their last line. A label section folds from its `@label` line to the
//! line before the next label.

use crate::cst::{SyntaxKind, SyntaxNode, SyntaxNodeExt, SyntaxTokenExt};
use crate::language_service::{AnalysisSnapshot, FoldingKind, FoldingRange};
use crate::semantic_analysis::directive_syntax;

/// Foldable ranges ordered by start line. Single-line constructs do not
/// fold.
#[must_use]
pub fn folding_ranges(snapshot: &AnalysisSnapshot) -> Vec<FoldingRange> {
    let lines = snapshot.line_index();
    let line_of = |offset: u32| lines.position(offset).map_or(0, |p| p.line);
    let mut ranges = Vec::new();

    let root = snapshot.cst().root();
    for node in root.descendants() {
        let kind = match node.kind() {
            SyntaxKind::FunctionDef => FoldingKind::Function,
            SyntaxKind::ConditionalBlock => FoldingKind::Conditional,
            _ => continue,
        };
        let Some(last) = last_token_start(&node) else {
            continue;
        };
        push(&mut ranges, line_of(node.span().start()), line_of(last), kind);
    }

    let labels: Vec<u32> = root
        .children()
        .filter(|node| {
            node.kind() == SyntaxKind::Directive
                && directive_syntax(node).is_some_and(|directive| directive.name == "label")
        })
        .map(|node| node.span().start())
        .collect();
    for (index, &start) in labels.iter().enumerate() {
        let end = labels.get(index + 1).copied().unwrap_or(snapshot.cst().len());
        push(
            &mut ranges,
            line_of(start),
            line_of(end.saturating_sub(1)),
            FoldingKind::Section,
        );
    }

    ranges.sort_by_key(|range| (range.start_line, range.end_line));
    ranges
}

fn push(ranges: &mut Vec<FoldingRange>, start_line: u32, end_line: u32, kind: FoldingKind) {
    if end_line > start_line {
        ranges.push(FoldingRange {
            start_line,
            end_line,
            kind,
        });
    }
}

fn last_token_start(node: &SyntaxNode) -> Option<u32> {
    node.descendant_tokens()
        .filter(|token| !token.kind().is_layout())
        .last()
        .map(|token| token.span().start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_service::analyze;

    fn range(start_line: u32, end_line: u32, kind: FoldingKind) -> FoldingRange {
        FoldingRange {
            start_line,
            end_line,
            kind,
        }
    }

    #[test]
    fn blocks_and_sections_fold() {
        let text = "\
@label Intro
func greet()
  if x
    A: hi
  endif
end
@label Outro
A: bye
";
        let ranges = folding_ranges(&analyze(text));
        assert_eq!(
            ranges,
            vec![
                range(0, 5, FoldingKind::Section),
                range(1, 5, FoldingKind::Function),
                range(2, 4, FoldingKind::Conditional),
                range(6, 7, FoldingKind::Section),
            ]
        );
    }

    #[test]
    fn unbalanced_block_folds_to_its_last_line() {
        let ranges = folding_ranges(&analyze("if x\nA: one\nA: two\n"));
        assert_eq!(ranges, vec![range(0, 2, FoldingKind::Conditional)]);
    }

    #[test]
    fn single_lines_do_not_fold() {
        assert!(folding_ranges(&analyze("@label Only\n")).is_empty());
    }
}
