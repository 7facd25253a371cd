// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Incremental re-analysis.
//!
//! **DDD Context:** Language Service
//!
//! Edits accumulate into a [`DirtyRegion`]. A pass re-parses from the
//! start of the first top-level item touching the region and stops as
//! soon as an item boundary past the region lines up with a boundary of
//! the previous tree. Items before and after the re-parsed window are
//! shared with the previous snapshot together with their parse
//! diagnostics and graph fragments. Binding and linking always run over
//! the whole tree since both are cheap and a rename anywhere can change
//! what every reference resolves to.

use std::sync::Arc;

use crate::cancellation::{CancellationToken, Cancelled};
use crate::cst::{GreenElement, SyntaxKind, element_kind};
use crate::source_analysis::ItemParser;

use super::snapshot::{AnalysisSnapshot, CachedItem};
use super::{EditError, TextEdit};

/// The part of the text changed since the last published snapshot.
///
/// `start..old_end` is the replaced range in the published text and
/// `start..new_end` the range that replaced it in the current text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DirtyRegion {
    pub(crate) start: u32,
    pub(crate) old_end: u32,
    pub(crate) new_end: u32,
}

impl DirtyRegion {
    /// The region of a single edit replacing `start..end` with `inserted`
    /// bytes.
    pub(crate) fn new(start: u32, end: u32, inserted: u32) -> Self {
        Self {
            start,
            old_end: end,
            new_end: start + inserted,
        }
    }

    /// Folds a later edit, given in coordinates of the current text, into
    /// this region.
    #[must_use]
    pub(crate) fn merge(self, start: u32, end: u32, inserted: u32) -> Self {
        let start64 = i64::from(start);
        let end64 = i64::from(end);
        let shift = i64::from(inserted) - (end64 - start64);
        let grown = i64::from(self.new_end) - i64::from(self.old_end);

        let new_end = i64::from(self.new_end).max(end64) + shift;
        let old_end = i64::from(self.old_end).max(end64 - grown);
        Self {
            start: self.start.min(start),
            old_end: clamp(old_end),
            new_end: clamp(new_end),
        }
    }

    /// Net growth of the text in bytes.
    pub(crate) fn delta(self) -> i64 {
        i64::from(self.new_end) - i64::from(self.old_end)
    }
}

fn clamp(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Applies `edit` to `text`, checking that its range fits.
pub(crate) fn splice(text: &str, edit: &TextEdit) -> Result<String, EditError> {
    let (start, end) = (edit.span.start(), edit.span.end());
    let len = u32::try_from(text.len()).map_err(|_| EditError::TooLarge)?;
    if start > end {
        return Err(EditError::Inverted { start, end });
    }
    if end > len {
        return Err(EditError::OutOfBounds { start, end, len });
    }
    for offset in [start, end] {
        if !text.is_char_boundary(offset as usize) {
            return Err(EditError::NotCharBoundary { offset });
        }
    }
    let new_len = text.len() - (end - start) as usize + edit.text.len();
    if u32::try_from(new_len).is_err() {
        return Err(EditError::TooLarge);
    }

    let mut spliced = String::with_capacity(new_len);
    spliced.push_str(&text[..start as usize]);
    spliced.push_str(&edit.text);
    spliced.push_str(&text[end as usize..]);
    Ok(spliced)
}

/// Counts of what a pass re-parsed and what it kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ReuseStats {
    pub(crate) reparsed: usize,
    pub(crate) reused: usize,
}

/// Re-analyzes `text`, which is the text of `previous` with `region`
/// replaced.
pub(crate) fn reanalyze(
    previous: &AnalysisSnapshot,
    text: Arc<str>,
    region: DirtyRegion,
    version: u64,
    cancel: &CancellationToken,
) -> Result<(AnalysisSnapshot, ReuseStats), Cancelled> {
    let old = previous.cst();
    let old_offsets = old.item_offsets();
    let old_lines = previous.line_index();
    let config = previous.shared_config();

    let first = restart_item(previous, region.start);
    let restart = old_offsets.get(first).copied().unwrap_or(0);
    // Text before the region is unchanged, so line numbers there agree.
    let line = old_lines.position(restart).map_or(0, |p| p.line);

    let mut items: Vec<CachedItem> = Vec::with_capacity(old.items().len());
    for index in 0..first {
        if let Some(item) = previous.cached_item(index) {
            items.push(item);
        }
    }

    let delta = region.delta();
    let mut resume_at = None;
    let mut stats = ReuseStats::default();
    {
        let mut parser = ItemParser::new(&text, restart, line, config.max_nesting_depth);
        while let Some(parsed) = parser.next_items() {
            cancel.check()?;
            stats.reparsed += parsed.len();
            items.extend(parsed.into_iter().map(CachedItem::from_parsed));

            let position = parser.offset();
            if position < region.new_end || !parser.at_line_start() {
                continue;
            }
            let Ok(old_position) = u32::try_from(i64::from(position) - delta) else {
                continue;
            };
            if old_position < region.old_end || !old_lines.is_line_start(old_position) {
                continue;
            }
            if let Ok(index) = old_offsets.binary_search(&old_position) {
                resume_at = Some(index);
                break;
            }
        }
    }

    if let Some(resume_at) = resume_at {
        for index in resume_at..old.items().len() {
            if let Some(item) = previous.cached_item(index) {
                items.push(item);
            }
        }
        stats.reused = first + old.items().len() - resume_at;
    } else {
        stats.reused = first;
    }

    let snapshot = AnalysisSnapshot::assemble(version, text, config, items, cancel)?;
    Ok((snapshot, stats))
}

/// Index of the first old item to re-parse for an edit at `offset`.
///
/// Backs up to a line start, and past unbalanced blocks: where those end
/// depends on the lines that follow them, which the edit may change.
fn restart_item(previous: &AnalysisSnapshot, offset: u32) -> usize {
    let old = previous.cst();
    let items = old.items();
    let mut first = old.first_item_touching(offset);
    while first > 0 && first < items.len() {
        let at_line_start = previous.line_index().is_line_start(old.item_offsets()[first]);
        if at_line_start && !is_error_item(&items[first - 1]) {
            break;
        }
        first -= 1;
    }
    first.min(items.len())
}

fn is_error_item(item: &GreenElement) -> bool {
    element_kind(item) == SyntaxKind::ErrorNode
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::cst::shares_storage;
    use crate::source_analysis::{DiagnosticCode, Span};

    fn full(version: u64, text: &str) -> AnalysisSnapshot {
        AnalysisSnapshot::analyze_full(
            version,
            text.into(),
            Arc::new(AnalysisConfig::default()),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    fn edit(previous: &AnalysisSnapshot, edit: &TextEdit) -> (AnalysisSnapshot, ReuseStats) {
        let text = splice(previous.text(), edit).unwrap();
        let inserted = u32::try_from(edit.text.len()).unwrap();
        let region = DirtyRegion::new(edit.span.start(), edit.span.end(), inserted);
        reanalyze(
            previous,
            text.into(),
            region,
            previous.version() + 1,
            &CancellationToken::new(),
        )
        .unwrap()
    }

    const SCRIPT: &str = "\
@character Alice
@label start
Alice: Hello there.
x = 1
if x > 0
  Alice: positive
else
  Alice: not positive
endif
Alice: Bye.
@jump start
";

    #[test]
    fn splice_checks_ranges() {
        assert_eq!(splice("hello", &TextEdit::new(Span::new(1, 3), "EY")).unwrap(), "hEYlo");
        assert_eq!(
            splice("hello", &TextEdit::new(Span::new(4, 9), "")),
            Err(EditError::OutOfBounds { start: 4, end: 9, len: 5 })
        );
        assert_eq!(
            splice("héllo", &TextEdit::insert(2, "x")),
            Err(EditError::NotCharBoundary { offset: 2 })
        );
    }

    #[test]
    fn merge_of_disjoint_edits_covers_both() {
        // "0123456789": replace 2..4 with one byte, then 6..7 (new coords) with three.
        let region = DirtyRegion::new(2, 4, 1).merge(6, 7, 3);
        assert_eq!(region.start, 2);
        // Old text: edit two ends at old 7 + 1 = 8.
        assert_eq!(region.old_end, 8);
        assert_eq!(region.new_end, 9);
        assert_eq!(region.delta(), 1);
    }

    #[test]
    fn merge_of_overlapping_edits() {
        // Insert five bytes at 3, then delete 1..6 of the new text.
        let region = DirtyRegion::new(3, 3, 5).merge(1, 6, 0);
        assert_eq!(region.start, 1);
        assert_eq!(region.new_end, 3);
        assert_eq!(region.old_end, 3);
        assert_eq!(region.delta(), 0);
    }

    #[test]
    fn merge_of_edit_before_region_shifts_it() {
        let region = DirtyRegion::new(10, 12, 2).merge(0, 0, 4);
        assert_eq!(region, DirtyRegion { start: 0, old_end: 12, new_end: 16 });
    }

    #[test]
    fn single_line_edit_reparses_one_item() {
        let previous = full(0, SCRIPT);
        let offset = u32::try_from(SCRIPT.find("Hello").unwrap()).unwrap();
        let (snapshot, stats) = edit(&previous, &TextEdit::new(Span::new(offset, offset + 5), "Hi"));

        assert_eq!(stats.reparsed, 1);
        assert_eq!(stats.reused, previous.cst().items().len() - 1);
        assert!(snapshot.same_analysis(&full(1, snapshot.text())));

        let old_items = previous.cst().items();
        let new_items = snapshot.cst().items();
        assert!(shares_storage(&new_items[0], &old_items[0]));
        assert!(shares_storage(&new_items[3], &old_items[3]));
        assert!(!shares_storage(&new_items[2], &old_items[2]));
    }

    #[test]
    fn opening_a_block_reparses_to_the_end() {
        let previous = full(0, SCRIPT);
        let offset = u32::try_from(SCRIPT.find("Alice: Bye.").unwrap()).unwrap();
        let (snapshot, _) = edit(&previous, &TextEdit::insert(offset, "if x\n"));
        assert!(snapshot.same_analysis(&full(1, snapshot.text())));
    }

    #[test]
    fn closing_an_unbalanced_block_reparses_it() {
        let text = "@character A\nif x\nA: in\nA: also\n";
        let previous = full(0, text);
        let (snapshot, _) = edit(&previous, &TextEdit::insert(u32::try_from(text.len()).unwrap(), "endif\n"));
        assert!(snapshot.same_analysis(&full(1, snapshot.text())));
        assert!(
            snapshot
                .diagnostics()
                .iter()
                .all(|d| d.code != DiagnosticCode::UnbalancedBlock)
        );
    }

    #[test]
    fn editing_inside_a_blank_line() {
        // The second blank line's newline item does not start a line.
        let text = "A: one\n  \n\nA: two\n";
        let previous = full(0, text);
        let (snapshot, _) = edit(&previous, &TextEdit::insert(10, "x = 1"));
        assert!(snapshot.same_analysis(&full(1, snapshot.text())));
    }

    #[test]
    fn deleting_everything() {
        let previous = full(0, SCRIPT);
        let len = u32::try_from(SCRIPT.len()).unwrap();
        let (snapshot, _) = edit(&previous, &TextEdit::delete(Span::new(0, len)));
        assert!(snapshot.cst().is_empty());
        assert!(snapshot.same_analysis(&full(1, "")));
    }

    #[test]
    fn reused_items_keep_their_diagnostics() {
        let text = "A: one\nx = (1\nA: two\n";
        let previous = full(0, text);
        let (snapshot, stats) = edit(&previous, &TextEdit::insert(0, "@character A\n"));
        assert!(stats.reused > 0);
        assert!(snapshot.same_analysis(&full(1, snapshot.text())));
    }

    #[test]
    fn cancelled_pass_returns_nothing() {
        let previous = full(0, SCRIPT);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = reanalyze(
            &previous,
            SCRIPT.into(),
            DirtyRegion::new(0, 0, 0),
            1,
            &cancel,
        );
        assert!(matches!(result, Err(Cancelled)));
    }
}
