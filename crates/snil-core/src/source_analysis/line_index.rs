// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Line/column bookkeeping for a script.
//!
//! SNIL is line structured, so every consumer of a snapshot (editor
//! positions, diagnostics rendering, incremental restarts) needs fast
//! offset ↔ position conversion. [`LineIndex`] precomputes line starts once
//! per snapshot.

/// A position in a source file (line and column, both 0-indexed).
///
/// The `column` field is a **byte offset within the line**, not a character
/// count. Callers must ensure that it always lies on a valid UTF-8 character
/// boundary in the corresponding source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize)]
pub struct Position {
    /// Line number (0-indexed).
    pub line: u32,
    /// Column offset in bytes from the start of the line (0-indexed).
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Precomputed line starts for one version of the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    /// Builds the index for `source`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| (i + 1) as u32),
        );
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Number of lines (a trailing newline opens one more, empty, line).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Total text length in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns true for an empty text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Converts a byte offset to a position.
    ///
    /// Returns `None` if the offset is out of bounds.
    #[must_use]
    pub fn position(&self, offset: u32) -> Option<Position> {
        if offset > self.len {
            return None;
        }
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "line count is bounded by the text length"
        )]
        let line_number = line as u32;
        Some(Position::new(line_number, offset - self.line_starts[line]))
    }

    /// Converts a position to a byte offset.
    ///
    /// Returns `None` if the line does not exist or the column runs past the
    /// end of the line.
    #[must_use]
    pub fn offset(&self, position: Position) -> Option<u32> {
        let line = position.line as usize;
        let start = *self.line_starts.get(line)?;
        let line_end = self.line_starts.get(line + 1).map_or(self.len, |&next| next - 1);
        let offset = start.checked_add(position.column)?;
        (offset <= line_end).then_some(offset)
    }

    /// Returns the start offset of `line`.
    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize).copied()
    }

    /// Returns true if `offset` is the first byte of a line.
    #[must_use]
    pub fn is_line_start(&self, offset: u32) -> bool {
        self.line_starts.binary_search(&offset).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_round_trip() {
        let index = LineIndex::new("hello\nworld\n!");
        assert_eq!(index.position(0), Some(Position::new(0, 0)));
        assert_eq!(index.position(5), Some(Position::new(0, 5)));
        assert_eq!(index.position(6), Some(Position::new(1, 0)));
        assert_eq!(index.position(12), Some(Position::new(2, 0)));
        assert_eq!(index.position(13), Some(Position::new(2, 1)));
        assert_eq!(index.position(14), None);

        assert_eq!(index.offset(Position::new(1, 5)), Some(11));
        assert_eq!(index.offset(Position::new(2, 1)), Some(13));
        assert_eq!(index.offset(Position::new(0, 6)), None);
        assert_eq!(index.offset(Position::new(3, 0)), None);
    }

    #[test]
    fn trailing_newline_opens_empty_line() {
        let index = LineIndex::new("a\n");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.position(2), Some(Position::new(1, 0)));
        assert!(index.is_line_start(2));
        assert!(!index.is_line_start(1));
    }

    #[test]
    fn columns_are_bytes() {
        let index = LineIndex::new("héllo\nx");
        assert_eq!(index.position(3), Some(Position::new(0, 3)));
        assert_eq!(index.offset(Position::new(1, 0)), Some(7));
    }

    #[test]
    fn empty_text() {
        let index = LineIndex::new("");
        assert!(index.is_empty());
        assert_eq!(index.position(0), Some(Position::new(0, 0)));
        assert_eq!(index.offset(Position::new(0, 0)), Some(0));
    }
}
