// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Byte-offset ranges into a script.
//!
//! Tokens, CST elements, diagnostics and graph nodes all carry a `Span`.
//! Items stored inside a snapshot keep spans relative to the item start;
//! [`Span::offset_by`] and [`Span::relative_to`] convert between the two.

use std::ops::Range;

/// A half-open byte range `[start, end)` into the source text.
///
/// # Examples
///
/// ```
/// use snil_core::source_analysis::Span;
///
/// let span = Span::new(4, 9);
/// assert_eq!(span.len(), 5);
/// assert!(span.contains_offset(4));
/// assert!(!span.contains_offset(9));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize)]
pub struct Span {
    start: u32,
    end: u32,
}

impl Span {
    /// Creates a new span from start and end byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// An empty span at `offset`.
    #[must_use]
    pub const fn empty(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    /// Returns the start byte offset.
    #[must_use]
    pub const fn start(self) -> u32 {
        self.start
    }

    /// Returns the end byte offset (exclusive).
    #[must_use]
    pub const fn end(self) -> u32 {
        self.end
    }

    /// Returns the length of the span in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Returns true if `other` is fully contained within `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if `offset` falls inside the half-open range.
    #[must_use]
    pub const fn contains_offset(self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Returns true if the spans overlap or share an endpoint.
    #[must_use]
    pub const fn touches(self, other: Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Creates a span that covers both `self` and `other`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Shifts an item-relative span to absolute coordinates.
    #[must_use]
    pub const fn offset_by(self, base: u32) -> Self {
        Self::new(self.start + base, self.end + base)
    }

    /// Makes an absolute span relative to `base`.
    ///
    /// `base` must not be past `self.start`.
    #[must_use]
    pub const fn relative_to(self, base: u32) -> Self {
        Self::new(self.start - base, self.end - base)
    }

    /// Converts to a `Range<usize>` for indexing into source text.
    #[must_use]
    pub const fn as_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl From<Range<u32>> for Span {
    fn from(range: Range<u32>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<Range<usize>> for Span {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.as_range()
    }
}

impl From<rowan::TextRange> for Span {
    fn from(range: rowan::TextRange) -> Self {
        Self::new(range.start().into(), range.end().into())
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start as usize, span.len() as usize).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_and_accessors() {
        let span = Span::new(5, 15);
        assert_eq!(span.start(), 5);
        assert_eq!(span.end(), 15);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::empty(3).is_empty());
    }

    #[test]
    fn span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(15, 20));
        assert_eq!(merged, Span::new(5, 20));
    }

    #[test]
    fn touching_includes_shared_endpoints() {
        let a = Span::new(0, 5);
        assert!(a.touches(Span::new(5, 8)));
        assert!(a.touches(Span::empty(0)));
        assert!(!a.touches(Span::new(6, 8)));
    }

    #[test]
    fn relative_round_trip() {
        let absolute = Span::new(40, 52);
        let relative = absolute.relative_to(30);
        assert_eq!(relative, Span::new(10, 22));
        assert_eq!(relative.offset_by(30), absolute);
    }

    #[test]
    fn span_from_range() {
        let span: Span = (0usize..10usize).into();
        assert_eq!(span, Span::new(0, 10));
        let range: Range<usize> = Span::new(5, 15).into();
        assert_eq!(range, 5..15);
    }
}
