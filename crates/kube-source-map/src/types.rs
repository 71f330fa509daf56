//! Core position types

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into a source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    /// Byte offset of the first byte (inclusive)
    pub start: usize,
    /// Byte offset one past the last byte (exclusive)
    pub end: usize,
}

impl TextRange {
    /// Create a range. `end` is clamped so it never precedes `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// A zero-width range at `offset`.
    pub fn empty(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `other` lies entirely within this range (bounds inclusive).
    pub fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True if the two ranges share no byte.
    pub fn is_disjoint(&self, other: TextRange) -> bool {
        self.end <= other.start || other.end <= self.start
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(&self, other: TextRange) -> TextRange {
        TextRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The text covered by this range, if it lies on char boundaries of `source`.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

impl From<std::ops::Range<usize>> for TextRange {
    fn from(span: std::ops::Range<usize>) -> Self {
        TextRange::new(span.start, span.end)
    }
}

/// A location in source text (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset from start of source
    pub offset: usize,
    /// Row number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in UTF-16 code units)
    pub column: usize,
}

/// A range in source text from start to end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Start location (inclusive)
    pub start: Location,
    /// End location (exclusive)
    pub end: Location,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_range_clamps_end() {
        let range = TextRange::new(10, 4);
        assert_eq!(range.start, 10);
        assert_eq!(range.end, 10);
        assert!(range.is_empty());
    }

    #[test]
    fn test_contains_and_disjoint() {
        let outer = TextRange::new(0, 20);
        let key = TextRange::new(2, 6);
        let value = TextRange::new(8, 12);

        assert!(outer.contains_range(key));
        assert!(outer.contains_range(outer));
        assert!(!key.contains_range(outer));
        assert!(key.is_disjoint(value));
        assert!(!outer.is_disjoint(value));
        // Touching ranges share no byte
        assert!(TextRange::new(0, 4).is_disjoint(TextRange::new(4, 8)));
    }

    #[test]
    fn test_cover_and_slice() {
        let text = "name: web";
        let a = TextRange::new(0, 4);
        let b = TextRange::new(6, 9);
        assert_eq!(a.cover(b), TextRange::new(0, 9));
        assert_eq!(b.slice(text), Some("web"));
        assert_eq!(TextRange::new(6, 40).slice(text), None);
    }

    #[test]
    fn test_location_ordering() {
        let loc1 = Location {
            offset: 0,
            row: 0,
            column: 0,
        };
        let loc2 = Location {
            offset: 10,
            row: 1,
            column: 0,
        };
        assert!(loc1 < loc2);
    }

    #[test]
    fn test_range_serialization() {
        let range = TextRange::new(3, 7);
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"start":3,"end":7}"#);
    }
}
