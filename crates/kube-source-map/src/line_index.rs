//! Efficient offset to line/column lookups

use crate::types::{Location, Range, TextRange};
use serde::{Deserialize, Serialize};

/// A character whose UTF-8 and UTF-16 encodings differ in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct WideChar {
    offset: usize,
    len_utf8: u8,
    len_utf16: u8,
}

/// Line index for one snapshot of a document.
///
/// Scans the content once, recording where each line starts and where the
/// non-ASCII characters are. Byte offsets are then converted to
/// `(row, column)` in O(log n), with columns counted in UTF-16 code units
/// as editors expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    /// Byte offsets of each newline character in the file
    line_breaks: Vec<usize>,

    /// Non-ASCII characters, sorted by offset
    wide_chars: Vec<WideChar>,

    /// Total length of the file in bytes
    total_length: usize,
}

impl LineIndex {
    /// Create a line index by analyzing content
    ///
    /// # Example
    ///
    /// ```
    /// use kube_source_map::LineIndex;
    ///
    /// let index = LineIndex::new("kind: Pod\nmetadata: {}");
    /// assert_eq!(index.line_count(), 2);
    /// ```
    pub fn new(content: &str) -> Self {
        let mut line_breaks = Vec::new();
        let mut wide_chars = Vec::new();

        for (offset, ch) in content.char_indices() {
            if ch == '\n' {
                line_breaks.push(offset);
            } else if !ch.is_ascii() {
                wide_chars.push(WideChar {
                    offset,
                    len_utf8: ch.len_utf8() as u8,
                    len_utf16: ch.len_utf16() as u8,
                });
            }
        }

        LineIndex {
            line_breaks,
            wide_chars,
            total_length: content.len(),
        }
    }

    /// Convert a byte offset to a Location with row and UTF-16 column
    ///
    /// Returns None if the offset is out of bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use kube_source_map::LineIndex;
    ///
    /// let index = LineIndex::new("hello\nworld");
    /// let loc = index.offset_to_location(6).unwrap();
    /// assert_eq!(loc.row, 1);
    /// assert_eq!(loc.column, 0);
    /// ```
    pub fn offset_to_location(&self, offset: usize) -> Option<Location> {
        if offset > self.total_length {
            return None;
        }

        // A newline belongs to the line it terminates
        let row = match self.line_breaks.binary_search(&offset) {
            Ok(idx) | Err(idx) => idx,
        };

        let line_start = if row == 0 {
            0
        } else {
            self.line_breaks[row - 1] + 1
        };

        let first = self.wide_chars.partition_point(|c| c.offset < line_start);
        let last = self.wide_chars.partition_point(|c| c.offset < offset);
        let shrink: usize = self.wide_chars[first..last]
            .iter()
            .map(|c| usize::from(c.len_utf8 - c.len_utf16))
            .sum();

        Some(Location {
            offset,
            row,
            column: offset - line_start - shrink,
        })
    }

    /// Convert a byte range into a line/column range.
    pub fn range(&self, range: TextRange) -> Option<Range> {
        Some(Range {
            start: self.offset_to_location(range.start)?,
            end: self.offset_to_location(range.end)?,
        })
    }

    /// Get the total length of the file in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Get the number of lines in the file
    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file() {
        let index = LineIndex::new("");
        assert_eq!(index.total_length(), 0);
        assert_eq!(index.line_count(), 1);

        let loc = index.offset_to_location(0).unwrap();
        assert_eq!(loc.row, 0);
        assert_eq!(loc.column, 0);
    }

    #[test]
    fn test_multiple_lines() {
        let content = "line 1\nline 2\nline 3";
        let index = LineIndex::new(content);
        assert_eq!(index.line_count(), 3);

        // At first newline (offset 6 is '\n')
        let loc = index.offset_to_location(6).unwrap();
        assert_eq!((loc.row, loc.column), (0, 6));

        // Start of second line
        let loc = index.offset_to_location(7).unwrap();
        assert_eq!((loc.row, loc.column), (1, 0));

        // End of file
        let loc = index.offset_to_location(20).unwrap();
        assert_eq!((loc.row, loc.column), (2, 6));
    }

    #[test]
    fn test_out_of_bounds() {
        let index = LineIndex::new("hello");
        assert!(index.offset_to_location(100).is_none());
        assert!(index.range(TextRange::new(0, 6)).is_none());
    }

    #[test]
    fn test_columns_are_utf16() {
        // 'é' is 2 bytes in UTF-8 and one UTF-16 unit
        let content = "name: café-x";
        let index = LineIndex::new(content);
        let offset = content.find("-x").unwrap();
        let loc = index.offset_to_location(offset).unwrap();
        assert_eq!(loc.column, 10);

        // '𝄞' is 4 bytes in UTF-8 and two UTF-16 units
        let content = "a: 𝄞b";
        let index = LineIndex::new(content);
        let offset = content.find('b').unwrap();
        assert_eq!(index.offset_to_location(offset).unwrap().column, 5);
    }

    #[test]
    fn test_wide_chars_on_earlier_lines_do_not_shift_columns() {
        let content = "ü: 1\nname: web";
        let index = LineIndex::new(content);
        let offset = content.find("web").unwrap();
        let loc = index.offset_to_location(offset).unwrap();
        assert_eq!((loc.row, loc.column), (1, 6));
    }

    #[test]
    fn test_range_conversion() {
        let content = "metadata:\n  name: web\n";
        let index = LineIndex::new(content);
        let start = content.find("web").unwrap();
        let range = index.range(TextRange::new(start, start + 3)).unwrap();
        assert_eq!((range.start.row, range.start.column), (1, 8));
        assert_eq!((range.end.row, range.end.column), (1, 11));
    }
}
