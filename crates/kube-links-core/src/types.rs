//! Editor-facing position and link types.
//!
//! All positions use 0-based line and character indices, as in the Language
//! Server Protocol. Characters are counted in UTF-16 code units.

use serde::{Deserialize, Serialize};

use crate::target::TargetId;

/// A position in a text document, expressed as zero-based line and character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    /// Zero-based line number.
    pub line: u32,
    /// Zero-based character offset (UTF-16 code units).
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.line, self.character).cmp(&(other.line, other.character))
    }
}

impl From<kube_source_map::Location> for Position {
    fn from(location: kube_source_map::Location) -> Self {
        Self {
            line: u32::try_from(location.row).unwrap_or(u32::MAX),
            character: u32::try_from(location.column).unwrap_or(u32::MAX),
        }
    }
}

/// A range in a text document, expressed as start and end positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Range {
    /// The range's start position (inclusive).
    pub start: Position,
    /// The range's end position (exclusive).
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

impl From<kube_source_map::Range> for Range {
    fn from(range: kube_source_map::Range) -> Self {
        Self {
            start: range.start.into(),
            end: range.end.into(),
        }
    }
}

/// A clickable span and the resource it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    pub range: Range,
    pub target: TargetId,
}
