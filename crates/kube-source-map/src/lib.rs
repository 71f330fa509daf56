//! Source positions for manifest text.
//!
//! Parsers in this workspace report every node as a [`TextRange`] of byte
//! offsets. Editors address text by line and UTF-16 column, so a
//! [`LineIndex`] is built once per snapshot and used to convert between the
//! two.
//!
//! # Example
//!
//! ```rust
//! use kube_source_map::{LineIndex, TextRange};
//!
//! let text = "metadata:\n  namespace: ns1\n";
//! let index = LineIndex::new(text);
//! let range = TextRange::new(23, 26);
//!
//! assert_eq!(range.slice(text), Some("ns1"));
//! let start = index.offset_to_location(range.start).unwrap();
//! assert_eq!((start.row, start.column), (1, 13));
//! ```

pub mod line_index;
pub mod types;

pub use line_index::LineIndex;
pub use types::{Location, Range, TextRange};
