//! Error types for manifest parsing.

use thiserror::Error;

/// Result type alias for kube-manifest-tree operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while building a syntax tree.
///
/// Adapters never return these directly; they are rendered into
/// [`ParsedDocument::errors`](crate::ParsedDocument::errors).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text is not well-formed YAML or JSON
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { message: String, offset: usize },

    /// Well-formed text whose shape the tree model cannot represent
    #[error("unsupported structure at byte {offset}: {message}")]
    Structure { message: String, offset: usize },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ParseError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub fn structure(message: impl Into<String>, offset: usize) -> Self {
        ParseError::Structure {
            message: message.into(),
            offset,
        }
    }

    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Syntax { offset, .. } | ParseError::Structure { offset, .. } => *offset,
        }
    }
}
