//! Parsed documents and the adapter seam.

use std::path::Path;

use kube_source_map::LineIndex;

use crate::json::JsonAdapter;
use crate::node::SyntaxTree;
use crate::yaml::YamlAdapter;
use crate::ParseError;

/// The result of parsing one snapshot of a file.
///
/// Either `tree` is complete and `errors` is empty, or `tree` has no roots
/// and `errors` says why. Adapters never hand out a partial tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub tree: SyntaxTree,
    pub errors: Vec<String>,
    pub line_index: LineIndex,
}

impl ParsedDocument {
    pub fn new(tree: SyntaxTree, text: &str) -> Self {
        Self {
            tree,
            errors: Vec::new(),
            line_index: LineIndex::new(text),
        }
    }

    pub fn failed(error: ParseError, text: &str) -> Self {
        Self {
            tree: SyntaxTree::new(),
            errors: vec![error.to_string()],
            line_index: LineIndex::new(text),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A parser producing the unified node model.
pub trait FormatAdapter {
    /// Parse `text`. Must not panic; failures are reported through
    /// [`ParsedDocument::errors`].
    fn parse(&self, text: &str) -> ParsedDocument;
}

/// Manifest formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Guess the format from a path or URI path. Query strings and fragments
    /// are ignored.
    pub fn sniff(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let extension = Path::new(path).extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }

    pub fn adapter(self) -> &'static dyn FormatAdapter {
        match self {
            DocumentFormat::Yaml => &YamlAdapter,
            DocumentFormat::Json => &JsonAdapter,
        }
    }
}

/// Parse `text` with the adapter matching `path`, if any.
pub fn parse_path(path: &str, text: &str) -> Option<ParsedDocument> {
    DocumentFormat::sniff(path).map(|format| format.adapter().parse(text))
}
