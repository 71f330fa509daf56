//! Conversion between kube-links-core types and tower_lsp::lsp_types.

use tower_lsp::lsp_types::{
    DocumentLink as LspDocumentLink, Position as LspPosition, Range as LspRange, Url,
};

use kube_links_core::types::{DocumentLink, Position, Range};

pub fn position_to_lsp(pos: &Position) -> LspPosition {
    LspPosition {
        line: pos.line,
        character: pos.character,
    }
}

pub fn range_to_lsp(range: &Range) -> LspRange {
    LspRange {
        start: position_to_lsp(&range.start),
        end: position_to_lsp(&range.end),
    }
}

/// Convert a core link to an LSP link.
///
/// Returns `None` if the target is not a valid URI, which only happens with
/// a misconfigured scheme.
pub fn link_to_lsp(link: &DocumentLink) -> Option<LspDocumentLink> {
    let target = Url::parse(link.target.as_str()).ok()?;
    Some(LspDocumentLink {
        range: range_to_lsp(&link.range),
        target: Some(target),
        tooltip: None,
        data: None,
    })
}
