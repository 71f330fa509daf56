//! YAML adapter: builds a [`SyntaxTree`] from yaml-rust2 parser events.

use std::collections::HashMap;

use kube_source_map::TextRange;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, ScanError, TScalarStyle};
use yaml_rust2::YamlLoader;

use crate::document::{FormatAdapter, ParsedDocument};
use crate::node::{NodeId, NodeKind, SyntaxTree};
use crate::{ParseError, Result};

/// Parses YAML streams. Each `---` document becomes one root.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlAdapter;

impl FormatAdapter for YamlAdapter {
    fn parse(&self, text: &str) -> ParsedDocument {
        match parse_tree(text) {
            Ok(tree) => ParsedDocument::new(tree, text),
            Err(err) => ParsedDocument::failed(err, text),
        }
    }
}

/// Parse a YAML stream into a syntax tree.
///
/// The text is first loaded with `YamlLoader` so that malformed input is
/// rejected before any position tracking happens.
///
/// # Example
///
/// ```rust
/// use kube_manifest_tree::yaml::parse_tree;
///
/// let tree = parse_tree("kind: Pod\n---\nkind: Service\n").unwrap();
/// assert_eq!(tree.roots().len(), 2);
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid or uses a mapping or sequence as
/// a key.
pub fn parse_tree(text: &str) -> Result<SyntaxTree> {
    // A byte order mark belongs to no node
    let body = text.strip_prefix('\u{feff}').unwrap_or(text);
    let offsets = CharOffsets::new(body, text.len() - body.len());

    YamlLoader::load_from_str(body).map_err(|err| scan_error(&err, &offsets))?;

    let mut parser = Parser::new_from_str(body);
    let mut builder = TreeBuilder::new(text, &offsets);
    parser
        .load(&mut builder, true)
        .map_err(|err| scan_error(&err, &offsets))?;

    builder.finish()
}

fn scan_error(err: &ScanError, offsets: &CharOffsets) -> ParseError {
    ParseError::syntax(err.info(), offsets.byte(err.marker().index()))
}

/// Maps yaml-rust2 marker indices (counted in chars of the parsed body) to
/// byte offsets in the full text, which starts `base` bytes earlier.
struct CharOffsets {
    table: Option<Vec<usize>>,
    base: usize,
    len: usize,
}

impl CharOffsets {
    fn new(body: &str, base: usize) -> Self {
        let table = (!body.is_ascii())
            .then(|| body.char_indices().map(|(i, _)| base + i).collect());
        Self {
            table,
            base,
            len: base + body.len(),
        }
    }

    fn byte(&self, char_index: usize) -> usize {
        match &self.table {
            None => (self.base + char_index).min(self.len),
            Some(table) => table.get(char_index).copied().unwrap_or(self.len),
        }
    }
}

enum Frame {
    Sequence {
        start: usize,
        flow: bool,
        items: Vec<NodeId>,
    },
    Mapping {
        start: usize,
        flow: bool,
        entries: Vec<(NodeId, Option<NodeId>)>,
    },
}

/// What an anchor was attached to.
enum Anchored {
    Scalar(String),
    Mapping,
    Sequence,
}

enum ScalarEnd {
    Known(usize),
    /// Block scalars end wherever the next event starts
    Deferred,
    /// Nothing in the source; an implicit null
    Missing,
}

struct TreeBuilder<'a> {
    source: &'a str,
    offsets: &'a CharOffsets,
    tree: SyntaxTree,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Anchored>,
    open_block_scalar: Option<NodeId>,
    error: Option<ParseError>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, offsets: &'a CharOffsets) -> Self {
        Self {
            source,
            offsets,
            tree: SyntaxTree::new(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            open_block_scalar: None,
            error: None,
        }
    }

    fn finish(mut self) -> Result<SyntaxTree> {
        self.close_block_scalar(self.source.len());
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.stack.is_empty() {
            return Err(ParseError::structure(
                "unterminated collection",
                self.source.len(),
            ));
        }
        Ok(self.tree)
    }

    fn fail(&mut self, error: ParseError) {
        self.error.get_or_insert(error);
    }

    /// True when the next completed node is a mapping key.
    fn expects_key(&self) -> bool {
        match self.stack.last() {
            Some(Frame::Mapping { entries, .. }) => {
                entries.last().is_none_or(|(_, value)| value.is_some())
            }
            _ => false,
        }
    }

    /// Where to put an implicit null that has no text of its own.
    fn implicit_null_range(&self, marker_offset: usize) -> TextRange {
        match self.stack.last() {
            Some(Frame::Mapping { entries, .. }) => match entries.last() {
                Some((key, None)) => TextRange::empty(self.tree.range(*key).end),
                _ => TextRange::empty(marker_offset),
            },
            Some(Frame::Sequence { items, start, .. }) => items
                .last()
                .map_or(TextRange::empty(*start), |item| {
                    TextRange::empty(self.tree.range(*item).end)
                }),
            None => TextRange::empty(marker_offset),
        }
    }

    fn push_complete(&mut self, id: NodeId) {
        match self.stack.last_mut() {
            None => self.tree.push_root(id),
            Some(Frame::Sequence { items, .. }) => items.push(id),
            Some(Frame::Mapping { entries, .. }) => match entries.last_mut() {
                Some((_, value @ None)) => *value = Some(id),
                _ => {
                    if matches!(self.tree.kind(id), NodeKind::Key { .. }) {
                        entries.push((id, None));
                    } else {
                        let offset = self.tree.range(id).start;
                        self.error.get_or_insert(ParseError::structure(
                            "mapping keys must be scalars",
                            offset,
                        ));
                    }
                }
            },
        }
    }

    fn scalar_node(&self, raw_range: TextRange, text: String, as_key: bool) -> NodeKind {
        let raw = raw_range.slice(self.source).unwrap_or_default().to_string();
        if as_key {
            NodeKind::Key { raw, text }
        } else {
            NodeKind::Literal { raw, text }
        }
    }

    fn scalar(&mut self, value: String, style: TScalarStyle, anchor_id: usize, offset: usize) {
        let as_key = self.expects_key();
        let null = !as_key && matches!(style, TScalarStyle::Plain) && is_null(&value);
        let (range, text, deferred) = match scalar_end(self.source, offset, style, &value) {
            ScalarEnd::Known(end) => (TextRange::new(offset, end), value, false),
            ScalarEnd::Deferred => {
                let start = block_indicator(self.source, offset);
                (TextRange::empty(start), value, true)
            }
            ScalarEnd::Missing => (self.implicit_null_range(offset), String::new(), false),
        };
        let text = if null { String::new() } else { text };

        if anchor_id > 0 {
            self.anchors.insert(anchor_id, Anchored::Scalar(text.clone()));
        }

        let kind = self.scalar_node(range, text, as_key);
        let id = self.tree.alloc(kind, range);
        if deferred {
            self.open_block_scalar = Some(id);
        }
        self.push_complete(id);
    }

    fn alias(&mut self, anchor_id: usize, offset: usize) {
        let as_key = self.expects_key();
        let rest = self.source.get(offset..).unwrap_or_default();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, ',' | ']' | '}'))
            .unwrap_or(rest.len());
        let range = TextRange::new(offset, offset + len);

        // An alias of a collection stays a collection, without repeating
        // the anchored entries
        let kind = match self.anchors.get(&anchor_id) {
            Some(Anchored::Mapping) => NodeKind::Object {
                properties: Vec::new(),
            },
            Some(Anchored::Sequence) => NodeKind::Array { items: Vec::new() },
            Some(Anchored::Scalar(text)) => self.scalar_node(range, text.clone(), as_key),
            None => self.scalar_node(range, String::new(), as_key),
        };
        let id = self.tree.alloc(kind, range);
        self.push_complete(id);
    }

    fn close_block_scalar(&mut self, next_offset: usize) {
        if let Some(id) = self.open_block_scalar.take() {
            let start = self.tree.range(id).start;
            let end = block_scalar_end(self.source, start, next_offset);
            self.tree
                .set_scalar_extent(id, TextRange::new(start, end), self.source);
        }
    }

    fn end_sequence(&mut self, offset: usize) {
        let Some(Frame::Sequence { start, flow, items }) = self.stack.pop() else {
            self.fail(ParseError::structure("unbalanced sequence end", offset));
            return;
        };

        let mut range = TextRange::empty(start);
        for item in &items {
            range = range.cover(self.tree.range(*item));
        }
        if flow && self.source.as_bytes().get(offset) == Some(&b']') {
            range = range.cover(TextRange::new(offset, offset + 1));
        }

        let id = self.tree.alloc(NodeKind::Array { items }, range);
        self.push_complete(id);
    }

    fn end_mapping(&mut self, offset: usize) {
        let Some(Frame::Mapping {
            start,
            flow,
            entries,
        }) = self.stack.pop()
        else {
            self.fail(ParseError::structure("unbalanced mapping end", offset));
            return;
        };

        let mut range = TextRange::empty(start);
        let mut properties = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Some(value) = value else {
                let key_start = self.tree.range(key).start;
                self.fail(ParseError::structure("mapping key without a value", key_start));
                return;
            };
            let entry_range = self.tree.range(key).cover(self.tree.range(value));
            properties.push(self.tree.alloc(NodeKind::Property { key, value }, entry_range));
            range = range.cover(entry_range);
        }
        if flow && self.source.as_bytes().get(offset) == Some(&b'}') {
            range = range.cover(TextRange::new(offset, offset + 1));
        }

        let id = self.tree.alloc(NodeKind::Object { properties }, range);
        self.push_complete(id);
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        let offset = self.offsets.byte(marker.index());
        self.close_block_scalar(offset);

        match ev {
            Event::Nothing => {}

            Event::StreamStart => {}
            Event::StreamEnd => {}
            Event::DocumentStart => {}
            Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor_id, _tag) => {
                self.scalar(value, style, anchor_id, offset);
            }

            Event::Alias(anchor_id) => self.alias(anchor_id, offset),

            Event::SequenceStart(anchor_id, _tag) => {
                if anchor_id > 0 {
                    self.anchors.insert(anchor_id, Anchored::Sequence);
                }
                let flow = self.source.as_bytes().get(offset) == Some(&b'[');
                self.stack.push(Frame::Sequence {
                    start: offset,
                    flow,
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => self.end_sequence(offset),

            Event::MappingStart(anchor_id, _tag) => {
                if anchor_id > 0 {
                    self.anchors.insert(anchor_id, Anchored::Mapping);
                }
                let flow = self.source.as_bytes().get(offset) == Some(&b'{');
                self.stack.push(Frame::Mapping {
                    start: offset,
                    flow,
                    entries: Vec::new(),
                });
            }

            Event::MappingEnd => self.end_mapping(offset),
        }
    }
}

/// Find where a scalar that starts at `start` ends in the source.
fn scalar_end(source: &str, start: usize, style: TScalarStyle, value: &str) -> ScalarEnd {
    let rest = source.get(start..).unwrap_or_default();
    let known = |len: Option<usize>| len.map_or(ScalarEnd::Missing, |len| ScalarEnd::Known(start + len));
    match style {
        TScalarStyle::SingleQuoted => known(quoted_len(rest, b'\'')),
        TScalarStyle::DoubleQuoted => known(quoted_len(rest, b'"')),
        TScalarStyle::Literal | TScalarStyle::Folded => ScalarEnd::Deferred,
        _ => known(plain_len(rest, value)),
    }
}

/// Plain spellings of null.
fn is_null(value: &str) -> bool {
    matches!(value, "~" | "null" | "Null" | "NULL")
}

/// Start of the `|` or `>` header of a block scalar the parser reported at
/// `offset`, which is where its content begins.
fn block_indicator(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    if matches!(source.as_bytes().get(offset), Some(b'|' | b'>')) {
        return offset;
    }
    let before = source.get(..offset).unwrap_or_default().trim_end();
    let line_start = before.rfind('\n').map_or(0, |nl| nl + 1);
    let header = &before[line_start..];
    let header = header.find(" #").map_or(header, |comment| &header[..comment]);
    match header.rfind(['|', '>']) {
        Some(pos) if is_block_header_tail(&header[pos + 1..]) => line_start + pos,
        _ => offset,
    }
}

/// Chomping and indentation indicators, e.g. the `-` of `|-` or the `2+` of `>2+`.
fn is_block_header_tail(tail: &str) -> bool {
    tail.trim_end()
        .bytes()
        .all(|b| b.is_ascii_digit() || b == b'+' || b == b'-')
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Length of a quoted scalar including both quotes.
fn quoted_len(rest: &str, quote: u8) -> Option<usize> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&quote) {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            // '' is an escaped quote inside single quotes
            b'\'' if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Length of a plain scalar in the source.
///
/// Multi-line plain scalars are folded by the parser, so the words of the
/// value are matched one by one across line breaks and indentation.
fn plain_len(rest: &str, value: &str) -> Option<usize> {
    if !value.is_empty() && rest.starts_with(value) {
        return Some(value.len());
    }
    let mut pos = 0;
    let mut matched = false;
    for word in value.split_whitespace() {
        let tail = &rest[pos..];
        pos += tail.len() - tail.trim_start().len();
        if !rest[pos..].starts_with(word) {
            return None;
        }
        pos += word.len();
        matched = true;
    }
    matched.then_some(pos)
}

/// End of a block scalar whose header is at `start`, given where the
/// following event starts.
///
/// Trailing blank lines belong to no node. Trailing `#` lines do only when
/// they are indented less than the content; otherwise they are content.
fn block_scalar_end(source: &str, start: usize, next_offset: usize) -> usize {
    let limit = next_offset.clamp(start, source.len());
    let header_start = source
        .get(..start)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |nl| nl + 1);
    let header_indent = source
        .get(header_start..start)
        .map_or(0, indentation);

    let mut region = source.get(start..limit).unwrap_or_default();
    let content_indent = region
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(indentation)
        .find(|indent| *indent > header_indent)
        .unwrap_or(usize::MAX);

    loop {
        region = region.trim_end();
        match region.rfind('\n') {
            Some(nl) => {
                let line = &region[nl + 1..];
                if line.trim_start().starts_with('#') && indentation(line) < content_indent {
                    region = &region[..nl];
                } else {
                    break;
                }
            }
            None => break,
        }
    }
    start + region.len()
}
