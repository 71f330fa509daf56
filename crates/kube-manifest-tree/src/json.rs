//! JSON adapter: a logos lexer feeding a recursive-descent tree builder.
//!
//! `serde_json` validates the text first, so the builder only ever sees
//! well-formed JSON and nesting depth is bounded by serde_json's recursion
//! limit.

use std::iter::Peekable;
use std::ops::Range;

use kube_source_map::TextRange;
use logos::{Logos, SpannedIter};
use serde::de::IgnoredAny;

use crate::document::{FormatAdapter, ParsedDocument};
use crate::node::{NodeId, NodeKind, SyntaxTree};
use crate::{ParseError, Result};

/// Token types for JSON text
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum JsonToken {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[regex(r"-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,
    #[regex(r#""([^"\\\x00-\x1F]|\\(["\\/bfnrt]|u[0-9a-fA-F]{4}))*""#)]
    String,
}

/// Parses a single JSON value into a one-root tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

impl FormatAdapter for JsonAdapter {
    fn parse(&self, text: &str) -> ParsedDocument {
        match parse_tree(text) {
            Ok(tree) => ParsedDocument::new(tree, text),
            Err(err) => ParsedDocument::failed(err, text),
        }
    }
}

/// Parse JSON text into a syntax tree.
///
/// # Example
///
/// ```rust
/// use kube_manifest_tree::json::parse_tree;
///
/// let tree = parse_tree(r#"{"kind": "Pod"}"#).unwrap();
/// assert_eq!(tree.roots().len(), 1);
/// ```
///
/// # Errors
///
/// Returns an error if the text is not a single well-formed JSON value.
pub fn parse_tree(text: &str) -> Result<SyntaxTree> {
    if let Err(err) = serde_json::from_str::<IgnoredAny>(text) {
        let offset = line_column_offset(text, err.line(), err.column());
        return Err(ParseError::syntax(err.to_string(), offset));
    }

    let mut parser = JsonParser {
        source: text,
        tokens: JsonToken::lexer(text).spanned().peekable(),
        tree: SyntaxTree::new(),
    };
    let root = parser.value()?;
    if let Some((_, span)) = parser.tokens.next() {
        return Err(ParseError::syntax("trailing characters", span.start));
    }
    parser.tree.push_root(root);
    Ok(parser.tree)
}

/// Byte offset of a 1-based line and column as reported by serde_json.
fn line_column_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

struct JsonParser<'s> {
    source: &'s str,
    tokens: Peekable<SpannedIter<'s, JsonToken>>,
    tree: SyntaxTree,
}

impl JsonParser<'_> {
    fn bump(&mut self) -> Result<(JsonToken, Range<usize>)> {
        match self.tokens.next() {
            Some((Ok(token), span)) => Ok((token, span)),
            Some((Err(()), span)) => Err(ParseError::syntax("unexpected character", span.start)),
            None => Err(ParseError::syntax("unexpected end of input", self.source.len())),
        }
    }

    fn expect(&mut self, expected: JsonToken) -> Result<Range<usize>> {
        let (token, span) = self.bump()?;
        if token == expected {
            Ok(span)
        } else {
            Err(ParseError::syntax(
                format!("expected {expected:?}, found {token:?}"),
                span.start,
            ))
        }
    }

    fn peek_is(&mut self, expected: JsonToken) -> bool {
        matches!(self.tokens.peek(), Some((Ok(token), _)) if *token == expected)
    }

    fn value(&mut self) -> Result<NodeId> {
        let (token, span) = self.bump()?;
        match token {
            JsonToken::LBrace => self.object(span.start),
            JsonToken::LBracket => self.array(span.start),
            JsonToken::String => {
                let (raw, text) = self.string(&span)?;
                Ok(self.tree.alloc(NodeKind::Literal { raw, text }, span.into()))
            }
            JsonToken::Number | JsonToken::True | JsonToken::False => {
                let raw = self.source[span.clone()].to_string();
                let text = raw.clone();
                Ok(self.tree.alloc(NodeKind::Literal { raw, text }, span.into()))
            }
            JsonToken::Null => {
                let raw = self.source[span.clone()].to_string();
                let text = String::new();
                Ok(self.tree.alloc(NodeKind::Literal { raw, text }, span.into()))
            }
            other => Err(ParseError::syntax(
                format!("expected a value, found {other:?}"),
                span.start,
            )),
        }
    }

    fn string(&self, span: &Range<usize>) -> Result<(String, String)> {
        let raw = &self.source[span.clone()];
        let text = serde_json::from_str::<String>(raw)
            .map_err(|err| ParseError::syntax(err.to_string(), span.start))?;
        Ok((raw.to_string(), text))
    }

    fn object(&mut self, start: usize) -> Result<NodeId> {
        let mut properties = Vec::new();
        if !self.peek_is(JsonToken::RBrace) {
            loop {
                let key_span = self.expect(JsonToken::String)?;
                let (raw, text) = self.string(&key_span)?;
                let key = self
                    .tree
                    .alloc(NodeKind::Key { raw, text }, key_span.clone().into());
                self.expect(JsonToken::Colon)?;
                let value = self.value()?;

                let range = TextRange::new(key_span.start, self.tree.range(value).end);
                properties.push(self.tree.alloc(NodeKind::Property { key, value }, range));

                if !self.peek_is(JsonToken::Comma) {
                    break;
                }
                self.bump()?;
            }
        }
        let end = self.expect(JsonToken::RBrace)?.end;
        Ok(self
            .tree
            .alloc(NodeKind::Object { properties }, TextRange::new(start, end)))
    }

    fn array(&mut self, start: usize) -> Result<NodeId> {
        let mut items = Vec::new();
        if !self.peek_is(JsonToken::RBracket) {
            loop {
                items.push(self.value()?);
                if !self.peek_is(JsonToken::Comma) {
                    break;
                }
                self.bump()?;
            }
        }
        let end = self.expect(JsonToken::RBracket)?.end;
        Ok(self
            .tree
            .alloc(NodeKind::Array { items }, TextRange::new(start, end)))
    }
}
