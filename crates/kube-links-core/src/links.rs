//! The link pass: document text in, clickable ranges out.

use kube_manifest_tree::{ParsedDocument, navigate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::cache::DocumentCache;
use crate::config::LinkConfig;
use crate::document::Document;
use crate::kinds::KindRegistry;
use crate::resolve::{LinkResolver, manifest_kind};
use crate::target::TargetIdentityCache;
use crate::types::{DocumentLink, Range};

/// Everything a link pass reads besides the document itself.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub config: &'a LinkConfig,
    pub kinds: &'a KindRegistry,
    /// Checked between leaves; a cancelled pass returns what it has so far
    pub cancel: &'a CancellationToken,
}

/// Compute the links of `document`, parsing through `cache`.
///
/// Never fails: unparseable or unsupported documents simply have no links.
pub fn provide_links<'u>(
    ctx: &LinkContext<'_>,
    document: &Document,
    cache: &mut DocumentCache,
    open_documents: impl IntoIterator<Item = &'u str>,
) -> Vec<DocumentLink> {
    let Some(parsed) = cache.get_parsed_documents(
        document.uri(),
        document.version(),
        document.content(),
        ctx.cancel,
    ) else {
        return Vec::new();
    };
    let mut targets = TargetIdentityCache::seeded(open_documents);
    links_for_document(ctx, document, &parsed, &mut targets)
}

/// Compute the links of an already parsed document.
pub fn links_for_document(
    ctx: &LinkContext<'_>,
    document: &Document,
    parsed: &ParsedDocument,
    targets: &mut TargetIdentityCache,
) -> Vec<DocumentLink> {
    let tree = &parsed.tree;
    let resolver = LinkResolver::new(ctx.config, ctx.kinds);
    let uri_kind = document.source_kind();
    let mut links = Vec::new();

    for &root in tree.roots() {
        let source_kind = uri_kind
            .as_deref()
            .or_else(|| manifest_kind(tree, root, ctx.kinds));
        trace!(uri = document.uri(), kind = ?source_kind, "resolving manifest");

        let leaves = navigate::descendants(tree, root).filter(|id| navigate::is_leaf(tree, *id));
        for leaf in leaves {
            if ctx.cancel.is_cancelled() {
                debug!(uri = document.uri(), "link pass cancelled");
                return links;
            }
            let Some(target) = resolver.resolve(tree, source_kind, leaf, targets) else {
                continue;
            };
            let Some(value) = navigate::value_node(tree, leaf) else {
                continue;
            };
            let Some(range) = parsed.line_index.range(tree.range(value)) else {
                continue;
            };
            links.push(DocumentLink {
                range: Range::from(range),
                target,
            });
        }
    }

    debug!(uri = document.uri(), links = links.len(), "computed document links");
    links
}

/// A link pass bundled with the state it keeps between calls.
///
/// This is the entry point for single-threaded hosts such as the CLI.
#[derive(Debug, Default)]
pub struct LinkProvider {
    config: LinkConfig,
    kinds: KindRegistry,
    cache: DocumentCache,
}

impl LinkProvider {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            kinds: config.kind_registry(),
            cache: DocumentCache::with_max_entries(config.max_cached_documents),
            config,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    pub fn provide_links<'u>(
        &mut self,
        document: &Document,
        open_documents: impl IntoIterator<Item = &'u str>,
        cancel: &CancellationToken,
    ) -> Vec<DocumentLink> {
        let ctx = LinkContext {
            config: &self.config,
            kinds: &self.kinds,
            cancel,
        };
        provide_links(&ctx, document, &mut self.cache, open_documents)
    }

    /// Forget the cached parse of `uri`.
    pub fn close(&mut self, uri: &str) {
        self.cache.evict(uri);
    }
}
