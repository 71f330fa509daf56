//! Transport-agnostic link resolution for Kubernetes manifests.
//!
//! Given the text of a YAML or JSON manifest, finds the fields that refer to
//! other resources (namespaces, owners, claims, config maps, Helm releases)
//! and returns a clickable range plus a target URI for each.
//!
//! # Architecture
//!
//! ```text
//! Document ──► DocumentCache ──► navigate::leaves ──► LinkResolver ──► TargetIdentityCache
//!              (parse or reuse)                      (per leaf rule)     (dedup per pass)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use kube_links_core::{Document, LinkConfig, LinkProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut provider = LinkProvider::new(LinkConfig::default());
//! let doc = Document::new("pod.yaml", "metadata:\n  namespace: shop\n", 1);
//! let links = provider.provide_links(&doc, std::iter::empty(), &CancellationToken::new());
//! assert_eq!(links.len(), 1);
//! assert!(links[0].target.as_str().contains("ns-shop.yaml"));
//! ```

pub mod cache;
pub mod config;
pub mod document;
pub mod kinds;
pub mod links;
pub mod resolve;
pub mod target;
pub mod types;

pub use cache::{CacheStats, DocumentCache, SharedDocumentCache};
pub use config::{ConfigError, LinkConfig};
pub use document::{Document, DocumentStore};
pub use kinds::{KindRegistry, ResourceKind};
pub use links::{LinkContext, LinkProvider, links_for_document, provide_links};
pub use resolve::LinkResolver;
pub use target::{TargetId, TargetIdentityCache};
pub use types::{DocumentLink, Position, Range};
