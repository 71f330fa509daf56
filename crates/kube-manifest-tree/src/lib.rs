//! Unified syntax tree for Kubernetes manifests written in YAML or JSON.
//!
//! Both adapters produce the same arena of [`NodeKind`]s with byte ranges
//! into the source text, so everything downstream of parsing is
//! format-agnostic.
//!
//! # Example
//!
//! ```rust
//! use kube_manifest_tree::{navigate, parse_path};
//!
//! let doc = parse_path("pod.yaml", "metadata:\n  namespace: shop\n").unwrap();
//! let leaves = navigate::leaves(&doc.tree);
//! assert_eq!(navigate::key(&doc.tree, leaves[0]), Some("namespace"));
//! assert_eq!(navigate::parent_key(&doc.tree, leaves[0]), Some("metadata"));
//! ```

pub mod document;
pub mod error;
pub mod json;
pub mod navigate;
pub mod node;
pub mod yaml;

pub use document::{DocumentFormat, FormatAdapter, ParsedDocument, parse_path};
pub use error::{ParseError, Result};
pub use node::{Node, NodeId, NodeKind, SyntaxTree};
