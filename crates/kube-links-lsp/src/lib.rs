//! Language Server Protocol front end for Kubernetes manifest links.
//!
//! Wraps `kube-links-core` with tower-lsp. The server tracks open documents
//! under full text sync and answers `textDocument/documentLink`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     kube-links-lsp                       │
//! │   tower-lsp wrapper, JSON-RPC/stdio, `kube-links lsp`    │
//! │                                                          │
//! │  ┌────────────────┐  ┌─────────────┐  ┌───────────────┐  │
//! │  │   server.rs    │  │ convert.rs  │  │capabilities.rs│  │
//! │  │ LanguageServer │  │ Core ↔ LSP  │  │  negotiation  │  │
//! │  └───────┬────────┘  └──────┬──────┘  └───────────────┘  │
//! │          └──────────────────┴─────────────┐              │
//! │  ┌────────────────────────────────────────▼───────────┐  │
//! │  │                  kube-links-core                   │  │
//! │  │   parse cache, leaf rules, target identities       │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! kube-links lsp
//! ```
//!
//! Or programmatically:
//!
//! ```rust,ignore
//! kube_links_lsp::run_server().await;
//! ```

pub mod capabilities;
pub mod convert;
pub mod server;

pub use server::{KubeLinksServer, run_server};
