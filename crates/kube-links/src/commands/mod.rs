//! Command implementations for the kube-links CLI.
//!
//! Each command handles its arguments and delegates to kube-links-core or
//! kube-links-lsp.

pub mod kinds;
pub mod links;
pub mod lsp;

use std::path::Path;

use anyhow::{Context, Result};
use kube_links_core::LinkConfig;

/// Load `path`, or the defaults when no configuration file was given.
fn load_config(path: Option<&Path>) -> Result<LinkConfig> {
    match path {
        Some(path) => LinkConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(LinkConfig::default()),
    }
}
