//! One-shot link pass over a manifest file.

use std::iter;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use kube_links_core::target::canonicalize;
use kube_links_core::{Document, LinkProvider};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub fn execute(file: &Path, kind: Option<&str>, config: Option<&Path>) -> Result<()> {
    let links = collect(file, kind, config)?;
    println!("{}", serde_json::to_string_pretty(&links)?);
    Ok(())
}

/// The links of `file` as a JSON array of `{range, target}` objects.
///
/// Targets are printed without their nonce so output is reproducible.
fn collect(file: &Path, kind: Option<&str>, config: Option<&Path>) -> Result<Value> {
    let config = super::load_config(config)?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut provider = LinkProvider::new(config);

    let mut uri = file.display().to_string();
    if let Some(kind) = kind {
        let kinds = provider.kinds();
        let abbreviation = kinds
            .find_kind(kind)
            .or_else(|| kinds.find_kind_by_abbreviation(kind))
            .map(|k| k.abbreviation.clone())
            .ok_or_else(|| anyhow!("unknown resource kind `{kind}`"))?;
        let name = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Same shape as a virtual document URI, so the query decides the kind
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("value", &format!("{abbreviation}/{name}"))
            .finish();
        uri = format!("{uri}?{query}");
    }
    debug!(%uri, "computing links");

    let document = Document::new(uri, text, 1);
    let links = provider.provide_links(&document, iter::empty(), &CancellationToken::new());
    Ok(links
        .iter()
        .map(|link| json!({"range": link.range, "target": canonicalize(link.target.as_str())}))
        .collect())
}
