//! Link targets and their per-pass identity cache.
//!
//! Targets are virtual-document URIs. Each freshly built URI carries an `_`
//! query parameter holding a nonce so the editor opens a fresh view; the
//! nonce carries no meaning, so two URIs that differ only in it are the same
//! target.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use url::Url;

use crate::config::LinkConfig;

/// Query parameter holding the nonce.
pub const NONCE_PARAM: &str = "_";

static NONCE: AtomicU64 = AtomicU64::new(0);

/// Next value of the process-wide nonce counter.
pub fn next_nonce() -> u64 {
    NONCE.fetch_add(1, Ordering::Relaxed) + 1
}

/// An opaque target identifier.
///
/// Cloning is cheap and keeps the identity: use [`TargetId::ptr_eq`] to ask
/// whether two ids came from the same interning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TargetId(Arc<str>);

impl TargetId {
    pub fn new(target: &str) -> Self {
        Self(Arc::from(target))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if both ids are the very same allocation.
    pub fn ptr_eq(a: &TargetId, b: &TargetId) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip the nonce parameter from a target URI.
///
/// Strings that are not URIs are returned unchanged.
pub fn canonicalize(target: &str) -> String {
    let Ok(mut url) = Url::parse(target) else {
        return target.to_string();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != NONCE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

/// URI of the view of resource `<abbreviation>/<name>`.
///
/// Returns `None` if the configured scheme or authority do not form a URI.
pub fn resource_uri(
    config: &LinkConfig,
    abbreviation: &str,
    name: &str,
    namespace: Option<&str>,
) -> Option<String> {
    let mut url = Url::parse(&format!(
        "{}://{}/",
        config.resource_scheme, config.resource_authority
    ))
    .ok()?;
    url.set_path(&format!("/{abbreviation}-{name}.{}", config.output_format));
    {
        let mut query = url.query_pairs_mut();
        if let Some(namespace) = namespace {
            query.append_pair("ns", namespace);
        }
        query
            .append_pair("value", &format!("{abbreviation}/{name}"))
            .append_pair(NONCE_PARAM, &next_nonce().to_string());
    }
    Some(url.into())
}

/// URI of the view of Helm release `release`.
pub fn helm_uri(config: &LinkConfig, release: &str) -> Option<String> {
    let mut url = Url::parse(&format!(
        "{}://{}/",
        config.helm_scheme, config.helm_authority
    ))
    .ok()?;
    url.set_path(&format!("/{release}.txt"));
    url.query_pairs_mut()
        .append_pair("value", release)
        .append_pair(NONCE_PARAM, &next_nonce().to_string());
    Some(url.into())
}

/// Interning table scoped to one link-computation pass.
///
/// Build a new one for every pass; holding on to it would hand out targets
/// computed for an older version of the document.
#[derive(Debug, Default)]
pub struct TargetIdentityCache {
    interned: HashMap<String, TargetId>,
}

impl TargetIdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that already knows the documents open in the editor, so links
    /// to them resolve to the exact open URI.
    pub fn seeded<'a>(open_documents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut cache = Self::new();
        for uri in open_documents {
            cache.intern(uri);
        }
        cache
    }

    /// The id previously interned for an equivalent target, or a new one.
    pub fn intern(&mut self, target: &str) -> TargetId {
        self.interned
            .entry(canonicalize(target))
            .or_insert_with(|| TargetId::new(target))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_nonce_only() {
        assert_eq!(
            canonicalize("k8smsx://loadkubernetescore/ns-a.yaml?value=ns%2Fa&_=12"),
            "k8smsx://loadkubernetescore/ns-a.yaml?value=ns%2Fa"
        );
        assert_eq!(
            canonicalize("k8smsx://loadkubernetescore/ns-a.yaml?_=12"),
            "k8smsx://loadkubernetescore/ns-a.yaml"
        );
        assert_eq!(canonicalize("not a uri"), "not a uri");
    }

    #[test]
    fn canonicalize_normalizes_encoding() {
        assert_eq!(
            canonicalize("k8smsx://loadkubernetescore/ns-a.yaml?value=ns/a&_=3"),
            canonicalize("k8smsx://loadkubernetescore/ns-a.yaml?value=ns%2Fa")
        );
    }

    #[test]
    fn resource_uri_shape() {
        let config = LinkConfig::default();
        let uri = resource_uri(&config, "deployment", "web", Some("shop")).unwrap();
        let url = Url::parse(&uri).unwrap();
        assert_eq!(url.scheme(), "k8smsx");
        assert_eq!(url.host_str(), Some("loadkubernetescore"));
        assert_eq!(url.path(), "/deployment-web.yaml");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("ns".to_string(), "shop".to_string()));
        assert_eq!(pairs[1], ("value".to_string(), "deployment/web".to_string()));
        assert_eq!(pairs[2].0, NONCE_PARAM);

        let cluster_scoped = resource_uri(&config, "ns", "shop", None).unwrap();
        assert!(!cluster_scoped.contains("ns="));
    }

    #[test]
    fn helm_uri_shape() {
        let uri = helm_uri(&LinkConfig::default(), "web-1").unwrap();
        assert!(uri.starts_with("helmget://helmget/web-1.txt?value=web-1&_="));
    }

    #[test]
    fn nonces_increase() {
        let a = next_nonce();
        let b = next_nonce();
        assert!(b > a);

        let config = LinkConfig::default();
        let first = resource_uri(&config, "ns", "a", None).unwrap();
        let second = resource_uri(&config, "ns", "a", None).unwrap();
        assert_ne!(first, second);
        assert_eq!(canonicalize(&first), canonicalize(&second));
    }

    #[test]
    fn bad_scheme_yields_no_uri() {
        let config = LinkConfig {
            resource_scheme: "not a scheme".to_string(),
            ..LinkConfig::default()
        };
        assert_eq!(resource_uri(&config, "ns", "a", None), None);
    }

    #[test]
    fn intern_dedups_with_and_without_nonce() {
        let mut cache = TargetIdentityCache::new();
        let with_nonce = cache.intern("k8smsx://loadkubernetescore/ns-ns1.yaml?value=ns%2Fns1&_=41");
        let without = cache.intern("k8smsx://loadkubernetescore/ns-ns1.yaml?value=ns%2Fns1");
        assert!(TargetId::ptr_eq(&with_nonce, &without));
        assert_eq!(cache.len(), 1);

        let other = cache.intern("k8smsx://loadkubernetescore/ns-ns2.yaml?value=ns%2Fns2");
        assert!(!TargetId::ptr_eq(&with_nonce, &other));
    }

    #[test]
    fn seeded_cache_returns_open_instance() {
        let open = "k8smsx://loadkubernetescore/pvc-data.yaml?value=pvc%2Fdata&_=3";
        let mut cache = TargetIdentityCache::seeded([open]);
        let fresh = resource_uri(&LinkConfig::default(), "pvc", "data", None).unwrap();
        let id = cache.intern(&fresh);
        assert_eq!(id.as_str(), open);
    }

    #[test]
    fn target_id_serializes_as_string() {
        let id = TargetId::new("helmget://helmget/r.txt");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""helmget://helmget/r.txt""#);
    }
}
