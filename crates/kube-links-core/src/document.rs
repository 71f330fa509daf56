//! Open manifest documents.
//!
//! A document is one editor snapshot: URI, text and the version counter the
//! editor bumps on every change. URIs may be real `file://` URIs, virtual
//! resource URIs carrying a query string, or plain filesystem paths when the
//! CLI is driving.

use std::borrow::Cow;
use std::collections::HashMap;

use url::Url;

/// A manifest snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    uri: String,
    content: String,
    version: i32,
}

impl Document {
    pub fn new(uri: impl Into<String>, content: impl Into<String>, version: i32) -> Self {
        Self {
            uri: uri.into(),
            content: content.into(),
            version,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Path component of the URI, without query or fragment.
    pub fn path(&self) -> Cow<'_, str> {
        match Url::parse(&self.uri) {
            Ok(url) => Cow::Owned(url.path().to_string()),
            Err(_) => Cow::Borrowed(split_query(&self.uri).0),
        }
    }

    /// Raw query string of the URI, if any.
    pub fn query(&self) -> Option<&str> {
        split_query(&self.uri).1
    }

    /// Decoded value of the first query parameter called `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Resource kind abbreviation encoded in a virtual document URI
    /// (`?value=<abbr>/<name>`).
    pub fn source_kind(&self) -> Option<String> {
        let value = self.query_param("value")?;
        let (abbreviation, _) = value.split_once('/')?;
        (!abbreviation.is_empty()).then(|| abbreviation.to_string())
    }

    pub fn set_content(&mut self, content: impl Into<String>, version: i32) {
        self.content = content.into();
        self.version = version;
    }
}

/// Split `uri` into the part before `?` and the query, dropping any fragment.
fn split_query(uri: &str) -> (&str, Option<&str>) {
    let uri = uri.split('#').next().unwrap_or(uri);
    match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    }
}

/// The set of documents the editor currently has open.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace a document.
    pub fn open(&mut self, uri: impl Into<String>, content: impl Into<String>, version: i32) {
        let uri = uri.into();
        self.documents
            .insert(uri.clone(), Document::new(uri, content, version));
    }

    /// Replace the content of an open document. Unknown URIs are ignored.
    pub fn change(&mut self, uri: &str, content: impl Into<String>, version: i32) {
        if let Some(doc) = self.documents.get_mut(uri) {
            doc.set_content(content, version);
        }
    }

    pub fn close(&mut self, uri: &str) -> Option<Document> {
        self.documents.remove(uri)
    }

    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_paths() {
        let doc = Document::new("file:///work/web.yaml", "kind: Pod", 1);
        assert_eq!(doc.path(), "/work/web.yaml");
        assert_eq!(doc.query(), None);
        assert_eq!(doc.source_kind(), None);

        let doc = Document::new("manifests/web.json?x=1", "{}", 1);
        assert_eq!(doc.path(), "manifests/web.json");
        assert_eq!(doc.query(), Some("x=1"));
    }

    #[test]
    fn virtual_document_query() {
        let doc = Document::new(
            "k8smsx://loadkubernetescore/deployment-web.yaml?ns=shop&value=deployment%2Fweb&_=7",
            "",
            1,
        );
        assert_eq!(doc.path(), "/deployment-web.yaml");
        assert_eq!(doc.query_param("ns").as_deref(), Some("shop"));
        assert_eq!(doc.query_param("value").as_deref(), Some("deployment/web"));
        assert_eq!(doc.source_kind().as_deref(), Some("deployment"));
        assert_eq!(doc.query_param("missing"), None);
    }

    #[test]
    fn unencoded_value_parameter() {
        let doc = Document::new("k8smsx://loadkubernetescore/pv-data.yaml?value=pv/data", "", 1);
        assert_eq!(doc.source_kind().as_deref(), Some("pv"));
    }

    #[test]
    fn document_store_lifecycle() {
        let mut store = DocumentStore::new();

        store.open("file:///a.yaml", "a: 1", 1);
        store.open("file:///b.yaml", "b: 1", 1);

        store.change("file:///a.yaml", "a: 2", 2);
        let a = store.get("file:///a.yaml").unwrap();
        assert_eq!(a.content(), "a: 2");
        assert_eq!(a.version(), 2);

        // Changes to unknown documents are dropped
        store.change("file:///c.yaml", "c: 1", 1);
        assert!(store.get("file:///c.yaml").is_none());

        assert!(store.close("file:///a.yaml").is_some());
        assert!(store.get("file:///a.yaml").is_none());
        assert_eq!(store.uris().collect::<Vec<_>>(), vec!["file:///b.yaml"]);
    }
}
