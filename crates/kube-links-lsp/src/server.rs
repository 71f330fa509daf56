//! LSP server implementation using tower-lsp.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

use kube_links_core::document::DocumentStore;
use kube_links_core::{
    KindRegistry, LinkConfig, LinkContext, SharedDocumentCache, TargetIdentityCache,
    links_for_document,
};

use crate::capabilities::server_capabilities;
use crate::convert;

/// Configuration fixed at `initialize`.
#[derive(Debug, Default)]
struct Settings {
    config: LinkConfig,
    kinds: KindRegistry,
}

/// The manifest link language server.
pub struct KubeLinksServer {
    /// The LSP client for sending notifications.
    client: Client,
    documents: Arc<RwLock<DocumentStore>>,
    settings: Arc<RwLock<Settings>>,
    cache: Arc<RwLock<Arc<SharedDocumentCache>>>,
    /// One token per open document, replaced on every change. Only touched
    /// while holding `documents`, so a document and its token always agree.
    pending: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl KubeLinksServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(DocumentStore::new())),
            settings: Arc::new(RwLock::new(Settings::default())),
            cache: Arc::new(RwLock::new(Arc::new(SharedDocumentCache::new()))),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cancel in-flight work for `uri` and install a fresh token.
    async fn renew_token(&self, uri: &str) {
        let mut pending = self.pending.lock().await;
        if let Some(old) = pending.insert(uri.to_string(), CancellationToken::new()) {
            old.cancel();
        }
    }

    /// Links of an open document, or `None` if `uri` is not open.
    async fn compute_links(&self, uri: &Url) -> Option<Vec<DocumentLink>> {
        let (document, open_documents, cancel) = {
            let documents = self.documents.read().await;
            let document = documents.get(uri.as_str())?.clone();
            let cancel = self.pending.lock().await.get(uri.as_str())?.clone();
            let open: Vec<String> = documents.uris().map(str::to_string).collect();
            (document, open, cancel)
        };

        let cache = Arc::clone(&*self.cache.read().await);
        let Some(parsed) = cache.get_parsed_documents(
            document.uri(),
            document.version(),
            document.content(),
            &cancel,
        ) else {
            return Some(Vec::new());
        };

        let settings = self.settings.read().await;
        let ctx = LinkContext {
            config: &settings.config,
            kinds: &settings.kinds,
            cancel: &cancel,
        };
        let mut targets = TargetIdentityCache::seeded(open_documents.iter().map(String::as_str));
        let links = links_for_document(&ctx, &document, &parsed, &mut targets);
        Some(links.iter().filter_map(convert::link_to_lsp).collect())
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for KubeLinksServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let config = match params.initialization_options {
            Some(options) => LinkConfig::from_json_value(options).unwrap_or_else(|err| {
                warn!(%err, "ignoring invalid initializationOptions");
                LinkConfig::default()
            }),
            None => LinkConfig::default(),
        };
        debug!(?config, "initializing");

        *self.cache.write().await =
            Arc::new(SharedDocumentCache::with_max_entries(config.max_cached_documents));
        *self.settings.write().await = Settings {
            kinds: config.kind_registry(),
            config,
        };

        Ok(InitializeResult {
            capabilities: server_capabilities(),
            server_info: Some(ServerInfo {
                name: "kube-links".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("kube-links language server initialized");
        self.client
            .log_message(MessageType::INFO, "kube-links server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let mut documents = self.documents.write().await;
        self.renew_token(uri.as_str()).await;
        documents.open(
            uri.as_str(),
            params.text_document.text,
            params.text_document.version,
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full document sync: the last change holds the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            let mut documents = self.documents.write().await;
            if documents.get(uri.as_str()).is_some() {
                self.renew_token(uri.as_str()).await;
                documents.change(uri.as_str(), change.text, version);
            }
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut documents = self.documents.write().await;
            if let Some(token) = self.pending.lock().await.remove(uri.as_str()) {
                token.cancel();
            }
            documents.close(uri.as_str());
        }
        self.cache.read().await.evict(uri.as_str());
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let uri = params.text_document.uri;
        let links = self.compute_links(&uri).await;
        debug!(uri = %uri, count = ?links.as_ref().map(Vec::len), "document links");
        Ok(links)
    }
}

/// Run the LSP server over stdio.
pub async fn run_server() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(KubeLinksServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    async fn open(server: &KubeLinksServer, uri: &Url, text: &str, version: i32) {
        server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: "yaml".to_string(),
                    version,
                    text: text.to_string(),
                },
            })
            .await;
    }

    async fn change(server: &KubeLinksServer, uri: &Url, text: &str, version: i32) {
        server
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: uri.clone(),
                    version,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: text.to_string(),
                }],
            })
            .await;
    }

    async fn token(server: &KubeLinksServer, uri: &Url) -> Option<CancellationToken> {
        server.pending.lock().await.get(uri.as_str()).cloned()
    }

    async fn links(server: &KubeLinksServer, uri: &Url) -> Option<Vec<DocumentLink>> {
        server
            .document_link(DocumentLinkParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn links_follow_document_changes() {
        let (service, _socket) = LspService::new(KubeLinksServer::new);
        let server = service.inner();
        server.initialize(InitializeParams::default()).await.unwrap();

        let doc = uri("file:///work/pod.yaml");
        open(server, &doc, "metadata:\n  namespace: shop\n", 1).await;

        let found = links(server, &doc).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range.start, Position::new(1, 13));
        assert_eq!(found[0].target.as_ref().unwrap().path(), "/ns-shop.yaml");

        change(server, &doc, "metadata:\n  name: web\n", 2).await;
        assert_eq!(links(server, &doc).await.unwrap().len(), 0);

        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: doc.clone() },
            })
            .await;
        assert!(links(server, &doc).await.is_none());
    }

    #[tokio::test]
    async fn changes_and_close_cancel_pending_work() {
        let (service, _socket) = LspService::new(KubeLinksServer::new);
        let server = service.inner();
        server.initialize(InitializeParams::default()).await.unwrap();

        let doc = uri("file:///work/pod.yaml");
        open(server, &doc, "metadata:\n  namespace: shop\n", 1).await;
        let first = token(server, &doc).await.unwrap();

        change(server, &doc, "metadata:\n  namespace: store\n", 2).await;
        assert!(first.is_cancelled());
        let second = token(server, &doc).await.unwrap();
        assert!(!second.is_cancelled());

        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: doc.clone() },
            })
            .await;
        assert!(second.is_cancelled());

        // Neither a request nor a late change brings a closed document back
        assert!(links(server, &doc).await.is_none());
        change(server, &doc, "metadata: {}\n", 3).await;
        assert!(token(server, &doc).await.is_none());
        assert!(links(server, &doc).await.is_none());
    }

    #[tokio::test]
    async fn initialization_options_configure_targets() {
        let (service, _socket) = LspService::new(KubeLinksServer::new);
        let server = service.inner();
        let options = json!({"resourceScheme": "kube", "outputFormat": "json"});
        server
            .initialize(InitializeParams {
                initialization_options: Some(options),
                ..Default::default()
            })
            .await
            .unwrap();

        let doc = uri("file:///work/pod.json");
        open(server, &doc, r#"{"metadata": {"namespace": "shop"}}"#, 1).await;
        let found = links(server, &doc).await.unwrap();
        let target = found[0].target.as_ref().unwrap();
        assert_eq!(target.scheme(), "kube");
        assert_eq!(target.path(), "/ns-shop.json");
    }

    #[tokio::test]
    async fn open_documents_are_link_targets() {
        let (service, _socket) = LspService::new(KubeLinksServer::new);
        let server = service.inner();
        server.initialize(InitializeParams::default()).await.unwrap();

        let view = uri("k8smsx://loadkubernetescore/ns-shop.yaml?value=ns%2Fshop&_=99");
        open(server, &view, "kind: Namespace\n", 1).await;
        let doc = uri("file:///work/pod.yaml");
        open(server, &doc, "metadata:\n  namespace: shop\n", 1).await;

        let found = links(server, &doc).await.unwrap();
        assert_eq!(found[0].target.as_ref(), Some(&view));
    }

    #[tokio::test]
    async fn malformed_documents_have_no_links() {
        let (service, _socket) = LspService::new(KubeLinksServer::new);
        let server = service.inner();
        server.initialize(InitializeParams::default()).await.unwrap();

        let doc = uri("file:///work/broken.json");
        open(server, &doc, "{\"metadata\": ", 1).await;
        assert_eq!(links(server, &doc).await, Some(Vec::new()));
    }
}
