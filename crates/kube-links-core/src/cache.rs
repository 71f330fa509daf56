//! Per-URI, per-version cache of parsed manifests.
//!
//! A hit hands back the very same `Arc<ParsedDocument>` that was stored, so
//! callers may memoize on pointer identity. A parse failure removes the
//! entry instead of replacing it, so stale trees are never served for a
//! newer version.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use kube_manifest_tree::{DocumentFormat, ParsedDocument};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
struct CacheEntry {
    version: i32,
    document: Arc<ParsedDocument>,
    last_used: u64,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

enum ParseOutcome {
    /// No adapter for this URI
    Unsupported,
    Parsed(Arc<ParsedDocument>),
    Failed,
}

/// Parse `text` with the adapter sniffed from `uri`, containing any panic.
fn parse_guarded(uri: &str, text: &str) -> ParseOutcome {
    let Some(format) = DocumentFormat::sniff(uri) else {
        trace!(uri, "no adapter for document");
        return ParseOutcome::Unsupported;
    };

    let adapter = format.adapter();
    match panic::catch_unwind(AssertUnwindSafe(|| adapter.parse(text))) {
        Ok(document) if document.is_ok() => ParseOutcome::Parsed(Arc::new(document)),
        Ok(document) => {
            debug!(uri, errors = ?document.errors, "parse failed");
            ParseOutcome::Failed
        }
        Err(_) => {
            warn!(uri, "parser panicked");
            ParseOutcome::Failed
        }
    }
}

/// Single-threaded document cache.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<String, CacheEntry>,
    max_entries: Option<usize>,
    tick: u64,
    stats: CacheStats,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `max_entries` parses, dropping the least
    /// recently used one when full. `None` means unbounded.
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self {
            max_entries,
            ..Self::default()
        }
    }

    /// The parse of `text`, reusing the stored one when `version` matches.
    ///
    /// Returns `None` when the URI has no adapter, when parsing fails, or
    /// when `cancel` fires before a parse is needed.
    pub fn get_parsed_documents(
        &mut self,
        uri: &str,
        version: i32,
        text: &str,
        cancel: &CancellationToken,
    ) -> Option<Arc<ParsedDocument>> {
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(uri) {
            if entry.version == version {
                entry.last_used = self.tick;
                self.stats.hits += 1;
                trace!(uri, version, "document cache hit");
                return Some(Arc::clone(&entry.document));
            }
        }

        if cancel.is_cancelled() {
            return None;
        }

        self.stats.misses += 1;
        match parse_guarded(uri, text) {
            ParseOutcome::Unsupported => None,
            ParseOutcome::Failed => {
                self.evict(uri);
                None
            }
            ParseOutcome::Parsed(document) => {
                debug!(uri, version, "parsed document");
                self.entries.insert(
                    uri.to_string(),
                    CacheEntry {
                        version,
                        document: Arc::clone(&document),
                        last_used: self.tick,
                    },
                );
                self.enforce_limit();
                Some(document)
            }
        }
    }

    fn enforce_limit(&mut self) {
        let Some(max) = self.max_entries else {
            return;
        };
        while self.entries.len() > max.max(1) {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(uri, _)| uri.clone())
            else {
                break;
            };
            trace!(uri = %oldest, "evicting least recently used document");
            self.evict(&oldest);
        }
    }

    /// Drop the entry for `uri`. Returns whether one existed.
    pub fn evict(&mut self, uri: &str) -> bool {
        let removed = self.entries.remove(uri).is_some();
        if removed {
            self.stats.evictions += 1;
        }
        removed
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Thread-safe document cache.
///
/// The URI map is behind a `RwLock` and only taken for writing when a URI
/// is seen for the first time or evicted. Each URI has its own `Mutex`, so
/// requests for one document are serialised while different documents are
/// parsed in parallel.
#[derive(Debug, Default)]
pub struct SharedDocumentCache {
    slots: RwLock<HashMap<String, Slot>>,
    max_entries: Option<usize>,
    tick: AtomicU64,
}

impl SharedDocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self {
            max_entries,
            ..Self::default()
        }
    }

    fn slot(&self, uri: &str) -> Slot {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(uri) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(uri.to_string()).or_default())
    }

    /// Same contract as [`DocumentCache::get_parsed_documents`].
    pub fn get_parsed_documents(
        &self,
        uri: &str,
        version: i32,
        text: &str,
        cancel: &CancellationToken,
    ) -> Option<Arc<ParsedDocument>> {
        if DocumentFormat::sniff(uri).is_none() {
            trace!(uri, "no adapter for document");
            return None;
        }

        let tick = self.tick.fetch_add(1, Ordering::Relaxed) + 1;
        let slot = self.slot(uri);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = entry.as_mut() {
            if cached.version == version {
                cached.last_used = tick;
                trace!(uri, version, "document cache hit");
                return Some(Arc::clone(&cached.document));
            }
        }

        if cancel.is_cancelled() {
            // An older parse stays; a slot made just for this request goes
            let vacant = entry.is_none();
            drop(entry);
            if vacant {
                self.remove_vacant(uri, &slot);
            }
            return None;
        }

        match parse_guarded(uri, text) {
            ParseOutcome::Unsupported | ParseOutcome::Failed => {
                *entry = None;
                drop(entry);
                self.remove_vacant(uri, &slot);
                None
            }
            ParseOutcome::Parsed(document) => {
                debug!(uri, version, "parsed document");
                *entry = Some(CacheEntry {
                    version,
                    document: Arc::clone(&document),
                    last_used: tick,
                });
                drop(entry);
                self.enforce_limit(uri);
                Some(document)
            }
        }
    }

    /// Forget `slot` if it is still the one stored for `uri` and holds no
    /// parse. Slots in use by another request are kept.
    fn remove_vacant(&self, uri: &str, slot: &Slot) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let vacant = slots.get(uri).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && current.try_lock().is_ok_and(|entry| entry.is_none())
        });
        if vacant {
            slots.remove(uri);
        }
    }

    /// Evict least recently used entries other than `keep` until the bound
    /// holds. Slots busy in another request are skipped.
    fn enforce_limit(&self, keep: &str) {
        let Some(max) = self.max_entries else {
            return;
        };
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        loop {
            let mut occupied = 0;
            let mut oldest: Option<(u64, String)> = None;
            for (uri, slot) in slots.iter() {
                let Ok(entry) = slot.try_lock() else {
                    occupied += 1;
                    continue;
                };
                let Some(entry) = entry.as_ref() else {
                    continue;
                };
                occupied += 1;
                if uri != keep && oldest.as_ref().is_none_or(|(used, _)| entry.last_used < *used) {
                    oldest = Some((entry.last_used, uri.clone()));
                }
            }
            match oldest {
                Some((_, uri)) if occupied > max.max(1) => {
                    trace!(uri = %uri, "evicting least recently used document");
                    slots.remove(&uri);
                }
                _ => break,
            }
        }
    }

    /// Drop the entry for `uri`. Returns whether one existed.
    pub fn evict(&self, uri: &str) -> bool {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri);
        removed.is_some_and(|slot| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        })
    }

    pub fn contains(&self, uri: &str) -> bool {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(uri).is_some_and(|slot| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        })
    }

    /// Number of URIs holding a parse.
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_manifest_tree::navigate;
    use std::thread;

    const POD: &str = "kind: Pod\nmetadata:\n  name: web\n";

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn same_version_returns_same_document() {
        let mut cache = DocumentCache::new();
        let first = cache.get_parsed_documents("pod.yaml", 1, POD, &token()).unwrap();
        let second = cache.get_parsed_documents("pod.yaml", 1, POD, &token()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, evictions: 0 });
    }

    #[test]
    fn new_version_reparses() {
        let mut cache = DocumentCache::new();
        let first = cache.get_parsed_documents("pod.yaml", 1, POD, &token()).unwrap();
        let second = cache
            .get_parsed_documents("pod.yaml", 2, "kind: Service\n", &token())
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        let leaf = navigate::leaves(&second.tree)[0];
        assert_eq!(navigate::value_text(&second.tree, leaf), Some("Service"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failure_evicts_entry() {
        let mut cache = DocumentCache::new();
        cache.get_parsed_documents("pod.json", 1, r#"{"kind": "Pod"}"#, &token()).unwrap();
        assert!(cache.contains("pod.json"));

        assert!(cache.get_parsed_documents("pod.json", 2, r#"{"kind": "#, &token()).is_none());
        assert!(!cache.contains("pod.json"));

        // The old version is gone as well
        assert!(cache.get_parsed_documents("pod.json", 1, r#"{"kind": "#, &token()).is_none());
    }

    #[test]
    fn unsupported_extension_leaves_cache_alone() {
        let mut cache = DocumentCache::new();
        cache.get_parsed_documents("pod.yaml", 1, POD, &token()).unwrap();
        assert!(cache.get_parsed_documents("notes.txt", 1, POD, &token()).is_none());
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains("notes.txt"));
    }

    #[test]
    fn cancelled_request_does_not_parse() {
        let mut cache = DocumentCache::new();
        let cancel = token();
        cancel.cancel();
        assert!(cache.get_parsed_documents("pod.yaml", 1, POD, &cancel).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn lru_bound() {
        let mut cache = DocumentCache::with_max_entries(Some(2));
        cache.get_parsed_documents("a.yaml", 1, POD, &token());
        cache.get_parsed_documents("b.yaml", 1, POD, &token());
        // Touch a so b becomes the oldest
        cache.get_parsed_documents("a.yaml", 1, POD, &token());
        cache.get_parsed_documents("c.yaml", 1, POD, &token());

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a.yaml"));
        assert!(!cache.contains("b.yaml"));
        assert!(cache.contains("c.yaml"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn shared_cache_identity_and_failure() {
        let cache = SharedDocumentCache::new();
        let first = cache.get_parsed_documents("pod.yaml", 1, POD, &token()).unwrap();
        let second = cache.get_parsed_documents("pod.yaml", 1, POD, &token()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        assert!(cache.get_parsed_documents("pod.yaml", 2, "a: [", &token()).is_none());
        assert!(!cache.contains("pod.yaml"));
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_cache_keeps_no_empty_slots() {
        let cache = SharedDocumentCache::new();
        let slot_count = || cache.slots.read().unwrap().len();

        assert!(cache.get_parsed_documents("notes.txt", 1, POD, &token()).is_none());
        assert!(cache.get_parsed_documents("bad.json", 1, "{", &token()).is_none());
        let cancel = token();
        cancel.cancel();
        assert!(cache.get_parsed_documents("late.yaml", 1, POD, &cancel).is_none());
        assert_eq!(slot_count(), 0);

        // A cancelled request for a newer version keeps the older parse
        cache.get_parsed_documents("pod.yaml", 1, POD, &token()).unwrap();
        assert!(cache.get_parsed_documents("pod.yaml", 2, POD, &cancel).is_none());
        assert!(cache.contains("pod.yaml"));
        assert_eq!(slot_count(), 1);
    }

    #[test]
    fn shared_cache_evict_and_bound() {
        let cache = SharedDocumentCache::with_max_entries(Some(1));
        cache.get_parsed_documents("a.yaml", 1, POD, &token());
        cache.get_parsed_documents("b.yaml", 1, POD, &token());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("b.yaml"));

        assert!(cache.evict("b.yaml"));
        assert!(!cache.evict("b.yaml"));
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_cache_across_threads() {
        let cache = Arc::new(SharedDocumentCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let uri = format!("doc-{}.yaml", i % 4);
                    cache
                        .get_parsed_documents(&uri, 1, POD, &CancellationToken::new())
                        .is_some()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(cache.len(), 4);
    }
}
