//! The document store: what a listing page reads from.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use folio_content_parser::{ContentParser, Document};
use folio_directory_watcher::{DocumentIdentity, WatchBatch, WatchEvent};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::config::DEFAULT_PAGE_SIZE;

/// One store mutation derived from a watch event.
#[derive(Debug, Clone)]
pub enum Update {
    /// A new file was parsed.
    Created(Arc<Document>),
    /// A known file was re-parsed.
    Changed(Arc<Document>),
    /// A file disappeared.
    Removed(DocumentIdentity),
}

/// What applying a batch did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Documents inserted for the first time.
    pub inserted: usize,

    /// Documents replaced.
    pub replaced: usize,

    /// Documents removed.
    pub removed: usize,

    /// Inserted or replaced documents that are parse-failure placeholders.
    pub failed: usize,

    /// Documents in the store afterwards.
    pub total: usize,
}

/// Parse every created or changed identity in `batch` concurrently.
///
/// The returned updates follow the batch's event order regardless of which
/// parse finishes first.
pub async fn parse_batch(parser: &Arc<ContentParser>, batch: &WatchBatch) -> Vec<Update> {
    let mut slots: Vec<Option<Update>> = vec![None; batch.len()];
    let mut parses = JoinSet::new();

    for (index, event) in batch.iter().enumerate() {
        let changed = match event {
            WatchEvent::Created(_) => false,
            WatchEvent::Changed(_) => true,
            WatchEvent::Removed(identity) => {
                slots[index] = Some(Update::Removed(identity.clone()));
                continue;
            }
        };
        let parser = Arc::clone(parser);
        let identity = event.identity().clone();
        parses.spawn(async move { (index, changed, parser.parse(&identity).await) });
    }

    while let Some(joined) = parses.join_next().await {
        match joined {
            Ok((index, changed, document)) => {
                let document = Arc::new(document);
                slots[index] = Some(if changed {
                    Update::Changed(document)
                } else {
                    Update::Created(document)
                });
            }
            Err(e) => error!("Parse task failed: {e}"),
        }
    }

    slots.into_iter().flatten().collect()
}

/// Documents sorted newest first, with lookups by base name and tag.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    /// Documents by base name.
    by_base: HashMap<String, Arc<Document>>,

    /// Documents ordered by date, newest first; ties by base name.
    sorted: Vec<Arc<Document>>,

    /// Base names by tag.
    tag_index: BTreeMap<String, BTreeSet<String>>,

    /// Documents per listing page.
    page_size: usize,
}

impl DocumentStore {
    /// Create an empty store with the default page size.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store with the given page size (at least 1).
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            by_base: HashMap::new(),
            sorted: Vec::new(),
            tag_index: BTreeMap::new(),
            page_size: page_size.max(1),
        }
    }

    /// Insert or replace a document by base name, returning the old one.
    pub fn upsert(&mut self, document: Arc<Document>) -> Option<Arc<Document>> {
        let previous = self.remove(document.base());

        for tag in &document.meta.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(document.base().to_string());
        }
        let position = self
            .sorted
            .partition_point(|probe| listing_order(probe, &document) == Ordering::Less);
        self.sorted.insert(position, Arc::clone(&document));
        self.by_base.insert(document.base().to_string(), document);

        previous
    }

    /// Remove a document by base name.
    pub fn remove(&mut self, base: &str) -> Option<Arc<Document>> {
        let document = self.by_base.remove(base)?;

        self.sorted.retain(|d| d.base() != base);
        for tag in &document.meta.tags {
            if let Some(bases) = self.tag_index.get_mut(tag) {
                bases.remove(base);
                if bases.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }

        Some(document)
    }

    /// Get a document by base name.
    pub fn get(&self, base: &str) -> Option<&Arc<Document>> {
        self.by_base.get(base)
    }

    /// All documents, newest first.
    pub fn documents(&self) -> &[Arc<Document>] {
        &self.sorted
    }

    /// A 1-based listing page. Out-of-range pages are empty.
    pub fn page(&self, page: usize) -> &[Arc<Document>] {
        if page == 0 {
            return &[];
        }
        let start = (page - 1).saturating_mul(self.page_size);
        if start >= self.sorted.len() {
            return &[];
        }
        let end = (start + self.page_size).min(self.sorted.len());
        &self.sorted[start..end]
    }

    /// Number of listing pages.
    pub fn page_count(&self) -> usize {
        self.sorted.len().div_ceil(self.page_size)
    }

    /// Documents per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Documents carrying `tag`, newest first.
    pub fn by_tag(&self, tag: &str) -> Vec<Arc<Document>> {
        match self.tag_index.get(tag) {
            Some(bases) => self
                .sorted
                .iter()
                .filter(|d| bases.contains(d.base()))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every tag with the number of documents carrying it.
    pub fn tags(&self) -> BTreeMap<&str, usize> {
        self.tag_index
            .iter()
            .map(|(tag, bases)| (tag.as_str(), bases.len()))
            .collect()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.by_base.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.by_base.is_empty()
    }

    /// Apply parsed updates in order.
    pub fn apply(&mut self, updates: Vec<Update>) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for update in updates {
            match update {
                Update::Created(document) | Update::Changed(document) if document.is_error() => {
                    summary.failed += 1;
                    self.record_upsert(document, &mut summary);
                }
                Update::Created(document) => self.record_upsert(document, &mut summary),
                Update::Changed(document) => {
                    if !self.by_base.contains_key(document.base()) {
                        debug!("Change for unknown document {}; inserting it", document.identity);
                    }
                    self.record_upsert(document, &mut summary);
                }
                Update::Removed(identity) => match self.remove(identity.base()) {
                    Some(_) => summary.removed += 1,
                    None => debug!("Ignoring removal of unknown document {identity}"),
                },
            }
        }

        summary.total = self.len();
        summary
    }

    fn record_upsert(&mut self, document: Arc<Document>, summary: &mut BatchSummary) {
        match self.upsert(document) {
            Some(_) => summary.replaced += 1,
            None => summary.inserted += 1,
        }
    }

    /// Parse a watch batch and apply it.
    ///
    /// `Changed` for a document the store does not hold inserts it.
    pub async fn apply_batch(&mut self, parser: &Arc<ContentParser>, batch: &WatchBatch) -> BatchSummary {
        let updates = parse_batch(parser, batch).await;
        self.apply(updates)
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest first; ties broken by base name.
fn listing_order(a: &Document, b: &Document) -> Ordering {
    (Reverse(a.meta.date), a.base()).cmp(&(Reverse(b.meta.date), b.base()))
}
