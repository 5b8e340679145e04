//! Engine wiring: one watcher, one parser, one store.
//!
//! An [`Engine`] is a complete graph built from one configuration. Reloading
//! never mutates a running graph; [`EngineHandle::reload`] builds a fresh one
//! and swaps it in.

use std::path::PathBuf;
use std::sync::Arc;

use folio_content_parser::ContentParser;
use folio_directory_watcher::{DirectoryWatcher, Subscription, WatcherError};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::FolioConfig;
use crate::error::Result;
use crate::store::{BatchSummary, DocumentStore, parse_batch};

/// Capacity of the batch summary channel.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Where an [`EngineHandle`] gets its configuration on every build.
pub trait ConfigSource: Send + Sync {
    /// Produce the configuration for the next build.
    fn load(&self) -> Result<FolioConfig>;
}

/// A TOML file, re-read on every build.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
}

impl FileConfig {
    /// Read configuration from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfig {
    fn load(&self) -> Result<FolioConfig> {
        FolioConfig::load(&self.path)
    }
}

/// A fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfig(pub FolioConfig);

impl ConfigSource for StaticConfig {
    fn load(&self) -> Result<FolioConfig> {
        self.0.validate()?;
        Ok(self.0.clone())
    }
}

/// A running watcher/parser/store graph.
pub struct Engine {
    /// Configuration this engine was built from.
    config: FolioConfig,

    /// Shared parser.
    parser: Arc<ContentParser>,

    /// The documents.
    store: Arc<RwLock<DocumentStore>>,

    /// Summaries of applied batches.
    updates: broadcast::Sender<BatchSummary>,

    /// The directory watcher, until shutdown.
    watcher: Mutex<Option<DirectoryWatcher>>,

    /// Task applying watch batches to the store, until shutdown.
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Start watching, load every document, then keep the store in sync.
    ///
    /// Returns once the initial listing has been parsed into the store.
    pub async fn build(config: FolioConfig, parser: Arc<ContentParser>) -> Result<Self> {
        config.validate()?;
        info!("Building engine for {}", config.content.dir.display());

        let watcher = DirectoryWatcher::start(config.content.clone()).await?;
        let mut subscription = watcher.subscribe()?;
        let initial = subscription
            .next_batch()
            .await
            .ok_or(WatcherError::Stopped)?;

        let mut store = DocumentStore::with_page_size(config.listing.page_size);
        let summary = store.apply_batch(&parser, &initial).await;
        info!(
            "Loaded {} documents ({} failed to parse)",
            summary.total, summary.failed
        );

        let store = Arc::new(RwLock::new(store));
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let consumer = tokio::spawn(consume(
            subscription,
            Arc::clone(&parser),
            Arc::clone(&store),
            updates.clone(),
        ));

        Ok(Self {
            config,
            parser,
            store,
            updates,
            watcher: Mutex::new(Some(watcher)),
            consumer: Mutex::new(Some(consumer)),
        })
    }

    /// The document store.
    pub fn store(&self) -> &Arc<RwLock<DocumentStore>> {
        &self.store
    }

    /// The parser.
    pub fn parser(&self) -> &Arc<ContentParser> {
        &self.parser
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Receive a summary after every applied batch.
    pub fn updates(&self) -> broadcast::Receiver<BatchSummary> {
        self.updates.subscribe()
    }

    /// Stop watching and wait for in-flight work to finish. Idempotent.
    pub async fn shutdown(&self) {
        if let Some(watcher) = self.watcher.lock().await.take() {
            watcher.shutdown().await;
        }
        if let Some(consumer) = self.consumer.lock().await.take() {
            if let Err(e) = consumer.await {
                error!("Store consumer failed: {e}");
            }
        }
        debug!("Engine for {} shut down", self.config.content.dir.display());
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(consumer) = self.consumer.get_mut().take() {
            consumer.abort();
        }
    }
}

/// Apply batches until the watcher goes away.
async fn consume(
    mut subscription: Subscription,
    parser: Arc<ContentParser>,
    store: Arc<RwLock<DocumentStore>>,
    updates: broadcast::Sender<BatchSummary>,
) {
    while let Some(batch) = subscription.next_batch().await {
        debug!("Applying batch of {} events", batch.len());
        // Parse outside the lock so readers never wait on file I/O.
        let parsed = parse_batch(&parser, &batch).await;
        let summary = store.write().await.apply(parsed);
        // No receivers is fine.
        let _ = updates.send(summary);
    }
    debug!("Watch subscription closed");
}

/// Owns the current [`Engine`] and rebuilds it on demand.
pub struct EngineHandle {
    source: Arc<dyn ConfigSource>,
    parser: Arc<ContentParser>,
    current: RwLock<Arc<Engine>>,
    reload_lock: Mutex<()>,
}

impl EngineHandle {
    /// Build the first engine from `source`.
    pub async fn new(source: Arc<dyn ConfigSource>, parser: Arc<ContentParser>) -> Result<Self> {
        let engine = Engine::build(source.load()?, Arc::clone(&parser)).await?;
        Ok(Self {
            source,
            parser,
            current: RwLock::new(Arc::new(engine)),
            reload_lock: Mutex::new(()),
        })
    }

    /// The engine currently serving.
    pub async fn current(&self) -> Arc<Engine> {
        Arc::clone(&*self.current.read().await)
    }

    /// Rebuild from the config source and swap the new engine in.
    ///
    /// If the new engine cannot be built the current one keeps serving and
    /// the error is returned.
    pub async fn reload(&self) -> Result<Arc<Engine>> {
        let _guard = self.reload_lock.lock().await;
        info!("Reloading");

        let config = self.source.load()?;
        let engine = Arc::new(Engine::build(config, Arc::clone(&self.parser)).await?);
        let previous = std::mem::replace(&mut *self.current.write().await, Arc::clone(&engine));
        previous.shutdown().await;

        info!("Reload complete");
        Ok(engine)
    }

    /// Shut the current engine down.
    pub async fn shutdown(&self) {
        self.current().await.shutdown().await;
    }
}
