//! Directory watcher implementation.
//!
//! A [`DirectoryWatcher`] owns one native `notify` handle and one actor task.
//! The actor is the only place the previous listing, the touched set and the
//! debounce deadline live; everything else talks to it over channels.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::config::{NameMatcher, WatchConfig};
use crate::error::{Result, WatcherError};
use crate::event::{WatchBatch, WatchEventKind};
use crate::indexer::{DocumentIdentity, FileIndex};

/// Requests sent to the watch loop.
enum Command {
    Subscribe {
        id: u64,
        batches: mpsc::UnboundedSender<WatchBatch>,
    },
    Unsubscribe(u64),
    Snapshot(oneshot::Sender<Vec<DocumentIdentity>>),
}

/// Watches one content directory and emits debounced, diffed batches.
pub struct DirectoryWatcher {
    /// Canonical path of the watched directory.
    dir: PathBuf,

    /// Native watch handle. Dropping it stops raw notifications.
    native: Option<RecommendedWatcher>,

    /// Command channel into the watch loop.
    commands: mpsc::UnboundedSender<Command>,

    /// The watch loop task.
    task: Option<JoinHandle<()>>,

    /// Source of subscription ids.
    next_subscription: AtomicU64,
}

impl DirectoryWatcher {
    /// Start watching the directory described by `config`.
    ///
    /// Performs the initial listing before returning; a missing or unreadable
    /// directory fails here and no watcher is produced.
    pub async fn start(config: WatchConfig) -> Result<Self> {
        let matcher = config.matcher()?;
        let dir = match tokio::fs::canonicalize(&config.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatcherError::DirectoryNotFound(
                    config.dir.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        // Arm the native watch before listing so nothing between the two is lost.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut native = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.send(res);
        })?;
        native.watch(&dir, RecursiveMode::NonRecursive)?;

        let previous = scan_blocking(dir.clone(), matcher.clone()).await?;
        info!(
            "Watching {} ({} documents, debounce {}ms)",
            dir.display(),
            previous.len(),
            config.debounce_ms
        );

        let (commands, command_rx) = mpsc::unbounded_channel();
        let watch_loop = WatchLoop {
            dir: dir.clone(),
            matcher,
            debounce: config.debounce(),
            previous,
            touched: BTreeSet::new(),
            deadline: None,
            subscribers: Vec::new(),
        };
        let task = tokio::spawn(watch_loop.run(raw_rx, command_rx));

        Ok(Self {
            dir,
            native: Some(native),
            commands,
            task: Some(task),
            next_subscription: AtomicU64::new(1),
        })
    }

    /// The canonical path of the watched directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register a consumer.
    ///
    /// The first batch the subscription yields is a replay with one `Created`
    /// per currently known identity (possibly empty); every later batch is a
    /// settle cycle.
    pub fn subscribe(&self) -> Result<Subscription> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let (batches, rx) = mpsc::unbounded_channel();
        self.commands
            .send(Command::Subscribe { id, batches })
            .map_err(|_| WatcherError::Stopped)?;

        debug!("Subscription {id} registered for {}", self.dir.display());
        Ok(Subscription {
            id,
            batches: rx,
            commands: self.commands.clone(),
        })
    }

    /// Snapshot of the identities known after the last settle cycle.
    pub async fn known(&self) -> Result<Vec<DocumentIdentity>> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .map_err(|_| WatcherError::Stopped)?;
        rx.await.map_err(|_| WatcherError::Stopped)
    }

    /// Check if the watch loop is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop watching and wait for the watch loop to exit.
    ///
    /// No batch is delivered after this returns.
    pub async fn shutdown(mut self) {
        self.native = None;
        if let Some(task) = self.task.take() {
            task.abort();
            match task.await {
                Err(e) if !e.is_cancelled() => {
                    error!("Watch loop for {} failed: {e}", self.dir.display());
                }
                _ => {}
            }
        }
        info!("Stopped watching {}", self.dir.display());
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.native = None;
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Dropped watcher for {}", self.dir.display());
        }
    }
}

/// A consumer's view of a [`DirectoryWatcher`].
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription {
    id: u64,
    batches: mpsc::UnboundedReceiver<WatchBatch>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    /// The subscription id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next batch. Returns `None` once the watcher has stopped.
    pub async fn next_batch(&mut self) -> Option<WatchBatch> {
        self.batches.recv().await
    }

    /// Take the next batch if one is already queued.
    pub fn try_next_batch(&mut self) -> Option<WatchBatch> {
        self.batches.try_recv().ok()
    }

    /// Stop receiving batches.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Unsubscribe(self.id));
    }
}

/// State owned by the watch loop task.
struct WatchLoop {
    dir: PathBuf,
    matcher: NameMatcher,
    debounce: Duration,
    previous: FileIndex,
    /// Base names touched since the last settle.
    touched: BTreeSet<String>,
    /// When the armed debounce timer fires, if armed.
    deadline: Option<Instant>,
    subscribers: Vec<(u64, mpsc::UnboundedSender<WatchBatch>)>,
}

impl WatchLoop {
    async fn run(
        mut self,
        mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
    ) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                Some(command) = command_rx.recv() => self.handle_command(command),
                raw = raw_rx.recv() => match raw {
                    Some(raw) => self.handle_raw(raw),
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.settle().await;
                }
            }
        }
        debug!("Watch loop for {} exited", self.dir.display());
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe { id, batches } => {
                let replay = WatchBatch::initial(self.previous.created_events());
                if batches.send(replay).is_ok() {
                    self.subscribers.push((id, batches));
                }
            }
            Command::Unsubscribe(id) => {
                self.subscribers.retain(|(sub_id, _)| *sub_id != id);
                debug!("Subscription {id} removed");
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.previous.iter().cloned().collect());
            }
        }
    }

    fn handle_raw(&mut self, raw: notify::Result<Event>) {
        let event = match raw {
            Ok(event) => event,
            Err(e) => {
                warn!("Watch error on {}: {e}", self.dir.display());
                return;
            }
        };

        // Reads, including our own parses, must not re-arm the timer.
        if matches!(event.kind, EventKind::Access(access) if access != AccessKind::Close(AccessMode::Write))
        {
            return;
        }

        let mut qualified = false;
        for path in &event.paths {
            if path.parent() != Some(self.dir.as_path()) || !self.matcher.matches_path(path) {
                continue;
            }
            if let Some(identity) = DocumentIdentity::from_path(path) {
                self.touched.insert(identity.base().to_string());
                qualified = true;
            }
        }

        if qualified {
            self.deadline = Some(Instant::now() + self.debounce);
        }
    }

    async fn settle(&mut self) {
        self.deadline = None;

        let current = match scan_blocking(self.dir.clone(), self.matcher.clone()).await {
            Ok(current) => current,
            Err(e) => {
                warn!(
                    "Skipping settle for {}, keeping previous listing: {e}",
                    self.dir.display()
                );
                return;
            }
        };

        let events = FileIndex::diff(&self.previous, &current, &self.touched);
        self.previous = current;
        self.touched.clear();

        if events.is_empty() {
            debug!("Settle for {} produced no changes", self.dir.display());
            return;
        }

        let batch = WatchBatch::new(events);
        info!(
            "{}: {} created, {} removed, {} changed",
            self.dir.display(),
            batch.count(WatchEventKind::Created),
            batch.count(WatchEventKind::Removed),
            batch.count(WatchEventKind::Changed)
        );
        self.subscribers
            .retain(|(_, subscriber)| subscriber.send(batch.clone()).is_ok());
    }
}

/// List the directory on the blocking pool.
async fn scan_blocking(dir: PathBuf, matcher: NameMatcher) -> Result<FileIndex> {
    tokio::task::spawn_blocking(move || FileIndex::scan(&dir, &matcher))
        .await
        .map_err(|e| WatcherError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::WatchEvent;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn config(dir: &Path) -> WatchConfig {
        WatchConfig::new(dir).with_debounce_ms(100)
    }

    #[tokio::test]
    async fn test_start_missing_directory_fails() {
        let result = DirectoryWatcher::start(WatchConfig::new("/nonexistent/path/12345")).await;
        assert!(matches!(result, Err(WatcherError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let result = DirectoryWatcher::start(config(temp_dir.path()).with_pattern("[")).await;
        assert!(matches!(result, Err(WatcherError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn test_subscribe_replays_known_identities() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.md"), "b").unwrap();
        std::fs::write(temp_dir.path().join("a.md"), "a").unwrap();
        std::fs::write(temp_dir.path().join("skip.txt"), "skip").unwrap();

        let watcher = DirectoryWatcher::start(config(temp_dir.path())).await.unwrap();
        let mut subscription = watcher.subscribe().unwrap();

        let batch = timeout(WAIT, subscription.next_batch())
            .await
            .unwrap()
            .unwrap();
        let bases: Vec<_> = batch.iter().map(|e| e.identity().base().to_string()).collect();

        assert!(batch.initial);
        assert!(batch.iter().all(|e| matches!(e, WatchEvent::Created(_))));
        assert_eq!(bases, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_directory_replays_empty_batch() {
        let temp_dir = TempDir::new().unwrap();
        let watcher = DirectoryWatcher::start(config(temp_dir.path())).await.unwrap();
        let mut subscription = watcher.subscribe().unwrap();

        let batch = timeout(WAIT, subscription.next_batch())
            .await
            .unwrap()
            .unwrap();
        assert!(batch.initial);
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_known_reflects_initial_scan() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("hello.md"), "hi").unwrap();

        let watcher = DirectoryWatcher::start(config(temp_dir.path())).await.unwrap();
        let known = watcher.known().await.unwrap();

        assert_eq!(known.len(), 1);
        assert_eq!(known[0].base(), "hello");
        assert!(watcher.is_running());
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscriptions() {
        let temp_dir = TempDir::new().unwrap();
        let watcher = DirectoryWatcher::start(config(temp_dir.path())).await.unwrap();
        let mut subscription = watcher.subscribe().unwrap();
        timeout(WAIT, subscription.next_batch()).await.unwrap();

        watcher.shutdown().await;
        std::fs::write(temp_dir.path().join("late.md"), "late").unwrap();

        let next = timeout(WAIT, subscription.next_batch()).await.unwrap();
        assert!(next.is_none());
    }
}
