//! Engine behaviour against a real content directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use folio_content_parser::ContentParser;
use folio_directory_watcher::{DocumentIdentity, WatchBatch, WatchEvent};
use folio_document_store::{
    BatchSummary, DocumentStore, Engine, EngineHandle, FileConfig, FolioConfig, StaticConfig,
    StoreError,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn post(dir: &Path, base: &str, date: &str, tags: &str) {
    std::fs::write(
        dir.join(format!("{base}.md")),
        format!("---\ntitle: {base}\ndate: {date}\ntags: [{tags}]\n---\nBody of {base}.\n"),
    )
    .unwrap();
}

fn config(dir: &Path) -> FolioConfig {
    let mut config = FolioConfig::new(dir);
    config.content.debounce_ms = 100;
    config
}

fn parser() -> Arc<ContentParser> {
    Arc::new(ContentParser::with_builtin_transforms())
}

async fn next_summary(updates: &mut broadcast::Receiver<BatchSummary>) -> BatchSummary {
    timeout(WAIT, updates.recv())
        .await
        .expect("timed out waiting for a batch")
        .unwrap()
}

async fn titles(engine: &Engine) -> Vec<String> {
    engine
        .store()
        .read()
        .await
        .documents()
        .iter()
        .map(|d| d.meta.title.clone())
        .collect()
}

#[tokio::test]
async fn test_build_loads_existing_documents() {
    let temp_dir = TempDir::new().unwrap();
    post(temp_dir.path(), "first", "2024-01-01", "rust");
    post(temp_dir.path(), "second", "2024-02-01", "rust, web");
    std::fs::write(temp_dir.path().join("broken.md"), "no front matter").unwrap();

    let engine = Engine::build(config(temp_dir.path()), parser()).await.unwrap();

    {
        let store = engine.store().read().await;
        assert_eq!(store.len(), 3);
        assert_eq!(store.by_tag("rust").len(), 2);
        assert_eq!(store.by_tag("error").len(), 1);
        assert!(store.get("broken").unwrap().is_error());
    }
    let listing = titles(&engine).await;
    assert_eq!(listing.len(), 3);
    assert_eq!(listing[1..].to_vec(), vec!["second", "first"]);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_store_follows_directory_changes() {
    let temp_dir = TempDir::new().unwrap();
    post(temp_dir.path(), "a", "2024-01-01", "x");
    post(temp_dir.path(), "b", "2024-01-02", "x");

    let engine = Engine::build(config(temp_dir.path()), parser()).await.unwrap();
    let mut updates = engine.updates();

    post(temp_dir.path(), "c", "2024-01-03", "y");
    std::fs::remove_file(temp_dir.path().join("a.md")).unwrap();
    post(temp_dir.path(), "b", "2024-01-04", "z");

    let summary = next_summary(&mut updates).await;
    assert_eq!(
        summary,
        BatchSummary {
            inserted: 1,
            replaced: 1,
            removed: 1,
            failed: 0,
            total: 2,
        }
    );
    assert_eq!(titles(&engine).await, vec!["b", "c"]);
    assert!(engine.store().read().await.by_tag("x").is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn test_missing_directory_fails_build() {
    let result = Engine::build(FolioConfig::new("/no/such/content/dir"), parser()).await;
    assert!(matches!(result, Err(StoreError::Watcher(_))));
}

#[tokio::test]
async fn test_reload_swaps_in_new_graph() {
    let temp_dir = TempDir::new().unwrap();
    let old_dir = temp_dir.path().join("old");
    let new_dir = temp_dir.path().join("new");
    std::fs::create_dir(&old_dir).unwrap();
    std::fs::create_dir(&new_dir).unwrap();
    post(&old_dir, "old-post", "2024-01-01", "");
    post(&new_dir, "new-post", "2024-01-01", "");

    let config_path = temp_dir.path().join("folio.toml");
    std::fs::write(&config_path, "[content]\ndir = \"old\"\ndebounce_ms = 100\n").unwrap();

    let handle = EngineHandle::new(Arc::new(FileConfig::new(&config_path)), parser())
        .await
        .unwrap();
    assert_eq!(titles(&*handle.current().await).await, vec!["old-post"]);

    std::fs::write(&config_path, "[content]\ndir = \"new\"\ndebounce_ms = 100\n").unwrap();
    handle.reload().await.unwrap();
    assert_eq!(titles(&*handle.current().await).await, vec!["new-post"]);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_failed_reload_keeps_current_engine() {
    let temp_dir = TempDir::new().unwrap();
    post(temp_dir.path(), "stays", "2024-01-01", "");
    let config_path = temp_dir.path().join("folio.toml");
    std::fs::write(
        &config_path,
        format!("[content]\ndir = {:?}\n", temp_dir.path().display().to_string()),
    )
    .unwrap();

    let handle = EngineHandle::new(Arc::new(FileConfig::new(&config_path)), parser())
        .await
        .unwrap();

    std::fs::write(&config_path, "[listing]\npage_size = 0\n").unwrap();
    assert!(matches!(handle.reload().await, Err(StoreError::Config(_))));
    assert_eq!(titles(&*handle.current().await).await, vec!["stays"]);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_static_config_source() {
    let temp_dir = TempDir::new().unwrap();
    post(temp_dir.path(), "only", "2024-01-01", "");

    let source = Arc::new(StaticConfig(config(temp_dir.path())));
    let handle = EngineHandle::new(source, parser()).await.unwrap();
    let engine = handle.current().await;

    assert_eq!(engine.config().listing.page_size, 10);
    assert_eq!(engine.store().read().await.page_count(), 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_apply_batch_inserts_unknown_change() {
    let temp_dir = TempDir::new().unwrap();
    post(temp_dir.path(), "late", "2024-06-01", "news");
    let identity = DocumentIdentity::resolve(temp_dir.path(), "late.md");

    let mut store = DocumentStore::new();
    let summary = store
        .apply_batch(&parser(), &WatchBatch::new(vec![WatchEvent::Changed(identity)]))
        .await;

    assert_eq!(summary.inserted, 1);
    assert_eq!(store.get("late").unwrap().meta.title, "late");
}
