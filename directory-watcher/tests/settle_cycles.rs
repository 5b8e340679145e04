//! Settle-cycle behaviour against a real directory.

use std::path::Path;
use std::time::Duration;

use folio_directory_watcher::{DirectoryWatcher, Subscription, WatchBatch, WatchConfig, WatchEvent};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

const DEBOUNCE_MS: u64 = 100;
const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(600);

async fn start(dir: &Path, config: WatchConfig) -> (DirectoryWatcher, Subscription) {
    let watcher = DirectoryWatcher::start(config.with_debounce_ms(DEBOUNCE_MS))
        .await
        .unwrap();
    let mut subscription = watcher.subscribe().unwrap();
    let replay = next(&mut subscription).await;
    assert!(replay.initial, "first batch for {} is the replay", dir.display());
    (watcher, subscription)
}

async fn next(subscription: &mut Subscription) -> WatchBatch {
    timeout(WAIT, subscription.next_batch())
        .await
        .expect("timed out waiting for a batch")
        .expect("watcher stopped")
}

async fn assert_quiet(subscription: &mut Subscription) {
    let extra = timeout(QUIET, subscription.next_batch()).await;
    assert!(extra.is_err(), "unexpected batch: {extra:?}");
}

fn summary(batch: &WatchBatch) -> Vec<String> {
    batch
        .iter()
        .map(|event| format!("{}:{}", event.kind(), event.identity()))
        .collect()
}

#[tokio::test]
async fn test_rapid_writes_coalesce_into_one_change() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("post.md");
    std::fs::write(&file, "v0").unwrap();
    let (_watcher, mut subscription) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    for i in 1..=5 {
        std::fs::write(&file, format!("v{i}")).unwrap();
        sleep(Duration::from_millis(10)).await;
    }

    let batch = next(&mut subscription).await;
    assert_eq!(summary(&batch), vec!["changed:post.md"]);
    assert_quiet(&mut subscription).await;
}

#[tokio::test]
async fn test_each_event_restarts_the_quiet_period() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("draft.md");
    std::fs::write(&file, "v0").unwrap();
    let (_watcher, mut subscription) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    // Writes land inside one debounce interval of each other but span several.
    let gap = Duration::from_millis(DEBOUNCE_MS * 6 / 10);
    for i in 1..=8 {
        std::fs::write(&file, format!("v{i}")).unwrap();
        sleep(gap).await;
    }

    let batch = next(&mut subscription).await;
    assert_eq!(summary(&batch), vec!["changed:draft.md"]);
    assert_quiet(&mut subscription).await;
}

#[tokio::test]
async fn test_new_file_is_created_not_changed() {
    let temp_dir = TempDir::new().unwrap();
    let (_watcher, mut subscription) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    let file = temp_dir.path().join("fresh.md");
    std::fs::write(&file, "one").unwrap();
    std::fs::write(&file, "two").unwrap();

    let batch = next(&mut subscription).await;
    assert_eq!(summary(&batch), vec!["created:fresh.md"]);
    assert_quiet(&mut subscription).await;
}

#[tokio::test]
async fn test_deleted_file_is_removed() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("gone.md");
    std::fs::write(&file, "bye").unwrap();
    let (watcher, mut subscription) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    std::fs::remove_file(&file).unwrap();

    let batch = next(&mut subscription).await;
    assert_eq!(summary(&batch), vec!["removed:gone.md"]);
    assert!(watcher.known().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_orders_created_before_removed_before_changed() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.md"), "a").unwrap();
    std::fs::write(temp_dir.path().join("b.md"), "b").unwrap();
    std::fs::write(temp_dir.path().join("c.md"), "c").unwrap();
    let (_watcher, mut subscription) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    std::fs::write(temp_dir.path().join("b.md"), "b2").unwrap();
    std::fs::remove_file(temp_dir.path().join("a.md")).unwrap();
    std::fs::write(temp_dir.path().join("d.md"), "d").unwrap();

    let batch = next(&mut subscription).await;
    assert_eq!(
        summary(&batch),
        vec!["created:d.md", "removed:a.md", "changed:b.md"]
    );
}

#[tokio::test]
async fn test_non_matching_files_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let (_watcher, mut subscription) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
    std::fs::write(temp_dir.path().join("README"), "ignored").unwrap();

    assert_quiet(&mut subscription).await;
}

#[tokio::test]
async fn test_temp_file_rename_save_is_a_change() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("post.md");
    std::fs::write(&file, "old").unwrap();
    let (_watcher, mut subscription) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    let scratch = temp_dir.path().join("post.md.tmp");
    std::fs::write(&scratch, "new").unwrap();
    std::fs::rename(&scratch, &file).unwrap();

    let batch = next(&mut subscription).await;
    assert_eq!(summary(&batch), vec!["changed:post.md"]);
}

#[tokio::test]
async fn test_extension_rename_keeps_identity() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("post.md"), "body").unwrap();
    let config = WatchConfig::new(temp_dir.path()).with_extensions(["md", "markdown"]);
    let (_watcher, mut subscription) = start(temp_dir.path(), config).await;

    std::fs::rename(
        temp_dir.path().join("post.md"),
        temp_dir.path().join("post.markdown"),
    )
    .unwrap();

    let batch = next(&mut subscription).await;
    assert_eq!(batch.len(), 1);
    assert!(matches!(&batch.events[0], WatchEvent::Changed(id) if id.ext() == "markdown"));
}

#[tokio::test]
async fn test_unreadable_directory_keeps_previous_listing() {
    let temp_dir = TempDir::new().unwrap();
    let content = temp_dir.path().join("content");
    std::fs::create_dir(&content).unwrap();
    std::fs::write(content.join("kept.md"), "kept").unwrap();
    let (watcher, mut subscription) = start(&content, WatchConfig::new(&content)).await;

    std::fs::remove_dir_all(&content).unwrap();

    assert_quiet(&mut subscription).await;
    let known = watcher.known().await.unwrap();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].base(), "kept");
}

#[tokio::test]
async fn test_late_subscriber_gets_current_listing() {
    let temp_dir = TempDir::new().unwrap();
    let (watcher, mut first) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;

    std::fs::write(temp_dir.path().join("later.md"), "later").unwrap();
    next(&mut first).await;

    let mut second = watcher.subscribe().unwrap();
    let replay = next(&mut second).await;
    assert!(replay.initial);
    assert_eq!(summary(&replay), vec!["created:later.md"]);
}

#[tokio::test]
async fn test_unsubscribed_consumer_stops_receiving() {
    let temp_dir = TempDir::new().unwrap();
    let (watcher, first) = start(temp_dir.path(), WatchConfig::new(temp_dir.path())).await;
    let mut second = watcher.subscribe().unwrap();
    next(&mut second).await;

    first.unsubscribe();
    std::fs::write(temp_dir.path().join("x.md"), "x").unwrap();

    let batch = next(&mut second).await;
    assert_eq!(summary(&batch), vec!["created:x.md"]);
}
