//! # Folio
//!
//! Watches a content directory, keeps every document parsed in memory and
//! logs the listing whenever it changes.
//!
//! ```bash
//! folio --dir ./posts
//! folio --config folio.toml
//! RUST_LOG=debug folio --dir ./posts --debounce-ms 200
//! ```
//!
//! Send `SIGHUP` to rebuild from the configuration file; `Ctrl-C` exits.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use folio_content_parser::ContentParser;
use folio_document_store::{BatchSummary, Engine, EngineHandle};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod args;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    let parser = Arc::new(ContentParser::with_builtin_transforms());
    let handle = EngineHandle::new(Arc::new(args), parser)
        .await
        .context("Failed to start watching the content directory")?;

    log_listing(&*handle.current().await).await;
    let result = run(&handle).await;
    handle.shutdown().await;
    result
}

/// Log every change until interrupted, rebuilding on hangup.
async fn run(handle: &EngineHandle) -> Result<()> {
    let mut hangup = Hangup::new().context("Failed to install the SIGHUP handler")?;

    loop {
        let engine = handle.current().await;
        let mut updates = engine.updates();

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to wait for Ctrl+C")?;
                    info!("Shutting down");
                    return Ok(());
                }
                _ = hangup.recv() => {
                    match handle.reload().await {
                        Ok(engine) => {
                            log_listing(&engine).await;
                            break;
                        }
                        Err(e) => error!("Reload failed, keeping the current listing: {e}"),
                    }
                }
                update = updates.recv() => match update {
                    Ok(summary) => {
                        log_summary(&summary);
                        log_listing(&engine).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Skipped {skipped} listing updates");
                        log_listing(&engine).await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("Engine stopped");
                        return Ok(());
                    }
                },
            }
        }
    }
}

fn log_summary(summary: &BatchSummary) {
    info!(
        "{} added, {} updated, {} removed ({} with errors)",
        summary.inserted, summary.replaced, summary.removed, summary.failed
    );
}

async fn log_listing(engine: &Engine) {
    let store = engine.store().read().await;
    let tags: Vec<String> = store
        .tags()
        .into_iter()
        .map(|(tag, count)| format!("{tag}({count})"))
        .collect();

    info!(
        "{} documents in {} pages from {}",
        store.len(),
        store.page_count(),
        engine.config().content.dir.display()
    );
    if !tags.is_empty() {
        info!("Tags: {}", tags.join(", "));
    }
    for document in store.page(1) {
        let marker = if document.truncated { " …" } else { "" };
        info!(
            "  {}  {}{marker}",
            document.meta.date.format("%Y-%m-%d"),
            document.meta.title
        );
    }
}

/// Hangup notifications; never fires where SIGHUP does not exist.
struct Hangup {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
}

impl Hangup {
    fn new() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            signal: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        if self.signal.recv().await.is_some() {
            return;
        }
        std::future::pending::<()>().await
    }
}
