//! # Directory Watcher
//!
//! This crate keeps an always-current listing of the documents in one content
//! directory and reports how that listing changes.
//!
//! ## Features
//!
//! - **Stable Identities**: Files are keyed by base name, so editors that save
//!   through a temp file and rename still look like one document
//! - **Debouncing**: Bursts of raw notifications collapse into one settle cycle
//! - **Diffing**: Each settle re-lists the directory and diffs it against the
//!   previous listing instead of replaying raw event types
//! - **Ordered Batches**: Created, then removed, then changed
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  notify ──► WatchLoop (touched set, deadline) ──► settle        │
//! │                                                     │           │
//! │                                FileIndex::scan + FileIndex::diff│
//! │                                                     ▼           │
//! │                              Subscription ◄── WatchBatch        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod indexer;
pub mod watcher;

pub use config::{DEFAULT_DEBOUNCE_MS, NameMatcher, WatchConfig};
pub use error::{Result, WatcherError};
pub use event::{WatchBatch, WatchEvent, WatchEventKind};
pub use indexer::{DocumentIdentity, FileIndex};
pub use watcher::{DirectoryWatcher, Subscription};
