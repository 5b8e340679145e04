//! # Document Store
//!
//! Keeps an in-memory, date-sorted and tag-indexed collection of parsed
//! documents in sync with a content directory.
//!
//! ## Features
//!
//! - **Replace on Write**: documents are immutable `Arc` values swapped by base
//!   name
//! - **Listings**: newest-first order, paging and per-tag views
//! - **Concurrent Parsing**: each batch is parsed in parallel and applied in
//!   event order
//! - **Reload**: [`EngineHandle::reload`] builds a fresh graph and swaps it in
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folio_content_parser::ContentParser;
//! use folio_document_store::{Engine, FolioConfig};
//!
//! let parser = Arc::new(ContentParser::with_builtin_transforms());
//! let engine = Engine::build(FolioConfig::new("./posts"), parser).await?;
//!
//! for document in engine.store().read().await.page(1) {
//!     println!("{}", document.meta.title);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod store;

pub use config::{DEFAULT_PAGE_SIZE, FolioConfig, ListingConfig};
pub use engine::{ConfigSource, Engine, EngineHandle, FileConfig, StaticConfig};
pub use error::{Result, StoreError};
pub use store::{BatchSummary, DocumentStore, Update, parse_batch};
