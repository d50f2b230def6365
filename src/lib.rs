//! # Soundvault Core
//!
//! `soundvault-core` keeps a persistent, queryable catalog of an audio
//! directory tree in sync with the filesystem. Instead of re-reading
//! everything on every update, a scan runs four reconciliation phases inside
//! one store transaction: change detection, metadata extraction, tombstone
//! pruning, and bottom-up folder aggregate recomputation.
//!
//! The storage engine and the tag decoder are collaborators behind traits
//! ([`catalog::CatalogStore`], [`decoder::TagDecoder`]); the crate ships an
//! in-memory store and a [`lofty`]-backed decoder.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use soundvault_core::{
//! 	catalog::MemoryStore,
//! 	config::Settings,
//! 	decoder::LoftyDecoder,
//! 	scan::{ScanMode, Scanner},
//! };
//!
//! # async fn example() -> Result<(), soundvault_core::error::ScanError> {
//! let settings = Settings {
//! 	root_directory: Some("/music".into()),
//! };
//! let scanner = Scanner::new(Arc::new(MemoryStore::new()), Arc::new(LoftyDecoder), settings);
//!
//! let _progress = scanner.subscribe_progress();
//! scanner.scan(ScanMode::Exhaustive).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod decoder;
pub mod error;
pub mod scan;

pub use catalog::{CatalogStore, MemoryStore, Record};
pub use config::Settings;
pub use decoder::{LoftyDecoder, TagDecoder};
pub use error::ScanError;
pub use scan::{ScanMode, ScanOutcome, ScanPhase, ScanProgress, Scanner};
