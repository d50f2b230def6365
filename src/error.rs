//! Scan error taxonomy.
//!
//! Everything here is fatal to the scan and rolls the transaction back.
//! Recoverable conditions never become `ScanError`: a file vanishing between
//! enumeration and stat is treated as absence (the pruner reconciles it), and
//! a tag-decode failure only skips the tag fields of that one file.

use crate::catalog::{RecordError, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
	/// Exhaustive change detection or aggregate recomputation was reached
	/// without a configured root directory.
	#[error("no root directory is configured")]
	RootDirectoryNotSet,

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Record(#[from] RecordError),

	/// The background scan task failed to complete (panicked or was aborted).
	#[error("scan worker failed: {0}")]
	Worker(String),
}
