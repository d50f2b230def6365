//! Phase 1: pick the filesystem entries worth re-examining.
//!
//! Exhaustive mode walks the whole configured root and trusts nothing. Fast
//! mode trusts stored folder mtimes and only re-walks folders whose mtime
//! moved; it is a heuristic with roughly 90% coverage, since edits that do
//! not touch an intermediate folder's mtime (or land within the filesystem's
//! timestamp resolution) go unnoticed until the next exhaustive scan. That
//! cost/recall tradeoff is the contract; do not widen fast mode.

use crate::catalog::CatalogStore;
use crate::error::ScanError;
use crate::scan::progress::PhaseProgress;
use crate::scan::scanner::ScanMode;
use crate::scan::walk::walk;
use crate::scan::{for_each_parallel, modified_ms};

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Returns the candidate set: every file and folder that later phases should
/// stat, re-decode or prune against.
pub(crate) fn detect_changes<S: CatalogStore>(
	store: &S,
	root: Option<&Path>,
	mode: ScanMode,
	progress: &PhaseProgress<'_>,
) -> Result<BTreeSet<PathBuf>, ScanError> {
	// Fast mode needs a populated index to compare against; the first scan is
	// always exhaustive.
	let first_scan = store.count_all()? == 0;
	if mode == ScanMode::Exhaustive || first_scan {
		if mode == ScanMode::Fast {
			debug!("store is empty, falling back to an exhaustive walk");
		}
		let root = root.ok_or(ScanError::RootDirectoryNotSet)?;
		return Ok(walk(root).collect());
	}

	let folders = store.get_all(Some(true))?;
	progress.set_total(folders.len());

	let candidates = Mutex::new(BTreeSet::new());
	for_each_parallel(folders, |folder| {
		let path = PathBuf::from(folder.path());
		match fs::metadata(&path) {
			// Folder gone (or unreadable): its stored subtree is stale, let
			// pruning sort it out.
			Err(_) => {
				candidates.lock().insert(path);
			}
			Ok(meta) => {
				if modified_ms(&meta) != folder.last_modified_ms {
					let entries: Vec<PathBuf> = walk(&path).collect();
					candidates.lock().extend(entries);
				}
			}
		}
		progress.tick();
	});

	Ok(candidates.into_inner())
}
