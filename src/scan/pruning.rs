//! Phase 3: tombstone pruning.
//!
//! A deleted file or folder never appears in the candidate set, because
//! enumeration only yields entries that still exist. Deletions are therefore
//! inferred the other way around: for every candidate that is a directory on
//! disk, the store is asked what it *believes* lives under that path, and
//! every record whose on-disk counterpart is gone becomes a tombstone.

use crate::catalog::CatalogStore;
use crate::error::ScanError;
use crate::scan::for_each_parallel;
use crate::scan::progress::PhaseProgress;

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Deletes records with no on-disk counterpart and returns their paths so the
/// aggregation phase can repair the ancestor folders.
pub(crate) fn prune_tombstones<S: CatalogStore>(
	store: &S,
	candidates: &BTreeSet<PathBuf>,
	progress: &PhaseProgress<'_>,
) -> Result<BTreeSet<PathBuf>, ScanError> {
	// Keyed by path to dedupe overlapping prefix queries (a folder and its
	// parent can both be candidates).
	let mut possibly_deleted = BTreeMap::new();
	for dir in candidates.iter().filter(|p| p.is_dir()) {
		for record in store.get_all_prefixed(&dir.to_string_lossy())? {
			possibly_deleted.insert(record.path().to_string(), record);
		}
	}
	progress.set_total(possibly_deleted.len());

	let deleted = Mutex::new(Vec::new());
	for_each_parallel(possibly_deleted.into_values().collect(), |record| {
		if !Path::new(record.path()).exists() {
			deleted.lock().push(record);
		}
		progress.tick();
	});

	let deleted = deleted.into_inner();
	let deleted_paths: BTreeSet<PathBuf> =
		deleted.iter().map(|r| PathBuf::from(r.path())).collect();
	if !deleted.is_empty() {
		debug!(count = deleted.len(), "pruning stale records");
		store.delete(&deleted)?;
	}
	Ok(deleted_paths)
}
