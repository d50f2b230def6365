//! Phase 4: folder aggregate recomputation.
//!
//! Aggregates are recursive over the whole subtree, so one changed file dirties
//! its entire ancestor chain up to the root. Each dirty folder is recomputed
//! from scratch against the file table rather than patched incrementally,
//! which keeps the math correct after partial updates and deletions alike.

use crate::catalog::path::{ancestors_up_to, with_trailing_slash};
use crate::catalog::{CatalogStore, Record};
use crate::error::ScanError;
use crate::scan::modified_ms;
use crate::scan::progress::PhaseProgress;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Recomputes size, duration and descendant file count for every folder that
/// is an ancestor of a touched (changed or deleted) path.
pub(crate) fn recompute_aggregates<S: CatalogStore>(
	store: &S,
	root: Option<&Path>,
	touched: &BTreeSet<PathBuf>,
	progress: &PhaseProgress<'_>,
) -> Result<(), ScanError> {
	let root = root.ok_or(ScanError::RootDirectoryNotSet)?;

	let mut folders = BTreeSet::new();
	for path in touched {
		folders.extend(ancestors_up_to(path, root));
	}
	progress.set_total(folders.len());

	// One ordered fetch of the file table; each folder's subtree is then a
	// contiguous run found by binary search on the slash-terminated prefix.
	let files = store.get_all(Some(false))?;

	let mut upserts = Vec::with_capacity(folders.len());
	for folder in folders {
		let folder_str = folder.to_string_lossy().into_owned();
		let prefix = with_trailing_slash(&folder_str);

		let mut record = match store.get_by_path(&folder_str)? {
			Some(existing) => existing,
			None => Record::new(folder_str, true)?,
		};

		let mut size = 0i64;
		let mut duration_ms = 0i64;
		let mut child_count = 0i64;
		let start = files.partition_point(|r| r.path() < prefix.as_str());
		for file in files[start..]
			.iter()
			.take_while(|r| r.path().starts_with(prefix.as_str()))
		{
			size += file.size;
			duration_ms += file.duration_ms;
			child_count += 1;
		}

		record.size = size;
		record.duration_ms = duration_ms;
		record.child_count = child_count;
		if let Ok(meta) = fs::metadata(&folder) {
			record.last_modified_ms = modified_ms(&meta);
		}

		upserts.push(record);
		progress.tick();
	}

	if !upserts.is_empty() {
		store.upsert(upserts)?;
	}
	Ok(())
}
