//! Phase 2: per-file metadata extraction.
//!
//! Each candidate file is stat-ed and compared against its stored record.
//! Matching `(mtime, size)` short-circuits with no decode and no upsert; that
//! comparison is what makes rescans of an unchanged library cheap. Changed
//! files get their tags re-decoded; a decode failure still records the new
//! size and mtime but keeps the previous tag fields.

use crate::catalog::{CatalogStore, Record};
use crate::decoder::TagDecoder;
use crate::error::ScanError;
use crate::scan::progress::PhaseProgress;
use crate::scan::{for_each_parallel, modified_ms};

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Examines every candidate that is a regular file and returns the set of
/// files whose records actually changed, for aggregation to consume.
pub(crate) fn extract_metadata<S: CatalogStore>(
	store: &S,
	decoder: &dyn TagDecoder,
	candidates: &BTreeSet<PathBuf>,
	progress: &PhaseProgress<'_>,
) -> Result<BTreeSet<PathBuf>, ScanError> {
	let files: Vec<&Path> = candidates
		.iter()
		.map(PathBuf::as_path)
		.filter(|p| p.is_file())
		.collect();
	progress.set_total(files.len());

	let known: HashMap<String, Record> = store
		.get_all(Some(false))?
		.into_iter()
		.map(|r| (r.path().to_string(), r))
		.collect();

	let changed_records = Mutex::new(Vec::new());
	let changed_files = Mutex::new(BTreeSet::new());
	let failure = Mutex::new(None::<ScanError>);

	for_each_parallel(files, |path| {
		if let Err(err) = examine_file(decoder, &known, path, &changed_records, &changed_files) {
			failure.lock().get_or_insert(err);
		}
		progress.tick();
	});

	if let Some(err) = failure.into_inner() {
		return Err(err);
	}

	let changed_records = changed_records.into_inner();
	if !changed_records.is_empty() {
		store.upsert(changed_records)?;
	}
	Ok(changed_files.into_inner())
}

fn examine_file(
	decoder: &dyn TagDecoder,
	known: &HashMap<String, Record>,
	path: &Path,
	changed_records: &Mutex<Vec<Record>>,
	changed_files: &Mutex<BTreeSet<PathBuf>>,
) -> Result<(), ScanError> {
	// Vanished between enumeration and stat: not an error, pruning reconciles.
	let Ok(meta) = fs::metadata(path) else {
		return Ok(());
	};

	let path_str = path.to_string_lossy().into_owned();
	let mut record = match known.get(&path_str) {
		Some(existing) => existing.clone(),
		None => Record::new(path_str, false)?,
	};

	let disk_mtime = modified_ms(&meta);
	let disk_size = meta.len() as i64;
	if record.last_modified_ms == disk_mtime && record.size == disk_size {
		return Ok(());
	}

	record.last_modified_ms = disk_mtime;
	record.size = disk_size;

	let file_name = path.file_name().and_then(OsStr::to_str).unwrap_or_default();
	match File::open(path) {
		Ok(mut handle) => match decoder.decode(&mut handle, file_name) {
			Ok(decoded) => {
				record.set_metadata(decoded.tags)?;
				record.apply_audio_properties(&decoded.properties);
			}
			Err(err) => {
				warn!(path = %path.display(), %err, "tag decode failed, keeping previous tags");
			}
		},
		Err(err) => {
			warn!(path = %path.display(), %err, "could not open file for tag reading");
		}
	}

	changed_records.lock().push(record);
	changed_files.lock().insert(path.to_path_buf());
	Ok(())
}
