//! The persistent store collaborator.
//!
//! The scan pipeline is written against [`CatalogStore`], a key-ordered record
//! store with prefix-range queries, bulk upsert/delete and an all-or-nothing
//! transaction wrapper. Real deployments back this with an embedded database;
//! [`MemoryStore`] is the in-process implementation used by tests and
//! embedders without their own backend.

use super::record::Record;

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("storage backend error: {0}")]
	Backend(String),
}

/// Key-ordered record store, keyed by absolute path.
///
/// Ordering contract: `get_all` and `get_all_prefixed` return records sorted
/// by path bytes, so any path prefix maps to one contiguous run.
pub trait CatalogStore: Send + Sync {
	/// All records, optionally filtered to folders (`Some(true)`) or files
	/// (`Some(false)`).
	fn get_all(&self, folders: Option<bool>) -> Result<Vec<Record>, StoreError>;

	fn get_by_path(&self, path: &str) -> Result<Option<Record>, StoreError>;

	/// Records whose path starts with `prefix`, compared byte-exact and
	/// case-sensitively.
	fn get_all_prefixed(&self, prefix: &str) -> Result<Vec<Record>, StoreError>;

	fn upsert(&self, records: Vec<Record>) -> Result<(), StoreError>;

	fn delete(&self, records: &[Record]) -> Result<(), StoreError>;

	fn count_all(&self) -> Result<u64, StoreError>;

	/// Runs `body` atomically: if it returns `Err`, every write it issued is
	/// rolled back and nothing becomes visible.
	fn run_in_transaction<T, E, F>(&self, body: F) -> Result<T, E>
	where
		F: FnOnce() -> Result<T, E>,
		E: From<StoreError>;
}

/// In-memory `BTreeMap` store.
///
/// Transactions are implemented as snapshot-and-restore, which gives the
/// rollback guarantee but not isolation from concurrent readers; the scanner
/// is single-flight, so only one writer ever exists.
#[derive(Debug, Default)]
pub struct MemoryStore {
	records: RwLock<BTreeMap<String, Record>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl CatalogStore for MemoryStore {
	fn get_all(&self, folders: Option<bool>) -> Result<Vec<Record>, StoreError> {
		let records = self.records.read();
		Ok(records
			.values()
			.filter(|r| folders.map_or(true, |want| r.is_folder() == want))
			.cloned()
			.collect())
	}

	fn get_by_path(&self, path: &str) -> Result<Option<Record>, StoreError> {
		Ok(self.records.read().get(path).cloned())
	}

	fn get_all_prefixed(&self, prefix: &str) -> Result<Vec<Record>, StoreError> {
		let records = self.records.read();
		Ok(records
			.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
			.take_while(|(path, _)| path.starts_with(prefix))
			.map(|(_, r)| r.clone())
			.collect())
	}

	fn upsert(&self, records: Vec<Record>) -> Result<(), StoreError> {
		let mut map = self.records.write();
		for record in records {
			map.insert(record.path().to_string(), record);
		}
		Ok(())
	}

	fn delete(&self, records: &[Record]) -> Result<(), StoreError> {
		let mut map = self.records.write();
		for record in records {
			map.remove(record.path());
		}
		Ok(())
	}

	fn count_all(&self) -> Result<u64, StoreError> {
		Ok(self.records.read().len() as u64)
	}

	fn run_in_transaction<T, E, F>(&self, body: F) -> Result<T, E>
	where
		F: FnOnce() -> Result<T, E>,
		E: From<StoreError>,
	{
		let snapshot = self.records.read().clone();
		match body() {
			Ok(value) => Ok(value),
			Err(err) => {
				*self.records.write() = snapshot;
				Err(err)
			}
		}
	}
}
