//! The scan orchestrator.
//!
//! [`Scanner`] is the single entry point for running scans. It is
//! single-flight: `Idle -> Running -> Idle`, and a scan requested while one is
//! running is dropped silently (not queued, not an error). The four phases run
//! sequentially inside one store transaction on a blocking worker thread, so a
//! failed scan persists nothing and a reader never observes a scan mid-flight.

use crate::catalog::CatalogStore;
use crate::config::Settings;
use crate::decoder::TagDecoder;
use crate::error::ScanError;
use crate::scan::aggregation::recompute_aggregates;
use crate::scan::change_detection::detect_changes;
use crate::scan::metadata::extract_metadata;
use crate::scan::progress::{PhaseProgress, ScanPhase, ScanProgress};
use crate::scan::pruning::prune_tombstones;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// How much to trust the stored index during change detection.
///
/// `Fast` trusts folder mtimes and catches roughly 90% of changes at a
/// fraction of the cost; `Exhaustive` re-walks everything. Invalid modes are
/// unrepresentable by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
	Fast,
	Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
	/// The scan ran to completion and committed.
	Completed,
	/// Another scan was already running; this request was dropped.
	AlreadyRunning,
}

pub struct Scanner<S: CatalogStore + 'static> {
	store: Arc<S>,
	decoder: Arc<dyn TagDecoder>,
	settings: RwLock<Settings>,
	running: AtomicBool,
	progress: watch::Sender<ScanProgress>,
}

impl<S: CatalogStore + 'static> Scanner<S> {
	pub fn new(store: Arc<S>, decoder: Arc<dyn TagDecoder>, settings: Settings) -> Arc<Self> {
		let (progress, _) = watch::channel(ScanProgress::idle());
		Arc::new(Self {
			store,
			decoder,
			settings: RwLock::new(settings),
			running: AtomicBool::new(false),
			progress,
		})
	}

	/// Level-triggered progress channel; late subscribers see only the
	/// current value.
	pub fn subscribe_progress(&self) -> watch::Receiver<ScanProgress> {
		self.progress.subscribe()
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	pub fn set_root_directory(&self, root: Option<PathBuf>) {
		self.settings.write().root_directory = root;
	}

	/// Runs one scan on a blocking worker thread.
	///
	/// The scan does blocking filesystem and store I/O and must never run on
	/// the async executor's reactor threads, hence `spawn_blocking`. If a scan
	/// is already in flight this returns [`ScanOutcome::AlreadyRunning`]
	/// immediately without queueing.
	pub async fn scan(self: &Arc<Self>, mode: ScanMode) -> Result<ScanOutcome, ScanError> {
		if self
			.running
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			debug!("scan already running, dropping request");
			return Ok(ScanOutcome::AlreadyRunning);
		}

		let scanner = Arc::clone(self);
		let result = tokio::task::spawn_blocking(move || {
			let _guard = RunningGuard(scanner.as_ref());
			scanner.run_scan(mode)
		})
		.await;

		match result {
			Ok(outcome) => outcome,
			Err(join_err) => Err(ScanError::Worker(join_err.to_string())),
		}
	}

	fn run_scan(&self, mode: ScanMode) -> Result<ScanOutcome, ScanError> {
		let root = self.settings.read().root_directory.clone();
		info!(?mode, "starting scan transaction");

		let outcome = self.store.run_in_transaction(|| {
			let phase = PhaseProgress::new(
				&self.progress,
				ScanPhase::ChangeDetection,
				"(1/4) Looking for new files...",
			);
			let candidates = detect_changes(self.store.as_ref(), root.as_deref(), mode, &phase)?;

			if candidates.is_empty() {
				debug!("nothing to reconcile, committing early");
				return Ok(ScanOutcome::Completed);
			}

			let phase = PhaseProgress::new(
				&self.progress,
				ScanPhase::MetadataExtraction,
				"(2/4) Reading file metadata...",
			);
			let changed =
				extract_metadata(self.store.as_ref(), self.decoder.as_ref(), &candidates, &phase)?;

			let phase = PhaseProgress::new(
				&self.progress,
				ScanPhase::Pruning,
				"(3/4) Purging deleted entries...",
			);
			let deleted = prune_tombstones(self.store.as_ref(), &candidates, &phase)?;

			// Deletions dirty ancestor folders just like edits do.
			let mut touched = changed;
			touched.extend(deleted);

			let phase = PhaseProgress::new(
				&self.progress,
				ScanPhase::Aggregation,
				"(4/4) Collecting folder metadata...",
			);
			recompute_aggregates(self.store.as_ref(), root.as_deref(), &touched, &phase)?;

			Ok(ScanOutcome::Completed)
		});

		match &outcome {
			Ok(_) => info!("scan committed"),
			Err(err) => info!(%err, "scan rolled back"),
		}
		outcome
	}
}

/// Clears the running flag and resets progress when the scan body exits,
/// whether it returned, errored or panicked.
struct RunningGuard<'a, S: CatalogStore + 'static>(&'a Scanner<S>);

impl<S: CatalogStore + 'static> Drop for RunningGuard<'_, S> {
	fn drop(&mut self) {
		self.0.progress.send_replace(ScanProgress::idle());
		self.0.running.store(false, Ordering::Release);
	}
}
