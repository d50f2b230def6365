//! Scan progress publishing.
//!
//! Progress goes out on a `tokio::sync::watch` channel: level-triggered,
//! latest-value-only. Late subscribers see the current snapshot, never a
//! backlog. Each phase publishes its own 0..1 fraction from an atomic counter
//! over the phase's item total.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanPhase {
	Idle,
	ChangeDetection,
	MetadataExtraction,
	Pruning,
	Aggregation,
}

/// Snapshot of scan progress: which phase, how far through it, and a
/// human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProgress {
	pub phase: ScanPhase,
	pub label: String,
	/// Fraction of the current phase completed, 0..1. Per phase, not across
	/// the whole scan.
	pub fraction: f32,
}

impl ScanProgress {
	pub fn idle() -> Self {
		Self {
			phase: ScanPhase::Idle,
			label: String::new(),
			fraction: 0.0,
		}
	}
}

/// Per-phase publisher. Created at phase entry (resetting the fraction to
/// zero), fed a total once known, and ticked from worker threads as items
/// complete.
pub(crate) struct PhaseProgress<'a> {
	tx: &'a watch::Sender<ScanProgress>,
	phase: ScanPhase,
	label: &'static str,
	done: AtomicUsize,
	total: AtomicUsize,
}

impl<'a> PhaseProgress<'a> {
	pub fn new(tx: &'a watch::Sender<ScanProgress>, phase: ScanPhase, label: &'static str) -> Self {
		tx.send_replace(ScanProgress {
			phase,
			label: label.to_string(),
			fraction: 0.0,
		});
		Self {
			tx,
			phase,
			label,
			done: AtomicUsize::new(0),
			total: AtomicUsize::new(0),
		}
	}

	pub fn set_total(&self, total: usize) {
		self.total.store(total, Ordering::Relaxed);
	}

	/// Marks one item complete and publishes the new fraction.
	pub fn tick(&self) {
		let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
		let total = self.total.load(Ordering::Relaxed);
		if total == 0 {
			return;
		}
		self.tx.send_replace(ScanProgress {
			phase: self.phase,
			label: self.label.to_string(),
			fraction: (done as f32 / total as f32).min(1.0),
		});
	}
}
