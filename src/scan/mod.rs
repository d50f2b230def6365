//! The incremental scan pipeline.
//!
//! A scan runs four phases in one store transaction:
//!
//! 1. [`change_detection`] — pick the filesystem entries worth re-examining,
//!    either by an exhaustive walk of the root or by trusting stored folder
//!    mtimes (the fast heuristic).
//! 2. [`metadata`] — stat each candidate file, re-decode tags when
//!    `(mtime, size)` moved, and bulk-upsert the changed records.
//! 3. [`pruning`] — diff stored records under each touched directory against
//!    the disk and delete the tombstones.
//! 4. [`aggregation`] — recompute size/duration/child-count for every folder
//!    whose descendants changed or disappeared.
//!
//! Pruning runs before aggregation so that deletions feed the aggregate
//! repair; after a successful scan every folder record sums exactly over the
//! surviving file records beneath it.

pub mod aggregation;
pub mod change_detection;
pub mod metadata;
pub mod progress;
pub mod pruning;
pub mod scanner;
pub mod walk;

pub use progress::{ScanPhase, ScanProgress};
pub use scanner::{ScanMode, ScanOutcome, Scanner};

use parking_lot::Mutex;
use std::fs::Metadata;
use std::time::UNIX_EPOCH;

/// Filesystem mtime in milliseconds since the epoch, zero when unavailable.
pub(crate) fn modified_ms(metadata: &Metadata) -> i64 {
	metadata
		.modified()
		.ok()
		.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
		.map(|d| d.as_millis() as i64)
		.unwrap_or(0)
}

/// Runs `work` over `items` on a scoped worker pool sized from the machine's
/// parallelism. Items are pulled from a shared queue, so uneven per-item cost
/// (deep folder walks next to cheap stats) still balances.
pub(crate) fn for_each_parallel<T, F>(items: Vec<T>, work: F)
where
	T: Send,
	F: Fn(T) + Sync,
{
	let workers = std::thread::available_parallelism()
		.map(|n| n.get())
		.unwrap_or(4)
		.min(items.len());

	if workers <= 1 {
		for item in items {
			work(item);
		}
		return;
	}

	let queue = Mutex::new(items.into_iter());
	std::thread::scope(|scope| {
		for _ in 0..workers {
			scope.spawn(|| loop {
				let Some(item) = queue.lock().next() else {
					break;
				};
				work(item);
			});
		}
	});
}
