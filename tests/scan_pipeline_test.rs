//! End-to-end scan pipeline tests.
//!
//! These drive a real temp directory tree through the scanner against the
//! in-memory store, with a deterministic stub decoder (duration = content
//! length * 100ms) so aggregate math is exact.

use soundvault_core::catalog::record::TagMap;
use soundvault_core::catalog::{CatalogStore, MemoryStore, Record, StoreError};
use soundvault_core::config::Settings;
use soundvault_core::decoder::{AudioProperties, DecodeError, DecodedTags, TagDecoder};
use soundvault_core::error::ScanError;
use soundvault_core::scan::{ScanMode, ScanOutcome, Scanner};

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
	use tracing_subscriber::EnvFilter;
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Stub decoder: duration is 100ms per content byte, TITLE is the uppercased
/// file stem. Content starting with `corrupt` fails to decode.
struct ContentDecoder;

impl TagDecoder for ContentDecoder {
	fn decode(&self, file: &mut File, file_name: &str) -> Result<DecodedTags, DecodeError> {
		let mut content = String::new();
		file.read_to_string(&mut content)?;
		if content.starts_with("corrupt") {
			return Err(DecodeError::Parse("corrupt test payload".to_string()));
		}

		let stem = file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name);
		let mut tags = TagMap::new();
		tags.insert("TITLE".to_string(), vec![stem.to_uppercase()]);

		Ok(DecodedTags {
			tags,
			properties: AudioProperties {
				channel_count: 2,
				bitrate_kbps: 1000,
				sample_rate_hz: 44100,
				duration_ms: content.len() as i64 * 100,
			},
		})
	}
}

/// Decoder that sleeps per file, to hold a scan in flight.
struct SlowDecoder;

impl TagDecoder for SlowDecoder {
	fn decode(&self, _file: &mut File, _file_name: &str) -> Result<DecodedTags, DecodeError> {
		std::thread::sleep(Duration::from_millis(300));
		Ok(DecodedTags::default())
	}
}

/// Store wrapper that counts write operations, for no-op idempotence checks.
struct RecordingStore {
	inner: MemoryStore,
	upsert_calls: AtomicUsize,
	delete_calls: AtomicUsize,
}

impl RecordingStore {
	fn new() -> Self {
		Self {
			inner: MemoryStore::new(),
			upsert_calls: AtomicUsize::new(0),
			delete_calls: AtomicUsize::new(0),
		}
	}

	fn reset_counters(&self) {
		self.upsert_calls.store(0, Ordering::SeqCst);
		self.delete_calls.store(0, Ordering::SeqCst);
	}
}

impl CatalogStore for RecordingStore {
	fn get_all(&self, folders: Option<bool>) -> Result<Vec<Record>, StoreError> {
		self.inner.get_all(folders)
	}

	fn get_by_path(&self, path: &str) -> Result<Option<Record>, StoreError> {
		self.inner.get_by_path(path)
	}

	fn get_all_prefixed(&self, prefix: &str) -> Result<Vec<Record>, StoreError> {
		self.inner.get_all_prefixed(prefix)
	}

	fn upsert(&self, records: Vec<Record>) -> Result<(), StoreError> {
		self.upsert_calls.fetch_add(1, Ordering::SeqCst);
		self.inner.upsert(records)
	}

	fn delete(&self, records: &[Record]) -> Result<(), StoreError> {
		self.delete_calls.fetch_add(1, Ordering::SeqCst);
		self.inner.delete(records)
	}

	fn count_all(&self) -> Result<u64, StoreError> {
		self.inner.count_all()
	}

	fn run_in_transaction<T, E, F>(&self, body: F) -> Result<T, E>
	where
		F: FnOnce() -> Result<T, E>,
		E: From<StoreError>,
	{
		self.inner.run_in_transaction(body)
	}
}

/// Creates `<tmp>/music/a.flac` (30 bytes -> 3000ms) and
/// `<tmp>/music/sub/b.flac` (40 bytes -> 4000ms).
fn music_tree() -> (TempDir, PathBuf) {
	let tmp = TempDir::new().unwrap();
	let root = tmp.path().join("music");
	fs::create_dir_all(root.join("sub")).unwrap();
	fs::write(root.join("a.flac"), "a".repeat(30)).unwrap();
	fs::write(root.join("sub/b.flac"), "b".repeat(40)).unwrap();
	(tmp, root)
}

fn settings_for(root: &Path) -> Settings {
	Settings {
		root_directory: Some(root.to_path_buf()),
	}
}

fn path_str(path: &Path) -> String {
	path.to_string_lossy().into_owned()
}

fn get(store: &impl CatalogStore, path: &Path) -> Option<Record> {
	store.get_by_path(&path_str(path)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn exhaustive_scan_builds_folder_aggregates() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));

	let outcome = scanner.scan(ScanMode::Exhaustive).await.unwrap();
	assert_eq!(outcome, ScanOutcome::Completed);

	let root_rec = get(store.as_ref(), &root).expect("root folder record");
	assert!(root_rec.is_folder());
	assert_eq!(root_rec.duration_ms, 7000);
	assert_eq!(root_rec.child_count, 2);
	assert_eq!(root_rec.size, 70);

	let sub_rec = get(store.as_ref(), &root.join("sub")).expect("sub folder record");
	assert_eq!(sub_rec.duration_ms, 4000);
	assert_eq!(sub_rec.child_count, 1);
	assert_eq!(sub_rec.size, 40);

	let a = get(store.as_ref(), &root.join("a.flac")).expect("file record");
	assert!(!a.is_folder());
	assert_eq!(a.duration_ms, 3000);
	assert_eq!(a.size, 30);
	assert_eq!(a.sample_rate_hz, 44100);
	assert_eq!(a.metadata().get("TITLE"), Some(&vec!["A".to_string()]));
	assert!(a.last_modified_ms > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unchanged_rescan_issues_no_writes() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(RecordingStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));

	scanner.scan(ScanMode::Exhaustive).await.unwrap();
	store.reset_counters();

	scanner.scan(ScanMode::Exhaustive).await.unwrap();
	assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 0);
	assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);

	// Fast mode sees unchanged folder mtimes and finds nothing at all.
	scanner.scan(ScanMode::Fast).await.unwrap();
	assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 0);
	assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn exhaustive_rescan_after_deletion_prunes_and_reaggregates() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));

	scanner.scan(ScanMode::Exhaustive).await.unwrap();
	fs::remove_file(root.join("sub/b.flac")).unwrap();
	scanner.scan(ScanMode::Exhaustive).await.unwrap();

	assert!(get(store.as_ref(), &root.join("sub/b.flac")).is_none());

	let sub_rec = get(store.as_ref(), &root.join("sub")).expect("sub survives, zeroed");
	assert_eq!(sub_rec.duration_ms, 0);
	assert_eq!(sub_rec.child_count, 0);
	assert_eq!(sub_rec.size, 0);

	let root_rec = get(store.as_ref(), &root).unwrap();
	assert_eq!(root_rec.duration_ms, 3000);
	assert_eq!(root_rec.child_count, 1);
	assert_eq!(root_rec.size, 30);
}

#[tokio::test(flavor = "multi_thread")]
async fn fast_scan_on_empty_store_behaves_like_exhaustive() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));

	scanner.scan(ScanMode::Fast).await.unwrap();

	let root_rec = get(store.as_ref(), &root).expect("first fast scan falls back to exhaustive");
	assert_eq!(root_rec.duration_ms, 7000);
	assert_eq!(root_rec.child_count, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn fast_scan_detects_deletion_via_parent_mtime() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));

	scanner.scan(ScanMode::Exhaustive).await.unwrap();

	// Ensure the directory mtime moves past the stored millisecond value.
	std::thread::sleep(Duration::from_millis(20));
	fs::remove_file(root.join("sub/b.flac")).unwrap();

	scanner.scan(ScanMode::Fast).await.unwrap();

	assert!(get(store.as_ref(), &root.join("sub/b.flac")).is_none());
	let sub_rec = get(store.as_ref(), &root.join("sub")).unwrap();
	assert_eq!(sub_rec.duration_ms, 0);
	let root_rec = get(store.as_ref(), &root).unwrap();
	assert_eq!(root_rec.duration_ms, 3000);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_scan_request_while_running_is_a_silent_noop() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(SlowDecoder), settings_for(&root));

	let background = {
		let scanner = scanner.clone();
		tokio::spawn(async move { scanner.scan(ScanMode::Exhaustive).await })
	};

	// Let the first scan reach its slow decode work.
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert!(scanner.is_running());

	let second = scanner.scan(ScanMode::Exhaustive).await.unwrap();
	assert_eq!(second, ScanOutcome::AlreadyRunning);

	let first = background.await.unwrap().unwrap();
	assert_eq!(first, ScanOutcome::Completed);
	assert!(!scanner.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_without_root_fails_and_persists_nothing() {
	init_tracing();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), Settings::default());

	let result = scanner.scan(ScanMode::Exhaustive).await;
	assert!(matches!(result, Err(ScanError::RootDirectoryNotSet)));
	assert_eq!(store.count_all().unwrap(), 0);
	assert!(!scanner.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn fast_scan_without_root_rolls_back_entirely() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));
	scanner.scan(ScanMode::Exhaustive).await.unwrap();
	let before = store.count_all().unwrap();

	// New file dirties sub's mtime, so fast detection finds work; the missing
	// root then aborts aggregation and the whole transaction must roll back.
	std::thread::sleep(Duration::from_millis(20));
	fs::write(root.join("sub/c.flac"), "c".repeat(10)).unwrap();
	scanner.set_root_directory(None);

	let result = scanner.scan(ScanMode::Fast).await;
	assert!(matches!(result, Err(ScanError::RootDirectoryNotSet)));
	assert_eq!(store.count_all().unwrap(), before);
	assert!(get(store.as_ref(), &root.join("sub/c.flac")).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn decode_failure_updates_size_and_mtime_but_keeps_tags() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));

	scanner.scan(ScanMode::Exhaustive).await.unwrap();
	let before = get(store.as_ref(), &root.join("a.flac")).unwrap();

	std::thread::sleep(Duration::from_millis(20));
	fs::write(root.join("a.flac"), "corrupt payload").unwrap();
	scanner.scan(ScanMode::Exhaustive).await.unwrap();

	let after = get(store.as_ref(), &root.join("a.flac")).unwrap();
	assert_eq!(after.size, "corrupt payload".len() as i64);
	assert!(after.last_modified_ms >= before.last_modified_ms);
	// Tag and audio-property fields survive the failed decode.
	assert_eq!(after.metadata(), before.metadata());
	assert_eq!(after.duration_ms, before.duration_ms);

	// The ancestor aggregates follow the new size but the old duration.
	let root_rec = get(store.as_ref(), &root).unwrap();
	assert_eq!(root_rec.size, "corrupt payload".len() as i64 + 40);
	assert_eq!(root_rec.duration_ms, 7000);
}

#[tokio::test(flavor = "multi_thread")]
async fn progress_returns_to_idle_after_scan() {
	init_tracing();
	let (_tmp, root) = music_tree();
	let store = Arc::new(MemoryStore::new());
	let scanner = Scanner::new(store.clone(), Arc::new(ContentDecoder), settings_for(&root));

	let progress = scanner.subscribe_progress();
	scanner.scan(ScanMode::Exhaustive).await.unwrap();

	let snapshot = progress.borrow().clone();
	assert_eq!(snapshot, soundvault_core::scan::ScanProgress::idle());
}
