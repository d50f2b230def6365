//! Catalog records.
//!
//! A [`Record`] describes one file or folder by absolute path. Files carry
//! audio properties and a tag map; folders carry aggregates (recursive size,
//! duration and descendant file count) maintained by the scan pipeline.

use crate::decoder::AudioProperties;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Tag names (uppercase) mapped to their ordered values.
pub type TagMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
	#[error("record path must not be empty")]
	EmptyPath,

	#[error("record path must be absolute: {0}")]
	RelativePath(String),

	#[error("metadata keys must be uppercase: {0}")]
	NonUppercaseTagKey(String),
}

/// One catalog entry, keyed by absolute `/`-separated path.
///
/// `path` and `is_folder` are fixed at construction. `metadata` is only
/// writable through [`Record::set_metadata`], which enforces the uppercase-key
/// invariant; deserialization funnels through the same validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct Record {
	path: String,
	is_folder: bool,
	pub last_modified_ms: i64,
	/// Byte length for files; recursive byte sum over descendant files for folders.
	pub size: i64,
	/// Count of descendant *file* records (folders are not counted). Folder-only.
	pub child_count: i64,
	/// Audio duration for files; recursive sum for folders.
	pub duration_ms: i64,
	pub sample_rate_hz: i32,
	pub bitrate_kbps: i32,
	pub channel_count: i32,
	metadata: TagMap,
}

impl Record {
	/// Creates an empty skeleton for a path observed for the first time.
	/// All observation fields start at zero; scan phases fill them in.
	pub fn new(path: impl Into<String>, is_folder: bool) -> Result<Self, RecordError> {
		let path = path.into();
		if path.is_empty() {
			return Err(RecordError::EmptyPath);
		}
		if !path.starts_with('/') {
			return Err(RecordError::RelativePath(path));
		}

		Ok(Self {
			path,
			is_folder,
			last_modified_ms: 0,
			size: 0,
			child_count: 0,
			duration_ms: 0,
			sample_rate_hz: 0,
			bitrate_kbps: 0,
			channel_count: 0,
			metadata: TagMap::new(),
		})
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn is_folder(&self) -> bool {
		self.is_folder
	}

	pub fn metadata(&self) -> &TagMap {
		&self.metadata
	}

	/// Replaces the tag map. Rejects any key that is not already uppercase;
	/// a record holding a non-uppercase key must never reach the store.
	pub fn set_metadata(&mut self, metadata: TagMap) -> Result<(), RecordError> {
		if let Some(key) = metadata.keys().find(|k| k.chars().any(char::is_lowercase)) {
			return Err(RecordError::NonUppercaseTagKey(key.clone()));
		}
		self.metadata = metadata;
		Ok(())
	}

	pub fn apply_audio_properties(&mut self, props: &AudioProperties) {
		self.channel_count = props.channel_count;
		self.bitrate_kbps = props.bitrate_kbps;
		self.sample_rate_hz = props.sample_rate_hz;
		self.duration_ms = props.duration_ms;
	}
}

/// Unvalidated mirror of [`Record`] used as the deserialization entry point.
#[derive(Deserialize)]
struct RawRecord {
	path: String,
	is_folder: bool,
	last_modified_ms: i64,
	size: i64,
	child_count: i64,
	duration_ms: i64,
	sample_rate_hz: i32,
	bitrate_kbps: i32,
	channel_count: i32,
	metadata: TagMap,
}

impl TryFrom<RawRecord> for Record {
	type Error = RecordError;

	fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
		let mut record = Record::new(raw.path, raw.is_folder)?;
		record.last_modified_ms = raw.last_modified_ms;
		record.size = raw.size;
		record.child_count = raw.child_count;
		record.duration_ms = raw.duration_ms;
		record.sample_rate_hz = raw.sample_rate_hz;
		record.bitrate_kbps = raw.bitrate_kbps;
		record.channel_count = raw.channel_count;
		record.set_metadata(raw.metadata)?;
		Ok(record)
	}
}
