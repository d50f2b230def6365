//! The tag-decoder collaborator.
//!
//! Phase 2 hands each changed file to a [`TagDecoder`] and stores whatever
//! comes back. [`LoftyDecoder`] is the production implementation; tests
//! substitute deterministic stubs.

use crate::catalog::record::TagMap;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::ItemKey;
use std::fs::File;
use thiserror::Error;

/// Technical audio properties reported by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioProperties {
	pub channel_count: i32,
	pub bitrate_kbps: i32,
	pub sample_rate_hz: i32,
	pub duration_ms: i64,
}

/// Result of decoding one file: tag map plus audio properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTags {
	pub tags: TagMap,
	pub properties: AudioProperties,
}

#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("failed to read tags: {0}")]
	Parse(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Reads tags and audio properties from an open file handle.
///
/// Implementations must emit uppercase tag keys only; records reject
/// anything else at construction.
pub trait TagDecoder: Send + Sync {
	fn decode(&self, file: &mut File, file_name: &str) -> Result<DecodedTags, DecodeError>;
}

/// Tag decoder backed by the `lofty` crate.
///
/// `lofty` probes the container format from content, so the file name is
/// only carried for the trait contract.
pub struct LoftyDecoder;

/// Well-known tag items exported into the catalog, with their uppercase keys.
const EXPORTED_TAGS: [(&str, ItemKey); 10] = [
	("TITLE", ItemKey::TrackTitle),
	("ARTIST", ItemKey::TrackArtist),
	("ALBUM", ItemKey::AlbumTitle),
	("ALBUMARTIST", ItemKey::AlbumArtist),
	("TRACKNUMBER", ItemKey::TrackNumber),
	("DISCNUMBER", ItemKey::DiscNumber),
	("GENRE", ItemKey::Genre),
	("DATE", ItemKey::RecordingDate),
	("COMPOSER", ItemKey::Composer),
	("COMMENT", ItemKey::Comment),
];

impl TagDecoder for LoftyDecoder {
	fn decode(&self, file: &mut File, _file_name: &str) -> Result<DecodedTags, DecodeError> {
		let tagged = lofty::read_from(file).map_err(|e| DecodeError::Parse(e.to_string()))?;

		let props = tagged.properties();
		let properties = AudioProperties {
			channel_count: props.channels().map(i32::from).unwrap_or(0),
			bitrate_kbps: props.audio_bitrate().map(|b| b as i32).unwrap_or(0),
			sample_rate_hz: props.sample_rate().map(|s| s as i32).unwrap_or(0),
			duration_ms: props.duration().as_millis() as i64,
		};

		let mut tags = TagMap::new();
		if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
			for (key, item_key) in EXPORTED_TAGS {
				if let Some(value) = tag.get_string(&item_key) {
					let value = value.trim();
					if !value.is_empty() {
						tags.insert(key.to_string(), vec![value.to_string()]);
					}
				}
			}
		}

		Ok(DecodedTags { tags, properties })
	}
}
