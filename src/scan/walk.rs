//! Directory walking with the catalog's filters.
//!
//! The walk yields the root itself, every non-hidden directory, and every
//! non-hidden file with a known audio extension. Hidden entries are pruned at
//! the tree level: a hidden directory is skipped together with its whole
//! subtree. Unreadable entries are silently dropped; anything that vanished
//! mid-walk is reconciled by the pruning phase instead.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Known audio file extensions, lowercase, most common first.
pub const AUDIO_EXTENSIONS: &[&str] = &[
	"flac", "mp3", "m4a", "ogg", "opus", "wav", "aac", "wma", "alac", "ape", "wv", "aiff", "mka",
	"dsf", "dff", "mpc", "tta", "webm",
];

/// True if the file name carries one of the known audio extensions,
/// case-insensitively.
pub fn is_audio_file(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.map(|ext| {
			let ext = ext.to_ascii_lowercase();
			AUDIO_EXTENSIONS.iter().any(|known| *known == ext)
		})
		.unwrap_or(false)
}

/// True if the final path component starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
	path.file_name()
		.and_then(|name| name.to_str())
		.map(|name| name.starts_with('.'))
		.unwrap_or(false)
}

/// Recursively walks `root`, yielding `root`, all non-hidden directories and
/// all non-hidden audio files. The iterator is lazy and restartable; it holds
/// no state beyond the walk position.
pub fn walk(root: &Path) -> impl Iterator<Item = PathBuf> {
	WalkDir::new(root)
		.follow_links(false)
		.into_iter()
		// Depth 0 is the root itself; it is always included so a scan rooted
		// at a dot-directory still works.
		.filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()))
		.filter_map(Result::ok)
		.filter(|entry| entry.file_type().is_dir() || is_audio_file(entry.path()))
		.map(walkdir::DirEntry::into_path)
}
