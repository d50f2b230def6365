//! Pure helpers over the path strings that structure the catalog tree.
//!
//! The catalog has no foreign keys; containment is derived entirely from
//! `/`-separated path prefixes, so these functions define the tree.

use std::path::{Path, PathBuf};

/// Returns `path` with exactly one trailing `/`.
///
/// Prefix queries must use this form: matching on the bare folder path would
/// also match siblings like `/a/bc` when looking under `/a/b`.
pub fn with_trailing_slash(path: &str) -> String {
	if path.ends_with('/') {
		path.to_string()
	} else {
		format!("{path}/")
	}
}

/// True iff `candidate` is a *direct* child of `parent`: it extends `parent`
/// with `/` plus exactly one non-empty component.
pub fn is_direct_child(parent: &str, candidate: &str) -> bool {
	let Some(rest) = candidate.strip_prefix(parent) else {
		return false;
	};
	let Some(rest) = rest.strip_prefix('/') else {
		return false;
	};
	!rest.is_empty() && !rest.contains('/')
}

/// All ancestor directories of `path`, from its parent up to and including
/// `root`. Empty when `path` is the root itself or lies outside it.
pub fn ancestors_up_to(path: &Path, root: &Path) -> Vec<PathBuf> {
	if path == root || !path.starts_with(root) {
		return Vec::new();
	}

	let mut out = Vec::new();
	let mut current = path.parent();
	while let Some(dir) = current {
		out.push(dir.to_path_buf());
		if dir == root {
			break;
		}
		current = dir.parent();
	}
	out
}
