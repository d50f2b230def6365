//! Scanner settings.
//!
//! The only required piece of configuration is the catalog root directory.
//! It is persisted as a TOML file so the choice survives restarts; an unset
//! root makes exhaustive scans fail with a configuration error instead of
//! walking from a nonsensical location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("failed to encode settings: {0}")]
	Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Absolute path of the directory tree to catalog. `None` means not yet
	/// configured.
	pub root_directory: Option<PathBuf>,
}

impl Settings {
	/// Default on-disk location, under the platform config directory.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("soundvault").join("settings.toml"))
	}

	/// Loads settings from `path`. A missing file is not an error; it yields
	/// the defaults, matching first-run behavior.
	pub fn load(path: &Path) -> Result<Self, SettingsError> {
		match fs::read_to_string(path) {
			Ok(text) => Ok(toml::from_str(&text)?),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			Err(err) => Err(err.into()),
		}
	}

	pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(path, toml::to_string_pretty(self)?)?;
		Ok(())
	}
}
