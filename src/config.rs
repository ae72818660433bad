use {
	const_format::concatcp,
	serde::Deserialize,
	std::{
		fs, io,
		path::{Path, PathBuf},
	},
	thiserror::Error,
};

pub const PIG_EXTENSION: &str = ".pig";
pub const DEFAULT_PALETTE: &str = "palette.256";
pub const DEFAULT_ARCHIVE: &str = concatcp!("descent", PIG_EXTENSION);
pub const DEFAULT_OUTPUT: &str = concatcp!("new", PIG_EXTENSION);

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{path:?}: {source}")]
	Io { path: PathBuf, source: io::Error },

	#[error("{path:?}: {source}")]
	Parse { path: PathBuf, source: toml::de::Error },
}

/// Where the run reads its inputs and writes its result. Every key is optional in the TOML file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PatchConfig {
	/// 768-byte palette with 6-bit channels.
	pub palette: PathBuf,
	pub archive: PathBuf,
	pub output: PathBuf,
	/// Snap bitmap palettes onto 6-bit-representable colors before matching.
	pub snapTo6Bit: bool,
}

impl Default for PatchConfig {
	fn default() -> Self {
		Self {
			palette: DEFAULT_PALETTE.into(),
			archive: DEFAULT_ARCHIVE.into(),
			output: DEFAULT_OUTPUT.into(),
			snapTo6Bit: true,
		}
	}
}

impl PatchConfig {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let toml = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.into(), source })?;
		toml::from_str(&toml).map_err(|source| ConfigError::Parse { path: path.into(), source })
	}

	/// True when `output` names the same file as `archive`.
	pub fn outputIsArchive(&self) -> bool {
		match (fs::canonicalize(&self.output), fs::canonicalize(&self.archive)) {
			(Ok(output), Ok(archive)) => output == archive,
			_ => self.output == self.archive,
		}
	}
}
