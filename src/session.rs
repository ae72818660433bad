//! One patch run: load the palette and the pig, patch each requested bitmap in order, then write
//! the new pig only if every bitmap's colors exist in the pig palette.

use {
	crate::{
		bmp::{Bitmap, BmpError},
		config::{ConfigError, PatchConfig},
		palette::{Palette, PaletteError, PaletteTable},
		patch::{patchSlot, Oversize, Payload},
		pig::{ArchiveIndex, PigError},
		reconcile::{reconcile, Status, UnresolvedColor},
		rle,
	},
	core::{fmt, str::FromStr},
	memchr::memrchr,
	std::{
		fs, io,
		path::{Path, PathBuf},
	},
	thiserror::Error,
};

/// One `path` or `path:name` batch argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
	pub path: PathBuf,
	/// Pig key, `name` or `name#frame`. Defaults to the file stem.
	pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0:?} has no file name to take a bitmap name from")]
pub struct NoFileName(pub String);

impl FromStr for Request {
	type Err = NoFileName;

	fn from_str(arg: &str) -> Result<Self, NoFileName> {
		match memrchr(b':', arg.as_bytes()) {
			// a colon at index 1 is a drive letter
			Some(j) if j >= 2 => Ok(Self { path: arg[..j].into(), name: arg[j + 1..].into() }),
			_ => {
				let path = PathBuf::from(arg);
				let name = path.file_stem().ok_or_else(|| NoFileName(arg.into()))?.to_string_lossy().into_owned();
				Ok(Self { path, name })
			}
		}
	}
}

#[derive(Debug, Error)]
pub enum FatalAbort {
	#[error("{path:?}: {source}")]
	Io { path: PathBuf, source: io::Error },

	#[error("{path:?}: {source}")]
	Palette { path: PathBuf, source: PaletteError },

	#[error("{path:?}: {source}")]
	Archive { path: PathBuf, source: PigError },

	#[error("{path:?}: {source}")]
	BadSignature { path: PathBuf, source: BmpError },

	#[error("refusing to overwrite the input pig {0:?}")]
	OutputIsArchive(PathBuf),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
	Info,
	Warning,
	Error,
}

/// Everything a run has to say about one requested bitmap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
	NotFound { name: String },
	Unsupported { name: String, planes: u16, bitsPerPixel: u16 },
	Malformed { name: String, reason: String },
	DimensionMismatch { name: String, size: [u32; 2], slotSize: [u32; 2] },
	UnresolvedColor { name: String, color: UnresolvedColor },
	Unresolved { name: String, size: [u32; 2], newSize: usize, capacity: usize },
	Oversize { name: String, size: [u32; 2], newSize: usize, capacity: usize },
	Patched { name: String, size: [u32; 2], remapped: bool, compressed: bool, newSize: usize, capacity: usize },
}

impl Diagnostic {
	pub fn name(&self) -> &str {
		match self {
			Self::NotFound { name }
			| Self::Unsupported { name, .. }
			| Self::Malformed { name, .. }
			| Self::DimensionMismatch { name, .. }
			| Self::UnresolvedColor { name, .. }
			| Self::Unresolved { name, .. }
			| Self::Oversize { name, .. }
			| Self::Patched { name, .. } => name,
		}
	}

	/// Each request ends with exactly one outcome; the other diagnostics are details leading up to it.
	pub fn isOutcome(&self) -> bool {
		!matches!(self, Self::DimensionMismatch { .. } | Self::UnresolvedColor { .. })
	}

	pub fn severity(&self) -> Severity {
		match self {
			Self::Patched { .. } => Severity::Info,
			Self::UnresolvedColor { .. } | Self::Unresolved { .. } => Severity::Error,
			_ => Severity::Warning,
		}
	}
}

impl fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotFound { name } => write!(f, "Bitmap {name} not found in pig, skipped."),
			Self::Unsupported { name, planes, bitsPerPixel } => {
				write!(f, "{name} unsupported, must be 8-bit bitmap: planes {planes} bitsPerPixel {bitsPerPixel}")
			}
			Self::Malformed { name, reason } => write!(f, "{name} skipped: {reason}"),
			Self::DimensionMismatch { name, size: [width, height], slotSize: [slotWidth, slotHeight] } => {
				write!(f, "{name} is {width}x{height} but the pig entry is {slotWidth}x{slotHeight}")
			}
			Self::UnresolvedColor { name, color } => write!(
				f,
				"{name} has {} times color {} but cannot resolve using {} {}",
				color.count, color.color, color.nearest, color.nearestColor
			),
			Self::Unresolved { name, size: [width, height], newSize, capacity } => write!(
				f,
				"{name} ({width}x{height}) has colors outside the pig palette, not added \
				 (new size = {newSize}, original size = {capacity})"
			),
			Self::Oversize { name, size: [width, height], newSize, capacity } => {
				write!(f, "Failed to add {name} ({width}x{height}) new size = {newSize}, original size = {capacity}")
			}
			Self::Patched { name, size: [width, height], remapped, compressed, newSize, capacity } => write!(
				f,
				"Adding {name} ({width}x{height}) ({}) ({}) (new size = {newSize}, original size = {capacity})",
				if *remapped { "remapped palette" } else { "equal palette" },
				if *compressed { "rle" } else { "raw" },
			),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
	CommitWrite,
	AbortNoWrite,
}

pub struct Session {
	table: PaletteTable,
	index: ArchiveIndex,
	pig: Vec<u8>,
	snapTo6Bit: bool,
	diagnostics: Vec<Diagnostic>,
	unresolved: bool,
}

impl Session {
	pub fn new(palette: Palette, pig: Vec<u8>, snapTo6Bit: bool) -> Result<Self, PigError> {
		Ok(Self {
			table: PaletteTable::new(palette),
			index: ArchiveIndex::parse(&pig)?,
			pig,
			snapTo6Bit,
			diagnostics: Vec::new(),
			unresolved: false,
		})
	}

	pub fn load(config: &PatchConfig) -> Result<Self, FatalAbort> {
		tracing::info!("Reading palette from {}", config.palette.display());
		let palette = Palette::fromPal6(&readFile(&config.palette)?)
			.map_err(|source| FatalAbort::Palette { path: config.palette.clone(), source })?;
		tracing::info!("Reading pig from {}", config.archive.display());
		Self::new(palette, readFile(&config.archive)?, config.snapTo6Bit)
			.map_err(|source| FatalAbort::Archive { path: config.archive.clone(), source })
	}

	pub fn index(&self) -> &ArchiveIndex {
		&self.index
	}

	pub fn pig(&self) -> &[u8] {
		&self.pig
	}

	pub fn diagnostics(&self) -> &[Diagnostic] {
		&self.diagnostics
	}

	pub fn verdict(&self) -> Verdict {
		if self.unresolved {
			Verdict::AbortNoWrite
		} else {
			Verdict::CommitWrite
		}
	}

	pub fn process(&mut self, requests: &[Request]) -> Result<Verdict, FatalAbort> {
		for request in requests {
			self.processAsset(request)?;
		}
		let verdict = self.verdict();
		if verdict == Verdict::AbortNoWrite {
			tracing::error!("Colors outside the pig palette found, aborted.");
		}
		Ok(verdict)
	}

	/// Resolves the name before touching the bitmap file, so a missing name never needs the file.
	pub fn processAsset(&mut self, request: &Request) -> Result<(), FatalAbort> {
		if self.index.lookup(&request.name).is_none() {
			self.emit(Diagnostic::NotFound { name: request.name.clone() });
			return Ok(());
		}
		tracing::info!("Reading bmp bitmap from {}", request.path.display());
		let bmp = readFile(&request.path)?;
		self.patchBitmap(request, &bmp)
	}

	pub fn patchBitmap(&mut self, request: &Request, bmp: &[u8]) -> Result<(), FatalAbort> {
		let name = &request.name;
		let image = match self.index.lookup(name) {
			Some(image) => image.clone(),
			None => {
				self.emit(Diagnostic::NotFound { name: name.clone() });
				return Ok(());
			}
		};
		let mut bitmap = match Bitmap::decode(bmp) {
			Ok(bitmap) => bitmap,
			Err(source) if source.isFatal() => return Err(FatalAbort::BadSignature { path: request.path.clone(), source }),
			Err(BmpError::Unsupported { planes, bitsPerPixel }) => {
				self.emit(Diagnostic::Unsupported { name: name.clone(), planes, bitsPerPixel });
				return Ok(());
			}
			Err(err) => {
				self.emit(Diagnostic::Malformed { name: name.clone(), reason: err.to_string() });
				return Ok(());
			}
		};
		let size = [bitmap.width, bitmap.height];
		if size != [image.width, image.height] {
			self.emit(Diagnostic::DimensionMismatch { name: name.clone(), size, slotSize: [image.width, image.height] });
		}

		let reconciliation = {
			let source = if self.snapTo6Bit { bitmap.palette.quantized() } else { bitmap.palette.clone() };
			reconcile(&source, &bitmap.usage(), &self.table)
		};
		for color in &reconciliation.unresolved {
			self.emit(Diagnostic::UnresolvedColor { name: name.clone(), color: color.clone() });
		}
		reconciliation.apply(&mut bitmap.pixels);

		let encoded = rle::encodeImage(bitmap.width as _, bitmap.height as _, &bitmap.pixels)
			.inspect_err(|err| tracing::debug!("{name} stays uncompressed: {err}"))
			.ok();
		let payload = Payload::choose(&bitmap.pixels, encoded.as_ref());
		let (newSize, capacity) = (payload.size(), image.capacity as usize);
		if reconciliation.status() == Status::Unresolved {
			self.unresolved = true;
			self.emit(Diagnostic::Unresolved { name: name.clone(), size, newSize, capacity });
			return Ok(());
		}
		let diagnostic = match patchSlot(&mut self.pig, &self.index, &image, &payload) {
			Ok(newSize) => Diagnostic::Patched {
				name: name.clone(),
				size,
				remapped: reconciliation.remapRequired,
				compressed: payload.isCompressed(),
				newSize,
				capacity,
			},
			Err(Oversize { size: newSize, capacity }) => Diagnostic::Oversize { name: name.clone(), size, newSize, capacity },
		};
		self.emit(diagnostic);
		Ok(())
	}

	/// Writes the patched pig unless the run has to abort.
	pub fn commit(&self, output: &Path) -> Result<Verdict, FatalAbort> {
		let verdict = self.verdict();
		if verdict == Verdict::CommitWrite {
			fs::write(output, &self.pig).map_err(|source| FatalAbort::Io { path: output.into(), source })?;
			tracing::info!("Wrote {}", output.display());
		}
		Ok(verdict)
	}

	fn emit(&mut self, diagnostic: Diagnostic) {
		match diagnostic.severity() {
			Severity::Info => tracing::info!("{diagnostic}"),
			Severity::Warning => tracing::warn!("{diagnostic}"),
			Severity::Error => tracing::error!("{diagnostic}"),
		}
		self.diagnostics.push(diagnostic);
	}
}

fn readFile(path: &Path) -> Result<Vec<u8>, FatalAbort> {
	fs::read(path).map_err(|source| FatalAbort::Io { path: path.into(), source })
}

/// `Loading → ProcessingAssets → CommitWrite | AbortNoWrite` for a whole batch.
pub fn run(config: &PatchConfig, requests: &[Request]) -> Result<Verdict, FatalAbort> {
	if config.outputIsArchive() {
		return Err(FatalAbort::OutputIsArchive(config.output.clone()));
	}
	let mut session = Session::load(config)?;
	session.process(requests)?;
	session.commit(&config.output)
}
