//! Descent 1 `.pig` texture archives: directory parsing and slot access.

use {
	crate::rle::{self, RleError},
	byteorder::{ReadBytesExt, LE},
	serde::Serialize,
	std::{
		collections::{hash_map::Entry, HashMap},
		io::{self, Read},
	},
	thiserror::Error,
};

pub const NAME_LEN: usize = 8;
pub const IMAGE_RECORD_LEN: usize = 17;
pub const SOUND_RECORD_LEN: usize = 20;
/// Image and sound counts that precede the records.
pub const DIRECTORY_HEADER_LEN: usize = 8;
/// Where the `flags` byte sits inside an image record.
pub const FLAGS_FIELD_OFFSET: usize = 11;
pub const SLOT_SIZE_PREFIX_LEN: usize = 4;

pub const DBM_FRAME_MASK: u8 = 0x3F;
pub const DBM_FLAG_ANIMATED: u8 = 0x40;
pub const DBM_FLAG_LARGE: u8 = 0x80;

pub const BM_FLAG_TRANSPARENT: u8 = 0x01;
pub const BM_FLAG_SUPER_TRANSPARENT: u8 = 0x02;
pub const BM_FLAG_NO_LIGHTING: u8 = 0x04;
pub const BM_FLAG_RLE: u8 = 0x08;
pub const BM_FLAG_PAGED_OUT: u8 = 0x10;
pub const BM_FLAG_RLE_BIG: u8 = 0x20;

#[derive(Debug, Error)]
pub enum PigError {
	#[error("pig directory truncated: {0}")]
	DirectoryTruncated(#[from] io::Error),

	#[error("pig directory at {offset} with {numImages} images and {numSounds} sounds does not fit in {len} bytes")]
	DirectoryOutOfBounds { offset: u32, numImages: u32, numSounds: u32, len: usize },

	#[error("bitmap {key} has an invalid compressed size {size}")]
	BadSlotSize { key: String, size: u32 },

	#[error("bitmap {key} spans up to byte {end} of a {len} byte pig")]
	SlotOutOfBounds { key: String, end: usize, len: usize },

	#[error("bitmap {key} is corrupt: {source}")]
	Rle { key: String, source: RleError },
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ImageEntry {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub frame: Option<u8>,
	pub width: u32,
	pub height: u32,
	pub flags: u8,
	pub avgColor: u8,
	/// Relative to [`ArchiveIndex::payloadBase`].
	pub offset: u32,
	/// Bytes any replacement may occupy; fixed when the archive was built.
	pub capacity: u32,
	#[serde(skip)]
	pub recordPosition: usize,
}

impl ImageEntry {
	pub fn key(&self) -> String {
		match self.frame {
			Some(frame) => format!("{}#{frame}", self.name),
			None => self.name.clone(),
		}
	}

	pub fn isRle(&self) -> bool {
		self.flags & BM_FLAG_RLE != 0
	}

	pub fn isRleBig(&self) -> bool {
		self.flags & BM_FLAG_RLE_BIG != 0
	}
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SoundEntry {
	pub name: String,
	pub length: u32,
	pub dataLength: u32,
	pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct ArchiveIndex {
	pub directoryOffset: u32,
	pub payloadBase: usize,

	#[serde(rename = "image", skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageEntry>,

	#[serde(rename = "sound", skip_serializing_if = "Vec::is_empty")]
	pub sounds: Vec<SoundEntry>,

	#[serde(skip)]
	byKey: HashMap<String, usize>,
}

impl ArchiveIndex {
	pub fn parse(pig: &[u8]) -> Result<Self, PigError> {
		let cursor = &mut io::Cursor::new(pig);
		let directoryOffset = cursor.read_u32::<LE>()?;
		cursor.set_position(directoryOffset.into());
		let (numImages, numSounds) = (cursor.read_u32::<LE>()?, cursor.read_u32::<LE>()?);
		let payloadBase = (directoryOffset as usize)
			.checked_add(DIRECTORY_HEADER_LEN)
			.and_then(|n| n.checked_add(IMAGE_RECORD_LEN.checked_mul(numImages as _)?))
			.and_then(|n| n.checked_add(SOUND_RECORD_LEN.checked_mul(numSounds as _)?))
			.filter(|&payloadBase| payloadBase <= pig.len())
			.ok_or(PigError::DirectoryOutOfBounds { offset: directoryOffset, numImages, numSounds, len: pig.len() })?;

		let mut images = Vec::with_capacity(numImages as _);
		for _ in 0..numImages {
			let recordPosition = cursor.position() as usize;
			let name = cursor.readName()?;
			let [dflags, width, height, flags, avgColor] = cursor.read_u8_array()?;
			let offset = cursor.read_u32::<LE>()?;
			let width = u32::from(width) + if dflags & DBM_FLAG_LARGE != 0 { 256 } else { 0 };
			let mut image = ImageEntry {
				name,
				frame: (dflags & DBM_FLAG_ANIMATED != 0).then_some(dflags & DBM_FRAME_MASK),
				width,
				height: height.into(),
				flags,
				avgColor,
				offset,
				capacity: 0,
				recordPosition,
			};
			image.capacity = slotCapacity(pig, payloadBase, &image)?;
			images.push(image);
		}
		let mut sounds = Vec::with_capacity(numSounds as _);
		for _ in 0..numSounds {
			sounds.push(SoundEntry {
				name: cursor.readName()?,
				length: cursor.read_u32::<LE>()?,
				dataLength: cursor.read_u32::<LE>()?,
				offset: cursor.read_u32::<LE>()?,
			});
		}
		debug_assert_eq!(cursor.position() as usize, payloadBase);

		let mut byKey = HashMap::with_capacity(images.len());
		for (i, image) in images.iter().enumerate() {
			match byKey.entry(image.key()) {
				Entry::Vacant(vacant) => {
					vacant.insert(i);
				}
				Entry::Occupied(occupied) => {
					tracing::warn!("bitmap {} appears twice in the pig, keeping the first one", occupied.key());
				}
			}
		}
		tracing::debug!("pig has {numImages} bitmaps and {numSounds} sounds, bitmap data starts at {payloadBase}");

		Ok(Self { directoryOffset, payloadBase, images, sounds, byKey })
	}

	/// Looks up `name`, or `name#frame` for a frame of an animation.
	pub fn lookup(&self, key: &str) -> Option<&ImageEntry> {
		self.byKey.get(key).map(|&i| &self.images[i])
	}

	pub fn slotStart(&self, image: &ImageEntry) -> usize {
		self.payloadBase + image.offset as usize
	}

	/// The pixels currently stored for `image`, top-down.
	pub fn readPixels(&self, pig: &[u8], image: &ImageEntry) -> Result<Vec<u8>, PigError> {
		let slot = &pig[self.slotStart(image)..][..image.capacity as usize];
		if !image.isRle() {
			return Ok(slot.to_vec());
		}
		rle::decodeImage(image.width as _, image.height as _, &slot[SLOT_SIZE_PREFIX_LEN..], image.isRleBig())
			.map_err(|source| PigError::Rle { key: image.key(), source })
	}
}

/// Uncompressed slots hold exactly `width × height` bytes; compressed ones start with their own
/// total size.
fn slotCapacity(pig: &[u8], payloadBase: usize, image: &ImageEntry) -> Result<u32, PigError> {
	let start = payloadBase + image.offset as usize;
	let outOfBounds = |end| PigError::SlotOutOfBounds { key: image.key(), end, len: pig.len() };
	let capacity = if image.isRle() {
		let prefix = pig.get(start..start + SLOT_SIZE_PREFIX_LEN).ok_or_else(|| outOfBounds(start + SLOT_SIZE_PREFIX_LEN))?;
		let size = io::Cursor::new(prefix).read_u32::<LE>()?;
		if (size as usize) < SLOT_SIZE_PREFIX_LEN {
			return Err(PigError::BadSlotSize { key: image.key(), size });
		}
		size
	} else {
		image.width * image.height
	};
	let end = start + capacity as usize;
	if end > pig.len() {
		return Err(outOfBounds(end));
	}
	Ok(capacity)
}

trait ReadExt {
	fn readName(&mut self) -> io::Result<String>;
	fn read_u8_array<const N: usize>(&mut self) -> io::Result<[u8; N]>;
}
impl<R: Read> ReadExt for R {
	fn readName(&mut self) -> io::Result<String> {
		let name: [u8; NAME_LEN] = self.read_u8_array()?;
		let len = memchr::memchr(0, &name).unwrap_or(NAME_LEN);
		Ok(String::from_utf8_lossy(&name[..len]).into_owned())
	}

	fn read_u8_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
		let mut array = [0; N];
		self.read_exact(&mut array)?;
		Ok(array)
	}
}
