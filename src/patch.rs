//! In-place slot rewrites. A slot never grows: a replacement either fits in the bytes the
//! archive already reserved for it or is refused without touching anything.

use {
	crate::{
		pig::{ArchiveIndex, ImageEntry, BM_FLAG_RLE, BM_FLAG_RLE_BIG, FLAGS_FIELD_OFFSET, SLOT_SIZE_PREFIX_LEN},
		rle::Encoded,
	},
	byteorder::{ByteOrder, LE},
	thiserror::Error,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload<'a> {
	Compressed { bytes: &'a [u8], big: bool },
	Raw { pixels: &'a [u8] },
}

impl<'a> Payload<'a> {
	/// Compressed data is only worth it when it beats the raw pixels on its own, prefix aside.
	/// Pixels that could not be encoded at all go out raw.
	pub fn choose(pixels: &'a [u8], encoded: Option<&'a Encoded>) -> Self {
		match encoded {
			Some(encoded) if encoded.bytes.len() < pixels.len() => Payload::Compressed { bytes: &encoded.bytes, big: encoded.big },
			_ => Payload::Raw { pixels },
		}
	}

	/// Bytes this payload occupies in a slot.
	pub fn size(&self) -> usize {
		match self {
			Payload::Compressed { bytes, .. } => SLOT_SIZE_PREFIX_LEN + bytes.len(),
			Payload::Raw { pixels } => pixels.len(),
		}
	}

	pub fn isCompressed(&self) -> bool {
		matches!(self, Payload::Compressed { .. })
	}

	fn flags(&self, old: u8) -> u8 {
		let old = old & !(BM_FLAG_RLE | BM_FLAG_RLE_BIG);
		match *self {
			Payload::Compressed { big: true, .. } => old | BM_FLAG_RLE | BM_FLAG_RLE_BIG,
			Payload::Compressed { big: false, .. } => old | BM_FLAG_RLE,
			Payload::Raw { .. } => old,
		}
	}
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("new size = {size}, original size = {capacity}")]
pub struct Oversize {
	pub size: usize,
	pub capacity: usize,
}

/// Writes `payload` over the slot of `image` and updates the compression bits of its directory
/// record. Returns the number of bytes written.
pub fn patchSlot(pig: &mut [u8], index: &ArchiveIndex, image: &ImageEntry, payload: &Payload<'_>) -> Result<usize, Oversize> {
	let (size, capacity) = (payload.size(), image.capacity as usize);
	if size > capacity {
		return Err(Oversize { size, capacity });
	}
	let slot = &mut pig[index.slotStart(image)..][..size];
	match *payload {
		Payload::Compressed { bytes, .. } => {
			// the stored size counts the prefix itself
			LE::write_u32(&mut slot[..SLOT_SIZE_PREFIX_LEN], size as u32);
			slot[SLOT_SIZE_PREFIX_LEN..].copy_from_slice(bytes);
		}
		Payload::Raw { pixels } => slot.copy_from_slice(pixels),
	}
	let flags = &mut pig[image.recordPosition + FLAGS_FIELD_OFFSET];
	*flags = payload.flags(*flags);
	Ok(size)
}
