//! Run-length codec for bitmap slots.
//!
//! An encoded image is a row-size table (one byte per row, or one little-endian `u16` per row
//! for "big" images where some row needs more than 255 bytes) followed by the rows. Inside a row,
//! a byte whose top three bits are set is a code: its low five bits are a repeat count for the
//! byte after it, and a count of zero ends the row. Any other byte is a single pixel.
//!
//! The 4-byte slot size that precedes an encoded image in the archive is not part of this codec.

use {
	byteorder::{ByteOrder, LE},
	core::mem::size_of,
	thiserror::Error,
};

pub const RLE_CODE: u8 = 0xE0;
pub const MAX_RUN: usize = 0x1F;
pub const END_OF_ROW: u8 = RLE_CODE;

#[inline(always)]
pub const fn isRleCode(byte: u8) -> bool {
	byte & RLE_CODE == RLE_CODE
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoded {
	pub bytes: Vec<u8>,
	/// The row-size table holds `u16`s.
	pub big: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RleError {
	#[error("encoded data ends inside row {row}")]
	Truncated { row: usize },

	#[error("row {row} decodes to {actual} pixels, {expected} expected")]
	RowWidth { row: usize, expected: usize, actual: usize },

	#[error("row {row} spans {actual} bytes but the row table says {expected}")]
	RowSize { row: usize, expected: usize, actual: usize },

	#[error("row {row} encodes to {size} bytes, more than the row table can hold")]
	RowTooLong { row: usize, size: usize },
}

/// Appends one encoded row, terminator included, and returns its encoded length.
pub fn encodeRow(row: &[u8], out: &mut Vec<u8>) -> usize {
	let start = out.len();
	let mut i = 0;
	while i < row.len() {
		let color = row[i];
		let runLen = row[i..].iter().take_while(|&&pixel| pixel == color).count();
		i += runLen;
		let (fullChunks, rest) = (runLen / MAX_RUN, runLen % MAX_RUN);
		for chunkLen in core::iter::repeat(MAX_RUN).take(fullChunks).chain((rest != 0).then_some(rest)) {
			if chunkLen == 1 && !isRleCode(color) {
				out.push(color);
			} else {
				out.extend_from_slice(&[RLE_CODE | chunkLen as u8, color]);
			}
		}
	}
	out.push(END_OF_ROW);
	out.len() - start
}

/// Encodes `width × height` top-down pixels. Fails when a row outgrows even the `u16` row table.
pub fn encodeImage(width: usize, height: usize, pixels: &[u8]) -> Result<Encoded, RleError> {
	assert_eq!(pixels.len(), width * height);
	let (mut body, mut rowSizes) = (Vec::with_capacity(pixels.len()), Vec::with_capacity(height));
	if width != 0 {
		for row in pixels.chunks(width) {
			rowSizes.push(encodeRow(row, &mut body));
		}
	}
	let big = rowSizes.iter().any(|&size| size > u8::MAX as usize);
	let mut bytes = Vec::with_capacity(height * if big { size_of::<u16>() } else { 1 } + body.len());
	for (row, size) in rowSizes.into_iter().enumerate() {
		if big {
			let mut buf = [0; size_of::<u16>()];
			LE::write_u16(&mut buf, u16::try_from(size).map_err(|_| RleError::RowTooLong { row, size })?);
			bytes.extend_from_slice(&buf);
		} else {
			bytes.push(size as u8);
		}
	}
	bytes.extend_from_slice(&body);
	Ok(Encoded { bytes, big })
}

/// Decodes one row into `out`, returning how many encoded bytes it used.
pub fn decodeRow(data: &[u8], row: usize, out: &mut Vec<u8>) -> Result<usize, RleError> {
	let mut i = 0;
	loop {
		let byte = *data.get(i).ok_or(RleError::Truncated { row })?;
		i += 1;
		if !isRleCode(byte) {
			out.push(byte);
			continue;
		}
		let count = (byte & !RLE_CODE) as usize;
		if count == 0 {
			return Ok(i);
		}
		let color = *data.get(i).ok_or(RleError::Truncated { row })?;
		i += 1;
		out.resize(out.len() + count, color);
	}
}

pub fn decodeImage(width: usize, height: usize, data: &[u8], big: bool) -> Result<Vec<u8>, RleError> {
	let entrySize = if big { size_of::<u16>() } else { 1 };
	let tableLen = height * entrySize;
	let (table, mut rows) = (data.get(..tableLen).ok_or(RleError::Truncated { row: 0 })?, &data[tableLen..]);
	let mut pixels = Vec::with_capacity(width * height);
	for row in 0..height {
		let expected = if big { LE::read_u16(&table[row * 2..]) as usize } else { table[row] as usize };
		let start = pixels.len();
		let used = decodeRow(rows, row, &mut pixels)?;
		if pixels.len() - start != width {
			return Err(RleError::RowWidth { row, expected: width, actual: pixels.len() - start });
		}
		if used != expected {
			return Err(RleError::RowSize { row, expected, actual: used });
		}
		rows = &rows[used..];
	}
	Ok(pixels)
}
