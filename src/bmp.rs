//! Uncompressed 8-bit indexed Windows bitmaps, the only kind of artwork accepted for patching.

use {
	crate::{
		palette::{Color, Palette},
		PAL_ENTRIES,
	},
	byteorder::{ReadBytesExt, WriteBytesExt, LE},
	std::io::{self, Write},
	thiserror::Error,
};

pub const SIGNATURE: u16 = u16::from_le_bytes(*b"BM");
pub const FILE_HEADER_LEN: usize = 14;
pub const INFO_HEADER_LEN: u32 = 40;
pub const PAL_ENTRY_SIZE: usize = 4;
const BI_RGB: u32 = 0;
const PIXELS_PER_METER: i32 = 2835;

pub type UsageHistogram = [u32; PAL_ENTRIES];

#[derive(Debug, Error)]
pub enum BmpError {
	#[error("invalid bmp signature {0:#06X}")]
	BadSignature(u16),

	#[error("unsupported, must be 8-bit bitmap: planes {planes} bitsPerPixel {bitsPerPixel}")]
	Unsupported { planes: u16, bitsPerPixel: u16 },

	#[error("unsupported, must be uncompressed: compression {0}")]
	Compressed(u32),

	#[error("width {width} and height {height} do not describe an image")]
	BadDimensions { width: i32, height: i32 },

	#[error("headers truncated: {0}")]
	HeaderTruncated(#[from] io::Error),

	#[error("pixel data is {actual} bytes, {expected} expected")]
	PixelsTruncated { expected: usize, actual: usize },
}

impl BmpError {
	/// A wrong signature means the input is not a bitmap at all; everything else is a bitmap this tool
	/// cannot use.
	pub fn isFatal(&self) -> bool {
		matches!(self, Self::BadSignature(_))
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
	pub width: u32,
	pub height: u32,
	/// Whether the rows were stored bottom-to-top (positive height field). `pixels` is always top-down.
	pub bottomUp: bool,
	pub pixels: Vec<u8>,
	pub palette: Palette,
}

#[inline(always)]
const fn rowStride(width: usize) -> usize {
	(width + 3) & !3
}

impl Bitmap {
	pub fn decode(bmp: &[u8]) -> Result<Self, BmpError> {
		let cursor = &mut io::Cursor::new(bmp);
		let signature = cursor.read_u16::<LE>()?;
		if signature != SIGNATURE {
			return Err(BmpError::BadSignature(signature));
		}
		let _fileLen = cursor.read_u32::<LE>()?;
		let _reserved = [cursor.read_u16::<LE>()?, cursor.read_u16::<LE>()?];
		let pixelDataOffset = cursor.read_u32::<LE>()? as usize;
		let headerLen = cursor.read_u32::<LE>()?;
		let width = cursor.read_i32::<LE>()?;
		let height = cursor.read_i32::<LE>()?;
		let planes = cursor.read_u16::<LE>()?;
		let bitsPerPixel = cursor.read_u16::<LE>()?;
		if planes != 1 || bitsPerPixel != 8 {
			return Err(BmpError::Unsupported { planes, bitsPerPixel });
		}
		let mut numPalEntries = PAL_ENTRIES;
		if headerLen >= INFO_HEADER_LEN {
			let compression = cursor.read_u32::<LE>()?;
			if compression != BI_RGB {
				return Err(BmpError::Compressed(compression));
			}
			cursor.set_position(cursor.position() + 12);
			match cursor.read_u32::<LE>()? as usize {
				0 => {}
				colorsUsed => numPalEntries = colorsUsed.min(PAL_ENTRIES),
			}
		}
		if width <= 0 || height == 0 || height == i32::MIN {
			return Err(BmpError::BadDimensions { width, height });
		}

		cursor.set_position((FILE_HEADER_LEN + headerLen as usize) as _);
		let mut colors = [Color::default(); PAL_ENTRIES];
		for color in &mut colors[..numPalEntries] {
			let [blue, green, red, _] = [cursor.read_u8()?, cursor.read_u8()?, cursor.read_u8()?, cursor.read_u8()?];
			*color = Color::new(red, green, blue);
		}

		let bottomUp = height > 0;
		let (width, height) = (width.unsigned_abs() as usize, height.unsigned_abs() as usize);
		let stride = rowStride(width);
		let pixelData = bmp.get(pixelDataOffset..).unwrap_or_default();
		let expected = stride * (height - 1) + width;
		if pixelData.len() < expected {
			return Err(BmpError::PixelsTruncated { expected, actual: pixelData.len() });
		}
		let mut pixels = Vec::with_capacity(width * height);
		for y in 0..height {
			let storedRow = if bottomUp { height - 1 - y } else { y };
			pixels.extend_from_slice(&pixelData[storedRow * stride..][..width]);
		}

		Ok(Self { width: width as _, height: height as _, bottomUp, pixels, palette: Palette(colors) })
	}

	pub fn usage(&self) -> UsageHistogram {
		let mut counts = [0; PAL_ENTRIES];
		for &pixel in &self.pixels {
			counts[pixel as usize] += 1;
		}
		counts
	}

	/// Writes an uncompressed 8-bit bitmap with a full 256-entry palette.
	pub fn encode(&self, bottomUp: bool) -> Vec<u8> {
		let (width, height) = (self.width as usize, self.height as usize);
		let stride = rowStride(width);
		let pixelDataOffset = FILE_HEADER_LEN + INFO_HEADER_LEN as usize + PAL_ENTRIES * PAL_ENTRY_SIZE;
		let fileLen = pixelDataOffset + stride * height;
		let mut bmp = Vec::with_capacity(fileLen);
		bmp.writeHeaders(fileLen, pixelDataOffset, self.width, if bottomUp { self.height as i32 } else { -(self.height as i32) })
			.and_then(|()| {
				for color in self.palette.iter() {
					bmp.write_all(&[color.b, color.g, color.r, 0])?;
				}
				let padding = [0; 3];
				for y in 0..height {
					let row = if bottomUp { height - 1 - y } else { y };
					bmp.write_all(&self.pixels[row * width..][..width])?;
					bmp.write_all(&padding[..stride - width])?;
				}
				Ok(())
			})
			.unwrap_or_else(|_| unreachable!("writing to a Vec does not fail"));
		bmp
	}
}

trait WriteHeadersExt {
	fn writeHeaders(&mut self, fileLen: usize, pixelDataOffset: usize, width: u32, height: i32) -> io::Result<()>;
}
impl<W: Write> WriteHeadersExt for W {
	fn writeHeaders(&mut self, fileLen: usize, pixelDataOffset: usize, width: u32, height: i32) -> io::Result<()> {
		self.write_u16::<LE>(SIGNATURE)?;
		self.write_u32::<LE>(fileLen as _)?;
		self.write_all(&[0; 4])?;
		self.write_u32::<LE>(pixelDataOffset as _)?;
		self.write_u32::<LE>(INFO_HEADER_LEN)?;
		self.write_i32::<LE>(width as _)?;
		self.write_i32::<LE>(height)?;
		self.write_u16::<LE>(1)?;
		self.write_u16::<LE>(8)?;
		self.write_u32::<LE>(BI_RGB)?;
		self.write_u32::<LE>((fileLen - pixelDataOffset) as _)?;
		self.write_i32::<LE>(PIXELS_PER_METER)?;
		self.write_i32::<LE>(PIXELS_PER_METER)?;
		self.write_u32::<LE>(PAL_ENTRIES as _)?;
		self.write_u32::<LE>(0)
	}
}

#[cfg(test)]
mod tests {
	use {super::*, array_macro::array, rstest::rstest};

	fn grayscalePalette() -> Palette {
		Palette(array![i => Color::new(i as u8, i as u8, i as u8); PAL_ENTRIES])
	}

	fn sample(width: u32, height: u32) -> Bitmap {
		Bitmap {
			width,
			height,
			bottomUp: false,
			pixels: (0..width * height).map(|i| (i * 7 % 251) as u8).collect(),
			palette: grayscalePalette(),
		}
	}

	#[rstest]
	#[case(4, 10)]
	#[case(5, 3)]
	#[case(1, 1)]
	fn decode_restoresTopDownRows(#[case] width: u32, #[case] height: u32) {
		let bitmap = sample(width, height);
		for bottomUp in [false, true] {
			let decoded = Bitmap::decode(&bitmap.encode(bottomUp)).unwrap();
			assert_eq!(decoded.bottomUp, bottomUp);
			assert_eq!((decoded.width, decoded.height), (width, height));
			assert_eq!(decoded.pixels, bitmap.pixels);
			assert_eq!(decoded.palette, bitmap.palette);
		}
	}

	#[test]
	fn decode_flipsPositiveHeight() {
		let bitmap = sample(4, 10);
		let bmp = bitmap.encode(true);
		// the first stored row is the bottom one
		let pixelDataOffset = FILE_HEADER_LEN + INFO_HEADER_LEN as usize + PAL_ENTRIES * PAL_ENTRY_SIZE;
		assert_eq!(&bmp[pixelDataOffset..][..4], &bitmap.pixels[36..40]);
		assert_eq!(i32::from_le_bytes(bmp[22..26].try_into().unwrap()), 10);
		assert_eq!(Bitmap::decode(&bmp).unwrap().pixels, bitmap.pixels);

		let bmp = bitmap.encode(false);
		assert_eq!(i32::from_le_bytes(bmp[22..26].try_into().unwrap()), -10);
		assert_eq!(&bmp[pixelDataOffset..][..4], &bitmap.pixels[..4]);
	}

	#[test]
	fn decode_rejectsSignature() {
		let mut bmp = sample(4, 4).encode(false);
		bmp[..2].copy_from_slice(b"PN");
		let err = Bitmap::decode(&bmp).unwrap_err();
		assert!(matches!(err, BmpError::BadSignature(0x4E50)));
		assert!(err.isFatal());
	}

	#[rstest]
	#[case(1, 4)]
	#[case(1, 24)]
	#[case(2, 8)]
	fn decode_skipsUnsupportedDepth(#[case] planes: u16, #[case] bitsPerPixel: u16) {
		let mut bmp = sample(4, 4).encode(false);
		bmp[26..28].copy_from_slice(&planes.to_le_bytes());
		bmp[28..30].copy_from_slice(&bitsPerPixel.to_le_bytes());
		let err = Bitmap::decode(&bmp).unwrap_err();
		assert!(matches!(err, BmpError::Unsupported { planes: p, bitsPerPixel: b } if p == planes && b == bitsPerPixel));
		assert!(!err.isFatal());
	}

	#[test]
	fn decode_reportsShortPixelData() {
		let bmp = sample(8, 8).encode(false);
		let err = Bitmap::decode(&bmp[..bmp.len() - 9]).unwrap_err();
		assert!(matches!(err, BmpError::PixelsTruncated { expected: 64, actual: 55 }));
		assert!(matches!(Bitmap::decode(&bmp[..20]).unwrap_err(), BmpError::HeaderTruncated(_)));
	}

	#[test]
	fn decode_readsPaletteAsBGR() {
		let mut bitmap = sample(4, 1);
		bitmap.palette.0[7] = Color::new(10, 20, 30);
		let bmp = bitmap.encode(false);
		let entry = FILE_HEADER_LEN + INFO_HEADER_LEN as usize + 7 * PAL_ENTRY_SIZE;
		assert_eq!(&bmp[entry..][..PAL_ENTRY_SIZE], &[30, 20, 10, 0]);
		assert_eq!(Bitmap::decode(&bmp).unwrap().palette[7], Color::new(10, 20, 30));
	}

	#[test]
	fn usage_countsEveryPixel() {
		let bitmap = Bitmap { pixels: vec![3, 3, 9, 3, 0, 0], ..sample(3, 2) };
		let usage = bitmap.usage();
		assert_eq!((usage[0], usage[3], usage[9]), (2, 3, 1));
		assert_eq!(usage.iter().sum::<u32>(), 6);
	}
}
