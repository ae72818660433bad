//! The archive's shared 256-color palette and its 6-bit on-disk form.

use {
	crate::{DotExt, PAL_ENTRIES, PAL_LEN, RGB_SIZE},
	array_macro::array,
	core::{fmt, ops},
	glam::IVec3,
	std::collections::HashMap,
	thiserror::Error,
};

pub const CHANNEL6_MAX: u8 = 63;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color {
	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	#[inline(always)]
	fn toIVec3(self) -> IVec3 {
		IVec3::new(self.r as _, self.g as _, self.b as _)
	}

	pub fn squaredDistance(self, other: Self) -> i32 {
		(self.toIVec3() - other.toIVec3()).lengthSquared()
	}

	#[must_use]
	pub const fn quantized(self) -> Self {
		Self::new(quantize8(self.r), quantize8(self.g), quantize8(self.b))
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[R={}, G={}, B={}]", self.r, self.g, self.b)
	}
}

/// Rescales one 6-bit VGA DAC channel to 8 bits. Color matching is exact, so this has to stay
/// `v * 65 / 16` with truncation.
#[inline(always)]
pub const fn channel6To8(value: u8) -> u8 {
	(value as u16 * 65 / 16) as u8
}

/// Snaps an 8-bit channel onto the values reachable from [`channel6To8`].
#[inline(always)]
pub const fn quantize8(value: u8) -> u8 {
	(value & 0xFC) | (value >> 6)
}

pub fn pal6ToPal8(pal6: &[u8; PAL_LEN]) -> [u8; PAL_LEN] {
	pal6.map(channel6To8)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
	#[error("palette is {0} bytes, expected {PAL_LEN}")]
	WrongLength(usize),

	#[error("palette channel {position} is {value}, above the 6-bit maximum {CHANNEL6_MAX}")]
	ChannelOutOfRange { position: usize, value: u8 },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Palette(pub [Color; PAL_ENTRIES]);

impl Palette {
	pub fn fromRGB(rgb: &[u8; PAL_LEN]) -> Self {
		Self(array![i => Color::new(rgb[i * RGB_SIZE], rgb[i * RGB_SIZE + 1], rgb[i * RGB_SIZE + 2]); PAL_ENTRIES])
	}

	/// Parses a raw `palette.256`-style resource: 256 RGB triples of 6-bit channels.
	pub fn fromPal6(pal6: &[u8]) -> Result<Self, PaletteError> {
		let pal6 = <&[u8; PAL_LEN]>::try_from(pal6).map_err(|_| PaletteError::WrongLength(pal6.len()))?;
		if let Some(position) = pal6.iter().position(|&value| value > CHANNEL6_MAX) {
			return Err(PaletteError::ChannelOutOfRange { position, value: pal6[position] });
		}
		Ok(Self::fromRGB(&pal6ToPal8(pal6)))
	}

	pub fn toRGB(&self) -> [u8; PAL_LEN] {
		array![i => { let color = self.0[i / RGB_SIZE]; [color.r, color.g, color.b][i % RGB_SIZE] }; PAL_LEN]
	}

	#[must_use]
	pub fn quantized(&self) -> Self {
		Self(self.0.map(Color::quantized))
	}

	pub fn iter(&self) -> impl Iterator<Item = Color> + '_ {
		self.0.iter().copied()
	}
}

impl ops::Index<u8> for Palette {
	type Output = Color;

	#[inline(always)]
	fn index(&self, index: u8) -> &Color {
		&self.0[index as usize]
	}
}

impl fmt::Debug for Palette {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.0.iter()).finish()
	}
}

/// Destination palette plus its exact color lookup. Built once per run and only read afterwards.
pub struct PaletteTable {
	palette: Palette,
	indexOf: HashMap<Color, u8>,
}

impl PaletteTable {
	pub fn new(palette: Palette) -> Self {
		let mut indexOf = HashMap::with_capacity(PAL_ENTRIES);
		for (i, color) in palette.iter().enumerate() {
			// duplicated colors resolve to their first index
			indexOf.entry(color).or_insert(i as u8);
		}
		Self { palette, indexOf }
	}

	pub fn palette(&self) -> &Palette {
		&self.palette
	}

	pub fn lookup(&self, color: Color) -> Option<u8> {
		self.indexOf.get(&color).copied()
	}

	/// Returns the closest entry by squared RGB distance and that distance. Ties go to the lower index.
	pub fn nearest(&self, color: Color) -> (u8, i32) {
		let (mut nearestSquaredDist, mut nearestI) = (i32::MAX, 0);
		for (i, palColor) in self.palette.iter().enumerate() {
			let squaredDist = color.squaredDistance(palColor);
			if squaredDist < nearestSquaredDist {
				(nearestSquaredDist, nearestI) = (squaredDist, i as u8);
			}
		}
		(nearestI, nearestSquaredDist)
	}
}
