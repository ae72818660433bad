#![allow(dead_code)]

use {
	pig_patcher::{
		bmp::Bitmap,
		config::PatchConfig,
		palette::Palette,
		pig::{BM_FLAG_RLE, NAME_LEN, SLOT_SIZE_PREFIX_LEN},
		rle,
		session::Request,
		PAL_ENTRIES,
	},
	std::{fs, path::PathBuf},
	tempfile::TempDir,
};

pub struct Slot {
	pub name: &'static str,
	pub dflags: u8,
	pub width: u8,
	pub height: u8,
	pub flags: u8,
	pub data: Vec<u8>,
}

impl Slot {
	pub fn raw(name: &'static str, width: u8, height: u8, pixels: Vec<u8>) -> Self {
		assert_eq!(pixels.len(), width as usize * height as usize);
		Self { name, dflags: 0, width, height, flags: 0, data: pixels }
	}

	/// A compressed slot whose capacity is exactly what `pixels` encode to.
	pub fn rle(name: &'static str, width: u8, height: u8, flags: u8, pixels: &[u8]) -> Self {
		let encoded = rle::encodeImage(width.into(), height.into(), pixels).unwrap();
		let size = (SLOT_SIZE_PREFIX_LEN + encoded.bytes.len()) as u32;
		let data = [&size.to_le_bytes()[..], &encoded.bytes[..]].concat();
		Self { name, dflags: 0, width, height, flags: flags | BM_FLAG_RLE, data }
	}
}

/// A pig with the directory right after the leading offset, one trailing sound and the slots
/// packed back to back.
pub fn buildPig(slots: &[Slot]) -> Vec<u8> {
	let (mut directory, mut payload) = (Vec::new(), Vec::new());
	directory.extend_from_slice(&(slots.len() as u32).to_le_bytes());
	directory.extend_from_slice(&1_u32.to_le_bytes());
	for slot in slots {
		let mut name = [0; NAME_LEN];
		name[..slot.name.len()].copy_from_slice(slot.name.as_bytes());
		directory.extend_from_slice(&name);
		directory.extend_from_slice(&[slot.dflags, slot.width, slot.height, slot.flags, 0]);
		directory.extend_from_slice(&(payload.len() as u32).to_le_bytes());
		payload.extend_from_slice(&slot.data);
	}
	directory.extend_from_slice(b"explode\0");
	directory.extend_from_slice(&[0; 12]);
	[&4_u32.to_le_bytes()[..], &directory[..], &payload[..]].concat()
}

/// 256 distinct 6-bit colors.
pub fn archivePal6() -> Vec<u8> {
	(0..PAL_ENTRIES).flat_map(|i| [(i % 64) as u8, (i / 64 * 16) as u8, (i * 7 % 64) as u8]).collect()
}

pub fn archivePalette() -> Palette {
	Palette::fromPal6(&archivePal6()).unwrap()
}

/// Pixels no two neighbours of which repeat, all below the codec's code range, so they never
/// compress.
pub fn noise(len: usize) -> Vec<u8> {
	(0..len).map(|i| (i * 37 % 200) as u8).collect()
}

pub fn bmp(width: u32, height: u32, pixels: Vec<u8>, palette: Palette) -> Vec<u8> {
	Bitmap { width, height, bottomUp: true, pixels, palette }.encode(true)
}

/// A scratch directory holding `palette.256` and `descent.pig`, with `new.pig` as the output.
pub struct Workspace {
	pub dir: TempDir,
	pub config: PatchConfig,
}

impl Workspace {
	pub fn new(pig: &[u8]) -> Self {
		let dir = tempfile::tempdir().unwrap();
		let config = PatchConfig {
			palette: dir.path().join("palette.256"),
			archive: dir.path().join("descent.pig"),
			output: dir.path().join("new.pig"),
			snapTo6Bit: true,
		};
		fs::write(&config.palette, archivePal6()).unwrap();
		fs::write(&config.archive, pig).unwrap();
		Self { dir, config }
	}

	/// Writes `bytes` to `file` and requests it under `name`.
	pub fn bitmap(&self, file: &str, name: &str, bytes: &[u8]) -> Request {
		let path: PathBuf = self.dir.path().join(file);
		fs::write(&path, bytes).unwrap();
		Request { path, name: name.into() }
	}

	pub fn output(&self) -> Option<Vec<u8>> {
		fs::read(&self.config.output).ok()
	}
}
