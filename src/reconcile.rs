//! Maps a bitmap's own palette indices onto the archive palette.

use {
	crate::{
		bmp::UsageHistogram,
		palette::{Color, Palette, PaletteTable},
		PAL_ENTRIES,
	},
	std::collections::BTreeMap,
};

/// A used source color with no exact counterpart in the archive palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedColor {
	pub source: u8,
	pub color: Color,
	pub count: u32,
	pub nearest: u8,
	pub nearestColor: Color,
	pub squaredDistance: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
	/// Every used index already points at its own color.
	Clean,
	Remapped,
	Unresolved,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
	/// Source index to archive index, for used source indices only.
	pub remap: BTreeMap<u8, u8>,
	pub remapRequired: bool,
	pub unresolved: Vec<UnresolvedColor>,
}

impl Reconciliation {
	pub fn status(&self) -> Status {
		match (self.unresolved.is_empty(), self.remapRequired) {
			(false, _) => Status::Unresolved,
			(true, true) => Status::Remapped,
			(true, false) => Status::Clean,
		}
	}

	/// Rewrites `pixels` into archive palette indices.
	pub fn apply(&self, pixels: &mut [u8]) {
		if !self.remapRequired && self.unresolved.is_empty() {
			return;
		}
		let mut lookup: [u8; PAL_ENTRIES] = core::array::from_fn(|i| i as u8);
		for (&source, &destination) in &self.remap {
			lookup[source as usize] = destination;
		}
		for pixel in pixels {
			*pixel = lookup[*pixel as usize];
		}
	}
}

pub fn reconcile(source: &Palette, usage: &UsageHistogram, destination: &PaletteTable) -> Reconciliation {
	let mut reconciliation = Reconciliation::default();
	for (i, &count) in usage.iter().enumerate().filter(|&(_, &count)| count != 0) {
		let i = i as u8;
		let color = source[i];
		let target = match destination.lookup(color) {
			Some(target) => {
				reconciliation.remapRequired |= target != i;
				target
			}
			None => {
				let (nearest, squaredDistance) = destination.nearest(color);
				reconciliation.unresolved.push(UnresolvedColor {
					source: i,
					color,
					count,
					nearest,
					nearestColor: destination.palette()[nearest],
					squaredDistance,
				});
				nearest
			}
		};
		reconciliation.remap.insert(i, target);
	}
	reconciliation
}
