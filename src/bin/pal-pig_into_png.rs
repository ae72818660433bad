#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	array_macro::array,
	clap::Parser,
	pig_patcher::{
		palette::Palette,
		pig::{ArchiveIndex, BM_FLAG_TRANSPARENT},
		stdoutRaw, PAL_ENTRIES,
	},
	png::ColorType,
	std::{fs, io::BufWriter, path::PathBuf},
};

/// Index drawn see-through in bitmaps flagged transparent.
const TRANSPARENT_INDEX: usize = 255;

fn main() {
	#[derive(Parser)]
	struct Args {
		#[clap(value_parser)]
		pal: PathBuf,

		#[clap(value_parser)]
		pig: PathBuf,

		/// `name` or `name#frame`
		#[clap(value_parser)]
		name: String,
	}
	let Args { pal, pig, name } = Args::parse();
	let readFile = |path: &PathBuf| fs::read(path).unwrap_or_else(|err| panic!("{path:?}: {err}"));
	let pngPAL = Palette::fromPal6(&readFile(&pal)).unwrap_or_else(|err| panic!("{pal:?}: {err}")).toRGB();
	let pig = readFile(&pig);
	let index = ArchiveIndex::parse(&pig).unwrap_or_else(|err| panic!("{err}"));
	let image = index.lookup(&name).unwrap_or_else(|| panic!("bitmap {name} not found in pig"));
	let pixels = index.readPixels(&pig, image).unwrap_or_else(|err| panic!("{err}"));
	let trns = array![i => if i == TRANSPARENT_INDEX { u8::MIN } else { u8::MAX }; PAL_ENTRIES];

	let mut png = png::Encoder::new(BufWriter::new(stdoutRaw()), image.width, image.height);
	png.set_color(ColorType::Indexed);
	png.set_palette(&pngPAL[..]);
	if image.flags & BM_FLAG_TRANSPARENT != 0 {
		png.set_trns(&trns[..]);
	}
	png.write_header().unwrap().write_image_data(&pixels).unwrap();
}
