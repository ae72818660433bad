#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	pig_patcher::{
		io_readToVec,
		pig::{ArchiveIndex, PigError},
		stdoutRaw, toml_toStringPretty,
	},
	std::io::{self, Write},
};

fn main() -> Result<(), PigError> {
	let pig = io_readToVec(io::stdin().lock()).unwrap();
	let index = ArchiveIndex::parse(&pig)?;
	eprintln!("{} bitmaps, {} sounds", index.images.len(), index.sounds.len());
	stdoutRaw()
		.write_all(&toml_toStringPretty(&index).unwrap_or_else(|err| panic!("{err}")).into_bytes())
		.unwrap();
	Ok(())
}
