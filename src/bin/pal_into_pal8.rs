#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	pig_patcher::{io_readToVec, palette::Palette, stdoutRaw},
	std::{
		io::{self, Write},
		process::ExitCode,
	},
};

fn main() -> ExitCode {
	match Palette::fromPal6(&io_readToVec(io::stdin().lock()).unwrap()) {
		Ok(palette) => {
			stdoutRaw().write_all(&palette.toRGB()).unwrap();
			ExitCode::SUCCESS
		}
		Err(err) => {
			eprintln!("{err}");
			ExitCode::FAILURE
		}
	}
}
