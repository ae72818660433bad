#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

pub mod bmp;
pub mod config;
pub mod palette;
pub mod patch;
pub mod pig;
pub mod reconcile;
pub mod rle;
pub mod session;

pub const PAL_ENTRIES: usize = u8::MAX as usize + 1;
pub const RGB_SIZE: usize = 3;
pub const PAL_LEN: usize = PAL_ENTRIES * RGB_SIZE;

use {
	glam::IVec3,
	serde::ser,
	std::{
		fs::File,
		io::{self, Read},
	},
};

pub trait DotExt {
	fn lengthSquared(self) -> i32;
}
impl DotExt for IVec3 {
	#[inline(always)]
	fn lengthSquared(self) -> i32 {
		self.dot(self)
	}
}

pub fn io_readToVec(mut reader: impl Read) -> io::Result<Vec<u8>> {
	let mut vec = Vec::new();
	reader.read_to_end(&mut vec)?;
	Ok(vec)
}

pub fn toml_toStringPretty<T: ?Sized + ser::Serialize>(value: &T) -> Result<String, toml::ser::Error> {
	let mut string = String::with_capacity(128);
	value.serialize((&mut toml::ser::Serializer::pretty(&mut string)).pretty_array(false))?;
	Ok(string)
}

#[cfg(unix)]
pub fn stdoutRaw() -> File {
	use std::os::unix::io::FromRawFd;
	unsafe { File::from_raw_fd(1) }
}

#[cfg(windows)]
pub fn stdoutRaw() -> File {
	use std::os::windows::io::{AsRawHandle, FromRawHandle};
	unsafe { File::from_raw_handle(io::stdout().as_raw_handle()) }
}
