#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	const_format::formatcp,
	pig_patcher::{
		config::{ConfigError, PatchConfig, DEFAULT_ARCHIVE, DEFAULT_OUTPUT, DEFAULT_PALETTE},
		session::{self, Request, Verdict},
	},
	std::{path::PathBuf, process::ExitCode},
	tracing_subscriber::EnvFilter,
};

const AFTER_HELP: &str = formatcp!(
	"Example: pig_patcher rock01.bmp door.bmp:door13#2\n\nThe palette and the pig default to {} and {}; the patched pig \
	 is written to {}, and only if every bitmap's colors exist in the pig palette.",
	DEFAULT_PALETTE,
	DEFAULT_ARCHIVE,
	DEFAULT_OUTPUT,
);

/// Replaces bitmaps inside a Descent 1 pig with 8-bit BMP artwork.
#[derive(Parser)]
#[clap(version, after_help = AFTER_HELP)]
struct Args {
	/// TOML file with any of the keys `palette`, `archive`, `output`, `snapTo6Bit`
	#[clap(long, value_name = "FILE", value_parser)]
	config: Option<PathBuf>,

	/// 768-byte palette with 6-bit channels
	#[clap(long, value_name = "FILE", value_parser)]
	palette: Option<PathBuf>,

	#[clap(long, value_name = "FILE", value_parser)]
	archive: Option<PathBuf>,

	#[clap(short, long, value_name = "FILE", value_parser)]
	output: Option<PathBuf>,

	/// Match bitmap colors as stored instead of snapping them to 6-bit values first
	#[clap(long)]
	noSnap: bool,

	/// Bitmaps to patch in, named after their file stem unless a pig name follows the last colon
	#[clap(value_name = "BITMAP[:NAME]", required = true, value_parser)]
	requests: Vec<Request>,
}

impl Args {
	fn patchConfig(&self) -> Result<PatchConfig, ConfigError> {
		let mut config = match &self.config {
			Some(path) => PatchConfig::load(path)?,
			None => PatchConfig::default(),
		};
		for (field, value) in [
			(&mut config.palette, &self.palette),
			(&mut config.archive, &self.archive),
			(&mut config.output, &self.output),
		] {
			if let Some(value) = value {
				field.clone_from(value);
			}
		}
		config.snapTo6Bit &= !self.noSnap;
		Ok(config)
	}
}

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_target(false)
		.without_time()
		.init();

	let args = Args::parse();
	let result = args.patchConfig().map_err(Into::into).and_then(|config| {
		tracing::debug!("{config:?}");
		session::run(&config, &args.requests)
	});
	match result {
		Ok(Verdict::CommitWrite) => ExitCode::SUCCESS,
		Ok(Verdict::AbortNoWrite) => ExitCode::FAILURE,
		Err(err) => {
			tracing::error!("{err}");
			tracing::error!("Aborted.");
			ExitCode::FAILURE
		}
	}
}
