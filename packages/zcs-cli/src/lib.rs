//! Command-line pieces shared by `zcs-api` and `zcs-worker`.

use std::path::PathBuf;

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};

pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"-",
	env!("VERGEN_GIT_SHA"),
	"-",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

/// The `-c/--config` flag. Both binaries read the same file.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
	#[arg(long = "config", short = 'c', value_name = "FILE")]
	pub path: PathBuf,
}
impl ConfigArgs {
	pub fn load(&self) -> zcs_config::Result<zcs_config::Config> {
		zcs_config::load(&self.path)
	}
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}
