use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	ReadConfig { path: PathBuf, source: io::Error },
	#[error("Failed to parse config file at {path:?}.")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	#[error("{key} is not a socket address: {value:?}.")]
	InvalidBind { key: &'static str, value: String },
	#[error("{key} must bind a loopback address, got {value:?}.")]
	PublicBind { key: &'static str, value: String },
	#[error("{message}")]
	Validation { message: String },
}
