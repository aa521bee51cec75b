pub mod cluster;
pub mod decode;
pub mod zoekt;

mod error;

pub use error::{Error, Result};

use reqwest::header::{HeaderMap, HeaderName};
use serde_json::{Map, Value};

const MAX_ERROR_BODY_CHARS: usize = 512;

pub fn default_headers(default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

fn truncate_body(body: &str) -> String {
	let trimmed = body.trim();

	if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
		return trimmed.to_string();
	}

	let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();

	out.push_str("...");

	out
}
