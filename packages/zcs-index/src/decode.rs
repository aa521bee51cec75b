use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{
	Error, Result,
	zoekt::{LineMatch, SearchResult},
};
use zcs_domain::blob::{DecodedMatch, LineFragments};

/// Flattens file matches into at most `per_page` decoded matches after skipping `offset`.
///
/// The walk stops as soon as the window is full, so fragments outside it are never decoded.
pub fn decode_window(result: &SearchResult, offset: u64, per_page: u32) -> Result<Vec<DecodedMatch>> {
	let end = offset + u64::from(per_page);
	let mut out = Vec::with_capacity(per_page as usize);
	let mut i = 0_u64;

	'files: for file in &result.files {
		for line_match in &file.line_matches {
			i += 1;

			if i <= offset {
				continue;
			}
			if i > end {
				break 'files;
			}

			let fragments = decode_fragments(line_match)?;

			out.push(DecodedMatch {
				project_id: file.repository,
				path: file.file_name.clone(),
				line_number: line_match.line_number,
				content: fragments.join(),
			});
		}
	}

	Ok(out)
}

pub fn decode_fragments(line_match: &LineMatch) -> Result<LineFragments> {
	Ok(LineFragments {
		before: decode_optional(line_match.before.as_deref())?,
		line: decode(&line_match.line)?,
		after: decode_optional(line_match.after.as_deref())?,
	})
}

fn decode_optional(raw: Option<&str>) -> Result<Option<Vec<u8>>> {
	match raw {
		Some(raw) if !raw.is_empty() => decode(raw).map(Some),
		_ => Ok(None),
	}
}

fn decode(raw: &str) -> Result<Vec<u8>> {
	STANDARD.decode(raw).map_err(|err| Error::Decode { message: err.to_string() })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::zoekt::FileMatch;

	fn encode(text: &str) -> String {
		STANDARD.encode(text)
	}

	fn file(repository: i64, name: &str, lines: usize) -> FileMatch {
		FileMatch {
			repository,
			file_name: name.to_string(),
			line_matches: (1..=lines)
				.map(|n| LineMatch {
					line_number: n as i64,
					line: encode(&format!("{name}:{n}")),
					before: None,
					after: None,
				})
				.collect(),
		}
	}

	fn result(sizes: &[usize]) -> SearchResult {
		SearchResult {
			match_count: sizes.iter().sum::<usize>() as u64,
			files: sizes.iter().enumerate().map(|(idx, n)| file(idx as i64 + 1, &format!("f{idx}"), *n)).collect(),
		}
	}

	#[test]
	fn first_page_spans_files_in_upstream_order() {
		let decoded = decode_window(&result(&[3, 4]), 0, 5).expect("Window must decode.");
		let contents: Vec<&str> = decoded.iter().map(|m| m.content.as_str()).collect();

		assert_eq!(contents, ["f0:1", "f0:2", "f0:3", "f1:1", "f1:2"]);
		assert_eq!(decoded[3].project_id, 2);
	}

	#[test]
	fn window_length_matches_the_offset_formula() {
		for n in [0_usize, 1, 4, 7, 12] {
			for offset in [0_u64, 1, 3, 7, 20] {
				for per_page in [1_u32, 2, 5, 10] {
					let decoded = decode_window(&result(&[n / 2, n - n / 2]), offset, per_page)
						.expect("Window must decode.");
					let expected = (n as u64).saturating_sub(offset).min(u64::from(per_page));

					assert_eq!(decoded.len() as u64, expected, "n={n} offset={offset} per_page={per_page}");

					if let Some(first) = decoded.first() {
						let index = offset as usize;
						let (file_idx, line) = if index < n / 2 { (0, index + 1) } else { (1, index - n / 2 + 1) };

						assert_eq!(first.content, format!("f{file_idx}:{line}"));
					}
				}
			}
		}
	}

	#[test]
	fn fragments_outside_the_window_are_not_decoded() {
		let mut raw = result(&[2]);

		raw.files[0].line_matches[1].line = "not base64!".to_string();

		assert_eq!(decode_window(&raw, 0, 1).expect("Window must decode.").len(), 1);
		assert!(matches!(decode_window(&raw, 0, 2), Err(Error::Decode { .. })));
	}

	#[test]
	fn context_lines_are_joined_without_blanks() {
		let line_match = LineMatch {
			line_number: 1,
			line: encode("fn main() {"),
			before: Some(String::new()),
			after: Some(encode("}")),
		};

		assert_eq!(decode_fragments(&line_match).expect("Fragments must decode.").join(), "fn main() {\n}");
	}
}
