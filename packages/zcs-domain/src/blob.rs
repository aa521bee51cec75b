use serde::Serialize;

/// One matched line with its optional single-line context, already base64-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFragments {
	pub before: Option<Vec<u8>>,
	pub line: Vec<u8>,
	pub after: Option<Vec<u8>>,
}
impl LineFragments {
	/// Joins present fragments with `\n`. Absent or empty context never yields a blank line.
	pub fn join(&self) -> String {
		let mut parts: Vec<&[u8]> = Vec::with_capacity(3);

		if let Some(before) = self.before.as_deref().filter(|bytes| !bytes.is_empty()) {
			parts.push(before);
		}

		parts.push(&self.line);

		if let Some(after) = self.after.as_deref().filter(|bytes| !bytes.is_empty()) {
			parts.push(after);
		}

		let joined = parts.join(&b'\n');

		String::from_utf8_lossy(&joined).into_owned()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMatch {
	pub project_id: i64,
	pub path: String,
	/// 1-based, as reported upstream.
	pub line_number: i64,
	pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
	pub id: i64,
	pub full_path: Option<String>,
	pub default_branch: Option<String>,
	pub pending_delete: bool,
}
impl ProjectRef {
	pub fn is_searchable(&self) -> bool {
		!self.pending_delete
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundBlob {
	pub path: String,
	pub basename: String,
	pub ref_name: Option<String>,
	pub start_line: i64,
	pub highlight_line: i64,
	pub data: String,
	pub project_id: i64,
	project: Option<ProjectRef>,
}
impl FoundBlob {
	pub fn from_match(decoded: DecodedMatch) -> Self {
		Self {
			basename: basename(&decoded.path),
			start_line: (decoded.line_number - 1).max(0),
			highlight_line: decoded.line_number,
			path: decoded.path,
			ref_name: None,
			data: decoded.content,
			project_id: decoded.project_id,
			project: None,
		}
	}

	pub fn project(&self) -> Option<&ProjectRef> {
		self.project.as_ref()
	}

	pub fn attach_project(&mut self, project: ProjectRef) {
		if self.ref_name.is_none() {
			self.ref_name = project.default_branch.clone();
		}

		self.project = Some(project);
	}
}

/// Path with the final extension removed; directories are kept.
pub fn basename(path: &str) -> String {
	let file_start = path.rfind('/').map(|idx| idx + 1).unwrap_or(0);
	let file_name = &path[file_start..];

	match file_name.rfind('.') {
		Some(dot) if dot > 0 => path[..file_start + dot].to_string(),
		_ => path.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn join_skips_absent_context() {
		let first_line =
			LineFragments { before: None, line: b"fn main() {".to_vec(), after: Some(b"}".to_vec()) };

		assert_eq!(first_line.join(), "fn main() {\n}");

		let last_line =
			LineFragments { before: Some(b"let x = 1;".to_vec()), line: b"}".to_vec(), after: None };

		assert_eq!(last_line.join(), "let x = 1;\n}");

		let only_line = LineFragments { before: Some(Vec::new()), line: b"x".to_vec(), after: None };

		assert_eq!(only_line.join(), "x");
	}

	#[test]
	fn basename_strips_only_the_extension() {
		assert_eq!(basename("app/models/user.rb"), "app/models/user");
		assert_eq!(basename("Makefile"), "Makefile");
		assert_eq!(basename("config/.env"), "config/.env");
		assert_eq!(basename("lib.tar.gz"), "lib.tar");
	}

	#[test]
	fn start_line_is_clamped_to_zero() {
		let blob = FoundBlob::from_match(DecodedMatch {
			project_id: 1,
			path: "README.md".to_string(),
			line_number: 1,
			content: "# Title".to_string(),
		});

		assert_eq!(blob.start_line, 0);
		assert_eq!(blob.highlight_line, 1);
		assert_eq!(blob.basename, "README");
	}
}
