use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryReject {
	EmptyQuery,
	EmptyProjectScope,
	InvalidPage,
	InvalidPerPage,
	PerPageTooLarge,
}
impl QueryReject {
	pub fn message(self) -> &'static str {
		match self {
			Self::EmptyQuery => "Search query must be non-empty.",
			Self::EmptyProjectScope => "Not possible to search without at least one project.",
			Self::InvalidPage => "Page must be at least 1.",
			Self::InvalidPerPage => "Per page must be greater than zero.",
			Self::PerPageTooLarge => "Per page exceeds the configured maximum.",
		}
	}
}

/// Which repositories a search may match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
	Any,
	Only(Vec<i64>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	#[default]
	Relevance,
	DocumentRank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
	pub languages: Vec<String>,
	pub file: Option<String>,
}

pub struct SearchQueryInput {
	pub query: String,
	pub scope: ProjectScope,
	pub node_id: Option<i64>,
	pub page: u32,
	pub per_page: u32,
	pub sort: SortOrder,
	pub filters: SearchFilters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
	query: String,
	scope: ProjectScope,
	node_id: Option<i64>,
	page: u32,
	per_page: u32,
	sort: SortOrder,
	filters: SearchFilters,
}
impl SearchQuery {
	pub fn new(input: SearchQueryInput, max_per_page: u32) -> Result<Self, QueryReject> {
		let query = input.query.trim().to_string();

		if query.is_empty() {
			return Err(QueryReject::EmptyQuery);
		}
		if matches!(&input.scope, ProjectScope::Only(ids) if ids.is_empty()) {
			return Err(QueryReject::EmptyProjectScope);
		}
		if input.page == 0 {
			return Err(QueryReject::InvalidPage);
		}
		if input.per_page == 0 {
			return Err(QueryReject::InvalidPerPage);
		}
		if input.per_page > max_per_page {
			return Err(QueryReject::PerPageTooLarge);
		}

		let scope = match input.scope {
			ProjectScope::Only(mut ids) => {
				ids.sort_unstable();
				ids.dedup();

				ProjectScope::Only(ids)
			},
			ProjectScope::Any => ProjectScope::Any,
		};
		let filters = SearchFilters {
			languages: input
				.filters
				.languages
				.into_iter()
				.map(|lang| lang.trim().to_string())
				.filter(|lang| !lang.is_empty())
				.collect(),
			file: input.filters.file.filter(|file| !file.trim().is_empty()),
		};

		Ok(Self {
			query,
			scope,
			node_id: input.node_id,
			page: input.page,
			per_page: input.per_page,
			sort: input.sort,
			filters,
		})
	}

	pub fn query(&self) -> &str {
		&self.query
	}

	pub fn scope(&self) -> &ProjectScope {
		&self.scope
	}

	pub fn node_id(&self) -> Option<i64> {
		self.node_id
	}

	pub fn page(&self) -> u32 {
		self.page
	}

	pub fn per_page(&self) -> u32 {
		self.per_page
	}

	pub fn sort(&self) -> SortOrder {
		self.sort
	}

	pub fn filters(&self) -> &SearchFilters {
		&self.filters
	}

	pub fn offset(&self) -> u64 {
		(u64::from(self.page) - 1) * u64::from(self.per_page)
	}

	/// Query text in Zoekt syntax with the language and file filters appended.
	pub fn zoekt_query(&self) -> String {
		let mut parts = Vec::with_capacity(3);

		if self.filters.languages.is_empty() && self.filters.file.is_none() {
			return self.query.clone();
		}

		parts.push(format!("({})", self.query));

		match self.filters.languages.as_slice() {
			[] => {},
			[lang] => parts.push(format!("lang:{lang}")),
			langs => {
				let atoms: Vec<String> = langs.iter().map(|lang| format!("lang:{lang}")).collect();

				parts.push(format!("({})", atoms.join(" or ")));
			},
		}

		if let Some(file) = self.filters.file.as_ref() {
			parts.push(format!("file:{file}"));
		}

		parts.join(" ")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input(query: &str) -> SearchQueryInput {
		SearchQueryInput {
			query: query.to_string(),
			scope: ProjectScope::Any,
			node_id: None,
			page: 1,
			per_page: 20,
			sort: SortOrder::Relevance,
			filters: SearchFilters::default(),
		}
	}

	#[test]
	fn offset_follows_page_and_per_page() {
		let mut raw = input("needle");

		raw.page = 3;
		raw.per_page = 25;

		let query = SearchQuery::new(raw, 100).expect("Query must be valid.");

		assert_eq!(query.offset(), 50);
	}

	#[test]
	fn project_ids_are_sorted_and_deduplicated() {
		let mut raw = input("needle");

		raw.scope = ProjectScope::Only(vec![9, 3, 9, 1]);

		let query = SearchQuery::new(raw, 100).expect("Query must be valid.");

		assert_eq!(query.scope(), &ProjectScope::Only(vec![1, 3, 9]));
	}

	#[test]
	fn filters_are_appended_in_zoekt_syntax() {
		let mut raw = input("fn main");

		raw.filters =
			SearchFilters { languages: vec!["rust".to_string()], file: Some("src/".to_string()) };

		let query = SearchQuery::new(raw, 100).expect("Query must be valid.");

		assert_eq!(query.zoekt_query(), "(fn main) lang:rust file:src/");

		let mut raw = input("fn main");

		raw.filters = SearchFilters {
			languages: vec!["rust".to_string(), " ".to_string(), "go".to_string()],
			file: None,
		};

		let query = SearchQuery::new(raw, 100).expect("Query must be valid.");

		assert_eq!(query.zoekt_query(), "(fn main) (lang:rust or lang:go)");
	}

	#[test]
	fn plain_query_is_passed_through() {
		let query = SearchQuery::new(input("  needle  "), 100).expect("Query must be valid.");

		assert_eq!(query.zoekt_query(), "needle");
	}
}
