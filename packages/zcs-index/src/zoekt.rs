use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};
use zcs_domain::{
	page::RESULT_CEILING,
	query::{ProjectScope, SearchQuery, SortOrder},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchPayload {
	pub q: String,
	pub opts: SearchOptions,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub repo_ids: Option<Vec<i64>>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub forward_to: Vec<ForwardTarget>,
}
impl SearchPayload {
	/// The match budget is always [`RESULT_CEILING`] so pages can be cut locally.
	pub fn new(query: &SearchQuery, context_lines: u32) -> Self {
		let repo_ids = match query.scope() {
			ProjectScope::Any => None,
			ProjectScope::Only(ids) => Some(ids.clone()),
		};

		Self {
			q: query.zoekt_query(),
			opts: SearchOptions {
				total_max_match_count: RESULT_CEILING,
				num_context_lines: context_lines,
				use_document_ranks: query.sort() == SortOrder::DocumentRank,
			},
			repo_ids,
			forward_to: Vec::new(),
		}
	}

	pub fn forward_to(mut self, endpoints: impl IntoIterator<Item = String>) -> Self {
		self.forward_to = endpoints.into_iter().map(|endpoint| ForwardTarget { endpoint }).collect();

		self
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchOptions {
	pub total_max_match_count: u64,
	pub num_context_lines: u32,
	pub use_document_ranks: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForwardTarget {
	pub endpoint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResponse {
	#[serde(default)]
	pub error: Option<String>,
	#[serde(default)]
	pub result: Option<SearchResult>,
}
impl SearchResponse {
	/// The upstream error, verbatim, when the response carries one.
	pub fn error_message(&self) -> Option<&str> {
		self.error.as_deref().filter(|message| !message.is_empty())
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResult {
	#[serde(default)]
	pub match_count: u64,
	#[serde(default, deserialize_with = "null_as_empty")]
	pub files: Vec<FileMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileMatch {
	#[serde(deserialize_with = "repository_id")]
	pub repository: i64,
	pub file_name: String,
	#[serde(default, deserialize_with = "null_as_empty")]
	pub line_matches: Vec<LineMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineMatch {
	pub line_number: i64,
	pub line: String,
	#[serde(default)]
	pub before: Option<String>,
	#[serde(default)]
	pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexPayload {
	pub repo_id: i64,
	pub gitaly_connection_info: GitalyConnectionInfo,
	pub file_size_limit: u64,
	pub timeout: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GitalyConnectionInfo {
	pub address: String,
	pub storage: String,
	pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepositoryId {
	Number(i64),
	Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IndexResponse {
	#[serde(default)]
	error: Option<String>,
}

pub struct ZoektClient {
	http: Client,
	headers: HeaderMap,
}
impl ZoektClient {
	pub fn new(cfg: &zcs_config::Zoekt) -> Result<Self> {
		let http = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::default_headers(&cfg.default_headers)?;

		Ok(Self { http, headers })
	}

	/// Issues exactly one search request. Retries are left to the caller's transport policy.
	pub async fn search(&self, url: &str, payload: &SearchPayload) -> Result<SearchResponse> {
		let res = self.http.post(url).headers(self.headers.clone()).json(payload).send().await?;
		let status = res.status();
		let body = res.text().await?;

		if status.is_success() {
			return Ok(serde_json::from_str(&body)?);
		}

		// Zoekt answers query syntax errors with a non-2xx status and an `Error` body.
		if let Ok(parsed) = serde_json::from_str::<SearchResponse>(&body)
			&& parsed.error_message().is_some()
		{
			return Ok(parsed);
		}

		Err(Error::Remote { status: status.as_u16(), message: crate::truncate_body(&body) })
	}

	pub async fn index_repository(&self, url: &str, payload: &IndexPayload) -> Result<()> {
		let res = self.http.post(url).headers(self.headers.clone()).json(payload).send().await?;
		let status = res.status();
		let body = res.text().await?;

		if !status.is_success() {
			return Err(Error::Remote { status: status.as_u16(), message: crate::truncate_body(&body) });
		}
		if body.trim().is_empty() {
			return Ok(());
		}

		let parsed: IndexResponse = serde_json::from_str(&body)?;

		match parsed.error.filter(|message| !message.is_empty()) {
			Some(message) => Err(Error::InvalidResponse { message }),
			None => Ok(()),
		}
	}
}

pub fn join_url(base: &str, path: &str) -> String {
	format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn repository_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	match RepositoryId::deserialize(deserializer)? {
		RepositoryId::Number(id) => Ok(id),
		RepositoryId::Text(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use zcs_domain::query::{SearchFilters, SearchQueryInput};

	fn query(scope: ProjectScope) -> SearchQuery {
		SearchQuery::new(
			SearchQueryInput {
				query: "needle".to_string(),
				scope,
				node_id: None,
				page: 1,
				per_page: 20,
				sort: SortOrder::Relevance,
				filters: SearchFilters::default(),
			},
			100,
		)
		.expect("Query must be valid.")
	}

	#[test]
	fn payload_requests_the_ceiling_regardless_of_page_size() {
		let payload = SearchPayload::new(&query(ProjectScope::Only(vec![4, 2])), 1);
		let json = serde_json::to_value(&payload).expect("Payload must encode.");

		assert_eq!(json["Q"], "needle");
		assert_eq!(json["Opts"]["TotalMaxMatchCount"], 5_000);
		assert_eq!(json["Opts"]["NumContextLines"], 1);
		assert_eq!(json["RepoIds"], serde_json::json!([2, 4]));
		assert!(json.get("ForwardTo").is_none());
	}

	#[test]
	fn global_scope_omits_repo_ids() {
		let payload = SearchPayload::new(&query(ProjectScope::Any), 1)
			.forward_to(["http://node-1:6070".to_string()]);
		let json = serde_json::to_value(&payload).expect("Payload must encode.");

		assert!(json.get("RepoIds").is_none());
		assert_eq!(json["ForwardTo"][0]["Endpoint"], "http://node-1:6070");
	}

	#[test]
	fn parses_error_and_result_shapes() {
		let error: SearchResponse =
			serde_json::from_str(r#"{"Error":"parse error at 3"}"#).expect("Error must parse.");

		assert_eq!(error.error_message(), Some("parse error at 3"));
		assert!(error.result.is_none());

		let result: SearchResponse = serde_json::from_str(
			r#"{"Result":{"MatchCount":2,"Files":[{"Repository":"17","FileName":"a.rb","LineMatches":[{"LineNumber":3,"Line":"eA==","Before":null}]}]}}"#,
		)
		.expect("Result must parse.");
		let result = result.result.expect("Result must be present.");

		assert_eq!(result.match_count, 2);
		assert_eq!(result.files[0].repository, 17);
		assert!(result.files[0].line_matches[0].before.is_none());
		assert!(result.files[0].line_matches[0].after.is_none());
	}

	#[test]
	fn null_files_mean_no_matches() {
		let response: SearchResponse =
			serde_json::from_str(r#"{"Result":{"MatchCount":0,"Files":null}}"#)
				.expect("Result must parse.");

		assert!(response.result.expect("Result must be present.").files.is_empty());
	}

	#[test]
	fn joins_urls_without_double_slashes() {
		assert_eq!(join_url("http://zoekt:6070/", "/api/search"), "http://zoekt:6070/api/search");
	}
}
