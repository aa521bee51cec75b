use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result, ZcsService, reconcile};
use zcs_domain::{
	blob::FoundBlob,
	page::PageWindow,
	query::{ProjectScope, SearchFilters, SearchQuery, SearchQueryInput, SortOrder},
};
use zcs_index::{
	decode,
	zoekt::{self, SearchPayload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
	/// Post straight to the node that owns the data.
	Direct,
	/// Post to the proxy and let it fan out to the listed nodes.
	Proxy,
}
impl SearchStrategy {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"direct" => Some(Self::Direct),
			"proxy" => Some(Self::Proxy),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoute {
	pub url: String,
	pub forward_to: Vec<String>,
}
impl SearchRoute {
	/// `node_url` is the search base URL of the requested node, if any. `fleet` lists every
	/// node's search base URL and is only consulted for proxy searches without a node.
	pub fn plan(
		strategy: SearchStrategy,
		cfg: &zcs_config::Zoekt,
		node_url: Option<&str>,
		fleet: Vec<String>,
	) -> Result<Self> {
		match strategy {
			SearchStrategy::Direct => {
				let base = node_url.unwrap_or(&cfg.default_search_url);

				Ok(Self { url: zoekt::join_url(base, &cfg.search_path), forward_to: Vec::new() })
			},
			SearchStrategy::Proxy => {
				let proxy = cfg.proxy_url.as_deref().ok_or_else(|| Error::InvalidRequest {
					message: "zoekt.proxy_url is required for proxy searches.".to_string(),
				})?;
				let forward_to = match node_url {
					Some(url) => vec![url.to_string()],
					None if fleet.is_empty() => vec![cfg.default_search_url.clone()],
					None => fleet,
				};

				Ok(Self { url: zoekt::join_url(proxy, &cfg.proxy_path), forward_to })
			},
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchBlobsRequest {
	pub query: String,
	/// Absent means every project. An explicit empty list is rejected.
	pub project_ids: Option<Vec<i64>>,
	pub node_id: Option<i64>,
	pub page: Option<u32>,
	pub per_page: Option<u32>,
	#[serde(default)]
	pub sort: SortOrder,
	#[serde(default)]
	pub languages: Vec<String>,
	pub file: Option<String>,
	#[serde(default)]
	pub preload_routes: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlobItem {
	pub path: String,
	pub basename: String,
	#[serde(rename = "ref")]
	pub ref_name: Option<String>,
	pub start_line: i64,
	pub highlight_line: i64,
	pub data: String,
	pub project_id: i64,
	pub project_path: Option<String>,
}
impl From<FoundBlob> for BlobItem {
	fn from(blob: FoundBlob) -> Self {
		let project_path = blob.project().and_then(|project| project.full_path.clone());

		Self {
			path: blob.path,
			basename: blob.basename,
			ref_name: blob.ref_name,
			start_line: blob.start_line,
			highlight_line: blob.highlight_line,
			data: blob.data,
			project_id: blob.project_id,
			project_path,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchBlobsResponse {
	pub blobs: Vec<BlobItem>,
	pub page: u32,
	pub per_page: u32,
	pub offset: u64,
	pub limit: u32,
	pub total_count: u64,
	pub formatted_total_count: String,
	pub total_pages: u64,
	pub error: Option<String>,
}
impl SearchBlobsResponse {
	fn from_window(blobs: Vec<BlobItem>, window: PageWindow, error: Option<String>) -> Self {
		Self {
			blobs,
			page: window.page(),
			per_page: window.per_page(),
			offset: window.offset(),
			limit: window.limit(),
			total_count: window.total_count(),
			formatted_total_count: window.formatted_total(),
			total_pages: window.total_pages(),
			error,
		}
	}

	fn failed(window: PageWindow, message: String) -> Self {
		Self::from_window(Vec::new(), window, Some(message))
	}
}

impl ZcsService {
	/// Searches blobs and returns one authorized page.
	///
	/// Only an invalid request is an `Err`. Upstream failures come back as an empty page with
	/// `error` set.
	pub async fn search_blobs(&self, req: SearchBlobsRequest) -> Result<SearchBlobsResponse> {
		let query = SearchQuery::new(
			SearchQueryInput {
				query: req.query,
				scope: match req.project_ids {
					Some(ids) => ProjectScope::Only(ids),
					None => ProjectScope::Any,
				},
				node_id: req.node_id,
				page: req.page.unwrap_or(1),
				per_page: req.per_page.unwrap_or(self.cfg.search.default_per_page),
				sort: req.sort,
				filters: SearchFilters { languages: req.languages, file: req.file },
			},
			self.cfg.search.max_per_page,
		)?;
		let empty = PageWindow::new(query.page(), query.per_page());
		let payload = SearchPayload::new(&query, self.cfg.search.context_lines);
		let response = match self.providers.search.search(&query, payload).await {
			Ok(response) => response,
			Err(err) => {
				warn!(error = %err, "Zoekt search failed.");

				return Ok(SearchBlobsResponse::failed(empty, err.to_string()));
			},
		};

		if let Some(message) = response.error_message() {
			warn!(error = %message, "Zoekt rejected the search.");

			return Ok(SearchBlobsResponse::failed(empty, message.to_string()));
		}

		let result = response.result.unwrap_or_default();
		let window = empty.with_server_total(result.match_count);
		let matches = match decode::decode_window(&result, window.offset(), window.limit()) {
			Ok(matches) => matches,
			Err(err) => {
				warn!(error = %err, "Failed to decode Zoekt matches.");

				return Ok(SearchBlobsResponse::failed(empty, err.to_string()));
			},
		};
		let reconciled = reconcile::reconcile_page(
			self.providers.projects.as_ref(),
			matches,
			window,
			req.preload_routes,
		)
		.await?;

		Ok(SearchBlobsResponse::from_window(
			reconciled.blobs.into_iter().map(BlobItem::from).collect(),
			reconciled.window,
			None,
		))
	}
}
