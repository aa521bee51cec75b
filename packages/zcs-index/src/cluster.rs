//! Thin client for the Elasticsearch/OpenSearch endpoints the worker and admin surface need.
//!
//! Writes that can run long (`_update_by_query`, `_reindex`) are always submitted with
//! `wait_for_completion=false` and tracked through [`ClusterClient::task_status`].

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, header::HeaderMap};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};
use zcs_domain::cluster::{ClusterVersion, HealthStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
	pub completed: bool,
	/// Failures reported by the finished task, rendered as JSON.
	pub failures: Vec<String>,
}

pub struct ClusterClient {
	http: Client,
	headers: HeaderMap,
	base_url: String,
	alias: String,
}
impl ClusterClient {
	pub fn new(cfg: &zcs_config::Cluster) -> Result<Self> {
		let http = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::default_headers(&cfg.default_headers)?;

		Ok(Self {
			http,
			headers,
			base_url: cfg.url.trim_end_matches('/').to_string(),
			alias: cfg.alias.clone(),
		})
	}

	pub fn alias(&self) -> &str {
		&self.alias
	}

	pub async fn version(&self) -> Result<ClusterVersion> {
		let json = self.send(self.request(Method::GET, "/")).await?;
		let version = json.get("version").ok_or_else(|| invalid("Root response is missing version."))?;
		let number = version
			.get("number")
			.and_then(Value::as_str)
			.ok_or_else(|| invalid("Root response is missing version.number."))?;
		let distribution = version.get("distribution").and_then(Value::as_str);

		Ok(ClusterVersion::new(distribution, number))
	}

	pub async fn health(&self) -> Result<HealthStatus> {
		let json = self.send(self.request(Method::GET, "/_cluster/health")).await?;
		let color = json
			.get("status")
			.and_then(Value::as_str)
			.ok_or_else(|| invalid("Cluster health response is missing status."))?;

		Ok(HealthStatus::from_color(color))
	}

	/// Free disk bytes across all data nodes.
	pub async fn free_bytes(&self) -> Result<u64> {
		let json = self.send(self.request(Method::GET, "/_cluster/stats")).await?;
		let fs = json
			.get("nodes")
			.and_then(|nodes| nodes.get("fs"))
			.ok_or_else(|| invalid("Cluster stats response is missing nodes.fs."))?;

		fs.get("available_in_bytes")
			.or_else(|| fs.get("free_in_bytes"))
			.and_then(Value::as_u64)
			.ok_or_else(|| invalid("Cluster stats response is missing free bytes."))
	}

	pub async fn alias_exists(&self, alias: &str) -> Result<bool> {
		let res = self
			.request(Method::HEAD, &format!("/_alias/{alias}"))
			.send()
			.await?;

		match res.status() {
			status if status.is_success() => Ok(true),
			StatusCode::NOT_FOUND => Ok(false),
			status => Err(Error::Remote { status: status.as_u16(), message: String::new() }),
		}
	}

	/// Concrete indices currently behind `alias`, sorted by name.
	pub async fn alias_targets(&self, alias: &str) -> Result<Vec<String>> {
		let json = self.send(self.request(Method::GET, &format!("/_alias/{alias}"))).await?;
		let mut targets: Vec<String> = json
			.as_object()
			.ok_or_else(|| invalid("Alias response must be an object."))?
			.keys()
			.cloned()
			.collect();

		targets.sort();

		Ok(targets)
	}

	pub async fn count(&self, index: &str, query: &Value) -> Result<u64> {
		let json = self
			.send(
				self.request(Method::POST, &format!("/{index}/_count"))
					.json(&serde_json::json!({ "query": query })),
			)
			.await?;

		json.get("count").and_then(Value::as_u64).ok_or_else(|| invalid("Count response is missing count."))
	}

	/// Starts an asynchronous update-by-query touching at most `max_docs` documents and returns
	/// the task id.
	pub async fn update_by_query(
		&self,
		index: &str,
		query: &Value,
		script: &Value,
		max_docs: u64,
	) -> Result<String> {
		let path = format!(
			"/{index}/_update_by_query?wait_for_completion=false&conflicts=proceed&max_docs={max_docs}"
		);
		let json = self
			.send(
				self.request(Method::POST, &path)
					.json(&serde_json::json!({ "query": query, "script": script })),
			)
			.await?;

		task_id(&json)
	}

	pub async fn reindex(&self, source: &str, dest: &str) -> Result<String> {
		let body = serde_json::json!({
			"source": { "index": source },
			"dest": { "index": dest },
		});
		let json = self
			.send(self.request(Method::POST, "/_reindex?wait_for_completion=false").json(&body))
			.await?;

		task_id(&json)
	}

	pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
		let json = self.send(self.request(Method::GET, &format!("/_tasks/{task_id}"))).await?;

		Ok(parse_task_status(&json))
	}

	/// Store size of `index` including replicas.
	pub async fn index_size_bytes(&self, index: &str) -> Result<u64> {
		let json = self.send(self.request(Method::GET, &format!("/{index}/_stats/store"))).await?;

		json.get("_all")
			.and_then(|all| all.get("total"))
			.and_then(|total| total.get("store"))
			.and_then(|store| store.get("size_in_bytes"))
			.and_then(Value::as_u64)
			.ok_or_else(|| invalid("Index stats response is missing store size."))
	}

	pub async fn index_exists(&self, index: &str) -> Result<bool> {
		let res = self.request(Method::HEAD, &format!("/{index}")).send().await?;

		match res.status() {
			status if status.is_success() => Ok(true),
			StatusCode::NOT_FOUND => Ok(false),
			status => Err(Error::Remote { status: status.as_u16(), message: String::new() }),
		}
	}

	pub async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
		self.send(self.request(Method::PUT, &format!("/{index}")).json(body)).await?;

		debug!(index, "Created index.");

		Ok(())
	}

	/// Points `alias` at `to` and away from every index in `from` in one atomic request.
	pub async fn switch_alias(&self, alias: &str, from: &[String], to: &str) -> Result<()> {
		let mut actions: Vec<Value> = from
			.iter()
			.filter(|index| index.as_str() != to)
			.map(|index| serde_json::json!({ "remove": { "index": index, "alias": alias } }))
			.collect();

		actions.push(serde_json::json!({ "add": { "index": to, "alias": alias } }));

		self.send(
			self.request(Method::POST, "/_aliases").json(&serde_json::json!({ "actions": actions })),
		)
		.await?;

		Ok(())
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.http
			.request(method, format!("{}{}", self.base_url, path))
			.headers(self.headers.clone())
	}

	async fn send(&self, req: RequestBuilder) -> Result<Value> {
		let res = req.send().await?;
		let status = res.status();
		let body = res.text().await?;

		if !status.is_success() {
			return Err(Error::Remote { status: status.as_u16(), message: crate::truncate_body(&body) });
		}

		Ok(serde_json::from_str(&body)?)
	}
}

pub fn parse_task_status(json: &Value) -> TaskStatus {
	let completed = json.get("completed").and_then(Value::as_bool).unwrap_or(false);
	let mut failures: Vec<String> = json
		.get("response")
		.and_then(|response| response.get("failures"))
		.and_then(Value::as_array)
		.map(|items| items.iter().map(Value::to_string).collect())
		.unwrap_or_default();

	if let Some(error) = json.get("error") {
		failures.push(error.to_string());
	}

	TaskStatus { completed, failures }
}

fn task_id(json: &Value) -> Result<String> {
	json.get("task")
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or_else(|| invalid("Task submission response is missing task."))
}

fn invalid(message: &str) -> Error {
	Error::InvalidResponse { message: message.to_string() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn task_status_collects_failures_and_errors() {
		let running = parse_task_status(&serde_json::json!({ "completed": false }));

		assert_eq!(running, TaskStatus { completed: false, failures: Vec::new() });

		let failed = parse_task_status(&serde_json::json!({
			"completed": true,
			"response": { "failures": [{ "cause": { "type": "version_conflict" } }] },
			"error": { "type": "task_cancelled" },
		}));

		assert!(failed.completed);
		assert_eq!(failed.failures.len(), 2);
		assert!(failed.failures[0].contains("version_conflict"));
	}
}
