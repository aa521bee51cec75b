use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub zoekt: Zoekt,
	#[serde(default)]
	pub search: Search,
	pub cluster: Cluster,
	#[serde(default)]
	pub migrations: Migrations,
	#[serde(default)]
	pub indexing: Indexing,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Zoekt {
	/// Search endpoint used when a request names no node.
	pub default_search_url: String,
	#[serde(default = "default_search_path")]
	pub search_path: String,
	#[serde(default = "default_index_path")]
	pub index_path: String,
	/// Required when `search.strategy` is `proxy`.
	pub proxy_url: Option<String>,
	#[serde(default = "default_proxy_path")]
	pub proxy_path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	/// One of `direct` or `proxy`.
	pub strategy: String,
	pub default_per_page: u32,
	pub max_per_page: u32,
	pub context_lines: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			strategy: "direct".to_string(),
			default_per_page: 20,
			max_per_page: 100,
			context_lines: 1,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
	pub url: String,
	/// Alias every migration and the health gate operate on.
	pub alias: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Migrations {
	pub enabled: bool,
	pub tick_interval_secs: u64,
	pub lock_ttl_secs: u64,
	pub lock_retries: u32,
	pub lock_sleep_ms: u64,
}
impl Default for Migrations {
	fn default() -> Self {
		Self {
			enabled: true,
			tick_interval_secs: 300,
			lock_ttl_secs: 600,
			lock_retries: 10,
			lock_sleep_ms: 1_000,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Indexing {
	pub poll_interval_ms: u64,
	pub claim_lease_secs: i64,
	pub file_size_limit_bytes: u64,
	pub timeout_secs: u64,
	pub gitaly_address: String,
}
impl Default for Indexing {
	fn default() -> Self {
		Self {
			poll_interval_ms: 500,
			claim_lease_secs: 60,
			file_size_limit_bytes: 1_048_576,
			timeout_secs: 5_400,
			gitaly_address: "unix:/var/opt/gitlab/gitaly/gitaly.socket".to_string(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub admin_auth_token: Option<String>,
}

fn default_search_path() -> String {
	"/api/search".to_string()
}

fn default_index_path() -> String {
	"/indexer/index".to_string()
}

fn default_proxy_path() -> String {
	"/webserver/api/search".to_string()
}
