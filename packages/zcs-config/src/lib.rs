mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cluster, Config, Indexing, Migrations, Postgres, Search, Security, Service, Storage, Zoekt,
};

use std::{fs, net::SocketAddr, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("zoekt.default_search_url", &cfg.zoekt.default_search_url),
		("cluster.url", &cfg.cluster.url),
		("cluster.alias", &cfg.cluster.alias),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	check_bind("service.admin_bind", &cfg.service.admin_bind, true)?;
	check_bind("service.http_bind", &cfg.service.http_bind, cfg.security.bind_localhost_only)?;

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.zoekt.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "zoekt.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.cluster.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "cluster.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.search.strategy.as_str(), "direct" | "proxy") {
		return Err(Error::Validation {
			message: "search.strategy must be one of direct or proxy.".to_string(),
		});
	}
	if cfg.search.strategy == "proxy" && cfg.zoekt.proxy_url.is_none() {
		return Err(Error::Validation {
			message: "zoekt.proxy_url must be set when search.strategy is proxy.".to_string(),
		});
	}
	if cfg.search.max_per_page == 0 {
		return Err(Error::Validation {
			message: "search.max_per_page must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_per_page == 0 || cfg.search.default_per_page > cfg.search.max_per_page {
		return Err(Error::Validation {
			message: "search.default_per_page must be in the range 1-search.max_per_page."
				.to_string(),
		});
	}
	if cfg.migrations.tick_interval_secs == 0 {
		return Err(Error::Validation {
			message: "migrations.tick_interval_secs must be greater than zero.".to_string(),
		});
	}
	// Renewal runs at a third of the TTL, so anything shorter cannot be renewed in time.
	if cfg.migrations.lock_ttl_secs < 3 {
		return Err(Error::Validation {
			message: "migrations.lock_ttl_secs must be at least 3.".to_string(),
		});
	}
	if cfg.indexing.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "indexing.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.claim_lease_secs <= 0 {
		return Err(Error::Validation {
			message: "indexing.claim_lease_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.security.admin_auth_token.is_none() {
		return Err(Error::Validation {
			message: "security.admin_auth_token must be non-empty.".to_string(),
		});
	}

	for (label, headers) in
		[("zoekt", &cfg.zoekt.default_headers), ("cluster", &cfg.cluster.default_headers)]
	{
		if headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation {
				message: format!("{label}.default_headers values must be strings."),
			});
		}
	}

	Ok(())
}

fn check_bind(key: &'static str, value: &str, loopback_only: bool) -> Result<()> {
	let addr: SocketAddr =
		value.parse().map_err(|_| Error::InvalidBind { key, value: value.to_string() })?;

	if loopback_only && !addr.ip().is_loopback() {
		return Err(Error::PublicBind { key, value: value.to_string() });
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.zoekt.proxy_url.as_deref().map(|url| url.trim().is_empty()).unwrap_or(false) {
		cfg.zoekt.proxy_url = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}

	cfg.zoekt.default_search_url = cfg.zoekt.default_search_url.trim_end_matches('/').to_string();
	cfg.cluster.url = cfg.cluster.url.trim_end_matches('/').to_string();
}
