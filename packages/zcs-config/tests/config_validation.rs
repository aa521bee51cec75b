use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::{Table, Value};

use zcs_config::Config;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_table() -> Table {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn section<'a>(root: &'a mut Table, name: &str) -> &'a mut Table {
	root.get_mut(name)
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Template config must include [{name}]."))
}

fn write_temp_config(table: &Table) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("zcs_config_test_{nanos}_{pid}_{ordinal}.toml"));

	let payload = toml::to_string(table).expect("Failed to render template config.");

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_table(table: &Table) -> zcs_config::Result<Config> {
	let path = write_temp_config(table);
	let result = zcs_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn assert_validation(table: &Table, expected: &str) {
	let err = load_table(table).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn sample_config_is_valid_and_normalized() {
	let cfg = load_table(&sample_table()).expect("Sample config must load.");

	assert_eq!(cfg.zoekt.default_search_url, "http://127.0.0.1:6070");
	assert_eq!(cfg.zoekt.search_path, "/api/search");
	assert_eq!(cfg.zoekt.index_path, "/indexer/index");
	assert_eq!(cfg.cluster.alias, "gitlab-production");
	assert_eq!(cfg.security.admin_auth_token.as_deref(), Some("admin-secret"));
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let mut table = sample_table();

	table.remove("search");
	table.remove("migrations");
	table.remove("indexing");

	let cfg = load_table(&table).expect("Config without optional sections must load.");

	assert_eq!(cfg.search.strategy, "direct");
	assert_eq!(cfg.search.default_per_page, 20);
	assert_eq!(cfg.migrations.lock_retries, 10);
	assert_eq!(cfg.migrations.lock_sleep_ms, 1_000);
	assert_eq!(cfg.indexing.poll_interval_ms, 500);
}

#[test]
fn search_strategy_must_be_known() {
	let mut table = sample_table();

	section(&mut table, "search").insert("strategy".to_string(), Value::from("fanout"));

	assert_validation(&table, "search.strategy must be one of direct or proxy.");
}

#[test]
fn proxy_strategy_requires_proxy_url() {
	let mut table = sample_table();

	section(&mut table, "search").insert("strategy".to_string(), Value::from("proxy"));
	section(&mut table, "zoekt").insert("proxy_url".to_string(), Value::from("   "));

	assert_validation(&table, "zoekt.proxy_url must be set when search.strategy is proxy.");
}

#[test]
fn default_per_page_cannot_exceed_max() {
	let mut table = sample_table();

	section(&mut table, "search").insert("default_per_page".to_string(), Value::from(500));

	assert_validation(&table, "search.default_per_page must be in the range");
}

#[test]
fn blank_admin_token_is_rejected() {
	let mut table = sample_table();

	section(&mut table, "security").insert("admin_auth_token".to_string(), Value::from(" "));

	assert_validation(&table, "security.admin_auth_token must be non-empty.");
}

#[test]
fn lock_ttl_must_leave_room_for_renewal() {
	let mut table = sample_table();

	section(&mut table, "migrations").insert("lock_ttl_secs".to_string(), Value::from(1));

	assert_validation(&table, "migrations.lock_ttl_secs must be at least 3.");
}

#[test]
fn default_headers_must_be_strings() {
	let mut table = sample_table();
	let headers = section(&mut table, "zoekt")
		.get_mut("default_headers")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [zoekt.default_headers].");

	headers.insert("X-Retry".to_string(), Value::from(3));

	assert_validation(&table, "zoekt.default_headers values must be strings.");
}

#[test]
fn cluster_alias_must_be_non_empty() {
	let mut table = sample_table();

	section(&mut table, "cluster").insert("alias".to_string(), Value::from(""));

	assert_validation(&table, "cluster.alias must be non-empty.");
}

#[test]
fn admin_bind_must_stay_on_loopback() {
	let mut table = sample_table();

	section(&mut table, "service").insert("admin_bind".to_string(), Value::from("0.0.0.0:8091"));

	let err = load_table(&table).expect_err("Expected validation error.");

	assert!(matches!(err, zcs_config::Error::PublicBind { key: "service.admin_bind", .. }));
}

#[test]
fn public_http_bind_follows_the_localhost_switch() {
	let mut table = sample_table();

	section(&mut table, "service").insert("http_bind".to_string(), Value::from("0.0.0.0:8090"));

	assert_validation(&table, "service.http_bind must bind a loopback address");

	section(&mut table, "security").insert("bind_localhost_only".to_string(), Value::from(false));

	assert!(load_table(&table).is_ok());
}

#[test]
fn bind_must_be_a_socket_address() {
	let mut table = sample_table();

	section(&mut table, "service").insert("http_bind".to_string(), Value::from("localhost"));

	assert_validation(&table, "service.http_bind is not a socket address");
}
