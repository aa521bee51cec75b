use zcs_service::{Error, NamespaceAssignRequest, ZcsService};
use zcs_storage::{db::Db, settings};
use zcs_testkit::TestDatabase;

fn test_config(dsn: &str) -> zcs_config::Config {
	let raw = format!(
		r#"
[service]
http_bind = "127.0.0.1:0"
admin_bind = "127.0.0.1:0"
log_level = "info"

[storage.postgres]
dsn = "{dsn}"
pool_max_conns = 2

[zoekt]
default_search_url = "http://127.0.0.1:6070"
timeout_ms = 1000

[cluster]
url = "http://127.0.0.1:9200"
alias = "gitlab-production"
timeout_ms = 1000

[security]
bind_localhost_only = true
admin_auth_token = "secret"
"#
	);

	toml::from_str(&raw).expect("Config must parse.")
}

async fn setup(test_name: &str) -> Option<(TestDatabase, ZcsService)> {
	let Some(base_dsn) = zcs_testkit::env_dsn() else {
		eprintln!("Skipping {test_name}; set ZCS_PG_DSN to run this test.");

		return None;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = test_config(test_db.dsn());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	sqlx::query(
		"INSERT INTO namespaces (id, parent_id, name, path) VALUES (1, NULL, 'org', 'org'), \
		 (2, 1, 'team', 'team')",
	)
	.execute(&db.pool)
	.await
	.expect("Failed to seed namespaces.");
	sqlx::query(
		"INSERT INTO projects (id, namespace_id, name, path, disk_path) \
		 VALUES (10, 2, 'app', 'app', '@hashed/app.git')",
	)
	.execute(&db.pool)
	.await
	.expect("Failed to seed project.");

	let service = ZcsService::new(cfg, db).expect("Service must build.");

	Some((test_db, service))
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ZCS_PG_DSN to run."]
async fn zoekt_routes_respect_the_feature_flag() {
	let Some((test_db, service)) = setup("zoekt_routes_respect_the_feature_flag").await else {
		return;
	};

	settings::set_feature(&service.db, settings::ZOEKT_ADMIN_API, false)
		.await
		.expect("Failed to toggle flag.");

	let err = service.list_nodes().await.expect_err("Disabled flag must reject.");

	assert!(matches!(
		err,
		Error::FeatureDisabled { ref message } if message == "Zoekt administration is disabled."
	));

	settings::set_feature(&service.db, settings::ZOEKT_ADMIN_API, true)
		.await
		.expect("Failed to toggle flag.");

	assert!(service.list_nodes().await.expect("Listing must succeed.").is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ZCS_PG_DSN to run."]
async fn trigger_index_enqueues_a_task() {
	let Some((test_db, service)) = setup("trigger_index_enqueues_a_task").await else {
		return;
	};
	let res = service.trigger_project_index(10).await.expect("Trigger must succeed.");
	let task = zcs_storage::outbox::find_task(&service.db, res.job_id)
		.await
		.expect("Lookup failed.")
		.expect("Task must exist.");

	assert_eq!(task.project_id, 10);
	assert_eq!(task.status, "PENDING");
	assert!(matches!(service.trigger_project_index(99).await, Err(Error::NotFound { .. })));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ZCS_PG_DSN to run."]
async fn namespace_assignment_lifecycle() {
	let Some((test_db, service)) = setup("namespace_assignment_lifecycle").await else {
		return;
	};
	let node = zcs_storage::nodes::register_node(
		&service.db,
		"http://zoekt-1:6060",
		"http://zoekt-1:6070",
		0,
		1_000,
	)
	.await
	.expect("Failed to register node.");
	let assigned = service
		.assign_namespace(node.id, 1, NamespaceAssignRequest::default())
		.await
		.expect("Assign must succeed.");

	assert!(assigned.search);
	assert_eq!(service.indexed_namespaces(node.id).await.expect("List failed.").len(), 1);
	assert!(matches!(
		service.assign_namespace(node.id + 1, 1, NamespaceAssignRequest::default()).await,
		Err(Error::NotFound { .. })
	));

	service.unassign_namespace(node.id, 1).await.expect("Unassign must succeed.");

	assert!(matches!(service.unassign_namespace(node.id, 1).await, Err(Error::NotFound { .. })));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
