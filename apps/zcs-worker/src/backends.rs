//! The storage and cluster operations the migration runner and health gate depend on.
//!
//! Production wiring uses Postgres through [`Db`] and the HTTP [`ClusterClient`]. Tests swap in
//! in-memory implementations.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use crate::{BoxFuture, Result, lease::LeaseLock};
use zcs_domain::{
	cluster::{ClusterVersion, HealthStatus},
	migration::MigrationRecord,
};
use zcs_index::cluster::{ClusterClient, TaskStatus};
use zcs_storage::{db::Db, migrations, models::SearchSettings, settings};

pub trait MigrationStore
where
	Self: Send + Sync,
{
	fn load_records(&self) -> BoxFuture<'_, Result<HashMap<i64, MigrationRecord>>>;

	fn save_record<'a>(&'a self, record: &'a MigrationRecord) -> BoxFuture<'a, Result<()>>;
}

pub trait SettingsStore
where
	Self: Send + Sync,
{
	fn feature_enabled<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn search_settings(&self) -> BoxFuture<'_, Result<SearchSettings>>;

	fn set_indexing_paused(&self, paused: bool) -> BoxFuture<'_, Result<()>>;

	fn reindexing_in_progress(&self) -> BoxFuture<'_, Result<bool>>;
}

pub trait ClusterOps
where
	Self: Send + Sync,
{
	fn alias_exists<'a>(&'a self, alias: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn version(&self) -> BoxFuture<'_, Result<ClusterVersion>>;

	fn health(&self) -> BoxFuture<'_, Result<HealthStatus>>;

	fn free_bytes(&self) -> BoxFuture<'_, Result<u64>>;

	fn count<'a>(&'a self, index: &'a str, query: &'a Value) -> BoxFuture<'a, Result<u64>>;

	fn update_by_query<'a>(
		&'a self,
		index: &'a str,
		query: &'a Value,
		script: &'a Value,
		max_docs: u64,
	) -> BoxFuture<'a, Result<String>>;

	fn reindex<'a>(&'a self, source: &'a str, dest: &'a str) -> BoxFuture<'a, Result<String>>;

	fn task_status<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<TaskStatus>>;

	fn index_size_bytes<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>>;

	fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn create_index<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<()>>;

	fn alias_targets<'a>(&'a self, alias: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

	fn switch_alias<'a>(
		&'a self,
		alias: &'a str,
		from: &'a [String],
		to: &'a str,
	) -> BoxFuture<'a, Result<()>>;
}

#[derive(Clone)]
pub struct Backends {
	pub store: Arc<dyn MigrationStore>,
	pub settings: Arc<dyn SettingsStore>,
	pub cluster: Arc<dyn ClusterOps>,
	pub lock: Arc<dyn LeaseLock>,
}
impl Backends {
	pub fn new(db: &Db, cluster: Arc<ClusterClient>) -> Self {
		let db = Arc::new(db.clone());

		Self { store: db.clone(), settings: db.clone(), cluster, lock: db }
	}
}

impl MigrationStore for Db {
	fn load_records(&self) -> BoxFuture<'_, Result<HashMap<i64, MigrationRecord>>> {
		Box::pin(async move { Ok(migrations::load_records(self).await?) })
	}

	fn save_record<'a>(&'a self, record: &'a MigrationRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(migrations::save_record(self, record).await?) })
	}
}

impl SettingsStore for Db {
	fn feature_enabled<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(settings::feature_enabled(self, name).await?) })
	}

	fn search_settings(&self) -> BoxFuture<'_, Result<SearchSettings>> {
		Box::pin(async move { Ok(settings::search_settings(self).await?) })
	}

	fn set_indexing_paused(&self, paused: bool) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(settings::set_indexing_paused(self, paused).await?) })
	}

	fn reindexing_in_progress(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(settings::reindexing_in_progress(self).await?) })
	}
}

impl ClusterOps for ClusterClient {
	fn alias_exists<'a>(&'a self, alias: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(ClusterClient::alias_exists(self, alias).await?) })
	}

	fn version(&self) -> BoxFuture<'_, Result<ClusterVersion>> {
		Box::pin(async move { Ok(ClusterClient::version(self).await?) })
	}

	fn health(&self) -> BoxFuture<'_, Result<HealthStatus>> {
		Box::pin(async move { Ok(ClusterClient::health(self).await?) })
	}

	fn free_bytes(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(ClusterClient::free_bytes(self).await?) })
	}

	fn count<'a>(&'a self, index: &'a str, query: &'a Value) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(ClusterClient::count(self, index, query).await?) })
	}

	fn update_by_query<'a>(
		&'a self,
		index: &'a str,
		query: &'a Value,
		script: &'a Value,
		max_docs: u64,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			Ok(ClusterClient::update_by_query(self, index, query, script, max_docs).await?)
		})
	}

	fn reindex<'a>(&'a self, source: &'a str, dest: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(ClusterClient::reindex(self, source, dest).await?) })
	}

	fn task_status<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<TaskStatus>> {
		Box::pin(async move { Ok(ClusterClient::task_status(self, task_id).await?) })
	}

	fn index_size_bytes<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(ClusterClient::index_size_bytes(self, index).await?) })
	}

	fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(ClusterClient::index_exists(self, index).await?) })
	}

	fn create_index<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(ClusterClient::create_index(self, index, body).await?) })
	}

	fn alias_targets<'a>(&'a self, alias: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move { Ok(ClusterClient::alias_targets(self, alias).await?) })
	}

	fn switch_alias<'a>(
		&'a self,
		alias: &'a str,
		from: &'a [String],
		to: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(ClusterClient::switch_alias(self, alias, from, to).await?) })
	}
}
