pub mod admin;
pub mod reconcile;
pub mod search;

mod error;

pub use admin::{
	IndexedNamespaceItem, MigrationStatusItem, NamespaceAssignRequest, NodeItem,
	TriggerIndexResponse,
};
pub use error::{Error, Result};
pub use search::{BlobItem, SearchBlobsRequest, SearchBlobsResponse, SearchRoute, SearchStrategy};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use zcs_config::Config;
use zcs_domain::{
	blob::ProjectRef,
	cluster::{ClusterVersion, HealthStatus},
	query::SearchQuery,
};
use zcs_index::{
	cluster::ClusterClient,
	zoekt::{SearchPayload, SearchResponse, ZoektClient},
};
use zcs_storage::{db::Db, nodes, projects};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sends one search to the Zoekt fleet. Implementations never retry.
pub trait SearchBackend
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		query: &'a SearchQuery,
		payload: SearchPayload,
	) -> BoxFuture<'a, Result<SearchResponse>>;
}

pub trait ProjectDirectory
where
	Self: Send + Sync,
{
	/// Resolves every id in one round trip. Unknown ids are left out of the map.
	fn find_projects<'a>(
		&'a self,
		ids: &'a [i64],
		with_routes: bool,
	) -> BoxFuture<'a, Result<HashMap<i64, ProjectRef>>>;
}

pub trait ClusterProbe
where
	Self: Send + Sync,
{
	fn version(&self) -> BoxFuture<'_, Result<ClusterVersion>>;

	fn health(&self) -> BoxFuture<'_, Result<HealthStatus>>;

	fn free_bytes(&self) -> BoxFuture<'_, Result<u64>>;
}

#[derive(Clone)]
pub struct Providers {
	pub search: Arc<dyn SearchBackend>,
	pub projects: Arc<dyn ProjectDirectory>,
	pub cluster: Arc<dyn ClusterProbe>,
}
impl Providers {
	pub fn new(
		search: Arc<dyn SearchBackend>,
		projects: Arc<dyn ProjectDirectory>,
		cluster: Arc<dyn ClusterProbe>,
	) -> Self {
		Self { search, projects, cluster }
	}

	/// Wires the HTTP clients and the database-backed project directory.
	pub fn from_config(cfg: &Config, db: &Db) -> Result<Self> {
		let strategy = SearchStrategy::parse(&cfg.search.strategy).ok_or_else(|| {
			Error::InvalidRequest { message: "search.strategy must be direct or proxy.".to_string() }
		})?;
		let search = ZoektBackend {
			client: ZoektClient::new(&cfg.zoekt)?,
			db: db.clone(),
			zoekt: cfg.zoekt.clone(),
			strategy,
		};
		let cluster = ClusterClient::new(&cfg.cluster)?;

		Ok(Self {
			search: Arc::new(search),
			projects: Arc::new(DbProjects { db: db.clone() }),
			cluster: Arc::new(ClusterHandle { client: cluster }),
		})
	}
}

pub struct ZcsService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}
impl ZcsService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let providers = Providers::from_config(&cfg, &db)?;

		Ok(Self { cfg, db, providers })
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}
}

struct ZoektBackend {
	client: ZoektClient,
	db: Db,
	zoekt: zcs_config::Zoekt,
	strategy: SearchStrategy,
}
impl ZoektBackend {
	async fn route(&self, query: &SearchQuery) -> Result<SearchRoute> {
		let node_url = match query.node_id() {
			Some(node_id) => {
				let node = nodes::find_node(&self.db, node_id).await?.ok_or_else(|| {
					Error::NotFound { message: format!("Zoekt node {node_id} does not exist.") }
				})?;

				Some(node.search_base_url)
			},
			None => None,
		};
		let fleet = match (self.strategy, node_url.is_some()) {
			(SearchStrategy::Proxy, false) => nodes::list_nodes(&self.db)
				.await?
				.into_iter()
				.map(|node| node.search_base_url)
				.collect(),
			_ => Vec::new(),
		};

		SearchRoute::plan(self.strategy, &self.zoekt, node_url.as_deref(), fleet)
	}
}
impl SearchBackend for ZoektBackend {
	fn search<'a>(
		&'a self,
		query: &'a SearchQuery,
		payload: SearchPayload,
	) -> BoxFuture<'a, Result<SearchResponse>> {
		Box::pin(async move {
			let route = self.route(query).await?;
			let payload = payload.forward_to(route.forward_to);

			Ok(self.client.search(&route.url, &payload).await?)
		})
	}
}

struct DbProjects {
	db: Db,
}
impl ProjectDirectory for DbProjects {
	fn find_projects<'a>(
		&'a self,
		ids: &'a [i64],
		with_routes: bool,
	) -> BoxFuture<'a, Result<HashMap<i64, ProjectRef>>> {
		Box::pin(async move {
			let rows = projects::find_projects(&self.db, ids, with_routes).await?;

			Ok(rows.into_iter().map(|(id, row)| (id, row.to_ref())).collect())
		})
	}
}

struct ClusterHandle {
	client: ClusterClient,
}
impl ClusterProbe for ClusterHandle {
	fn version(&self) -> BoxFuture<'_, Result<ClusterVersion>> {
		Box::pin(async move { Ok(self.client.version().await?) })
	}

	fn health(&self) -> BoxFuture<'_, Result<HealthStatus>> {
		Box::pin(async move { Ok(self.client.health().await?) })
	}

	fn free_bytes(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(self.client.free_bytes().await?) })
	}
}
