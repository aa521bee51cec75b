use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result, ZcsService};
use zcs_domain::{
	cluster::ClusterHealthSnapshot,
	migration::{MigrationPhase, MigrationRecord, MigrationState},
};
use zcs_storage::{
	migrations,
	models::{IndexedNamespace, ZoektNode},
	nodes, outbox, projects, settings,
};

pub const ZOEKT_ADMIN_DISABLED: &str = "Zoekt administration is disabled.";

#[derive(Debug, Clone, Serialize)]
pub struct TriggerIndexResponse {
	pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeItem {
	pub id: i64,
	pub index_base_url: String,
	pub search_base_url: String,
	pub used_bytes: i64,
	pub total_bytes: i64,
	#[serde(with = "zcs_domain::time_serde")]
	pub last_seen_at: OffsetDateTime,
}
impl From<ZoektNode> for NodeItem {
	fn from(node: ZoektNode) -> Self {
		Self {
			id: node.id,
			index_base_url: node.index_base_url,
			search_base_url: node.search_base_url,
			used_bytes: node.used_bytes,
			total_bytes: node.total_bytes,
			last_seen_at: node.last_seen_at,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexedNamespaceItem {
	pub id: i64,
	pub zoekt_node_id: i64,
	pub namespace_id: i64,
	pub search: bool,
	#[serde(with = "zcs_domain::time_serde")]
	pub created_at: OffsetDateTime,
}
impl From<IndexedNamespace> for IndexedNamespaceItem {
	fn from(row: IndexedNamespace) -> Self {
		Self {
			id: row.id,
			zoekt_node_id: row.zoekt_node_id,
			namespace_id: row.namespace_id,
			search: row.search,
			created_at: row.created_at,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceAssignRequest {
	/// Defaults to `true`.
	pub search: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatusItem {
	pub version: i64,
	pub name: String,
	pub phase: MigrationPhase,
	pub started: bool,
	pub completed: bool,
	pub state: MigrationState,
	#[serde(with = "zcs_domain::time_serde::option")]
	pub updated_at: Option<OffsetDateTime>,
}
impl From<MigrationRecord> for MigrationStatusItem {
	fn from(record: MigrationRecord) -> Self {
		Self {
			phase: record.phase(),
			version: record.version,
			name: record.name,
			started: record.started,
			completed: record.completed,
			state: record.state,
			updated_at: record.updated_at,
		}
	}
}

impl ZcsService {
	pub async fn trigger_project_index(&self, project_id: i64) -> Result<TriggerIndexResponse> {
		self.ensure_zoekt_admin().await?;

		if projects::find_project(&self.db, project_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("Project {project_id} does not exist.") });
		}

		let job_id = outbox::enqueue_index_task(&self.db, project_id).await?;

		info!(project_id, job_id = %job_id, "Queued Zoekt indexing task.");

		Ok(TriggerIndexResponse { job_id })
	}

	pub async fn list_nodes(&self) -> Result<Vec<NodeItem>> {
		self.ensure_zoekt_admin().await?;

		Ok(nodes::list_nodes(&self.db).await?.into_iter().map(NodeItem::from).collect())
	}

	/// The most recently assigned namespaces on a node.
	pub async fn indexed_namespaces(&self, node_id: i64) -> Result<Vec<IndexedNamespaceItem>> {
		self.ensure_zoekt_admin().await?;
		self.ensure_node(node_id).await?;

		Ok(nodes::indexed_namespaces(&self.db, node_id)
			.await?
			.into_iter()
			.map(IndexedNamespaceItem::from)
			.collect())
	}

	pub async fn assign_namespace(
		&self,
		node_id: i64,
		namespace_id: i64,
		req: NamespaceAssignRequest,
	) -> Result<IndexedNamespaceItem> {
		self.ensure_zoekt_admin().await?;
		self.ensure_node(node_id).await?;

		let row =
			nodes::assign_namespace(&self.db, node_id, namespace_id, req.search.unwrap_or(true))
				.await?;

		info!(node_id, namespace_id, "Assigned namespace to Zoekt node.");

		Ok(row.into())
	}

	pub async fn unassign_namespace(&self, node_id: i64, namespace_id: i64) -> Result<()> {
		self.ensure_zoekt_admin().await?;

		if !nodes::unassign_namespace(&self.db, node_id, namespace_id).await? {
			return Err(Error::NotFound {
				message: format!("Namespace {namespace_id} is not assigned to node {node_id}."),
			});
		}

		info!(node_id, namespace_id, "Removed namespace from Zoekt node.");

		Ok(())
	}

	/// Persisted migration records, read without the migration lease.
	pub async fn migration_statuses(&self) -> Result<Vec<MigrationStatusItem>> {
		let mut records: Vec<MigrationRecord> =
			migrations::load_records(&self.db).await?.into_values().collect();

		records.sort_by_key(|record| record.version);

		Ok(records.into_iter().map(MigrationStatusItem::from).collect())
	}

	pub async fn cluster_snapshot(&self) -> Result<ClusterHealthSnapshot> {
		let cluster = &self.providers.cluster;
		let version = cluster.version().await?;
		let health = cluster.health().await?;
		let free_bytes = cluster.free_bytes().await?;
		let reindexing_in_progress = settings::reindexing_in_progress(&self.db).await?;

		Ok(ClusterHealthSnapshot {
			version_supported: version.is_supported(),
			version,
			free_bytes,
			health,
			reindexing_in_progress,
		})
	}

	async fn ensure_zoekt_admin(&self) -> Result<()> {
		if settings::feature_enabled(&self.db, settings::ZOEKT_ADMIN_API).await? {
			return Ok(());
		}

		Err(Error::FeatureDisabled { message: ZOEKT_ADMIN_DISABLED.to_string() })
	}

	async fn ensure_node(&self, node_id: i64) -> Result<()> {
		if nodes::find_node(&self.db, node_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("Zoekt node {node_id} does not exist.") });
		}

		Ok(())
	}
}
