use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use zcs_domain::blob::ProjectRef;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
	pub id: i64,
	pub namespace_id: i64,
	pub name: String,
	pub path: String,
	pub default_branch: Option<String>,
	pub pending_delete: bool,
	pub archived: bool,
	pub repository_storage: String,
	pub disk_path: String,
	/// Only populated when routes were preloaded.
	pub full_path: Option<String>,
}
impl ProjectRow {
	pub fn to_ref(&self) -> ProjectRef {
		ProjectRef {
			id: self.id,
			full_path: self.full_path.clone(),
			default_branch: self.default_branch.clone(),
			pending_delete: self.pending_delete,
		}
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ZoektNode {
	pub id: i64,
	pub index_base_url: String,
	pub search_base_url: String,
	pub used_bytes: i64,
	pub total_bytes: i64,
	pub last_seen_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IndexedNamespace {
	pub id: i64,
	pub zoekt_node_id: i64,
	pub namespace_id: i64,
	pub search: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IndexingTask {
	pub task_id: Uuid,
	pub project_id: i64,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRow {
	pub version: i64,
	pub name: String,
	pub started: bool,
	pub completed: bool,
	pub state: Value,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct SearchSettings {
	pub indexing_enabled: bool,
	pub indexing_paused: bool,
}
