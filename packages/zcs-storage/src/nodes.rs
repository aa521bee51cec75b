use time::OffsetDateTime;

use crate::{
	Error, Result,
	db::Db,
	models::{IndexedNamespace, ZoektNode},
};

pub const RECENT_INDEXED_NAMESPACES: i64 = 20;

const NODE_COLUMNS: &str = "id, index_base_url, search_base_url, used_bytes, total_bytes, \
	last_seen_at, created_at, updated_at";

pub async fn list_nodes(db: &Db) -> Result<Vec<ZoektNode>> {
	let sql = format!("SELECT {NODE_COLUMNS} FROM zoekt_nodes ORDER BY id ASC");

	Ok(sqlx::query_as(&sql).fetch_all(&db.pool).await?)
}

pub async fn find_node(db: &Db, node_id: i64) -> Result<Option<ZoektNode>> {
	let sql = format!("SELECT {NODE_COLUMNS} FROM zoekt_nodes WHERE id = $1");

	Ok(sqlx::query_as(&sql).bind(node_id).fetch_optional(&db.pool).await?)
}

pub async fn register_node(
	db: &Db,
	index_base_url: &str,
	search_base_url: &str,
	used_bytes: i64,
	total_bytes: i64,
) -> Result<ZoektNode> {
	let now = OffsetDateTime::now_utc();
	let sql = format!(
		"\
INSERT INTO zoekt_nodes (
	index_base_url,
	search_base_url,
	used_bytes,
	total_bytes,
	last_seen_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $5, $5)
ON CONFLICT (search_base_url) DO UPDATE
SET index_base_url = EXCLUDED.index_base_url,
	used_bytes = EXCLUDED.used_bytes,
	total_bytes = EXCLUDED.total_bytes,
	last_seen_at = EXCLUDED.last_seen_at,
	updated_at = EXCLUDED.updated_at
RETURNING {NODE_COLUMNS}"
	);

	Ok(sqlx::query_as(&sql)
		.bind(index_base_url)
		.bind(search_base_url)
		.bind(used_bytes)
		.bind(total_bytes)
		.bind(now)
		.fetch_one(&db.pool)
		.await?)
}

/// The most recently created assignments on a node, newest first.
pub async fn indexed_namespaces(db: &Db, node_id: i64) -> Result<Vec<IndexedNamespace>> {
	Ok(sqlx::query_as(
		"\
SELECT id, zoekt_node_id, namespace_id, search, created_at, updated_at
FROM zoekt_indexed_namespaces
WHERE zoekt_node_id = $1
ORDER BY created_at DESC, id DESC
LIMIT $2",
	)
	.bind(node_id)
	.bind(RECENT_INDEXED_NAMESPACES)
	.fetch_all(&db.pool)
	.await?)
}

/// Assigns a top-level namespace to a node. Re-assigning the same pair only refreshes it.
pub async fn assign_namespace(
	db: &Db,
	node_id: i64,
	namespace_id: i64,
	search: bool,
) -> Result<IndexedNamespace> {
	let parent: Option<(Option<i64>,)> =
		sqlx::query_as("SELECT parent_id FROM namespaces WHERE id = $1")
			.bind(namespace_id)
			.fetch_optional(&db.pool)
			.await?;

	match parent {
		None => return Err(Error::NotFound(format!("namespace {namespace_id}"))),
		Some((Some(_),)) =>
			return Err(Error::InvalidArgument(format!(
				"namespace {namespace_id} is not a top-level namespace"
			))),
		Some((None,)) => {},
	}

	let now = OffsetDateTime::now_utc();

	Ok(sqlx::query_as(
		"\
INSERT INTO zoekt_indexed_namespaces (zoekt_node_id, namespace_id, search, created_at, updated_at)
VALUES ($1, $2, $3, $4, $4)
ON CONFLICT (zoekt_node_id, namespace_id) DO UPDATE
SET search = EXCLUDED.search,
	updated_at = EXCLUDED.updated_at
RETURNING id, zoekt_node_id, namespace_id, search, created_at, updated_at",
	)
	.bind(node_id)
	.bind(namespace_id)
	.bind(search)
	.bind(now)
	.fetch_one(&db.pool)
	.await?)
}

/// Returns whether an assignment existed.
pub async fn unassign_namespace(db: &Db, node_id: i64, namespace_id: i64) -> Result<bool> {
	let result = sqlx::query(
		"DELETE FROM zoekt_indexed_namespaces WHERE zoekt_node_id = $1 AND namespace_id = $2",
	)
	.bind(node_id)
	.bind(namespace_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// The node serving a top-level namespace. The oldest assignment wins when there are several.
pub async fn node_for_namespace(db: &Db, namespace_id: i64) -> Result<Option<ZoektNode>> {
	Ok(sqlx::query_as(
		"\
SELECT
	n.id,
	n.index_base_url,
	n.search_base_url,
	n.used_bytes,
	n.total_bytes,
	n.last_seen_at,
	n.created_at,
	n.updated_at
FROM zoekt_indexed_namespaces z
JOIN zoekt_nodes n ON n.id = z.zoekt_node_id
WHERE z.namespace_id = $1
ORDER BY z.created_at ASC, z.id ASC
LIMIT 1",
	)
	.bind(namespace_id)
	.fetch_optional(&db.pool)
	.await?)
}
