use std::collections::HashMap;

use crate::{Result, db::Db, models::ProjectRow};

/// Loads every requested project in one query, keyed by id. Missing ids are simply absent.
///
/// With `with_routes` the project's full path is joined from `routes`.
pub async fn find_projects(
	db: &Db,
	ids: &[i64],
	with_routes: bool,
) -> Result<HashMap<i64, ProjectRow>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let sql = if with_routes {
		"\
SELECT
	p.id,
	p.namespace_id,
	p.name,
	p.path,
	p.default_branch,
	p.pending_delete,
	p.archived,
	p.repository_storage,
	p.disk_path,
	r.path AS full_path
FROM projects p
LEFT JOIN routes r ON r.source_type = 'Project' AND r.source_id = p.id
WHERE p.id = ANY($1)"
	} else {
		"\
SELECT
	id,
	namespace_id,
	name,
	path,
	default_branch,
	pending_delete,
	archived,
	repository_storage,
	disk_path,
	NULL::text AS full_path
FROM projects
WHERE id = ANY($1)"
	};
	let rows: Vec<ProjectRow> = sqlx::query_as(sql).bind(ids).fetch_all(&db.pool).await?;

	Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

pub async fn find_project(db: &Db, id: i64) -> Result<Option<ProjectRow>> {
	let mut found = find_projects(db, &[id], true).await?;

	Ok(found.remove(&id))
}

/// Walks `parent_id` up to the top-level namespace that owns the project.
pub async fn root_namespace_id(db: &Db, project_id: i64) -> Result<Option<i64>> {
	let root: Option<(i64,)> = sqlx::query_as(
		"\
WITH RECURSIVE ancestry AS (
	SELECT n.id, n.parent_id
	FROM namespaces n
	JOIN projects p ON p.namespace_id = n.id
	WHERE p.id = $1
	UNION ALL
	SELECT n.id, n.parent_id
	FROM namespaces n
	JOIN ancestry a ON n.id = a.parent_id
)
SELECT id FROM ancestry WHERE parent_id IS NULL LIMIT 1",
	)
	.bind(project_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(root.map(|(id,)| id))
}
