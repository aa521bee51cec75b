use time::OffsetDateTime;

use crate::{Result, db::Db, models::SearchSettings};

pub const SEARCH_MIGRATION_WORKER: &str = "search_migration_worker";
pub const ZOEKT_ADMIN_API: &str = "zoekt_admin_api";

/// Unknown flags are disabled.
pub async fn feature_enabled(db: &Db, name: &str) -> Result<bool> {
	let row: Option<(bool,)> = sqlx::query_as("SELECT enabled FROM feature_flags WHERE name = $1")
		.bind(name)
		.fetch_optional(&db.pool)
		.await?;

	Ok(row.map(|(enabled,)| enabled).unwrap_or(false))
}

pub async fn set_feature(db: &Db, name: &str, enabled: bool) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO feature_flags (name, enabled, updated_at)
VALUES ($1, $2, $3)
ON CONFLICT (name) DO UPDATE
SET enabled = EXCLUDED.enabled,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(name)
	.bind(enabled)
	.bind(OffsetDateTime::now_utc())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn search_settings(db: &Db) -> Result<SearchSettings> {
	let row: Option<SearchSettings> = sqlx::query_as(
		"SELECT indexing_enabled, indexing_paused FROM search_settings WHERE id = 1",
	)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row.unwrap_or(SearchSettings { indexing_enabled: true, indexing_paused: false }))
}

pub async fn set_indexing_paused(db: &Db, paused: bool) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO search_settings (id, indexing_paused, updated_at)
VALUES (1, $1, $2)
ON CONFLICT (id) DO UPDATE
SET indexing_paused = EXCLUDED.indexing_paused,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(paused)
	.bind(OffsetDateTime::now_utc())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn set_indexing_enabled(db: &Db, enabled: bool) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO search_settings (id, indexing_enabled, updated_at)
VALUES (1, $1, $2)
ON CONFLICT (id) DO UPDATE
SET indexing_enabled = EXCLUDED.indexing_enabled,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(enabled)
	.bind(OffsetDateTime::now_utc())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn reindexing_in_progress(db: &Db) -> Result<bool> {
	let (running,): (bool,) = sqlx::query_as(
		"\
SELECT EXISTS (
	SELECT 1 FROM search_reindexing_tasks WHERE state NOT IN ('success', 'failure')
)",
	)
	.fetch_one(&db.pool)
	.await?;

	Ok(running)
}
