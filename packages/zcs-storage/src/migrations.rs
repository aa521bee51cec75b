use std::collections::HashMap;

use time::OffsetDateTime;

use crate::{Result, db::Db, models::MigrationRow};
use zcs_domain::migration::{MigrationRecord, MigrationState};

pub async fn load_records(db: &Db) -> Result<HashMap<i64, MigrationRecord>> {
	let rows: Vec<MigrationRow> = sqlx::query_as(
		"\
SELECT version, name, started, completed, state, updated_at
FROM search_migrations
ORDER BY version ASC",
	)
	.fetch_all(&db.pool)
	.await?;
	let mut records = HashMap::with_capacity(rows.len());

	for row in rows {
		let record = into_record(row)?;

		records.insert(record.version, record);
	}

	Ok(records)
}

pub async fn load_record(db: &Db, version: i64) -> Result<Option<MigrationRecord>> {
	let row: Option<MigrationRow> = sqlx::query_as(
		"\
SELECT version, name, started, completed, state, updated_at
FROM search_migrations
WHERE version = $1",
	)
	.bind(version)
	.fetch_optional(&db.pool)
	.await?;

	row.map(into_record).transpose()
}

/// Writes the whole record. The state blob is replaced, never merged.
pub async fn save_record(db: &Db, record: &MigrationRecord) -> Result<()> {
	let state = serde_json::to_value(&record.state)?;
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO search_migrations (version, name, started, completed, state, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $6)
ON CONFLICT (version) DO UPDATE
SET name = EXCLUDED.name,
	started = EXCLUDED.started,
	completed = EXCLUDED.completed,
	state = EXCLUDED.state,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(record.version)
	.bind(record.name.as_str())
	.bind(record.started)
	.bind(record.completed)
	.bind(state)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

fn into_record(row: MigrationRow) -> Result<MigrationRecord> {
	let state: MigrationState = serde_json::from_value(row.state)?;

	Ok(MigrationRecord {
		version: row.version,
		name: row.name,
		started: row.started,
		completed: row.completed,
		state,
		updated_at: Some(row.updated_at),
	})
}
