use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, db::Db, models::IndexingTask};

pub async fn enqueue_index_task(db: &Db, project_id: i64) -> Result<Uuid> {
	let task_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO zoekt_indexing_tasks (task_id, project_id, status, available_at, created_at, updated_at)
VALUES ($1, $2, 'PENDING', $3, $3, $3)",
	)
	.bind(task_id)
	.bind(project_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(task_id)
}

/// Claims the oldest due task by pushing its `available_at` forward by `lease`.
///
/// Concurrent workers skip rows another transaction already locked.
pub async fn claim_next_task(
	db: &Db,
	now: OffsetDateTime,
	lease: Duration,
) -> Result<Option<IndexingTask>> {
	let mut tx = db.pool.begin().await?;
	let row: Option<IndexingTask> = sqlx::query_as(
		"\
SELECT
	task_id,
	project_id,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM zoekt_indexing_tasks
WHERE status IN ('PENDING', 'FAILED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let task = if let Some(mut task) = row {
		let lease_until = now + lease;

		sqlx::query(
			"UPDATE zoekt_indexing_tasks SET available_at = $1, updated_at = $2 WHERE task_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(task.task_id)
		.execute(&mut *tx)
		.await?;

		task.available_at = lease_until;
		task.updated_at = now;

		Some(task)
	} else {
		None
	};

	tx.commit().await?;

	Ok(task)
}

pub async fn mark_task_done(db: &Db, task_id: Uuid) -> Result<()> {
	sqlx::query("UPDATE zoekt_indexing_tasks SET status = 'DONE', updated_at = $1 WHERE task_id = $2")
		.bind(OffsetDateTime::now_utc())
		.bind(task_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn mark_task_failed(
	db: &Db,
	task_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE zoekt_indexing_tasks
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE task_id = $5",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(OffsetDateTime::now_utc())
	.bind(task_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn find_task(db: &Db, task_id: Uuid) -> Result<Option<IndexingTask>> {
	Ok(sqlx::query_as(
		"\
SELECT
	task_id,
	project_id,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM zoekt_indexing_tasks
WHERE task_id = $1",
	)
	.bind(task_id)
	.fetch_optional(&db.pool)
	.await?)
}
