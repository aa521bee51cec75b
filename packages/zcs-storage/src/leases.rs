//! Expiring named leases backed by `search_leases`.
//!
//! A lease row survives its holder crashing, so acquisition takes over rows whose
//! `expires_at` has passed. Renewal and release only touch rows still owned by the caller.
//! Expiry is always computed from the database clock, so workers with skewed clocks agree on it.

use time::Duration;
use uuid::Uuid;

use crate::{Result, db::Db};

/// Returns `true` when `holder` now owns `key` for `ttl` from the database's `now()`.
pub async fn try_acquire(db: &Db, key: &str, holder: Uuid, ttl: Duration) -> Result<bool> {
	let row: Option<(Uuid,)> = sqlx::query_as(
		"\
INSERT INTO search_leases (lease_key, holder, expires_at)
VALUES ($1, $2, now() + make_interval(secs => $3))
ON CONFLICT (lease_key) DO UPDATE
SET holder = EXCLUDED.holder,
	expires_at = EXCLUDED.expires_at
WHERE search_leases.expires_at <= now() OR search_leases.holder = EXCLUDED.holder
RETURNING holder",
	)
	.bind(key)
	.bind(holder)
	.bind(ttl.as_seconds_f64())
	.fetch_optional(&db.pool)
	.await?;

	Ok(row.is_some())
}

/// Extends a live lease. `false` means it expired, was taken over, or was released.
pub async fn renew(db: &Db, key: &str, holder: Uuid, ttl: Duration) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE search_leases
SET expires_at = now() + make_interval(secs => $3)
WHERE lease_key = $1 AND holder = $2 AND expires_at > now()",
	)
	.bind(key)
	.bind(holder)
	.bind(ttl.as_seconds_f64())
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn release(db: &Db, key: &str, holder: Uuid) -> Result<()> {
	sqlx::query("DELETE FROM search_leases WHERE lease_key = $1 AND holder = $2")
		.bind(key)
		.bind(holder)
		.execute(&db.pool)
		.await?;

	Ok(())
}
