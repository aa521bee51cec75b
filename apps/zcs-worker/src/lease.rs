//! Exclusive named leases with a renewal heartbeat.
//!
//! The body of [`with_lease`] runs only while the lease is held. A heartbeat renews it every
//! third of the TTL. Validity is counted from the moment a successful acquire or renew was
//! issued, since the backend sets the expiry when it receives the call. The body is dropped and
//! the caller gets [`LeaseError::Lost`] when renewal reports the lease gone, or when the next
//! heartbeat would land past the last confirmed expiry.

use std::{future::Future, time::Duration};

use tokio::time::{self as tokio_time, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::{BoxFuture, Error, Result};
use zcs_storage::{db::Db, leases};

pub trait LeaseLock
where
	Self: Send + Sync,
{
	/// `Ok(false)` means another holder owns a live lease.
	fn try_acquire<'a>(
		&'a self,
		key: &'a str,
		holder: Uuid,
		ttl: Duration,
	) -> BoxFuture<'a, Result<bool>>;

	/// `Ok(false)` means the lease is no longer owned by `holder`.
	fn renew<'a>(
		&'a self,
		key: &'a str,
		holder: Uuid,
		ttl: Duration,
	) -> BoxFuture<'a, Result<bool>>;

	fn release<'a>(&'a self, key: &'a str, holder: Uuid) -> BoxFuture<'a, Result<()>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
	pub ttl: Duration,
	/// Extra acquisition attempts after the first one.
	pub retries: u32,
	pub sleep: Duration,
}
impl LockOptions {
	pub fn from_config(cfg: &zcs_config::Migrations) -> Self {
		Self {
			ttl: Duration::from_secs(cfg.lock_ttl_secs),
			retries: cfg.lock_retries,
			sleep: Duration::from_millis(cfg.lock_sleep_ms),
		}
	}

	fn heartbeat(&self) -> Duration {
		(self.ttl / 3).max(Duration::from_millis(10))
	}
}

#[derive(Debug, thiserror::Error)]
pub enum LeaseError {
	#[error("Lease {key} is held by another worker after {attempts} attempts.")]
	Contended { key: String, attempts: u32 },
	#[error("Lease backend is unavailable for {key}: {source}")]
	Unavailable { key: String, source: Error },
	#[error("Lease {key} was lost while the body was running.")]
	Lost { key: String },
}

/// Runs `body` while holding the lease named `key`.
pub async fn with_lease<F>(
	lock: &dyn LeaseLock,
	key: &str,
	opts: &LockOptions,
	body: F,
) -> std::result::Result<F::Output, LeaseError>
where
	F: Future,
{
	let holder = Uuid::new_v4();
	let valid_from = acquire(lock, key, holder, opts).await?;
	let outcome = run_with_heartbeat(lock, key, holder, opts, valid_from, body).await;

	if !matches!(outcome, Err(LeaseError::Lost { .. }))
		&& let Err(err) = lock.release(key, holder).await
	{
		tracing::warn!(error = %err, key, "Failed to release lease. It will expire on its own.");
	}

	outcome
}

/// Returns the instant the winning acquire call was issued.
async fn acquire(
	lock: &dyn LeaseLock,
	key: &str,
	holder: Uuid,
	opts: &LockOptions,
) -> std::result::Result<Instant, LeaseError> {
	let attempts = opts.retries.saturating_add(1);

	for attempt in 1..=attempts {
		let issued_at = Instant::now();

		match lock.try_acquire(key, holder, opts.ttl).await {
			Ok(true) => return Ok(issued_at),
			Ok(false) if attempt < attempts => tokio_time::sleep(opts.sleep).await,
			Ok(false) => {},
			Err(err) => return Err(LeaseError::Unavailable { key: key.to_string(), source: err }),
		}
	}

	Err(LeaseError::Contended { key: key.to_string(), attempts })
}

async fn run_with_heartbeat<F>(
	lock: &dyn LeaseLock,
	key: &str,
	holder: Uuid,
	opts: &LockOptions,
	mut valid_from: Instant,
	body: F,
) -> std::result::Result<F::Output, LeaseError>
where
	F: Future,
{
	let period = opts.heartbeat();
	let mut heartbeat = tokio_time::interval_at(Instant::now() + period, period);

	heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

	tokio::pin!(body);

	loop {
		tokio::select! {
			output = &mut body => return Ok(output),
			_ = heartbeat.tick() => {
				let issued_at = Instant::now();

				match tokio_time::timeout(period, lock.renew(key, holder, opts.ttl)).await {
					Ok(Ok(true)) => valid_from = issued_at,
					Ok(Ok(false)) => return Err(LeaseError::Lost { key: key.to_string() }),
					Ok(Err(err)) => {
						tracing::warn!(error = %err, key, "Failed to renew lease.");
					},
					Err(_) => {
						tracing::warn!(key, timeout = ?period, "Lease renewal timed out.");
					},
				}

				if outlives_lease(valid_from.elapsed(), period, opts.ttl) {
					return Err(LeaseError::Lost { key: key.to_string() });
				}
			},
		}
	}
}

/// The body may run until the next heartbeat, so that heartbeat must still fall inside the
/// last confirmed lease.
fn outlives_lease(since_valid: Duration, period: Duration, ttl: Duration) -> bool {
	since_valid.saturating_add(period) >= ttl
}

impl LeaseLock for Db {
	fn try_acquire<'a>(
		&'a self,
		key: &'a str,
		holder: Uuid,
		ttl: Duration,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(leases::try_acquire(self, key, holder, to_time_duration(ttl)?).await?)
		})
	}

	fn renew<'a>(
		&'a self,
		key: &'a str,
		holder: Uuid,
		ttl: Duration,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(leases::renew(self, key, holder, to_time_duration(ttl)?).await?) })
	}

	fn release<'a>(&'a self, key: &'a str, holder: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(leases::release(self, key, holder).await?) })
	}
}

fn to_time_duration(duration: Duration) -> Result<time::Duration> {
	time::Duration::try_from(duration)
		.map_err(|_| Error::Message(format!("Lease TTL {duration:?} is out of range.")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn heartbeat_is_a_third_of_the_ttl() {
		let opts = LockOptions {
			ttl: Duration::from_secs(600),
			retries: 10,
			sleep: Duration::from_secs(1),
		};

		assert_eq!(opts.heartbeat(), Duration::from_secs(200));
	}

	#[test]
	fn one_missed_renewal_is_tolerated_but_not_two() {
		let ttl = Duration::from_millis(900);
		let period = Duration::from_millis(300);

		assert!(!outlives_lease(Duration::from_millis(310), period, ttl));
		assert!(outlives_lease(Duration::from_millis(600), period, ttl));
		assert!(outlives_lease(ttl, Duration::ZERO, ttl));
	}

	#[test]
	fn options_follow_config() {
		let opts = LockOptions::from_config(&zcs_config::Migrations::default());

		assert_eq!(opts.ttl, Duration::from_secs(600));
		assert_eq!(opts.retries, 10);
		assert_eq!(opts.sleep, Duration::from_millis(1_000));
	}
}
