use std::{future, time::Duration};

use tokio::time::{self as tokio_time, Instant};

use crate::migration::{MigrationRunner, TickOutcome};
use zcs_index::zoekt::ZoektClient;
use zcs_storage::db::Db;

pub struct WorkerState {
	pub db: Db,
	pub zoekt: ZoektClient,
	pub config: zcs_config::Config,
	pub runner: MigrationRunner,
}

/// Runs the indexing poller and the migration ticker side by side until interrupted.
///
/// The two loops share one task but never wait on each other, so a tick stuck acquiring the
/// lease does not hold back indexing.
pub async fn run_worker(state: WorkerState) -> color_eyre::Result<()> {
	tracing::info!(lock_key = state.runner.lock_key(), "Worker started.");

	tokio::select! {
		signal = tokio::signal::ctrl_c() => {
			signal?;

			tracing::info!("Worker shutting down.");
		},
		_ = indexing_loop(&state) => {},
		_ = migration_loop(&state) => {},
	}

	Ok(())
}

async fn indexing_loop(state: &WorkerState) {
	let poll_interval = Duration::from_millis(state.config.indexing.poll_interval_ms);

	poll_forever(poll_interval, move || async move {
		if let Err(err) =
			crate::indexing::process_next_task(&state.db, &state.zoekt, &state.config).await
		{
			tracing::error!(error = ?err, "Indexing task processing failed.");
		}
	})
	.await
}

async fn migration_loop(state: &WorkerState) {
	if !state.config.migrations.enabled {
		tracing::info!("Search migrations are disabled.");

		return future::pending().await;
	}

	let tick_interval = Duration::from_secs(state.config.migrations.tick_interval_secs);

	tick_forever(tick_interval, move || async move {
		let outcome = state.runner.tick().await;

		log_outcome(&outcome);

		outcome
	})
	.await
}

async fn poll_forever<F, Fut>(interval: Duration, mut step: F)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = ()>,
{
	loop {
		step().await;

		tokio_time::sleep(interval).await;
	}
}

async fn tick_forever<F, Fut>(interval: Duration, mut tick: F)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = TickOutcome>,
{
	let mut next_tick = Instant::now();

	loop {
		tokio_time::sleep_until(next_tick).await;

		let outcome = tick().await;

		next_tick = Instant::now() + next_tick_delay(&outcome, interval);
	}
}

/// A follow-up request can only bring the next tick forward.
pub fn next_tick_delay(outcome: &TickOutcome, tick_interval: Duration) -> Duration {
	match outcome.follow_up() {
		Some(delay) => delay.min(tick_interval),
		None => tick_interval,
	}
}

fn log_outcome(outcome: &TickOutcome) {
	match outcome {
		TickOutcome::InProgress { version, follow_up } => {
			tracing::info!(version, follow_up = ?follow_up, "Migration is still in progress.");
		},
		TickOutcome::Blocked(reason) => {
			tracing::debug!(reason = ?reason, "Migration tick blocked.");
		},
		other => {
			tracing::debug!(outcome = ?other, "Migration tick finished.");
		},
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[tokio::test]
	async fn slow_tick_does_not_hold_back_indexing() {
		let polls = AtomicUsize::new(0);
		let ticks = AtomicUsize::new(0);
		let (poll_count, tick_count) = (&polls, &ticks);
		let indexing = poll_forever(Duration::from_millis(10), move || async move {
			poll_count.fetch_add(1, Ordering::SeqCst);
		});
		let migrations = tick_forever(Duration::from_secs(300), move || async move {
			tick_count.fetch_add(1, Ordering::SeqCst);
			tokio_time::sleep(Duration::from_secs(5)).await;

			TickOutcome::LockContended
		});

		let _ = tokio_time::timeout(Duration::from_millis(300), async {
			tokio::join!(indexing, migrations);
		})
		.await;

		assert_eq!(ticks.load(Ordering::SeqCst), 1);
		assert!(polls.load(Ordering::SeqCst) >= 10);
	}

	#[test]
	fn follow_up_brings_the_tick_forward() {
		let interval = Duration::from_secs(300);
		let batched = TickOutcome::InProgress { version: 1, follow_up: Some(Duration::from_secs(60)) };

		assert_eq!(next_tick_delay(&batched, interval), Duration::from_secs(60));
		assert_eq!(next_tick_delay(&TickOutcome::Completed { version: 1 }, interval), interval);

		let slow = TickOutcome::InProgress { version: 1, follow_up: Some(Duration::from_secs(900)) };

		assert_eq!(next_tick_delay(&slow, interval), interval);
	}
}
