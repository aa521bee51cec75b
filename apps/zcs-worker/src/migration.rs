//! Drives the next pending migration forward by one tick.
//!
//! A tick checks the health gate, takes the runner's lease, then does at most one step of
//! migration work and persists the resulting record. It never returns an error. Failures are
//! logged and reported through [`TickOutcome`], while the actionable state stays in the
//! persisted record.

use std::{any, sync::Arc, time::Duration};

use color_eyre::eyre::WrapErr;
use tracing::{error, info, warn};

use crate::{
	backends::Backends,
	gate::{self, BlockReason, GateDecision},
	lease::{self, LeaseError, LockOptions},
	migrations::{Migration, MigrationContext, MigrationRegistry},
};
use zcs_domain::migration::MigrationRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
	Blocked(BlockReason),
	NoMigrationAvailable,
	Halted { version: i64 },
	InsufficientSpace { version: i64, required: u64, free: u64 },
	InProgress { version: i64, follow_up: Option<Duration> },
	Completed { version: i64 },
	/// Attempts are exhausted and the record is now halted.
	Failed { version: i64, message: String },
	/// The step failed and the next tick will try again.
	Errored { message: String },
	LockContended,
	LockUnavailable,
	LeaseLost,
}
impl TickOutcome {
	/// Requested delay before the next tick, if sooner than the regular interval.
	pub fn follow_up(&self) -> Option<Duration> {
		match self {
			Self::InProgress { follow_up, .. } => *follow_up,
			_ => None,
		}
	}
}

pub struct MigrationRunner {
	registry: MigrationRegistry,
	backends: Backends,
	ctx: MigrationContext,
	lock_options: LockOptions,
}
impl MigrationRunner {
	pub fn new(
		registry: MigrationRegistry,
		backends: Backends,
		alias: String,
		lock_options: LockOptions,
	) -> Self {
		let ctx = MigrationContext { cluster: backends.cluster.clone(), alias };

		Self { registry, backends, ctx, lock_options }
	}

	/// The lease is per runner, not per migration.
	pub fn lock_key(&self) -> &'static str {
		any::type_name::<Self>()
	}

	pub async fn tick(&self) -> TickOutcome {
		match gate::evaluate(
			self.backends.settings.as_ref(),
			self.backends.cluster.as_ref(),
			&self.ctx.alias,
		)
		.await
		{
			Ok(GateDecision::Proceed) => {},
			Ok(GateDecision::Blocked(reason)) => return TickOutcome::Blocked(reason),
			Err(err) => {
				error!(error = %err, "Migration health gate failed.");

				return TickOutcome::Errored { message: err.to_string() };
			},
		}

		let key = self.lock_key();

		match lease::with_lease(self.backends.lock.as_ref(), key, &self.lock_options, self.step())
			.await
		{
			Ok(Ok(outcome)) => outcome,
			Ok(Err(report)) => {
				error!(error = ?report, "Migration tick failed.");

				TickOutcome::Errored { message: format!("{report:#}") }
			},
			Err(err @ LeaseError::Contended { .. }) => {
				info!(error = %err, "Skipping migration tick.");

				TickOutcome::LockContended
			},
			Err(err @ LeaseError::Unavailable { .. }) => {
				error!(error = %err, "Skipping migration tick.");

				TickOutcome::LockUnavailable
			},
			Err(err @ LeaseError::Lost { .. }) => {
				error!(error = %err, "Migration tick was cancelled.");

				TickOutcome::LeaseLost
			},
		}
	}

	async fn step(&self) -> color_eyre::Result<TickOutcome> {
		let records = self.backends.store.load_records().await?;
		let Some(migration) = self.registry.next_pending(&records) else {
			return Ok(TickOutcome::NoMigrationAvailable);
		};
		let version = migration.version();
		let name = migration.name();
		let record = records
			.get(&version)
			.cloned()
			.unwrap_or_else(|| MigrationRecord::pending(version, name));

		self.advance(migration, record)
			.await
			.wrap_err_with(|| format!("Migration {name} ({version}) failed."))
	}

	async fn advance(
		&self,
		migration: Arc<dyn Migration>,
		mut record: MigrationRecord,
	) -> color_eyre::Result<TickOutcome> {
		let version = record.version;

		if record.is_halted() {
			self.unpause_after_halt(&mut record).await?;

			return Ok(TickOutcome::Halted { version });
		}
		if !record.started
			&& let Some(required) = migration.space_required(&self.ctx).await?
		{
			let free = self.backends.cluster.free_bytes().await?;

			if free < required {
				warn!(
					version,
					required,
					free,
					"Not enough free cluster space for migration. Halting it."
				);

				record.state.halt();
				self.backends.store.save_record(&record).await?;

				return Ok(TickOutcome::InsufficientSpace { version, required, free });
			}
		}

		let opts = migration.options();

		if !record.started || opts.batched || opts.retry_on_failure {
			if opts.pause_indexing {
				self.pause_indexing(&mut record).await?;
			}

			record.started = true;

			self.backends.store.save_record(&record).await?;

			if let Err(err) = migration.migrate(&self.ctx, &mut record.state).await {
				if !opts.retry_on_failure {
					return Err(err);
				}

				record.state.previous_attempts = record.state.previous_attempts.saturating_add(1);

				if record.state.previous_attempts >= opts.max_attempts {
					let message = format!("{err:#}");

					error!(
						error = ?err,
						version,
						attempts = record.state.previous_attempts,
						"Migration failed permanently. Halting it."
					);

					record.state.fail(message.clone());
					self.backends.store.save_record(&record).await?;

					return Ok(TickOutcome::Failed { version, message });
				}

				self.backends.store.save_record(&record).await?;

				return Err(err);
			}
		}

		let completed = migration.completed(&self.ctx, &record.state).await?;

		record.completed = completed;

		self.backends.store.save_record(&record).await?;

		if completed {
			info!(version, name = %record.name, "Migration completed.");

			if record.state.pause_indexing == Some(true) {
				self.backends.settings.set_indexing_paused(false).await?;

				info!(version, "Resumed indexing after migration.");
			}

			return Ok(TickOutcome::Completed { version });
		}

		let follow_up = opts.batched.then_some(opts.throttle_delay);

		Ok(TickOutcome::InProgress { version, follow_up })
	}

	async fn pause_indexing(&self, record: &mut MigrationRecord) -> color_eyre::Result<()> {
		if record.state.pause_indexing.is_some() {
			return Ok(());
		}
		if self.backends.settings.search_settings().await?.indexing_paused {
			record.state.pause_indexing = Some(false);

			return Ok(());
		}

		self.backends.settings.set_indexing_paused(true).await?;

		record.state.pause_indexing = Some(true);

		info!(version = record.version, "Paused indexing for migration.");

		Ok(())
	}

	/// Reverts a pause this migration performed, once per halt.
	async fn unpause_after_halt(&self, record: &mut MigrationRecord) -> color_eyre::Result<()> {
		if record.state.halted_indexing_unpaused == Some(true) {
			return Ok(());
		}
		if record.state.pause_indexing == Some(true) {
			self.backends.settings.set_indexing_paused(false).await?;

			info!(version = record.version, "Resumed indexing paused by halted migration.");
		}

		record.state.halted_indexing_unpaused = Some(true);

		self.backends.store.save_record(record).await?;

		Ok(())
	}
}
