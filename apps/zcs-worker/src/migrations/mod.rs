pub mod backfill_archived;
pub mod reindex_blobs;

pub use backfill_archived::BackfillProjectArchived;
pub use reindex_blobs::ReindexBlobsWithPathAnalyzer;

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{BoxFuture, backends::ClusterOps};
use zcs_domain::migration::{self, MigrationRecord, MigrationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOptions {
	/// Work is split over several ticks; the runner asks for a follow-up after each one.
	pub batched: bool,
	pub retry_on_failure: bool,
	pub max_attempts: u32,
	pub throttle_delay: Duration,
	pub pause_indexing: bool,
}
impl Default for MigrationOptions {
	fn default() -> Self {
		Self {
			batched: false,
			retry_on_failure: false,
			max_attempts: 1,
			throttle_delay: Duration::from_secs(60),
			pause_indexing: false,
		}
	}
}

pub struct MigrationContext {
	pub cluster: Arc<dyn ClusterOps>,
	pub alias: String,
}

/// One versioned unit of index schema work.
///
/// `migrate` may be called many times. `completed` must be a side-effect-free check of the
/// cluster and the persisted state.
pub trait Migration
where
	Self: Send + Sync,
{
	fn version(&self) -> i64;

	fn name(&self) -> &'static str;

	fn options(&self) -> MigrationOptions {
		MigrationOptions::default()
	}

	/// Free bytes the cluster must have before the first run.
	fn space_required<'a>(
		&'a self,
		_ctx: &'a MigrationContext,
	) -> BoxFuture<'a, color_eyre::Result<Option<u64>>> {
		Box::pin(async { Ok(None) })
	}

	fn migrate<'a>(
		&'a self,
		ctx: &'a MigrationContext,
		state: &'a mut MigrationState,
	) -> BoxFuture<'a, color_eyre::Result<()>>;

	fn completed<'a>(
		&'a self,
		ctx: &'a MigrationContext,
		state: &'a MigrationState,
	) -> BoxFuture<'a, color_eyre::Result<bool>>;
}

/// Registered migrations in ascending version order.
#[derive(Clone, Default)]
pub struct MigrationRegistry {
	migrations: Vec<Arc<dyn Migration>>,
}
impl MigrationRegistry {
	pub fn new(mut migrations: Vec<Arc<dyn Migration>>) -> Self {
		migrations.sort_by_key(|migration| migration.version());

		Self { migrations }
	}

	pub fn builtin() -> Self {
		let migrations: Vec<Arc<dyn Migration>> =
			vec![Arc::new(BackfillProjectArchived), Arc::new(ReindexBlobsWithPathAnalyzer)];

		Self::new(migrations)
	}

	pub fn versions(&self) -> impl Iterator<Item = i64> + '_ {
		self.migrations.iter().map(|migration| migration.version())
	}

	pub fn next_pending(
		&self,
		records: &HashMap<i64, MigrationRecord>,
	) -> Option<Arc<dyn Migration>> {
		let version = migration::next_pending_version(self.versions(), records)?;

		self.migrations.iter().find(|migration| migration.version() == version).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_registry_is_ordered() {
		let registry = MigrationRegistry::builtin();
		let versions: Vec<i64> = registry.versions().collect();

		assert_eq!(versions, [BackfillProjectArchived::VERSION, ReindexBlobsWithPathAnalyzer::VERSION]);
		assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
	}

	#[test]
	fn next_pending_moves_past_completed_records() {
		let registry = MigrationRegistry::builtin();
		let mut records = HashMap::new();

		assert_eq!(
			registry.next_pending(&records).map(|migration| migration.version()),
			Some(BackfillProjectArchived::VERSION)
		);

		let mut done = MigrationRecord::pending(BackfillProjectArchived::VERSION, "done");

		done.completed = true;
		records.insert(done.version, done);

		assert_eq!(
			registry.next_pending(&records).map(|migration| migration.name()),
			Some("ReindexBlobsWithPathAnalyzer")
		);
	}
}
