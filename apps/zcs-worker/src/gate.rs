//! Pre-flight checks that decide whether migration work may touch the cluster.
//!
//! Checks run in a fixed order and stop at the first failure. Nothing is cached between ticks.

use tracing::{error, warn};

use crate::{
	Result,
	backends::{ClusterOps, SettingsStore},
};
use zcs_storage::settings::SEARCH_MIGRATION_WORKER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
	Proceed,
	Blocked(BlockReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
	WorkerDisabled,
	IndexingDisabled,
	AliasMissing,
	ReindexingInFlight,
	/// Indexing is paused as a side effect.
	UnsupportedVersion,
	ClusterUnhealthy,
}

pub async fn evaluate(
	settings: &dyn SettingsStore,
	cluster: &dyn ClusterOps,
	alias: &str,
) -> Result<GateDecision> {
	if !settings.feature_enabled(SEARCH_MIGRATION_WORKER).await? {
		return Ok(GateDecision::Blocked(BlockReason::WorkerDisabled));
	}
	if !settings.search_settings().await?.indexing_enabled {
		return Ok(GateDecision::Blocked(BlockReason::IndexingDisabled));
	}
	if !cluster.alias_exists(alias).await? {
		return Ok(GateDecision::Blocked(BlockReason::AliasMissing));
	}
	if settings.reindexing_in_progress().await? {
		return Ok(GateDecision::Blocked(BlockReason::ReindexingInFlight));
	}

	let version = cluster.version().await?;

	if !version.is_supported() {
		warn!(
			distribution = ?version.distribution,
			version = %version.number,
			"Cluster version is not supported. Pausing indexing."
		);

		settings.set_indexing_paused(true).await?;

		return Ok(GateDecision::Blocked(BlockReason::UnsupportedVersion));
	}

	let health = cluster.health().await?;

	if !health.allows_work() {
		error!(health = ?health, "Cluster is unhealthy. Skipping migration work.");

		return Ok(GateDecision::Blocked(BlockReason::ClusterUnhealthy));
	}

	Ok(GateDecision::Proceed)
}
