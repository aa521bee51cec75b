//! Sets `archived = false` on project documents indexed before the field existed.

use std::time::Duration;

use color_eyre::eyre;
use serde_json::{Value, json};
use tracing::info;

use crate::{
	BoxFuture,
	migrations::{Migration, MigrationContext, MigrationOptions},
};
use zcs_domain::migration::MigrationState;

/// Documents touched by one update-by-query task.
const BATCH_SIZE: u64 = 10_000;

pub struct BackfillProjectArchived;
impl BackfillProjectArchived {
	pub const VERSION: i64 = 20_240_115_120_000;

	fn missing_field_query() -> Value {
		json!({
			"bool": {
				"filter": [{ "term": { "type": "project" } }],
				"must_not": [{ "exists": { "field": "archived" } }],
			}
		})
	}

	fn script() -> Value {
		json!({
			"lang": "painless",
			"source": "ctx._source.archived = params.archived",
			"params": { "archived": false },
		})
	}
}
impl Migration for BackfillProjectArchived {
	fn version(&self) -> i64 {
		Self::VERSION
	}

	fn name(&self) -> &'static str {
		"BackfillProjectArchived"
	}

	fn options(&self) -> MigrationOptions {
		MigrationOptions {
			batched: true,
			retry_on_failure: true,
			max_attempts: 3,
			throttle_delay: Duration::from_secs(60),
			pause_indexing: false,
		}
	}

	fn migrate<'a>(
		&'a self,
		ctx: &'a MigrationContext,
		state: &'a mut MigrationState,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			let query = Self::missing_field_query();

			if let Some(task_id) = state.task_id.clone() {
				let status = ctx.cluster.task_status(&task_id).await?;

				if !status.completed {
					info!(task_id = %task_id, "Archived backfill batch is still running.");

					return Ok(());
				}

				state.task_id = None;

				if !status.failures.is_empty() {
					return Err(eyre::eyre!(
						"Update by query task {task_id} failed: {}.",
						status.failures.join("; ")
					));
				}
			}

			let remaining = ctx.cluster.count(&ctx.alias, &query).await?;

			state.documents_remaining = Some(remaining);

			if remaining == 0 {
				return Ok(());
			}

			let task_id =
				ctx.cluster.update_by_query(&ctx.alias, &query, &Self::script(), BATCH_SIZE).await?;

			info!(task_id = %task_id, remaining, "Started archived backfill batch.");

			state.task_id = Some(task_id);

			Ok(())
		})
	}

	fn completed<'a>(
		&'a self,
		ctx: &'a MigrationContext,
		state: &'a MigrationState,
	) -> BoxFuture<'a, color_eyre::Result<bool>> {
		Box::pin(async move {
			if state.task_id.is_some() {
				return Ok(false);
			}

			Ok(ctx.cluster.count(&ctx.alias, &Self::missing_field_query()).await? == 0)
		})
	}
}
