//! Rebuilds the blob index with a path-hierarchy analyzer and moves the alias to it.
//!
//! Progress lives in the migration state: the target index name, the indices the alias pointed
//! at when the copy started, the `_reindex` task id, and whether the alias was switched.

use std::time::Duration;

use color_eyre::eyre;
use serde_json::{Value, json};
use tracing::info;

use crate::{
	BoxFuture,
	migrations::{Migration, MigrationContext, MigrationOptions},
};
use zcs_domain::migration::MigrationState;

const TARGET_INDEX: &str = "target_index";
const SOURCE_INDICES: &str = "source_indices";
const ALIAS_SWITCHED: &str = "alias_switched";

pub struct ReindexBlobsWithPathAnalyzer;
impl ReindexBlobsWithPathAnalyzer {
	pub const VERSION: i64 = 20_240_301_090_000;

	fn target_index(&self, alias: &str) -> String {
		format!("{alias}-{}", Self::VERSION)
	}

	fn index_body() -> Value {
		json!({
			"settings": {
				"analysis": {
					"analyzer": {
						"path_analyzer": {
							"type": "custom",
							"tokenizer": "path_tokenizer",
							"filter": ["lowercase", "asciifolding"],
						}
					},
					"tokenizer": {
						"path_tokenizer": { "type": "path_hierarchy", "reverse": true }
					},
				}
			},
			"mappings": {
				"properties": {
					"blob": {
						"properties": {
							"path": { "type": "text", "analyzer": "path_analyzer" },
							"file_name": { "type": "text", "analyzer": "path_analyzer" },
						}
					}
				}
			},
		})
	}

	async fn start_copy(
		&self,
		ctx: &MigrationContext,
		state: &mut MigrationState,
	) -> color_eyre::Result<()> {
		let target = match state.extra_str(TARGET_INDEX) {
			Some(target) => target.to_string(),
			None => self.target_index(&ctx.alias),
		};
		let sources: Vec<String> = ctx
			.cluster
			.alias_targets(&ctx.alias)
			.await?
			.into_iter()
			.filter(|index| index != &target)
			.collect();

		if sources.is_empty() {
			return Err(eyre::eyre!("Alias {} points at no index to copy from.", ctx.alias));
		}
		if !ctx.cluster.index_exists(&target).await? {
			ctx.cluster.create_index(&target, &Self::index_body()).await?;
		}

		let task_id = ctx.cluster.reindex(&ctx.alias, &target).await?;

		info!(task_id = %task_id, target = %target, "Started blob reindex.");

		state.set_extra(TARGET_INDEX, target);
		state.set_extra(SOURCE_INDICES, sources);
		state.task_id = Some(task_id);

		Ok(())
	}
}
impl Migration for ReindexBlobsWithPathAnalyzer {
	fn version(&self) -> i64 {
		Self::VERSION
	}

	fn name(&self) -> &'static str {
		"ReindexBlobsWithPathAnalyzer"
	}

	fn options(&self) -> MigrationOptions {
		MigrationOptions {
			batched: true,
			retry_on_failure: true,
			max_attempts: 3,
			throttle_delay: Duration::from_secs(30),
			pause_indexing: true,
		}
	}

	/// The copy needs as much free space as the current index occupies.
	fn space_required<'a>(
		&'a self,
		ctx: &'a MigrationContext,
	) -> BoxFuture<'a, color_eyre::Result<Option<u64>>> {
		Box::pin(async move { Ok(Some(ctx.cluster.index_size_bytes(&ctx.alias).await?)) })
	}

	fn migrate<'a>(
		&'a self,
		ctx: &'a MigrationContext,
		state: &'a mut MigrationState,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			if state.extra_bool(ALIAS_SWITCHED) {
				return Ok(());
			}

			let Some(task_id) = state.task_id.clone() else {
				return self.start_copy(ctx, state).await;
			};
			let status = ctx.cluster.task_status(&task_id).await?;

			if !status.completed {
				info!(task_id = %task_id, "Blob reindex is still running.");

				return Ok(());
			}
			if !status.failures.is_empty() {
				state.task_id = None;

				return Err(eyre::eyre!(
					"Reindex task {task_id} failed: {}.",
					status.failures.join("; ")
				));
			}

			let target = state
				.extra_str(TARGET_INDEX)
				.map(str::to_string)
				.ok_or_else(|| eyre::eyre!("Reindex state is missing {TARGET_INDEX}."))?;
			let sources: Vec<String> = match state.extra.get(SOURCE_INDICES) {
				Some(value) => serde_json::from_value(value.clone())?,
				None => Vec::new(),
			};

			ctx.cluster.switch_alias(&ctx.alias, &sources, &target).await?;

			info!(alias = %ctx.alias, target = %target, "Switched alias to the reindexed blobs.");

			state.set_extra(ALIAS_SWITCHED, true);

			Ok(())
		})
	}

	fn completed<'a>(
		&'a self,
		_ctx: &'a MigrationContext,
		state: &'a MigrationState,
	) -> BoxFuture<'a, color_eyre::Result<bool>> {
		Box::pin(async move { Ok(state.extra_bool(ALIAS_SWITCHED)) })
	}
}
