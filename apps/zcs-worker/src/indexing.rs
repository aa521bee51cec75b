use std::mem;

use color_eyre::{Report, Result};
use reqwest::Url;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};

use zcs_index::zoekt::{self, GitalyConnectionInfo, IndexPayload, ZoektClient};
use zcs_storage::{db::Db, models::IndexingTask, nodes, outbox, projects, settings};

const RETRY_BASE_MS: i64 = 500;
const RETRY_CAP_MS: i64 = 30_000;
const MAX_TASK_ERROR_CHARS: usize = 1_024;
const REDACTED: &str = "[REDACTED]";
const SECRET_KEYS: [&str; 5] = ["api_key", "passwd", "password", "secret", "token"];

/// Claims and runs at most one indexing task. Returns whether a task was claimed.
pub async fn process_next_task(
	db: &Db,
	zoekt: &ZoektClient,
	cfg: &zcs_config::Config,
) -> Result<bool> {
	let search_settings = settings::search_settings(db).await?;

	if !search_settings.indexing_enabled || search_settings.indexing_paused {
		return Ok(false);
	}

	let now = OffsetDateTime::now_utc();
	let lease = Duration::seconds(cfg.indexing.claim_lease_secs);
	let Some(task) = outbox::claim_next_task(db, now, lease).await? else {
		return Ok(false);
	};

	match index_project(db, zoekt, cfg, &task).await {
		Ok(()) => {
			outbox::mark_task_done(db, task.task_id).await?;
		},
		Err(err) => {
			let attempts = task.attempts.saturating_add(1);
			let available_at = OffsetDateTime::now_utc() + retry_delay(attempts);
			let error_text = task_error_text(&err);

			outbox::mark_task_failed(db, task.task_id, attempts, &error_text, available_at).await?;

			error!(
				error = %error_text,
				task_id = %task.task_id,
				project_id = task.project_id,
				"Indexing task failed."
			);
		},
	}

	Ok(true)
}

async fn index_project(
	db: &Db,
	zoekt: &ZoektClient,
	cfg: &zcs_config::Config,
	task: &IndexingTask,
) -> Result<()> {
	let Some(project) = projects::find_project(db, task.project_id).await? else {
		info!(project_id = task.project_id, "Project missing for indexing task. Marking done.");

		return Ok(());
	};

	if project.pending_delete {
		info!(project_id = project.id, "Project is pending deletion. Skipping index.");

		return Ok(());
	}

	let node = match projects::root_namespace_id(db, project.id).await? {
		Some(namespace_id) => nodes::node_for_namespace(db, namespace_id).await?,
		None => None,
	};
	let Some(node) = node else {
		info!(project_id = project.id, "No Zoekt node serves the project namespace. Marking done.");

		return Ok(());
	};
	let payload = IndexPayload {
		repo_id: project.id,
		gitaly_connection_info: GitalyConnectionInfo {
			address: cfg.indexing.gitaly_address.clone(),
			storage: project.repository_storage.clone(),
			path: project.disk_path.clone(),
		},
		file_size_limit: cfg.indexing.file_size_limit_bytes,
		timeout: format!("{}s", cfg.indexing.timeout_secs),
	};
	let url = zoekt::join_url(&node.index_base_url, &cfg.zoekt.index_path);

	zoekt.index_repository(&url, &payload).await?;

	info!(project_id = project.id, node_id = node.id, "Indexed project on Zoekt node.");

	Ok(())
}

/// 500 ms for the first failure, doubling up to 30 s.
fn retry_delay(attempts: i32) -> Duration {
	let doublings = attempts.saturating_sub(1).clamp(0, 16) as u32;

	Duration::milliseconds((RETRY_BASE_MS << doublings).min(RETRY_CAP_MS))
}

/// One line for `last_error`: the report chain with credentials scrubbed, bounded in length.
///
/// Failures mostly come from reqwest, whose messages embed the node URL, so URLs lose their
/// userinfo and query string.
fn task_error_text(err: &Report) -> String {
	let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(": ");
	let mut redact_next = false;
	let words: Vec<String> = chain
		.split_whitespace()
		.map(|word| {
			if mem::take(&mut redact_next) {
				return REDACTED.to_string();
			}

			redact_next = word.eq_ignore_ascii_case("bearer") || word.eq_ignore_ascii_case("basic");

			scrub_word(word)
		})
		.collect();
	let text = words.join(" ");

	match text.char_indices().nth(MAX_TASK_ERROR_CHARS) {
		Some((cut, _)) => format!("{}...", &text[..cut]),
		None => text,
	}
}

fn scrub_word(word: &str) -> String {
	let core = word.trim_matches(|c: char| matches!(c, '(' | ')' | ',' | '.' | '"' | '\''));

	if let Ok(mut url) = Url::parse(core)
		&& url.has_host()
	{
		let _ = url.set_username("");
		let _ = url.set_password(None);

		url.set_query(None);
		url.set_fragment(None);

		return word.replacen(core, url.as_str(), 1);
	}
	if let Some(sep) = word.find(['=', ':'])
		&& sep + 1 < word.len()
	{
		let key = word[..sep].to_ascii_lowercase();

		if SECRET_KEYS.iter().any(|secret| key.contains(secret)) {
			return format!("{}{REDACTED}", &word[..=sep]);
		}
	}

	word.to_string()
}
