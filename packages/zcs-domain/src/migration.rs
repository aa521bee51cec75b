//! Persisted migration bookkeeping.
//!
//! A record is keyed by migration version. Its state blob only grows by additive keys, so
//! unknown keys are carried through `extra` untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationState {
	pub previous_attempts: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub task_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub documents_remaining: Option<u64>,
	/// `Some(true)` only when this migration performed the pause itself.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pause_indexing: Option<bool>,
	pub halted: bool,
	pub failed: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub halted_indexing_unpaused: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl MigrationState {
	pub fn halt(&mut self) {
		self.halted = true;
		self.halted_indexing_unpaused = Some(false);
	}

	pub fn fail(&mut self, message: impl Into<String>) {
		self.halt();

		self.failed = true;
		self.last_error = Some(message.into());
	}

	pub fn extra_str(&self, key: &str) -> Option<&str> {
		self.extra.get(key).and_then(Value::as_str)
	}

	pub fn extra_bool(&self, key: &str) -> bool {
		self.extra.get(key).and_then(Value::as_bool).unwrap_or(false)
	}

	pub fn set_extra(&mut self, key: &str, value: impl Into<Value>) {
		self.extra.insert(key.to_string(), value.into());
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
	Pending,
	Started,
	Retrying,
	Halted,
	Failed,
	Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRecord {
	pub version: i64,
	pub name: String,
	pub started: bool,
	pub completed: bool,
	pub state: MigrationState,
	#[serde(with = "crate::time_serde::option")]
	pub updated_at: Option<OffsetDateTime>,
}
impl MigrationRecord {
	pub fn pending(version: i64, name: &str) -> Self {
		Self {
			version,
			name: name.to_string(),
			started: false,
			completed: false,
			state: MigrationState::default(),
			updated_at: None,
		}
	}

	pub fn phase(&self) -> MigrationPhase {
		if self.completed {
			MigrationPhase::Completed
		} else if self.state.failed {
			MigrationPhase::Failed
		} else if self.state.halted {
			MigrationPhase::Halted
		} else if !self.started {
			MigrationPhase::Pending
		} else if self.state.previous_attempts > 0 {
			MigrationPhase::Retrying
		} else {
			MigrationPhase::Started
		}
	}

	pub fn is_halted(&self) -> bool {
		self.state.halted
	}
}

/// Picks the first version, in ascending order, whose record is not completed.
///
/// A halted migration is still returned: it blocks every later migration until it is cleared.
pub fn next_pending_version(
	versions: impl IntoIterator<Item = i64>,
	records: &HashMap<i64, MigrationRecord>,
) -> Option<i64> {
	let mut versions: Vec<i64> = versions.into_iter().collect();

	versions.sort_unstable();

	versions
		.into_iter()
		.find(|version| records.get(version).map(|record| !record.completed).unwrap_or(true))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn state_round_trips_unknown_keys() {
		let raw = serde_json::json!({
			"previous_attempts": 2,
			"task_id": "node:42",
			"target_index": "blobs-20240301",
		});
		let state: MigrationState = serde_json::from_value(raw).expect("State must parse.");

		assert_eq!(state.previous_attempts, 2);
		assert_eq!(state.task_id.as_deref(), Some("node:42"));
		assert_eq!(state.extra_str("target_index"), Some("blobs-20240301"));

		let encoded = serde_json::to_value(&state).expect("State must encode.");

		assert_eq!(encoded["target_index"], "blobs-20240301");
		assert!(encoded.get("pause_indexing").is_none());
	}

	#[test]
	fn phase_reflects_state() {
		let mut record = MigrationRecord::pending(1, "First");

		assert_eq!(record.phase(), MigrationPhase::Pending);

		record.started = true;

		assert_eq!(record.phase(), MigrationPhase::Started);

		record.state.previous_attempts = 1;

		assert_eq!(record.phase(), MigrationPhase::Retrying);

		record.state.fail("boom");

		assert_eq!(record.phase(), MigrationPhase::Failed);
		assert_eq!(record.state.halted_indexing_unpaused, Some(false));
	}

	#[test]
	fn next_pending_skips_completed_and_stops_at_halted() {
		let mut records = HashMap::new();
		let mut done = MigrationRecord::pending(10, "Done");

		done.completed = true;
		records.insert(10, done);

		let mut halted = MigrationRecord::pending(20, "Halted");

		halted.state.halt();
		records.insert(20, halted);

		assert_eq!(next_pending_version([30, 10, 20], &records), Some(20));
		assert_eq!(next_pending_version([10], &records), None);
		assert_eq!(next_pending_version([10, 40], &records), Some(40));
	}
}
