use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
	Elasticsearch,
	Opensearch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterVersion {
	pub distribution: Distribution,
	pub number: String,
}
impl ClusterVersion {
	/// `distribution` is the `version.distribution` field of the root endpoint, absent on
	/// Elasticsearch.
	pub fn new(distribution: Option<&str>, number: &str) -> Self {
		let distribution = match distribution {
			Some(name) if name.eq_ignore_ascii_case("opensearch") => Distribution::Opensearch,
			_ => Distribution::Elasticsearch,
		};

		Self { distribution, number: number.to_string() }
	}

	pub fn major(&self) -> Option<u32> {
		self.number.split('.').next()?.trim().parse().ok()
	}

	pub fn is_supported(&self) -> bool {
		match (self.distribution, self.major()) {
			(Distribution::Elasticsearch, Some(major)) => (7..=8).contains(&major),
			(Distribution::Opensearch, Some(major)) => (1..=2).contains(&major),
			(_, None) => false,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}
impl HealthStatus {
	/// Maps the `_cluster/health` color. Unknown colors count as unhealthy.
	pub fn from_color(color: &str) -> Self {
		match color {
			"green" => Self::Healthy,
			"yellow" => Self::Degraded,
			_ => Self::Unhealthy,
		}
	}

	pub fn allows_work(self) -> bool {
		!matches!(self, Self::Unhealthy)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterHealthSnapshot {
	pub version: ClusterVersion,
	pub version_supported: bool,
	pub free_bytes: u64,
	pub health: HealthStatus,
	pub reindexing_in_progress: bool,
}
