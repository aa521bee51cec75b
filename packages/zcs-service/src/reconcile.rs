//! Turns a decoded page into blobs the caller may see.
//!
//! Projects are resolved once per page. A match whose project is gone or pending deletion is
//! dropped and the reported total shrinks by one, so later pages stay consistent with what was
//! actually shown.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::{ProjectDirectory, Result};
use zcs_domain::{
	blob::{DecodedMatch, FoundBlob, ProjectRef},
	page::PageWindow,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
	pub blobs: Vec<FoundBlob>,
	pub window: PageWindow,
}

pub async fn reconcile_page(
	directory: &dyn ProjectDirectory,
	matches: Vec<DecodedMatch>,
	window: PageWindow,
	with_routes: bool,
) -> Result<Reconciled> {
	if matches.is_empty() {
		return Ok(Reconciled { blobs: Vec::new(), window });
	}

	let ids = distinct_project_ids(&matches);
	let projects = directory.find_projects(&ids, with_routes).await?;

	Ok(reconcile(matches, &projects, window))
}

pub fn reconcile(
	matches: Vec<DecodedMatch>,
	projects: &HashMap<i64, ProjectRef>,
	mut window: PageWindow,
) -> Reconciled {
	let mut blobs = Vec::with_capacity(matches.len());

	for decoded in matches {
		let Some(project) = projects.get(&decoded.project_id).filter(|project| project.is_searchable())
		else {
			debug!(project_id = decoded.project_id, path = %decoded.path, "Dropped match for unavailable project.");

			window.drop_one();

			continue;
		};
		let mut blob = FoundBlob::from_match(decoded);

		blob.attach_project(project.clone());
		blobs.push(blob);
	}

	Reconciled { blobs, window }
}

fn distinct_project_ids(matches: &[DecodedMatch]) -> Vec<i64> {
	matches.iter().map(|m| m.project_id).collect::<BTreeSet<_>>().into_iter().collect()
}
