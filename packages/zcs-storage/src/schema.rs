pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_namespaces.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_namespaces.sql")),
				"tables/002_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_projects.sql")),
				"tables/003_routes.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_routes.sql")),
				"tables/004_zoekt_nodes.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_zoekt_nodes.sql")),
				"tables/005_zoekt_indexed_namespaces.sql" => out
					.push_str(include_str!("../../../sql/tables/005_zoekt_indexed_namespaces.sql")),
				"tables/006_zoekt_indexing_tasks.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_zoekt_indexing_tasks.sql")),
				"tables/007_search_migrations.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_search_migrations.sql")),
				"tables/008_search_leases.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_search_leases.sql")),
				"tables/009_search_settings.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_search_settings.sql")),
				"tables/010_feature_flags.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_feature_flags.sql")),
				"tables/011_search_reindexing_tasks.sql" => out
					.push_str(include_str!("../../../sql/tables/011_search_reindexing_tasks.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_include_is_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS search_leases"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS search_reindexing_tasks"));
	}
}
