use zcs_domain::{
	page::{PageWindow, RESULT_CEILING, format_count},
	query::{ProjectScope, QueryReject, SearchFilters, SearchQuery, SearchQueryInput, SortOrder},
};

fn input() -> SearchQueryInput {
	SearchQueryInput {
		query: "needle".to_string(),
		scope: ProjectScope::Only(vec![1, 2]),
		node_id: Some(3),
		page: 1,
		per_page: 20,
		sort: SortOrder::DocumentRank,
		filters: SearchFilters::default(),
	}
}

#[test]
fn rejects_invalid_queries() {
	let cases: [(fn(&mut SearchQueryInput), QueryReject); 5] = [
		(|raw| raw.query = "   ".to_string(), QueryReject::EmptyQuery),
		(|raw| raw.scope = ProjectScope::Only(Vec::new()), QueryReject::EmptyProjectScope),
		(|raw| raw.page = 0, QueryReject::InvalidPage),
		(|raw| raw.per_page = 0, QueryReject::InvalidPerPage),
		(|raw| raw.per_page = 101, QueryReject::PerPageTooLarge),
	];

	for (mutate, expected) in cases {
		let mut raw = input();

		mutate(&mut raw);

		assert_eq!(SearchQuery::new(raw, 100), Err(expected));
	}
}

#[test]
fn accepted_query_keeps_request_fields() {
	let query = SearchQuery::new(input(), 100).expect("Query must be valid.");

	assert_eq!(query.node_id(), Some(3));
	assert_eq!(query.sort(), SortOrder::DocumentRank);
	assert_eq!(query.offset(), 0);
}

#[test]
fn query_offset_matches_page_window_offset() {
	for (page, per_page) in [(1, 1), (2, 20), (7, 13), (250, 20)] {
		let mut raw = input();

		raw.page = page;
		raw.per_page = per_page;

		let query = SearchQuery::new(raw, 100).expect("Query must be valid.");
		let window = PageWindow::new(page, per_page);

		assert_eq!(query.offset(), window.offset());
		assert_eq!(window.offset(), u64::from(page - 1) * u64::from(per_page));
	}
}

#[test]
fn displayed_total_is_min_of_reported_and_ceiling() {
	for reported in [0_u64, 1, 999, RESULT_CEILING - 1, RESULT_CEILING, RESULT_CEILING * 3] {
		let window = PageWindow::new(1, 20).with_server_total(reported);

		assert_eq!(window.total_count(), reported.min(RESULT_CEILING));
		assert_eq!(window.formatted_total().ends_with('+'), reported >= RESULT_CEILING);
	}

	assert_eq!(format_count(5_000), "5000+");
}
