/// Hard ceiling on matches fetched from Zoekt and on any reported total.
pub const RESULT_CEILING: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
	page: u32,
	per_page: u32,
	total_count: u64,
	dropped: u64,
}
impl PageWindow {
	pub fn new(page: u32, per_page: u32) -> Self {
		Self { page: page.max(1), per_page, total_count: 0, dropped: 0 }
	}

	/// Records the server-reported match count, clamped to [`RESULT_CEILING`].
	pub fn with_server_total(mut self, match_count: u64) -> Self {
		self.total_count = match_count.min(RESULT_CEILING);

		self
	}

	/// Removes one unsurfaced result from the total.
	pub fn drop_one(&mut self) {
		self.dropped += 1;
		self.total_count = self.total_count.saturating_sub(1);
	}

	pub fn page(&self) -> u32 {
		self.page
	}

	pub fn per_page(&self) -> u32 {
		self.per_page
	}

	pub fn offset(&self) -> u64 {
		(u64::from(self.page) - 1) * u64::from(self.per_page)
	}

	pub fn limit(&self) -> u32 {
		self.per_page
	}

	pub fn total_count(&self) -> u64 {
		self.total_count
	}

	pub fn dropped(&self) -> u64 {
		self.dropped
	}

	pub fn total_pages(&self) -> u64 {
		if self.per_page == 0 {
			return 0;
		}

		self.total_count.div_ceil(u64::from(self.per_page))
	}

	pub fn formatted_total(&self) -> String {
		format_count(self.total_count)
	}
}

pub fn format_count(count: u64) -> String {
	if count >= RESULT_CEILING { format!("{RESULT_CEILING}+") } else { count.to_string() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn total_is_clamped_and_formatted() {
		for (reported, expected, display) in [
			(0, 0, "0"),
			(7, 7, "7"),
			(4_999, 4_999, "4999"),
			(5_000, 5_000, "5000+"),
			(120_000, 5_000, "5000+"),
		] {
			let window = PageWindow::new(1, 20).with_server_total(reported);

			assert_eq!(window.total_count(), expected, "reported {reported}");
			assert_eq!(window.formatted_total(), display, "reported {reported}");
		}
	}

	#[test]
	fn dropping_results_lowers_the_total() {
		let mut window = PageWindow::new(2, 10).with_server_total(5_400);

		window.drop_one();
		window.drop_one();

		assert_eq!(window.offset(), 10);
		assert_eq!(window.total_count(), 4_998);
		assert_eq!(window.dropped(), 2);
		assert_eq!(window.formatted_total(), "4998");
		assert_eq!(window.total_pages(), 500);
	}

	#[test]
	fn total_never_underflows() {
		let mut window = PageWindow::new(1, 5);

		window.drop_one();

		assert_eq!(window.total_count(), 0);
	}
}
