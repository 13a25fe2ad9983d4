use std::time::Duration;

/// Counters for one run. Owned by the single driving flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub num_pages: usize,
    pub num_rows: usize,
    pub num_rows_with_link: usize,
    pub num_rows_kept: usize,
    pub num_items_ok: usize,
    pub num_items_failed: usize,
}

impl Statistics {
    pub fn record_page(&mut self, page: &PageStats) {
        self.num_pages += 1;
        self.num_rows += page.rows_total;
        self.num_rows_with_link += page.rows_with_link;
        self.num_rows_kept += page.rows_kept;
    }

    pub fn record_item(&mut self, ok: bool) {
        if ok {
            self.num_items_ok += 1;
        } else {
            self.num_items_failed += 1;
        }
    }

    pub fn write_to_log(&self, running_time: Duration) {
        tracing::info!(
            num_pages = self.num_pages,
            num_rows = self.num_rows,
            num_rows_with_link = self.num_rows_with_link,
            num_rows_kept = self.num_rows_kept,
            num_items_ok = self.num_items_ok,
            num_items_failed = self.num_items_failed,
            running_time = ?running_time,
            "statistics"
        );
    }
}

/// Row counts for a single listing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub rows_total: usize,
    pub rows_with_link: usize,
    pub rows_kept: usize,
}
