#![allow(dead_code)]

use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use catalogcrawler::{DetailFields, DetailView, ListingRow, ListingView, NextControl, PageState};
use tokio::time::Instant;

pub const LISTING_URL: &str = "https://parts.example.com/parts/basic_parts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeError(pub String);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("FakeError: {}", self.0))
    }
}

impl std::error::Error for FakeError {}

pub fn row(key: &str) -> ListingRow {
    ListingRow::new(format!("{} Basic part", key), format!("/partdetail/{}", key))
}

pub fn fields(package: &str, description: &str, stock: &str) -> DetailFields {
    DetailFields {
        package: package.to_string(),
        description: description.to_string(),
        stock: stock.to_string(),
        ..Default::default()
    }
}

/// Listing served from fixed pages.
#[derive(Debug, Default)]
pub struct FakeListing {
    pub pages: Vec<Vec<ListingRow>>,
    /// Keep offering a next page, cycling through `pages`.
    pub endless: bool,
    pub fail_goto: bool,
    pub fail_toggle: bool,
    /// Reading rows fails from this page index on.
    pub rows_fail_from: Option<usize>,
    /// The remaining counter ignores the filter.
    pub counter_stuck: bool,
    /// Apply is shown but never reports enabled.
    pub apply_disabled: bool,
    /// The pager keeps showing page 1 as active.
    pub active_page_stuck: bool,
    pub page: usize,
    pub filtered: bool,
    pub toggles: u32,
    pub apply_clicks: u32,
    pub next_clicks: u32,
}

impl FakeListing {
    pub fn new(pages: Vec<Vec<ListingRow>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ListingView for FakeListing {
    type Error = FakeError;

    async fn goto(&mut self, url: &str) -> Result<(), Self::Error> {
        if self.fail_goto {
            return Err(FakeError(format!("cannot reach {}", url)));
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, Self::Error> {
        Ok(LISTING_URL.to_string())
    }

    async fn page_state(&self) -> Result<PageState, Self::Error> {
        Ok(PageState {
            rows: 20,
            loading: false,
        })
    }

    async fn remaining_text(&self) -> Result<Option<String>, Self::Error> {
        let remaining = if self.filtered && !self.counter_stuck {
            "5"
        } else {
            "1,200"
        };
        Ok(Some(format!("Results remaining: {}", remaining)))
    }

    async fn toggle_filter(&mut self) -> Result<(), Self::Error> {
        self.toggles += 1;
        if self.fail_toggle {
            return Err(FakeError("filter checkbox detached".to_string()));
        }
        self.filtered = true;
        Ok(())
    }

    async fn apply_enabled(&self) -> Result<Option<bool>, Self::Error> {
        Ok(Some(self.filtered && !self.apply_disabled))
    }

    async fn click_apply(&mut self) -> Result<(), Self::Error> {
        self.apply_clicks += 1;
        Ok(())
    }

    async fn rows(&self) -> Result<Vec<ListingRow>, Self::Error> {
        if matches!(self.rows_fail_from, Some(from) if self.page >= from) {
            return Err(FakeError("table went away".to_string()));
        }
        Ok(self.pages[self.page % self.pages.len()].clone())
    }

    async fn next_control(&self) -> Result<NextControl, Self::Error> {
        Ok(if self.endless || self.page + 1 < self.pages.len() {
            NextControl::Enabled
        } else {
            NextControl::Disabled
        })
    }

    async fn active_page(&self) -> Result<Option<u32>, Self::Error> {
        if self.active_page_stuck {
            return Ok(Some(1));
        }
        Ok(Some(self.page as u32 + 1))
    }

    async fn click_next(&mut self) -> Result<(), Self::Error> {
        self.next_clicks += 1;
        self.page += 1;
        Ok(())
    }
}

/// Detail view replaying a script: navigation fails a number of times, then
/// each read within an attempt returns the next entry (the last one repeats).
#[derive(Debug)]
pub struct ScriptedDetail {
    pub navigation_failures: u32,
    pub navigation_error: String,
    pub reads: Vec<Result<DetailFields, String>>,
    pub download: Result<Option<String>, String>,
    pub read_index: usize,
    pub gotos: u32,
    pub goto_times: Vec<Instant>,
    pub extracts: u32,
    pub downloads: u32,
}

impl ScriptedDetail {
    pub fn new(reads: Vec<Result<DetailFields, String>>) -> Self {
        Self {
            navigation_failures: 0,
            navigation_error: "timeout".to_string(),
            reads,
            download: Ok(None),
            read_index: 0,
            gotos: 0,
            goto_times: Vec::new(),
            extracts: 0,
            downloads: 0,
        }
    }

    pub fn always(fields: DetailFields) -> Self {
        Self::new(vec![Ok(fields)])
    }
}

#[async_trait]
impl DetailView for ScriptedDetail {
    type Error = FakeError;

    async fn goto(&mut self, url: &str) -> Result<(), Self::Error> {
        self.gotos += 1;
        self.goto_times.push(Instant::now());
        self.read_index = 0;
        if self.navigation_failures > 0 {
            self.navigation_failures -= 1;
            return Err(FakeError(format!("{} opening {}", self.navigation_error, url)));
        }
        Ok(())
    }

    async fn extract(&mut self) -> Result<DetailFields, Self::Error> {
        self.extracts += 1;
        let index = self.read_index.min(self.reads.len() - 1);
        self.read_index += 1;
        self.reads[index].clone().map_err(FakeError)
    }

    async fn capture_download_link(&mut self) -> Result<Option<String>, Self::Error> {
        self.downloads += 1;
        self.download.clone().map_err(FakeError)
    }
}

/// Detail pages by URL. Unknown URLs fail to load.
#[derive(Debug, Default)]
pub struct CatalogDetail {
    pub pages: HashMap<String, DetailFields>,
    pub current: Option<DetailFields>,
}

impl CatalogDetail {
    pub fn with_page(mut self, key: &str, fields: DetailFields) -> Self {
        self.pages
            .insert(format!("https://parts.example.com/partdetail/{}", key), fields);
        self
    }
}

#[async_trait]
impl DetailView for CatalogDetail {
    type Error = FakeError;

    async fn goto(&mut self, url: &str) -> Result<(), Self::Error> {
        match self.pages.get(url) {
            Some(fields) => {
                self.current = Some(fields.clone());
                Ok(())
            }
            None => {
                self.current = None;
                Err(FakeError(format!("404 at {}", url)))
            }
        }
    }

    async fn extract(&mut self) -> Result<DetailFields, Self::Error> {
        self.current
            .clone()
            .ok_or_else(|| FakeError("nothing loaded".to_string()))
    }

    async fn capture_download_link(&mut self) -> Result<Option<String>, Self::Error> {
        Ok(None)
    }
}
