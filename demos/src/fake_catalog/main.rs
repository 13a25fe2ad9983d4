use std::{path::PathBuf, time::Duration};

use catalogcrawler::{
    crawler::{CrawlerOptions, Throttle},
    report, Crawler, ReportWriter, XlsxReport,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    println!("starting fake_catalog");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info"))
                .expect("telemetry: Creating EnvFilter"),
        )
        .init();

    let mut options = CrawlerOptions::default();
    options.enrich.throttle = Throttle::new(Duration::from_millis(100));
    options.enrich.secondary_budget = Duration::from_millis(300);
    let crawler = Crawler::new(fake_catalog::LISTING_URL, options);

    let mut listing = fake_catalog::FakeListing::new();
    let mut detail = fake_catalog::FakeDetail::new();
    let items = match crawler.run(&mut listing, &mut detail).await {
        Ok(items) => items,
        Err(err) => {
            tracing::error!("fake_catalog: run failed: {}", err);
            return;
        }
    };

    let today = chrono::Local::now().date_naive();
    let path = PathBuf::from(report::file_name("fake_catalog", today));
    if let Err(err) = XlsxReport::default().write(&items, &path) {
        tracing::error!("fake_catalog: writing report failed: {}", err);
    }
}

pub mod fake_catalog {
    use std::fmt;

    use async_trait::async_trait;
    use catalogcrawler::{DetailFields, DetailView, ListingRow, ListingView, NextControl, PageState};

    pub const LISTING_URL: &str = "https://parts.example.com/parts/basic_parts";
    const PAGES: u32 = 3;
    const PER_PAGE: u32 = 4;

    /// Three pages of four parts. The last part of each page shows up again
    /// as the first of the next one.
    #[derive(Debug)]
    pub struct FakeListing {
        page: u32,
        filtered: bool,
    }

    impl FakeListing {
        pub fn new() -> Self {
            Self {
                page: 1,
                filtered: false,
            }
        }
    }

    #[async_trait]
    impl ListingView for FakeListing {
        type Error = FakeError;

        async fn goto(&mut self, url: &str) -> Result<(), Self::Error> {
            println!("opening {}", url);
            Ok(())
        }
        async fn current_url(&self) -> Result<String, Self::Error> {
            Ok(format!("{}?page={}", LISTING_URL, self.page))
        }
        async fn page_state(&self) -> Result<PageState, Self::Error> {
            Ok(PageState {
                rows: PER_PAGE as usize,
                loading: false,
            })
        }
        async fn remaining_text(&self) -> Result<Option<String>, Self::Error> {
            let remaining = if self.filtered { PAGES * PER_PAGE } else { 1_234 };
            Ok(Some(format!("Results remaining: {}", remaining)))
        }
        async fn toggle_filter(&mut self) -> Result<(), Self::Error> {
            self.filtered = true;
            Ok(())
        }
        async fn apply_enabled(&self) -> Result<Option<bool>, Self::Error> {
            Ok(Some(self.filtered))
        }
        async fn click_apply(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
        async fn rows(&self) -> Result<Vec<ListingRow>, Self::Error> {
            let first = (self.page - 1) * (PER_PAGE - 1) + 1000;
            Ok((first..first + PER_PAGE)
                .map(|n| ListingRow::new(format!("C{} Basic part", n), format!("/partdetail/C{}", n)))
                .collect())
        }
        async fn next_control(&self) -> Result<NextControl, Self::Error> {
            Ok(if self.page < PAGES {
                NextControl::Enabled
            } else {
                NextControl::Disabled
            })
        }
        async fn active_page(&self) -> Result<Option<u32>, Self::Error> {
            Ok(Some(self.page))
        }
        async fn click_next(&mut self) -> Result<(), Self::Error> {
            self.page += 1;
            Ok(())
        }
    }

    /// Renders a part's fields over a few reads. `C1004` never loads.
    #[derive(Debug)]
    pub struct FakeDetail {
        url: String,
        reads: u32,
    }

    impl FakeDetail {
        pub fn new() -> Self {
            Self {
                url: String::new(),
                reads: 0,
            }
        }
    }

    #[async_trait]
    impl DetailView for FakeDetail {
        type Error = FakeError;

        async fn goto(&mut self, url: &str) -> Result<(), Self::Error> {
            if url.ends_with("C1004") {
                return Err(FakeError(format!("timeout loading {}", url)));
            }
            self.url = url.to_string();
            self.reads = 0;
            Ok(())
        }
        async fn extract(&mut self) -> Result<DetailFields, Self::Error> {
            self.reads += 1;
            let code = self.url.rsplit('/').next().unwrap_or_default().to_string();
            let mut fields = DetailFields {
                package: "0402".to_string(),
                ..Default::default()
            };
            if self.reads >= 2 {
                fields.description = format!("Resistor {}", code);
                fields.stock = "12,345".to_string();
            }
            if self.reads >= 3 {
                fields.category_path = "Resistors / Chip Resistor - Surface Mount".to_string();
                fields.kind = "Resistors / Chip Resistor - Surface Mount".to_string();
            }
            Ok(fields)
        }
        async fn capture_download_link(&mut self) -> Result<Option<String>, Self::Error> {
            Ok(Some(format!("{}.pdf", self.url)))
        }
    }

    #[derive(Debug, Clone)]
    pub struct FakeError(String);

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_fmt(format_args!("FakeError: {}", self.0))
        }
    }

    impl std::error::Error for FakeError {}
}
