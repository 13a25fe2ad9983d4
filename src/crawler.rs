//! Orchestration of a whole run: crawl the listing, enrich every item, hand
//! back the items sorted by key.

use tokio::time::Instant;

use crate::item::Item;
use crate::report;
use crate::view::{DetailView, ListingView};
use crate::Result;

pub mod enricher;
pub mod listing;
pub mod policy;
pub mod progress;
pub mod statistics;

pub use enricher::{EnrichOptions, Enricher};
pub use listing::{Accumulator, ListingCrawler, ListingOptions};
pub use policy::{Backoff, RetryPolicy, Throttle};
pub use progress::{format_duration, Progress};
pub use statistics::Statistics;

pub struct Crawler {
    listing_url: String,
    listing: ListingCrawler,
    enricher: Enricher,
}

#[derive(Debug, Clone, Default)]
pub struct CrawlerOptions {
    pub listing: ListingOptions,
    pub enrich: EnrichOptions,
}

impl Crawler {
    pub fn new<S: Into<String>>(
        listing_url: S,
        CrawlerOptions { listing, enrich }: CrawlerOptions,
    ) -> Self {
        Self {
            listing_url: listing_url.into(),
            listing: ListingCrawler::new(listing),
            enricher: Enricher::new(enrich),
        }
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Run both phases. Only a listing that cannot be opened or filtered
    /// fails the run; items that cannot be enriched come back with an error
    /// note.
    pub async fn run<L, D>(&self, listing: &mut L, detail: &mut D) -> Result<Vec<Item>>
    where
        L: ListingView,
        D: DetailView,
    {
        tracing::info!(url = %self.listing_url, "crawler: starting");
        let starting_time = Instant::now();
        let mut statistics = Statistics::default();

        let accumulator = self
            .listing
            .crawl(listing, &self.listing_url, &mut statistics)
            .await?;
        let items = accumulator.into_items();
        let total = items.len();
        tracing::info!(total_unique = total, "crawler: listing phase done");

        let progress = Progress::new(total);
        let mut enriched = Vec::with_capacity(total);
        for (index, item) in items.into_iter().enumerate() {
            let item = self.enricher.enrich(detail, item).await;
            let done = index + 1;
            let ok = item.is_enriched();
            statistics.record_item(ok);

            let eta = format_duration(progress.estimate(done).remaining);
            let stock = item
                .stock
                .as_ref()
                .map(|stock| stock.to_string())
                .unwrap_or_default();
            let status = if ok { "OK" } else { "FAIL" };
            tracing::info!(
                key = %item.key,
                status,
                "{}/{} {} In Stock: {} ... {} [ETA: {}]",
                done,
                total,
                item.key,
                stock,
                status,
                eta
            );
            enriched.push(item);
        }

        statistics.write_to_log(starting_time.elapsed());
        Ok(report::sorted(enriched))
    }
}
