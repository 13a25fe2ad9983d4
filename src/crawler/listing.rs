//! Crawl of the paginated listing: filter, apply, then page through the
//! table collecting one item per key.

use std::{collections::BTreeMap, time::Duration};

use regex::Regex;
use url::Url;

use super::policy::{Backoff, RetryPolicy};
use super::statistics::{PageStats, Statistics};
use crate::item::Item;
use crate::view::{ListingRow, ListingView, NextControl};
use crate::{wait, Error, Result};

pub const DEFAULT_KEY_PATTERN: &str = r"\bC\d{3,}\b";

#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// How long the remaining counter gets to react to the filter toggle.
    pub filter_settle: Duration,
    pub apply_timeout: Duration,
    pub page_ready_timeout: Duration,
    pub page_turn_timeout: Duration,
    /// Hard ceiling on scraped pages, whatever the pager claims.
    pub max_pages: usize,
    pub key_pattern: Regex,
    pub interactions: RetryPolicy,
}

impl ListingOptions {
    pub fn with_key_pattern(pattern: &str) -> Result<Self> {
        Ok(Self {
            key_pattern: Regex::new(pattern)?,
            ..Self::default()
        })
    }
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            filter_settle: Duration::from_secs(15),
            apply_timeout: Duration::from_secs(30),
            page_ready_timeout: Duration::from_secs(60),
            page_turn_timeout: Duration::from_secs(30),
            max_pages: 500,
            key_pattern: Regex::new(DEFAULT_KEY_PATTERN).expect("default key pattern"),
            interactions: RetryPolicy::new(3, Backoff::default()),
        }
    }
}

/// Items seen so far, one per key. A later row with a known key replaces the
/// earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    items: BTreeMap<String, Item>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge<I: IntoIterator<Item = Item>>(&mut self, items: I) {
        for item in items {
            self.items.insert(item.key.clone(), item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    /// Items in ascending key order.
    pub fn into_items(self) -> Vec<Item> {
        self.items.into_values().collect()
    }
}

/// Where the crawl stands in the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page: usize,
    pub has_more: bool,
}

impl Cursor {
    fn start() -> Self {
        Self {
            page: 1,
            has_more: true,
        }
    }

    fn advance(&mut self) {
        self.page += 1;
    }

    fn finish(&mut self) {
        self.has_more = false;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingCrawler {
    options: ListingOptions,
}

impl ListingCrawler {
    pub fn new(options: ListingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ListingOptions {
        &self.options
    }

    /// Open `url`, filter, and walk every page. Only opening the listing and
    /// applying the filter are fatal; a page that cannot be read or turned
    /// ends the crawl with what was collected.
    pub async fn crawl<V: ListingView>(
        &self,
        view: &mut V,
        url: &str,
        stats: &mut Statistics,
    ) -> Result<Accumulator> {
        tracing::info!(url, "listing: opening");
        view.goto(url).await.map_err(|err| Error::OpenListing {
            url: url.to_string(),
            source: Box::new(err),
        })?;
        wait::page_ready(&*view, self.options.page_ready_timeout).await;

        self.apply_filter(view).await?;

        let retry = self.options.interactions;
        let mut accumulator = Accumulator::new();
        let mut cursor = Cursor::start();
        while cursor.has_more {
            wait::page_ready(&*view, self.options.page_ready_timeout).await;

            let rows = match retry.run(view, "listing: read rows", |v| v.rows()).await {
                Ok(rows) => rows,
                Err(err) => {
                    tracing::warn!(page = cursor.page, "listing: stopping, rows unreadable: {}", err);
                    break;
                }
            };
            let base = match view.current_url().await {
                Ok(current) => Url::parse(&current).ok(),
                Err(_) => None,
            }
            .or_else(|| Url::parse(url).ok());

            let (items, page) = self.extract_items(&rows, base.as_ref());
            let got = items.len();
            accumulator.merge(items);
            stats.record_page(&page);
            tracing::info!(
                page = cursor.page,
                got,
                rows_total = page.rows_total,
                rows_with_link = page.rows_with_link,
                total_unique = accumulator.len(),
                "listing: page scraped"
            );

            if cursor.page >= self.options.max_pages {
                tracing::warn!(max_pages = self.options.max_pages, "listing: page ceiling reached");
                cursor.finish();
            } else if self.advance(view, cursor.page).await {
                cursor.advance();
            } else {
                cursor.finish();
            }
        }

        tracing::info!(
            pages = cursor.page,
            total_unique = accumulator.len(),
            "listing: crawl complete"
        );
        Ok(accumulator)
    }

    /// Turn rows into items. Rows without a key or a link are dropped but
    /// still counted.
    pub fn extract_items(&self, rows: &[ListingRow], base: Option<&Url>) -> (Vec<Item>, PageStats) {
        let mut stats = PageStats {
            rows_total: rows.len(),
            ..PageStats::default()
        };
        let mut items = Vec::new();
        for row in rows {
            let href = row.href.trim();
            if href.is_empty() {
                continue;
            }
            stats.rows_with_link += 1;
            let Some(key) = self.options.key_pattern.find(&row.text) else {
                continue;
            };
            items.push(Item::new(key.as_str(), resolve(base, href)));
        }
        stats.rows_kept = items.len();
        (items, stats)
    }

    async fn apply_filter<V: ListingView>(&self, view: &mut V) -> Result<()> {
        let retry = self.options.interactions;

        let before = wait::remaining(&*view).await;
        tracing::info!(remaining = ?before, "listing: results before filter");

        retry
            .run(view, "listing: toggle filter", |v| v.toggle_filter())
            .await
            .map_err(|err| Error::listing("toggle filter", err))?;

        let settled = wait::counter_changed(&*view, before, self.options.filter_settle).await;
        if settled.ready {
            tracing::info!(remaining = ?settled.last.flatten(), "listing: results after filter");
        } else {
            tracing::info!(
                remaining = ?settled.last.flatten(),
                "listing: remaining count did not change after filter"
            );
        }

        if !wait::control_enabled(&*view, self.options.apply_timeout).await {
            tracing::warn!("listing: apply control not enabled in time, clicking anyway");
        }
        retry
            .run(view, "listing: apply", |v| v.click_apply())
            .await
            .map_err(|err| Error::listing("apply", err))?;

        wait::page_ready(&*view, self.options.page_ready_timeout).await;
        tracing::info!(
            remaining = ?wait::remaining(&*view).await,
            "listing: results after apply"
        );
        Ok(())
    }

    /// Click through to the next page. `false` means there is none, or it
    /// could not be reached.
    async fn advance<V: ListingView>(&self, view: &mut V, page: usize) -> bool {
        let retry = self.options.interactions;

        match retry.run(view, "listing: find next", |v| v.next_control()).await {
            Ok(NextControl::Enabled) => {}
            Ok(control) => {
                tracing::debug!(page, ?control, "listing: no further page");
                return false;
            }
            Err(err) => {
                tracing::warn!(page, "listing: stopping, pager unreadable: {}", err);
                return false;
            }
        }

        let active = view.active_page().await.ok().flatten();
        if let Err(err) = retry.run(view, "listing: next page", |v| v.click_next()).await {
            tracing::warn!(page, "listing: stopping, next page unreachable: {}", err);
            return false;
        }

        if let Some(active) = active {
            let expected = active + 1;
            let turned = wait::page_advanced(&*view, expected, self.options.page_turn_timeout).await;
            if !turned.ready {
                tracing::warn!(
                    expected,
                    observed = ?turned.last.flatten(),
                    "listing: page turn not confirmed"
                );
            }
        }
        true
    }
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    resolved
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_without_key_or_link_are_dropped_but_counted() {
        let crawler = ListingCrawler::default();
        let base = Url::parse("https://parts.example.com/parts/basic_parts").unwrap();
        let rows = vec![
            ListingRow::new("C1234 Resistor 0402", "/partdetail/C1234"),
            ListingRow::new("no code here", "/partdetail/x"),
            ListingRow::new("C5678 Capacitor", ""),
            ListingRow::new("C99 too short", "/partdetail/C99"),
        ];
        let (items, stats) = crawler.extract_items(&rows, Some(&base));
        assert_eq!(
            items,
            vec![Item::new("C1234", "https://parts.example.com/partdetail/C1234")]
        );
        assert_eq!(
            stats,
            PageStats {
                rows_total: 4,
                rows_with_link: 3,
                rows_kept: 1,
            }
        );
    }

    #[test]
    fn absolute_links_are_kept_without_base() {
        let crawler = ListingCrawler::default();
        let rows = vec![ListingRow::new("C2000", "https://other.example.com/partdetail/C2000")];
        let (items, _) = crawler.extract_items(&rows, None);
        assert_eq!(items[0].source_url, "https://other.example.com/partdetail/C2000");
    }

    #[test]
    fn later_rows_win() {
        let mut acc = Accumulator::new();
        acc.merge(vec![Item::new("C100", "a"), Item::new("C200", "b")]);
        acc.merge(vec![Item::new("C100", "c")]);
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.get("C100").map(|i| i.source_url.as_str()), Some("c"));
        let keys: Vec<_> = acc.into_items().into_iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["C100", "C200"]);
    }

    #[test]
    fn custom_key_pattern() {
        let crawler = ListingCrawler::new(ListingOptions::with_key_pattern(r"SKU-\d+").unwrap());
        let rows = vec![ListingRow::new("item SKU-42 blue", "https://x.example/42")];
        let (items, _) = crawler.extract_items(&rows, None);
        assert_eq!(items[0].key, "SKU-42");
        assert!(ListingOptions::with_key_pattern("(").is_err());
    }
}
