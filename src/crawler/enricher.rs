//! Per-item enrichment from the detail view.
//!
//! Each attempt navigates, then reads the page in two budgeted stages:
//! stage A waits for the mandatory fields (package, description, stock),
//! stage B gives category and datasheet a little longer to show up. Reads are
//! merged so that nothing already seen is lost. Every failed attempt, the
//! last one included, is followed by a growing delay; a successful one is
//! padded to the minimum iteration time.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};

use super::policy::{RetryPolicy, Throttle};
use crate::error::BoxError;
use crate::item::{normalize, DetailFields, Item};
use crate::view::DetailView;

/// Longest error note kept on a failed item, in characters.
pub const ERROR_NOTE_LIMIT: usize = 180;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub retry: RetryPolicy,
    pub throttle: Throttle,
    /// Wall-clock budget of stage B.
    pub secondary_budget: Duration,
    /// Fall back to clicking the download link when no datasheet is shown.
    pub action_fallback: bool,
    pub poll_interval: Duration,
    /// Number of reads stage A may take.
    pub mandatory_tries: u32,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            throttle: Throttle::new(Duration::from_secs(2)),
            secondary_budget: Duration::from_secs(2),
            action_fallback: true,
            poll_interval: Duration::from_millis(150),
            mandatory_tries: 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("navigation failed: {0}")]
    Navigate(#[source] BoxError),
    #[error("extraction failed: {0}")]
    Extract(#[source] BoxError),
}

/// State of one try at one item.
#[derive(Debug)]
struct Attempt {
    number: u32,
    started: Instant,
    fields: DetailFields,
}

impl Attempt {
    fn begin(number: u32) -> Self {
        Self {
            number,
            started: Instant::now(),
            fields: DetailFields::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Enricher {
    options: EnrichOptions,
}

impl Enricher {
    pub fn new(options: EnrichOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EnrichOptions {
        &self.options
    }

    /// Enrich `item` from its detail view. Never fails: once the attempts are
    /// used up the item comes back with an error note and whatever the last
    /// attempt managed to read.
    pub async fn enrich<V: DetailView>(&self, view: &mut V, mut item: Item) -> Item {
        let retry = self.options.retry;
        let mut attempt = Attempt::begin(1);
        loop {
            match self.collect(view, &item.source_url, &mut attempt).await {
                Ok(()) => {
                    item.populate(&attempt.fields);
                    if item.datasheet_url.is_none() && self.options.action_fallback {
                        item.datasheet_url = self.datasheet_fallback(view, &item.key).await;
                    }
                    item.error_note = None;
                    let padded = self.options.throttle.pad(attempt.started).await;
                    tracing::debug!(
                        key = %item.key,
                        attempt = attempt.number,
                        padded = ?padded,
                        "enrich: item done"
                    );
                    return item;
                }
                Err(err) if retry.is_last(attempt.number) => {
                    let delay = retry.backoff.delay(attempt.number);
                    tracing::warn!(
                        key = %item.key,
                        attempt = attempt.number,
                        delay = ?delay,
                        "enrich: giving up: {}",
                        err
                    );
                    item.populate(&attempt.fields);
                    item.error_note = Some(truncate(&err.to_string(), ERROR_NOTE_LIMIT));
                    // failures skip the throttle, the backoff keeps them apart
                    sleep(delay).await;
                    return item;
                }
                Err(err) => {
                    let delay = retry.backoff.delay(attempt.number);
                    tracing::warn!(
                        key = %item.key,
                        attempt = attempt.number,
                        delay = ?delay,
                        "enrich: attempt failed: {}",
                        err
                    );
                    sleep(delay).await;
                    attempt = Attempt::begin(attempt.number + 1);
                }
            }
        }
    }

    async fn collect<V: DetailView>(
        &self,
        view: &mut V,
        url: &str,
        attempt: &mut Attempt,
    ) -> Result<(), AttemptError> {
        view.goto(url)
            .await
            .map_err(|err| AttemptError::Navigate(Box::new(err)))?;
        self.read_mandatory(view, attempt).await?;
        self.read_secondary(view, attempt).await
    }

    /// Stage A. Running out of tries is not an error: an empty page shows up
    /// later as a failed item.
    async fn read_mandatory<V: DetailView>(
        &self,
        view: &mut V,
        attempt: &mut Attempt,
    ) -> Result<(), AttemptError> {
        let tries = self.options.mandatory_tries.max(1);
        for read in 1..=tries {
            attempt.fields.fill_gaps(extract(view).await?);
            if attempt.fields.mandatory_complete() {
                tracing::trace!(read, "enrich: mandatory fields present");
                return Ok(());
            }
            if read < tries {
                sleep(self.options.poll_interval).await;
            }
        }
        tracing::debug!(tries, "enrich: mandatory fields incomplete, continuing");
        Ok(())
    }

    /// Stage B.
    async fn read_secondary<V: DetailView>(
        &self,
        view: &mut V,
        attempt: &mut Attempt,
    ) -> Result<(), AttemptError> {
        let started = Instant::now();
        while !attempt.fields.secondary_complete() && started.elapsed() < self.options.secondary_budget {
            sleep(self.options.poll_interval).await;
            attempt.fields.fill_gaps(extract(view).await?);
        }
        Ok(())
    }

    async fn datasheet_fallback<V: DetailView>(&self, view: &mut V, key: &str) -> Option<String> {
        match view.capture_download_link().await {
            Ok(Some(url)) => {
                let url = normalize(&url);
                if url.is_empty() {
                    None
                } else {
                    tracing::debug!(key, url = %url, "enrich: datasheet from download");
                    Some(url)
                }
            }
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(key, "enrich: datasheet download fallback failed: {}", err);
                None
            }
        }
    }
}

async fn extract<V: DetailView>(view: &mut V) -> Result<DetailFields, AttemptError> {
    view.extract()
        .await
        .map_err(|err| AttemptError::Extract(Box::new(err)))
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
