//! Run configuration, read from environment variables. Every variable is
//! optional.
//!
//! | variable                   | default                                |
//! |----------------------------|----------------------------------------|
//! | `HEADLESS`                 | on, `0` shows the browser              |
//! | `DETAIL_DELAY`             | 2 (seconds per item, at least)         |
//! | `DETAIL_RETRIES`           | 2 (attempts per item)                  |
//! | `BLOCK_ASSETS`             | on, `0` loads images, fonts and media  |
//! | `BREADCRUMB_WAIT`          | 2.0 (seconds for category/datasheet)   |
//! | `DATASHEET_CLICK_FALLBACK` | on, `0` never clicks download          |
//! | `LISTING_URL`              | [`DEFAULT_LISTING_URL`]                |
//! | `OUTPUT_BASE`              | [`DEFAULT_OUTPUT_BASE`]                |

use std::time::Duration;

use crate::crawler::{CrawlerOptions, EnrichOptions, ListingOptions, RetryPolicy, Throttle};
use crate::{Error, Result};

pub const DEFAULT_LISTING_URL: &str = "https://jlcpcb.com/parts/basic_parts";
pub const DEFAULT_OUTPUT_BASE: &str = "jlcpcb_basic_parts";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub headless: bool,
    pub min_iteration: Duration,
    pub max_attempts: u32,
    pub block_assets: bool,
    pub secondary_budget: Duration,
    pub action_fallback: bool,
    pub listing_url: String,
    pub output_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            headless: true,
            min_iteration: Duration::from_secs(2),
            max_attempts: 2,
            block_assets: true,
            secondary_budget: Duration::from_secs(2),
            action_fallback: true,
            listing_url: DEFAULT_LISTING_URL.to_string(),
            output_base: DEFAULT_OUTPUT_BASE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Config::default();

        Ok(Self {
            headless: get("HEADLESS").map_or(defaults.headless, |v| toggle(&v)),
            min_iteration: match get("DETAIL_DELAY") {
                Some(v) => seconds("DETAIL_DELAY", v)?,
                None => defaults.min_iteration,
            },
            max_attempts: match get("DETAIL_RETRIES") {
                Some(v) => count("DETAIL_RETRIES", v)?,
                None => defaults.max_attempts,
            },
            block_assets: get("BLOCK_ASSETS").map_or(defaults.block_assets, |v| toggle(&v)),
            secondary_budget: match get("BREADCRUMB_WAIT") {
                Some(v) => seconds("BREADCRUMB_WAIT", v)?,
                None => defaults.secondary_budget,
            },
            action_fallback: get("DATASHEET_CLICK_FALLBACK")
                .map_or(defaults.action_fallback, |v| toggle(&v)),
            listing_url: get("LISTING_URL").unwrap_or(defaults.listing_url),
            output_base: get("OUTPUT_BASE").unwrap_or(defaults.output_base),
        })
    }

    pub fn crawler_options(&self) -> CrawlerOptions {
        let defaults = EnrichOptions::default();
        CrawlerOptions {
            listing: ListingOptions::default(),
            enrich: EnrichOptions {
                retry: RetryPolicy::new(self.max_attempts, defaults.retry.backoff),
                throttle: Throttle::new(self.min_iteration),
                secondary_budget: self.secondary_budget,
                action_fallback: self.action_fallback,
                ..defaults
            },
        }
    }
}

/// Only a literal `0` switches a toggle off.
fn toggle(value: &str) -> bool {
    value != "0"
}

fn seconds(key: &'static str, value: String) -> Result<Duration> {
    let parsed = match value.parse::<f64>() {
        Ok(secs) => Duration::try_from_secs_f64(secs).map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };
    parsed.map_err(|reason| Error::Config { key, value, reason })
}

fn count(key: &'static str, value: String) -> Result<u32> {
    value.parse::<u32>().map_err(|err| Error::Config {
        key,
        value,
        reason: err.to_string(),
    })
}
