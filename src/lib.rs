//! A library for harvesting a paginated, client-rendered parts catalog.
//!
//! The listing is crawled through a [`ListingView`] into one item per key,
//! then every item is enriched from its [`DetailView`] and the result is
//! written as a spreadsheet.

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod config;
pub mod crawler;
mod error;
pub mod item;
pub mod report;
mod view;
pub mod wait;

pub use config::Config;
pub use crawler::{Crawler, CrawlerOptions};
pub use error::{BoxError, Error, Result};
pub use item::{DetailFields, Item, StockQuantity};
pub use report::{ReportWriter, XlsxReport};
pub use view::{DetailView, ListingRow, ListingView, NextControl, PageState};
