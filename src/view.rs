use std::error::Error as StdError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::item::DetailFields;

/// What the listing table looks like right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub rows: usize,
    pub loading: bool,
}

impl PageState {
    pub fn is_ready(&self) -> bool {
        self.rows > 0 && !self.loading
    }
}

/// One rendered row of the listing: its visible text and the detail link,
/// empty when the row has none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRow {
    pub text: String,
    #[serde(default)]
    pub href: String,
}

impl ListingRow {
    pub fn new<T: Into<String>, H: Into<String>>(text: T, href: H) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextControl {
    Absent,
    Disabled,
    Enabled,
}

/// The paginated index page.
///
/// Observers take `&self` so they can be polled; interactions take
/// `&mut self`.
#[async_trait]
pub trait ListingView: Send + Sync + 'static {
    type Error: StdError + Send + Sync + 'static;

    async fn goto(&mut self, url: &str) -> Result<(), Self::Error>;
    async fn current_url(&self) -> Result<String, Self::Error>;

    async fn page_state(&self) -> Result<PageState, Self::Error>;
    /// Text of the "results remaining" counter, if one is shown.
    async fn remaining_text(&self) -> Result<Option<String>, Self::Error>;

    async fn toggle_filter(&mut self) -> Result<(), Self::Error>;
    /// `None` when the apply control is not on the page.
    async fn apply_enabled(&self) -> Result<Option<bool>, Self::Error>;
    async fn click_apply(&mut self) -> Result<(), Self::Error>;

    async fn rows(&self) -> Result<Vec<ListingRow>, Self::Error>;

    async fn next_control(&self) -> Result<NextControl, Self::Error>;
    async fn active_page(&self) -> Result<Option<u32>, Self::Error>;
    async fn click_next(&mut self) -> Result<(), Self::Error>;
}

/// The per-item page holding the extended fields.
#[async_trait]
pub trait DetailView: Send {
    type Error: StdError + Send + Sync + 'static;

    async fn goto(&mut self, url: &str) -> Result<(), Self::Error>;

    /// Read whatever is rendered right now. Missing fields come back empty.
    async fn extract(&mut self) -> Result<DetailFields, Self::Error>;

    /// Trigger the datasheet download affordance and report the URL the
    /// download resolved to. The downloaded resource must never be kept.
    async fn capture_download_link(&mut self) -> Result<Option<String>, Self::Error>;
}
