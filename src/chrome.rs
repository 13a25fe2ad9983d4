//! Chrome DevTools implementation of the view traits, on top of
//! `chromiumoxide`. Gated behind the `chrome` feature.
//!
//! All DOM work happens in small scripts evaluated in the page; the Rust side
//! only decodes their JSON results.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    EventDownloadWillBegin, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::item::DetailFields;
use crate::view::{DetailView, ListingRow, ListingView, NextControl, PageState};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125 Safari/537.36";

/// Image, font and media requests dropped when asset blocking is on.
/// Stylesheets are left alone, the tables need them to lay out.
const BLOCKED_URLS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.woff", "*.woff2",
    "*.ttf", "*.otf", "*.eot", "*.mp4", "*.webm", "*.mp3", "*.wav",
];

const DOWNLOAD_WAIT: Duration = Duration::from_secs(4);

#[derive(Debug, Error)]
pub enum ChromeError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("cdp error: {0}")]
    Cdp(#[from] CdpError),
    #[error("unexpected script result: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("navigation to '{0}' timed out")]
    Timeout(String),
    #[error("not found on page: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub block_assets: bool,
    pub user_agent: String,
    pub navigation_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            block_assets: true,
            user_agent: USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&Config> for ChromeOptions {
    fn from(config: &Config) -> Self {
        Self {
            headless: config.headless,
            block_assets: config.block_assets,
            ..Self::default()
        }
    }
}

/// One browser process and the task driving its DevTools connection.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    options: ChromeOptions,
}

impl ChromeSession {
    pub async fn launch(options: ChromeOptions) -> Result<Self, ChromeError> {
        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ChromeError::Launch)?;
        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!("chrome: handler error: {}", err);
                }
            }
        });

        tracing::info!(headless = options.headless, block_assets = options.block_assets, "chrome: launched");
        Ok(Self {
            browser,
            handler,
            options,
        })
    }

    pub async fn listing(&self) -> Result<ChromeListing, ChromeError> {
        Ok(ChromeListing {
            page: self.open_page().await?,
            navigation_timeout: self.options.navigation_timeout,
        })
    }

    pub async fn detail(&self) -> Result<ChromeDetail, ChromeError> {
        Ok(ChromeDetail {
            page: self.open_page().await?,
            navigation_timeout: self.options.navigation_timeout,
        })
    }

    async fn open_page(&self) -> Result<Page, ChromeError> {
        let page = self.browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(self.options.user_agent.clone()))
            .await?;
        // Downloads are denied outright. Only the event carrying the URL is
        // wanted, the file itself is never written.
        let mut downloads = SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::Deny);
        downloads.events_enabled = Some(true);
        page.execute(downloads).await?;
        if self.options.block_assets {
            page.execute(EnableParams::default()).await?;
            let patterns = BLOCKED_URLS.iter().map(|p| p.to_string()).collect::<Vec<_>>();
            page.execute(SetBlockedUrLsParams::new(patterns)).await?;
        }
        Ok(page)
    }

    pub async fn close(mut self) -> Result<(), ChromeError> {
        self.browser.close().await?;
        if let Err(err) = self.browser.wait().await {
            tracing::debug!("chrome: waiting for browser exit: {}", err);
        }
        self.handler.abort();
        Ok(())
    }
}

async fn evaluate<T: DeserializeOwned>(page: &Page, script: &str) -> Result<T, ChromeError> {
    Ok(page.evaluate(script).await?.into_value()?)
}

async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), ChromeError> {
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(result) => {
            result?;
            Ok(())
        }
        Err(_) => Err(ChromeError::Timeout(url.to_string())),
    }
}

pub struct ChromeListing {
    page: Page,
    navigation_timeout: Duration,
}

#[async_trait]
impl ListingView for ChromeListing {
    type Error = ChromeError;

    async fn goto(&mut self, url: &str) -> Result<(), Self::Error> {
        navigate(&self.page, url, self.navigation_timeout).await
    }

    async fn current_url(&self) -> Result<String, Self::Error> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn page_state(&self) -> Result<PageState, Self::Error> {
        evaluate(&self.page, scripts::PAGE_STATE).await
    }

    async fn remaining_text(&self) -> Result<Option<String>, Self::Error> {
        evaluate(&self.page, scripts::REMAINING_TEXT).await
    }

    async fn toggle_filter(&mut self) -> Result<(), Self::Error> {
        let outcome: String = evaluate(&self.page, scripts::TOGGLE_BASIC_FILTER).await?;
        match outcome.as_str() {
            "missing" => Err(ChromeError::Missing("parts type filter")),
            other => {
                tracing::debug!(outcome = other, "chrome: filter toggled");
                Ok(())
            }
        }
    }

    async fn apply_enabled(&self) -> Result<Option<bool>, Self::Error> {
        evaluate(&self.page, scripts::APPLY_ENABLED).await
    }

    async fn click_apply(&mut self) -> Result<(), Self::Error> {
        let clicked: bool = evaluate(&self.page, scripts::CLICK_APPLY).await?;
        if clicked {
            Ok(())
        } else {
            Err(ChromeError::Missing("apply button"))
        }
    }

    async fn rows(&self) -> Result<Vec<ListingRow>, Self::Error> {
        evaluate(&self.page, scripts::ROWS).await
    }

    async fn next_control(&self) -> Result<NextControl, Self::Error> {
        evaluate(&self.page, scripts::NEXT_CONTROL).await
    }

    async fn active_page(&self) -> Result<Option<u32>, Self::Error> {
        evaluate(&self.page, scripts::ACTIVE_PAGE).await
    }

    async fn click_next(&mut self) -> Result<(), Self::Error> {
        let clicked: bool = evaluate(&self.page, scripts::CLICK_NEXT).await?;
        if clicked {
            Ok(())
        } else {
            Err(ChromeError::Missing("next page button"))
        }
    }
}

pub struct ChromeDetail {
    page: Page,
    navigation_timeout: Duration,
}

#[async_trait]
impl DetailView for ChromeDetail {
    type Error = ChromeError;

    async fn goto(&mut self, url: &str) -> Result<(), Self::Error> {
        navigate(&self.page, url, self.navigation_timeout).await
    }

    async fn extract(&mut self) -> Result<DetailFields, Self::Error> {
        evaluate(&self.page, scripts::DETAIL_FIELDS).await
    }

    async fn capture_download_link(&mut self) -> Result<Option<String>, Self::Error> {
        let mut downloads = self.page.event_listener::<EventDownloadWillBegin>().await?;
        let clicked: bool = evaluate(&self.page, scripts::CLICK_DOWNLOAD).await?;
        if !clicked {
            return Ok(None);
        }
        match tokio::time::timeout(DOWNLOAD_WAIT, downloads.next()).await {
            Ok(Some(event)) => Ok(Some(event.url.trim().to_string())),
            Ok(None) | Err(_) => Ok(None),
        }
    }
}

mod scripts {
    pub const PAGE_STATE: &str = r#"(() => {
  const rows = document.querySelectorAll('.el-table__body-wrapper tbody tr').length;
  const mask = document.querySelector('.el-loading-mask');
  let loading = false;
  if (mask) {
    const style = window.getComputedStyle(mask);
    loading = style.display !== 'none' && style.visibility !== 'hidden' && mask.offsetParent !== null;
  }
  return { rows, loading };
})()"#;

    pub const REMAINING_TEXT: &str = r#"(() => {
  const hit = document.evaluate(
    "//*[contains(normalize-space(.), 'Results remaining:')][not(*[contains(normalize-space(.), 'Results remaining:')])]",
    document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  if (!hit) return null;
  const own = hit.innerText || hit.textContent || '';
  if (/\d/.test(own) || !hit.parentElement) return own;
  return hit.parentElement.innerText || own;
})()"#;

    pub const TOGGLE_BASIC_FILTER: &str = r#"(() => {
  let block = document.evaluate(
    "//*[contains(normalize-space(.), 'Parts Type')][not(*[contains(normalize-space(.), 'Parts Type')])]",
    document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  while (block && !block.querySelector('label.el-checkbox')) block = block.parentElement;
  if (!block) return 'missing';
  const label = Array.from(block.querySelectorAll('label.el-checkbox'))
    .find(l => /\bBasic\b/i.test(l.innerText || ''));
  if (!label) return 'missing';
  const input = label.querySelector("input[type='checkbox']");
  if (input && input.checked) return 'checked';
  label.click();
  return 'clicked';
})()"#;

    pub const APPLY_ENABLED: &str = r#"(() => {
  const btn = Array.from(document.querySelectorAll('button'))
    .find(b => (b.innerText || '').trim() === 'Apply');
  if (!btn) return null;
  return !(btn.disabled || btn.classList.contains('is-disabled'));
})()"#;

    pub const CLICK_APPLY: &str = r#"(() => {
  const btn = Array.from(document.querySelectorAll('button'))
    .find(b => (b.innerText || '').trim() === 'Apply');
  if (!btn) return false;
  btn.click();
  return true;
})()"#;

    pub const ROWS: &str = r#"(() => Array.from(document.querySelectorAll('.el-table__body-wrapper tbody tr')).map(row => {
  const link = row.querySelector("a[href*='/partdetail/']");
  return {
    text: (row.innerText || '').replace(/\s+/g, ' ').trim(),
    href: link ? (link.getAttribute('href') || '') : '',
  };
}))()"#;

    pub const NEXT_CONTROL: &str = r#"(() => {
  window.scrollTo(0, document.body.scrollHeight);
  const btn = document.querySelector('.el-pagination button.btn-next');
  if (!btn) return 'absent';
  return (btn.disabled || btn.hasAttribute('disabled')) ? 'disabled' : 'enabled';
})()"#;

    pub const ACTIVE_PAGE: &str = r#"(() => {
  const li = document.querySelector('.el-pagination .el-pager li.number.active');
  if (!li) return null;
  const n = parseInt((li.innerText || '').trim(), 10);
  return Number.isNaN(n) ? null : n;
})()"#;

    pub const CLICK_NEXT: &str = r#"(() => {
  const btn = document.querySelector('.el-pagination button.btn-next');
  if (!btn || btn.disabled) return false;
  btn.click();
  return true;
})()"#;

    pub const DETAIL_FIELDS: &str = r#"(() => {
  const clean = (t) => (t || '').replace(/\s+/g, ' ').trim();
  const labelNode = (label) => document.evaluate(
    `//*[normalize-space()='${label}']`,
    document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  const valueOf = (label) => {
    const node = labelNode(label);
    if (!node) return '';
    let value = node.nextElementSibling;
    if (!value && node.parentElement && node.parentElement.children.length >= 2) {
      value = node.parentElement.children[1];
    }
    return value ? clean(value.innerText) : '';
  };
  const linkOf = (label) => {
    const node = labelNode(label);
    if (!node) return '';
    const a = (node.nextElementSibling && node.nextElementSibling.querySelector('a[href]'))
      || (node.parentElement && node.parentElement.querySelector('a[href]'));
    if (!a) return '';
    const href = (a.href || a.getAttribute('href') || '').trim();
    if (!href) return '';
    try { return new URL(href, location.origin).href; } catch (e) { return href; }
  };

  const body = document.body ? (document.body.innerText || '') : '';
  const stock = /In\s*Stock:\s*([\d,]+)/i.exec(body);

  let crumbs = [];
  const root = Array.from(document.querySelectorAll('a'))
    .find(a => clean(a.textContent).startsWith('All Components'));
  if (root) {
    let node = root.parentElement;
    for (let up = 0; up < 6 && node; up++) {
      if (node.querySelectorAll('a').length >= 2) break;
      node = node.parentElement;
    }
    if (node) {
      crumbs = Array.from(node.querySelectorAll('a'))
        .map(a => clean(a.textContent).replace(/\s*\/\s*$/, '').trim())
        .filter(Boolean);
      if (crumbs.length && crumbs[0].toLowerCase().startsWith('all components')) crumbs.shift();
    }
  }

  let datasheet = linkOf('Datasheet');
  if (!datasheet) {
    const html = document.documentElement ? (document.documentElement.innerHTML || '') : '';
    const m = /\/api\/file\/downloadByFileSystemAccessId\/\d+/i.exec(html);
    if (m) {
      try { datasheet = new URL(m[0], location.origin).href; } catch (e) { datasheet = location.origin + m[0]; }
    }
  }

  return {
    package: valueOf('Package'),
    description: valueOf('Description'),
    stock: stock ? stock[1] : '',
    category_path: crumbs.join(' / '),
    type: crumbs.length >= 2 ? crumbs.slice(-2).join(' / ') : (crumbs[0] || ''),
    datasheet,
  };
})()"#;

    pub const CLICK_DOWNLOAD: &str = r#"(() => {
  const label = document.evaluate("//*[normalize-space()='Datasheet']",
    document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  const scope = label ? label.nextElementSibling : null;
  const isDownload = (el) => /download/i.test((el.innerText || '').trim()) && el.children.length === 0;
  let target = scope ? [scope, ...scope.querySelectorAll('*')].find(isDownload) : null;
  if (!target) {
    target = Array.from(document.querySelectorAll('a, button, span'))
      .find(el => /^download$/i.test((el.innerText || '').trim()));
  }
  if (!target) return false;
  target.click();
  return true;
})()"#;
}
