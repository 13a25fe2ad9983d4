//! Polling for readiness of asynchronously rendered views.
//!
//! None of these ever fail. On timeout the last observation is handed back
//! and the caller decides what to do with it.

use std::{fmt::Display, future::Future, time::Duration};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::{sleep, Instant};

use crate::view::{ListingView, PageState};

pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

static REMAINING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Results remaining:\s*([\d,]+)").expect("remaining counter pattern")
});

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitOptions {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            interval: POLL_INTERVAL,
            timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Observed<T> {
    /// Last successful observation, if any succeeded.
    pub last: Option<T>,
    pub ready: bool,
    pub elapsed: Duration,
}

/// Observe until `ready` holds or the timeout elapses.
pub async fn poll_until<T, E, F, Fut, P>(options: WaitOptions, mut observe: F, ready: P) -> Observed<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let mut last = None;
    loop {
        match observe().await {
            Ok(state) => {
                let done = ready(&state);
                last = Some(state);
                if done {
                    return Observed {
                        last,
                        ready: true,
                        elapsed: started.elapsed(),
                    };
                }
            }
            Err(err) => tracing::debug!("readiness: observation failed: {}", err),
        }

        let elapsed = started.elapsed();
        if elapsed >= options.timeout {
            return Observed {
                last,
                ready: false,
                elapsed,
            };
        }
        sleep(options.interval.min(options.timeout - elapsed)).await;
    }
}

/// Parse the "Results remaining: 1,234" counter.
pub fn parse_remaining(text: &str) -> Option<u64> {
    REMAINING
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

pub async fn remaining<V: ListingView + ?Sized>(view: &V) -> Option<u64> {
    match view.remaining_text().await {
        Ok(text) => text.as_deref().and_then(parse_remaining),
        Err(err) => {
            tracing::debug!("readiness: remaining counter unreadable: {}", err);
            None
        }
    }
}

/// Rows are rendered and the loading mask is gone.
pub async fn page_ready<V: ListingView + ?Sized>(view: &V, timeout: Duration) -> Observed<PageState> {
    let observed = poll_until(
        WaitOptions::timeout(timeout),
        move || view.page_state(),
        PageState::is_ready,
    )
    .await;
    if !observed.ready {
        tracing::warn!(
            timeout = ?timeout,
            last = ?observed.last,
            "readiness: listing not ready, continuing"
        );
    }
    observed
}

/// The remaining counter moved away from `previous`. Returns the last value
/// seen, changed or not.
pub async fn counter_changed<V: ListingView + ?Sized>(
    view: &V,
    previous: Option<u64>,
    timeout: Duration,
) -> Observed<Option<u64>> {
    poll_until(
        WaitOptions::timeout(timeout),
        move || async move { Ok::<_, std::convert::Infallible>(remaining(view).await) },
        |current: &Option<u64>| matches!((previous, current), (Some(old), Some(new)) if old != *new),
    )
    .await
}

/// The apply control exists and reports enabled.
pub async fn control_enabled<V: ListingView + ?Sized>(view: &V, timeout: Duration) -> bool {
    poll_until(
        WaitOptions::timeout(timeout),
        move || view.apply_enabled(),
        |enabled: &Option<bool>| *enabled == Some(true),
    )
    .await
    .ready
}

/// The active page number reached `expected`.
pub async fn page_advanced<V: ListingView + ?Sized>(
    view: &V,
    expected: u32,
    timeout: Duration,
) -> Observed<Option<u32>> {
    poll_until(
        WaitOptions::timeout(timeout),
        move || view.active_page(),
        |active: &Option<u32>| *active == Some(expected),
    )
    .await
}
