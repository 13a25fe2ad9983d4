mod common;

use std::time::Duration;

use catalogcrawler::{
    crawler::{enricher::ERROR_NOTE_LIMIT, Backoff, EnrichOptions, Enricher, RetryPolicy, Throttle},
    DetailFields, Item, StockQuantity,
};
use common::{fields, ScriptedDetail};
use tokio::time::Instant;

const URL: &str = "https://parts.example.com/partdetail/C1234";

fn item() -> Item {
    Item::new("C1234", URL)
}

fn complete() -> DetailFields {
    DetailFields {
        category_path: "Transistors / Bipolar Transistors - BJT".to_string(),
        kind: "Bipolar Transistors - BJT".to_string(),
        datasheet: "https://parts.example.com/datasheet/C1234.pdf".to_string(),
        ..fields("SOT-23", "NPN 40V 200mA", "12,345")
    }
}

fn options(max_attempts: u32) -> EnrichOptions {
    EnrichOptions {
        retry: RetryPolicy::new(max_attempts, Backoff::default()),
        throttle: Throttle::default(),
        ..EnrichOptions::default()
    }
}

#[tokio::test(start_paused = true)]
async fn fields_are_copied_and_stock_parsed() {
    let mut view = ScriptedDetail::always(complete());

    let item = Enricher::new(options(2)).enrich(&mut view, item()).await;

    assert_eq!(item.package, "SOT-23");
    assert_eq!(item.description, "NPN 40V 200mA");
    assert_eq!(item.stock, Some(StockQuantity::Count(12345)));
    assert_eq!(item.kind, "Bipolar Transistors - BJT");
    assert_eq!(
        item.datasheet_url.as_deref(),
        Some("https://parts.example.com/datasheet/C1234.pdf")
    );
    assert!(item.error_note.is_none());
    assert!(item.is_enriched());
    assert_eq!(view.downloads, 0);
}

#[tokio::test(start_paused = true)]
async fn unparseable_stock_is_kept_as_text() {
    let mut view = ScriptedDetail::always(DetailFields {
        stock: "N/A".to_string(),
        ..complete()
    });

    let item = Enricher::new(options(1)).enrich(&mut view, item()).await;

    assert_eq!(item.stock, Some(StockQuantity::Raw("N/A".to_string())));
    assert!(item.is_enriched());
}

#[tokio::test(start_paused = true)]
async fn navigation_is_retried_with_backoff() {
    let mut view = ScriptedDetail::always(complete());
    view.navigation_failures = 2;
    let started = Instant::now();

    let item = Enricher::new(options(3)).enrich(&mut view, item()).await;

    assert!(item.is_enriched());
    assert_eq!(view.gotos, 3);
    assert!(started.elapsed() >= Duration::from_millis(1100 + 1500));
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_leave_a_truncated_note() {
    let mut view = ScriptedDetail::always(complete());
    view.navigation_failures = u32::MAX;
    view.navigation_error = "net::ERR_TIMED_OUT ".repeat(20);
    let started = Instant::now();

    let item = Enricher::new(options(2)).enrich(&mut view, item()).await;

    assert_eq!(view.gotos, 2);
    // backoff after both attempts, the last one included
    assert_eq!(started.elapsed(), Duration::from_millis(1100 + 1500));
    assert!(!item.is_enriched());
    assert!(item.package.is_empty());
    assert!(item.description.is_empty());
    assert!(item.stock.is_none());
    let note = item.error_note.unwrap();
    assert!(note.starts_with("navigation failed:"));
    assert_eq!(note.chars().count(), ERROR_NOTE_LIMIT);
}

#[tokio::test(start_paused = true)]
async fn last_attempt_keeps_what_it_read() {
    let mut view = ScriptedDetail::new(vec![
        Ok(fields("0603", "", "")),
        Err("page crashed".to_string()),
    ]);

    let item = Enricher::new(options(1)).enrich(&mut view, item()).await;

    assert_eq!(item.package, "0603");
    assert_eq!(
        item.error_note.as_deref(),
        Some("extraction failed: FakeError: page crashed")
    );
    assert!(!item.is_enriched());
}

#[tokio::test(start_paused = true)]
async fn fast_items_are_padded_to_the_minimum_iteration() {
    let mut view = ScriptedDetail::always(complete());
    let enricher = Enricher::new(EnrichOptions {
        throttle: Throttle::new(Duration::from_secs(2)),
        ..options(2)
    });
    let started = Instant::now();

    enricher.enrich(&mut view, item()).await;

    assert_eq!(started.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn late_category_is_picked_up_within_the_budget() {
    let mandatory = fields("SOT-23", "NPN 40V 200mA", "12,345");
    let with_category = DetailFields {
        category_path: "Transistors / Bipolar Transistors - BJT".to_string(),
        kind: "Bipolar Transistors - BJT".to_string(),
        ..mandatory.clone()
    };
    let mut view = ScriptedDetail::new(vec![
        Ok(mandatory.clone()),
        Ok(mandatory),
        Ok(with_category),
        Ok(complete()),
    ]);

    let item = Enricher::new(options(1)).enrich(&mut view, item()).await;

    assert_eq!(item.category_path, "Transistors / Bipolar Transistors - BJT");
    assert!(item.datasheet_url.is_some());
    assert_eq!(view.extracts, 4);
    assert_eq!(view.downloads, 0);
}

#[tokio::test(start_paused = true)]
async fn datasheet_falls_back_to_the_download_link() {
    let mut view = ScriptedDetail::always(fields("SOT-23", "NPN", "10"));
    view.download = Ok(Some("https://files.example.com/C1234.pdf".to_string()));

    let item = Enricher::new(options(1)).enrich(&mut view, item()).await;

    assert_eq!(view.downloads, 1);
    assert_eq!(
        item.datasheet_url.as_deref(),
        Some("https://files.example.com/C1234.pdf")
    );
}

#[tokio::test(start_paused = true)]
async fn download_fallback_errors_are_swallowed() {
    let mut view = ScriptedDetail::always(fields("SOT-23", "NPN", "10"));
    view.download = Err("no download started".to_string());

    let item = Enricher::new(options(1)).enrich(&mut view, item()).await;

    assert_eq!(view.downloads, 1);
    assert!(item.datasheet_url.is_none());
    assert!(item.is_enriched());
}

#[tokio::test(start_paused = true)]
async fn download_fallback_can_be_switched_off() {
    let mut view = ScriptedDetail::always(fields("SOT-23", "NPN", "10"));
    view.download = Ok(Some("https://files.example.com/C1234.pdf".to_string()));
    let enricher = Enricher::new(EnrichOptions {
        action_fallback: false,
        ..options(1)
    });

    let item = enricher.enrich(&mut view, item()).await;

    assert_eq!(view.downloads, 0);
    assert!(item.datasheet_url.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_items_are_spaced_from_the_next_request() {
    let mut view = ScriptedDetail::always(complete());
    view.navigation_failures = u32::MAX;
    let enricher = Enricher::new(options(2));

    enricher.enrich(&mut view, Item::new("C100", URL)).await;
    enricher.enrich(&mut view, Item::new("C200", URL)).await;

    let times = &view.goto_times;
    assert_eq!(times.len(), 4);
    assert_eq!(times[1] - times[0], Duration::from_millis(1100));
    assert_eq!(times[2] - times[1], Duration::from_millis(1500));
    assert_eq!(times[3] - times[2], Duration::from_millis(1100));
}

#[tokio::test(start_paused = true)]
async fn missing_mandatory_fields_are_not_an_error() {
    let mut view = ScriptedDetail::always(fields("SOT-23", "", ""));
    let enricher = Enricher::new(EnrichOptions {
        mandatory_tries: 5,
        secondary_budget: Duration::ZERO,
        ..options(2)
    });
    let started = Instant::now();

    let item = enricher.enrich(&mut view, item()).await;

    assert_eq!(view.gotos, 1);
    assert_eq!(view.extracts, 5);
    assert_eq!(started.elapsed(), Duration::from_millis(4 * 150));
    assert_eq!(item.package, "SOT-23");
    assert!(item.error_note.is_none());
    assert!(!item.is_enriched());
}
