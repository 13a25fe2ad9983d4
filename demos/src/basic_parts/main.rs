use std::{error::Error, path::PathBuf};

use catalogcrawler::{
    chrome::ChromeSession, report, Config, Crawler, ReportWriter, XlsxReport,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info"))
                .expect("telemetry: Creating EnvFilter"),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "basic_parts: starting");

    let session = ChromeSession::launch((&config).into()).await?;
    let result = harvest(&session, &config).await;
    if let Err(err) = session.close().await {
        tracing::warn!("basic_parts: closing browser: {}", err);
    }
    let path = result?;

    println!("Saved {}", path.display());
    Ok(())
}

async fn harvest(session: &ChromeSession, config: &Config) -> Result<PathBuf, Box<dyn Error>> {
    let mut listing = session.listing().await?;
    let mut detail = session.detail().await?;

    let crawler = Crawler::new(config.listing_url.clone(), config.crawler_options());
    let items = crawler.run(&mut listing, &mut detail).await?;

    let today = chrono::Local::now().date_naive();
    let path = PathBuf::from(report::file_name(&config.output_base, today));
    XlsxReport::default().write(&items, &path)?;
    Ok(path)
}
