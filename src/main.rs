use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use log::info;
use scraping_utils::fs_json_util::write_json;
use url::Url;
use zwiftpower_scraping::{
    column_map::Layout,
    config::Config,
    html_table::SnapshotSource,
    merge::{DedupKey, Summary},
    report::scrape,
};

/// Collects race results from saved copies of a results table, one file per page.
#[derive(Parser)]
struct Opts {
    /// Page snapshots in the order the pages are visited.
    #[arg(required = true)]
    pages: Vec<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    layout: Option<Layout>,
    #[arg(long, value_enum)]
    dedup_key: Option<DedupKey>,
    #[arg(long)]
    page_cap: Option<u32>,
    /// Wait after each page change, in milliseconds.
    #[arg(long)]
    settle_ms: Option<u64>,
    /// Relative links in the table are resolved against this URL.
    #[arg(long)]
    base_url: Option<Url>,
    #[arg(long, default_value = "zwiftpower_results.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    let mut config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(layout) = opts.layout {
        config.layout = layout;
        config.column_map = None;
    }
    if let Some(dedup_key) = opts.dedup_key {
        config.dedup_key = dedup_key;
    }
    if let Some(page_cap) = opts.page_cap {
        config.pagination.page_cap = page_cap;
    }
    if let Some(settle_ms) = opts.settle_ms {
        config.pagination.settle_delay = Duration::from_millis(settle_ms);
    }
    if let Some(base_url) = opts.base_url {
        config.base_url = Some(base_url);
    }
    config.validate().context("Invalid configuration")?;

    let mut source =
        SnapshotSource::load(&opts.pages, &config.selectors, config.base_url.clone())?;
    let report = scrape(&mut source, &config).await;
    log_summary(report.summary());

    write_json(&opts.output, &report)?;
    info!("Successfully saved data to {:?}.", opts.output);

    Ok(())
}

fn log_summary(summary: &Summary) {
    info!(
        "Unique races: {} ({} rows read)",
        summary.unique_count(),
        summary.raw_count()
    );
    if let Some(range) = summary.date_range() {
        info!("Date range: {} to {}", range.earliest(), range.latest());
    }
    let categories = summary
        .by_category()
        .iter()
        .map(|(category, count)| format!("{category}: {count}"))
        .chain((summary.uncategorized() > 0).then(|| format!("none: {}", summary.uncategorized())))
        .join(", ");
    if !categories.is_empty() {
        info!("Races by category: {categories}");
    }
}
