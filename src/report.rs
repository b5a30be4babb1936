use getset::{CopyGetters, Getters};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    merge::{finalize, Summary},
    pagination::{DoneReason, Driver, PageSource},
    schema::Record,
};

/// The outcome of one run: why the walk stopped, and the deduplicated results.
#[derive(Clone, PartialEq, Debug, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Report {
    #[getset(get_copy = "pub")]
    reason: DoneReason,
    #[getset(get_copy = "pub")]
    pages_visited: u32,
    #[getset(get = "pub")]
    summary: Summary,
    #[getset(get = "pub")]
    records: Vec<Record>,
}

/// Walks every page `source` offers and merges what was found.
pub async fn scrape<S: PageSource>(source: &mut S, config: &Config) -> Report {
    let collection = Driver::new(source, config.column_map(), config.pagination)
        .run()
        .await;
    let reason = collection.reason();
    let pages_visited = collection.pages_visited();
    info!("Stopped after {pages_visited} page(s): {reason}");

    let (records, summary) = finalize(collection.into_records(), config.dedup_key).into_parts();
    if records.is_empty() {
        warn!("No results were collected ({reason})");
    } else {
        info!(
            "{} unique results out of {} rows read",
            summary.unique_count(),
            summary.raw_count()
        );
    }
    Report {
        reason,
        pages_visited,
        summary,
        records,
    }
}
