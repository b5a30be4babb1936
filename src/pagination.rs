//! Walks a paginated results table one page at a time.
//!
//! Pagination is navigational: every step depends on what the previous step left on
//! screen, so pages are visited strictly in sequence. The only pause is the settle delay
//! after asking for the next page.

use std::time::Duration;

use getset::{CopyGetters, Getters};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tokio::time::sleep;
use typed_builder::TypedBuilder;

use crate::{
    column_map::ColumnMap, page_extractor::extract_page, row_parser::RawRow, schema::Record,
};

/// The page being scraped, as seen from the table's pagination widgets.
///
/// Any of the `Option` answers may be `None` when the page has no such widget;
/// the driver falls back to the next signal.
pub trait PageSource {
    /// Rows of the table as currently displayed.
    fn current_rows(&mut self, min_columns: usize) -> Vec<RawRow>;

    /// Whether the "next" button is enabled. `None` if there is no such button.
    fn has_next_page(&self) -> Option<bool>;

    /// Whether a button for `page` exists. `None` if there are no page-number buttons at all.
    fn has_page_control(&self, _page: u32) -> Option<bool> {
        None
    }

    /// Total number of results, when the page says so.
    fn total_expected_count(&self) -> Option<usize> {
        None
    }

    /// Asks for `page` to be shown. `false` if that could not be done.
    fn request_next_page(&mut self, page: u32) -> bool;
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Debug, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// No more than this many pages are visited, whatever the page claims.
    #[builder(default = 10)]
    pub page_cap: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "settle_delay_ms")]
    #[builder(default = Duration::from_millis(1500))]
    pub settle_delay: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DoneReason {
    NoNextControl,
    Stalled,
    EmptyPage,
    ExpectedCountReached,
    PageCapReached,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Extracting(u32),
    CheckingNext(u32),
    Advancing(u32),
    /// Waiting for the given page to replace the previous one.
    Waiting(u32),
    Done(DoneReason),
}

pub struct Driver<'s, S> {
    source: &'s mut S,
    column_map: ColumnMap,
    config: PaginationConfig,
    state: State,
    batches: Vec<Vec<Record>>,
    collected: usize,
    pages_visited: u32,
    last_fingerprint: Option<String>,
}

#[derive(Debug, Getters, CopyGetters)]
pub struct Collection {
    #[getset(get = "pub")]
    batches: Vec<Vec<Record>>,
    #[getset(get_copy = "pub")]
    pages_visited: u32,
    #[getset(get_copy = "pub")]
    reason: DoneReason,
}

impl Collection {
    /// All records in visit order.
    pub fn into_records(self) -> Vec<Record> {
        self.batches.into_iter().flatten().collect()
    }
}

impl<'s, S: PageSource> Driver<'s, S> {
    pub fn new(source: &'s mut S, column_map: ColumnMap, config: PaginationConfig) -> Self {
        Self {
            source,
            column_map,
            config,
            state: State::Extracting(1),
            batches: vec![],
            collected: 0,
            pages_visited: 0,
            last_fingerprint: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Batches collected so far. After any step this is a usable prefix of the final result.
    pub fn batches(&self) -> &[Vec<Record>] {
        &self.batches
    }

    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    /// Performs one transition and returns the new state.
    pub async fn step(&mut self) -> State {
        self.state = match self.state {
            State::Extracting(page) => self.extract(page),
            State::CheckingNext(page) => self.check_next(page),
            State::Advancing(page) => {
                info!("Moving to page {}...", page + 1);
                if self.source.request_next_page(page + 1) {
                    State::Waiting(page + 1)
                } else {
                    warn!("Could not move to page {}", page + 1);
                    State::Done(DoneReason::NoNextControl)
                }
            }
            State::Waiting(page) => {
                sleep(self.config.settle_delay).await;
                State::Extracting(page)
            }
            done @ State::Done(_) => done,
        };
        debug!("Pagination state: {:?}", self.state);
        self.state
    }

    pub async fn run(mut self) -> Collection {
        loop {
            if let State::Done(reason) = self.step().await {
                return Collection {
                    batches: self.batches,
                    pages_visited: self.pages_visited,
                    reason,
                };
            }
        }
    }

    fn extract(&mut self, page: u32) -> State {
        info!("Extracting page {page}...");
        self.pages_visited = page;
        let rows = self.source.current_rows(self.column_map.min_columns());
        let records = extract_page(&rows, &self.column_map);

        let Some(first) = records.first() else {
            if page == 1 {
                warn!("No results found on the first page ({} rows)", rows.len());
            } else {
                info!("  No results found on page {page}, stopping");
            }
            return State::Done(DoneReason::EmptyPage);
        };
        let fingerprint = first.fingerprint();
        if self.last_fingerprint.as_ref() == Some(&fingerprint) {
            warn!("  Page {page} starts with the same result as the previous page ({fingerprint:?}), stopping");
            return State::Done(DoneReason::Stalled);
        }
        self.last_fingerprint = Some(fingerprint);

        self.collected += records.len();
        info!(
            "  Found {} results on page {page} (total so far: {})",
            records.len(),
            self.collected
        );
        self.batches.push(records);
        State::CheckingNext(page)
    }

    fn check_next(&self, page: u32) -> State {
        let expected = self.source.total_expected_count();
        if let Some(total) = expected {
            if self.collected >= total {
                info!("Collected all {total} expected results");
                return State::Done(DoneReason::ExpectedCountReached);
            }
        }
        if page >= self.config.page_cap {
            warn!("Stopping at the limit of {} pages", self.config.page_cap);
            return State::Done(DoneReason::PageCapReached);
        }
        let has_next = self
            .source
            .has_next_page()
            .or_else(|| self.source.has_page_control(page + 1))
            .or_else(|| expected.map(|total| self.collected < total));
        match has_next {
            Some(true) => State::Advancing(page),
            Some(false) => {
                info!("Reached the last page");
                State::Done(DoneReason::NoNextControl)
            }
            None => {
                info!("No pagination controls found");
                State::Done(DoneReason::NoNextControl)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use itertools::Itertools;

    use super::{Collection, DoneReason, Driver, PageSource, PaginationConfig, State};
    use crate::{
        column_map::ColumnMap,
        row_parser::{tests::profile_row, RawRow},
    };

    /// Replays canned pages. Signals are switched on per test.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        pub pages: Vec<Vec<RawRow>>,
        pub current: usize,
        pub next_button: bool,
        pub page_buttons: bool,
        pub total: Option<usize>,
        /// Keep answering "yes, there is a next page" but never move.
        pub stuck: bool,
        /// Claim a next page forever, serving the last page again once they run out.
        pub endless: bool,
        pub requests: Vec<u32>,
    }

    impl ScriptedSource {
        pub(crate) fn new(pages: Vec<Vec<RawRow>>) -> Self {
            Self {
                pages,
                ..Default::default()
            }
        }
    }

    impl PageSource for ScriptedSource {
        fn current_rows(&mut self, _min_columns: usize) -> Vec<RawRow> {
            self.pages
                .get(self.current.min(self.pages.len().saturating_sub(1)))
                .cloned()
                .unwrap_or_default()
        }
        fn has_next_page(&self) -> Option<bool> {
            self.next_button
                .then(|| self.stuck || self.endless || self.current + 1 < self.pages.len())
        }
        fn has_page_control(&self, page: u32) -> Option<bool> {
            self.page_buttons
                .then(|| (page as usize) <= self.pages.len())
        }
        fn total_expected_count(&self) -> Option<usize> {
            self.total
        }
        fn request_next_page(&mut self, page: u32) -> bool {
            self.requests.push(page);
            if self.stuck {
                return true;
            }
            if self.endless || self.current + 1 < self.pages.len() {
                self.current += 1;
                true
            } else {
                false
            }
        }
    }

    pub(crate) fn page(first_day: u32, len: u32) -> Vec<RawRow> {
        (0..len)
            .map(|i| {
                profile_row(
                    &format!("5/{}/25", first_day - i),
                    &format!("Race on day {}", first_day - i),
                    "C",
                    "30km",
                )
            })
            .collect()
    }

    fn config(page_cap: u32) -> PaginationConfig {
        PaginationConfig::builder()
            .page_cap(page_cap)
            .settle_delay(Duration::ZERO)
            .build()
    }

    async fn run(source: &mut ScriptedSource, page_cap: u32) -> Collection {
        Driver::new(source, ColumnMap::profile(), config(page_cap))
            .run()
            .await
    }

    fn batch_sizes(collection: &Collection) -> Vec<usize> {
        collection.batches().iter().map(Vec::len).collect_vec()
    }

    #[tokio::test]
    async fn follows_next_button_to_the_end() {
        let mut source = ScriptedSource::new(vec![page(28, 3), page(25, 3), page(22, 2)]);
        source.next_button = true;
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::NoNextControl);
        assert_eq!(collection.pages_visited(), 3);
        assert_eq!(batch_sizes(&collection), [3, 3, 2]);
        assert_eq!(source.requests, [2, 3]);
    }

    #[tokio::test]
    async fn steps_through_every_state() {
        let mut source = ScriptedSource::new(vec![page(28, 2), page(26, 2)]);
        source.next_button = true;
        let mut driver = Driver::new(&mut source, ColumnMap::profile(), config(10));
        assert_eq!(driver.state(), State::Extracting(1));
        let mut states = vec![];
        while !matches!(driver.state(), State::Done(_)) {
            states.push(driver.step().await);
            // Whatever has been collected is already usable.
            assert!(driver.batches().iter().all(|batch| !batch.is_empty()));
        }
        assert_eq!(
            states,
            [
                State::CheckingNext(1),
                State::Advancing(1),
                State::Waiting(2),
                State::Extracting(2),
                State::CheckingNext(2),
                State::Done(DoneReason::NoNextControl),
            ]
        );
        assert_eq!(driver.step().await, State::Done(DoneReason::NoNextControl));
        assert_eq!(driver.pages_visited(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_page_buttons() {
        let mut source = ScriptedSource::new(vec![page(28, 3), page(25, 3)]);
        source.page_buttons = true;
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::NoNextControl);
        assert_eq!(batch_sizes(&collection), [3, 3]);
        assert_eq!(source.requests, [2]);
    }

    #[tokio::test]
    async fn falls_back_to_expected_count() {
        let mut source = ScriptedSource::new(vec![page(28, 3), page(25, 3), page(22, 1)]);
        source.total = Some(7);
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::ExpectedCountReached);
        assert_eq!(batch_sizes(&collection), [3, 3, 1]);
    }

    #[tokio::test]
    async fn expected_count_stops_before_the_last_button() {
        let mut source = ScriptedSource::new(vec![page(28, 3), page(25, 3), page(22, 3)]);
        source.next_button = true;
        source.total = Some(6);
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::ExpectedCountReached);
        assert_eq!(collection.pages_visited(), 2);
    }

    #[tokio::test]
    async fn no_signal_means_single_page() {
        let mut source = ScriptedSource::new(vec![page(28, 3), page(25, 3)]);
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::NoNextControl);
        assert_eq!(batch_sizes(&collection), [3]);
        assert!(source.requests.is_empty());
    }

    #[tokio::test]
    async fn stuck_navigation_is_detected() {
        let mut source = ScriptedSource::new(vec![vec![
            profile_row("5/24/25", "2025 SISU Pinkki - Stage 5", "D", "56km"),
            profile_row("5/20/25", "Crit City Race", "D", "20km"),
        ]]);
        source.next_button = true;
        source.stuck = true;
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::Stalled);
        assert_eq!(collection.pages_visited(), 2);
        assert_eq!(batch_sizes(&collection), [2]);
        assert_eq!(
            collection.batches()[0][0].fingerprint(),
            "2025-05-24-2025 SISU Pinkki - Stage 5"
        );
    }

    #[tokio::test]
    async fn empty_page_ends_the_walk() {
        let mut source = ScriptedSource::new(vec![page(28, 3), vec![], page(22, 3)]);
        source.next_button = true;
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::EmptyPage);
        assert_eq!(batch_sizes(&collection), [3]);
    }

    #[tokio::test]
    async fn empty_first_page_gives_empty_result() {
        let mut source = ScriptedSource::new(vec![vec![profile_row("", "", "", "")]]);
        source.next_button = true;
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::EmptyPage);
        assert_eq!(collection.pages_visited(), 1);
        assert!(collection.into_records().is_empty());
    }

    #[tokio::test]
    async fn refused_navigation_ends_the_walk() {
        let mut source = ScriptedSource::new(vec![page(28, 3)]);
        // The count promises more results than the table can show.
        source.total = Some(100);
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::NoNextControl);
        assert_eq!(source.requests, [2]);
    }

    #[tokio::test]
    async fn endless_source_is_capped() {
        // Every page differs, so only the cap can stop this.
        let pages = (0..30).map(|i| page(28 - i % 28, 1)).collect_vec();
        let mut source = ScriptedSource::new(pages);
        source.next_button = true;
        source.endless = true;
        let collection = run(&mut source, 10).await;
        assert_eq!(collection.reason(), DoneReason::PageCapReached);
        assert_eq!(collection.pages_visited(), 10);
        assert_eq!(source.requests, (2..=10).collect_vec());

        let mut source = ScriptedSource::new(vec![page(28, 1), page(27, 1)]);
        source.next_button = true;
        source.endless = true;
        let collection = run(&mut source, 1).await;
        assert_eq!(collection.reason(), DoneReason::PageCapReached);
        assert_eq!(collection.pages_visited(), 1);
    }
}
