//! Reads the results table and its pagination widgets out of saved copies of the profile page.

use std::{fmt::Debug, path::PathBuf};

use anyhow::{anyhow, bail, Context};
use itertools::Itertools;
use log::{debug, info, warn};
use scraper::{ElementRef, Html, Selector};
use scraping_utils::{regex, selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    pagination::PageSource,
    row_parser::{RawCell, RawRow},
};

/// CSS selectors locating the parts of the page the scraper reads.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSelectors {
    pub rows: String,
    pub cells: String,
    pub next_control: String,
    pub page_controls: String,
    pub info: String,
}

impl Default for TableSelectors {
    fn default() -> Self {
        Self {
            rows: "#profile_results tbody tr".to_owned(),
            cells: "td".to_owned(),
            next_control: "#profile_results_next".to_owned(),
            page_controls: ".paginate_button".to_owned(),
            info: "#profile_results_info".to_owned(),
        }
    }
}

struct Compiled {
    rows: Selector,
    cells: Selector,
    next_control: Selector,
    page_controls: Selector,
    info: Selector,
}

impl TryFrom<&TableSelectors> for Compiled {
    type Error = anyhow::Error;
    fn try_from(selectors: &TableSelectors) -> anyhow::Result<Self> {
        let parse = |selector: &str| {
            Selector::parse(selector).map_err(|e| anyhow!("Invalid selector {selector:?}: {e}"))
        };
        Ok(Self {
            rows: parse(&selectors.rows)?,
            cells: parse(&selectors.cells)?,
            next_control: parse(&selectors.next_control)?,
            page_controls: parse(&selectors.page_controls)?,
            info: parse(&selectors.info)?,
        })
    }
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn read_rows(html: &Html, selectors: &Compiled, base_url: Option<&Url>) -> Vec<RawRow> {
    html.select(&selectors.rows)
        .map(|row| {
            row.select(&selectors.cells)
                .map(|cell| RawCell {
                    text: text_of(cell),
                    link: cell
                        .select(selector!("a[href]"))
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(|href| resolve_link(href, base_url)),
                })
                .collect_vec()
        })
        .collect()
}

fn resolve_link(href: &str, base_url: Option<&Url>) -> String {
    base_url
        .and_then(|base| base.join(href).ok())
        .map_or_else(|| href.to_owned(), String::from)
}

fn read_next_control(html: &Html, selectors: &Compiled) -> Option<bool> {
    let control = html.select(&selectors.next_control).next()?;
    let disabled = control.value().classes().any(|class| class == "disabled")
        || control.value().attr("aria-disabled") == Some("true");
    Some(!disabled)
}

fn read_page_control(html: &Html, selectors: &Compiled, page: u32) -> Option<bool> {
    let controls = html.select(&selectors.page_controls).collect_vec();
    if controls.is_empty() {
        return None;
    }
    let label = page.to_string();
    Some(controls.into_iter().any(|control| text_of(control) == label))
}

/// The `... of N entries` count in the table's info line.
fn read_total_count(html: &Html, selectors: &Compiled) -> Option<usize> {
    let info = text_of(html.select(&selectors.info).next()?);
    let captures = regex!(r"of ([0-9][0-9,]*) entries").captures(&info)?;
    captures[1].replace(',', "").parse().ok()
}

/// Replays saved copies of the results page. Asking for the next page moves on to the next copy.
pub struct SnapshotSource {
    pages: Vec<Html>,
    current: usize,
    selectors: Compiled,
    base_url: Option<Url>,
}

impl SnapshotSource {
    pub fn new(
        pages: Vec<Html>,
        selectors: &TableSelectors,
        base_url: Option<Url>,
    ) -> anyhow::Result<Self> {
        if pages.is_empty() {
            bail!("No page snapshots were given");
        }
        Ok(Self {
            pages,
            current: 0,
            selectors: selectors.try_into()?,
            base_url,
        })
    }

    pub fn load<P: Into<PathBuf> + Debug + Clone>(
        paths: &[P],
        selectors: &TableSelectors,
        base_url: Option<Url>,
    ) -> anyhow::Result<Self> {
        let pages = paths
            .iter()
            .map(|path| {
                let path = path.clone().into();
                let text = fs_err::read_to_string(&path)
                    .with_context(|| format!("While reading the page snapshot {path:?}"))?;
                info!("Loaded page snapshot {path:?}");
                anyhow::Ok(Html::parse_document(&text))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Self::new(pages, selectors, base_url)
    }

    fn page(&self) -> Option<&Html> {
        self.pages.get(self.current)
    }
}

impl PageSource for SnapshotSource {
    fn current_rows(&mut self, min_columns: usize) -> Vec<RawRow> {
        let Some(html) = self.page() else {
            return vec![];
        };
        let rows = read_rows(html, &self.selectors, self.base_url.as_ref());
        debug!(
            "{} of {} rows have at least {min_columns} cells",
            rows.iter().filter(|row| row.len() >= min_columns).count(),
            rows.len()
        );
        rows
    }

    fn has_next_page(&self) -> Option<bool> {
        read_next_control(self.page()?, &self.selectors)
    }

    fn has_page_control(&self, page: u32) -> Option<bool> {
        read_page_control(self.page()?, &self.selectors, page)
    }

    fn total_expected_count(&self) -> Option<usize> {
        read_total_count(self.page()?, &self.selectors)
    }

    fn request_next_page(&mut self, page: u32) -> bool {
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            true
        } else {
            warn!("No snapshot left to show page {page}");
            false
        }
    }
}
