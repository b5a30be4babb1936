use std::{fmt::Debug, path::PathBuf};

use scraping_utils::fs_json_util::read_toml;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
    column_map::{ColumnMap, ColumnMapError, Layout},
    html_table::TableSelectors,
    merge::DedupKey,
    pagination::PaginationConfig,
};

/// Everything a run can be tuned with. Every field may be left out of the file.
///
/// An explicit `column_map` takes precedence over `layout`.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: Layout,
    pub column_map: Option<ColumnMap>,
    pub dedup_key: DedupKey,
    pub pagination: PaginationConfig,
    pub selectors: TableSelectors,
    pub base_url: Option<Url>,
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum ConfigError {
    #[error("page_cap must be at least 1")]
    ZeroPageCap,
    #[error("Invalid column map: {0}")]
    ColumnMap(#[from] ColumnMapError),
}

impl Config {
    pub fn load<P: Into<PathBuf> + Debug>(path: P) -> anyhow::Result<Self> {
        read_toml(path)
    }

    pub fn column_map(&self) -> ColumnMap {
        self.column_map
            .clone()
            .unwrap_or_else(|| self.layout.column_map())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.page_cap == 0 {
            return Err(ConfigError::ZeroPageCap);
        }
        self.column_map().validate()?;
        Ok(())
    }
}
