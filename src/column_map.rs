use std::collections::BTreeMap;

use clap::ValueEnum;
use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::schema::Metric;

/// Which cell of a results row feeds which field of a [`crate::schema::Record`].
///
/// Rows with fewer than `min_columns` cells are not results and are skipped.
/// A field whose column is not mapped is left empty.
#[derive(Clone, PartialEq, Eq, Debug, TypedBuilder, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct ColumnMap {
    min_columns: usize,
    date: usize,
    event: usize,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    category: Option<usize>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    position: Option<usize>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    distance: Option<usize>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    elapsed_time: Option<usize>,
    #[builder(default)]
    #[serde(default)]
    #[getset(skip)]
    metrics: BTreeMap<Metric, usize>,
    /// Fill `estimated_minutes` from distance and category.
    #[builder(default)]
    #[serde(default)]
    estimate_duration: bool,
}

impl ColumnMap {
    pub fn metrics(&self) -> &BTreeMap<Metric, usize> {
        &self.metrics
    }

    /// The profile results table: category, position, date, race, power columns, distance, score.
    pub fn profile() -> Self {
        Self::builder()
            .min_columns(18)
            .category(0)
            .position(1)
            .date(2)
            .event(3)
            .distance(15)
            .metrics(BTreeMap::from([(Metric::Score, 17)]))
            .estimate_duration(true)
            .build()
    }

    /// The profile results table read for its power and heart-rate columns.
    pub fn power() -> Self {
        use Metric::*;
        Self::builder()
            .min_columns(16)
            .date(2)
            .event(3)
            .distance(15)
            .metrics(BTreeMap::from([
                (Power20m, 4),
                (Power5m, 5),
                (Power1m, 6),
                (Power15s, 7),
                (Power5s, 8),
                (AvgPower, 9),
                (NormalizedPower, 10),
                (AvgWkg, 11),
                (Weight, 12),
                (AvgHr, 13),
                (MaxHr, 14),
            ]))
            .build()
    }

    /// The older narrow table: date, event, category, position, time, W/kg.
    pub fn legacy() -> Self {
        Self::builder()
            .min_columns(7)
            .date(0)
            .event(1)
            .category(2)
            .position(3)
            .elapsed_time(4)
            .metrics(BTreeMap::from([(Metric::AvgWkg, 5)]))
            .build()
    }

    pub fn validate(&self) -> Result<(), ColumnMapError> {
        if self.min_columns == 0 {
            return Err(ColumnMapError::ZeroMinColumns);
        }
        for (field, index) in [("date", self.date), ("event", self.event)] {
            if index >= self.min_columns {
                return Err(ColumnMapError::RequiredColumnOutOfRange {
                    field,
                    index,
                    min_columns: self.min_columns,
                });
            }
        }
        Ok(())
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::profile()
    }
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum ColumnMapError {
    #[error("min_columns must be at least 1")]
    ZeroMinColumns,
    #[error("The {field} column ({index}) must be below min_columns ({min_columns})")]
    RequiredColumnOutOfRange {
        field: &'static str,
        index: usize,
        min_columns: usize,
    },
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    Profile,
    Power,
    Legacy,
}

impl Layout {
    pub fn column_map(self) -> ColumnMap {
        match self {
            Layout::Profile => ColumnMap::profile(),
            Layout::Power => ColumnMap::power(),
            Layout::Legacy => ColumnMap::legacy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnMap, ColumnMapError, Layout};
    use crate::schema::Metric;

    #[test]
    fn builtin_layouts_are_valid() {
        for layout in [Layout::Profile, Layout::Power, Layout::Legacy] {
            assert_eq!(layout.column_map().validate(), Ok(()), "{layout:?}");
        }
        assert_eq!(ColumnMap::default(), ColumnMap::profile());
    }

    #[test]
    fn validate_rejects_unreachable_required_columns() {
        let map = ColumnMap::builder().min_columns(3).date(0).event(3).build();
        assert_eq!(
            map.validate(),
            Err(ColumnMapError::RequiredColumnOutOfRange {
                field: "event",
                index: 3,
                min_columns: 3
            })
        );
        let map = ColumnMap::builder().min_columns(0).date(0).event(0).build();
        assert_eq!(map.validate(), Err(ColumnMapError::ZeroMinColumns));
    }

    #[test]
    fn column_map_from_toml() {
        let map: ColumnMap = toml::from_str(
            r#"
            min_columns = 5
            date = 0
            event = 1
            distance = 2
            estimate_duration = true

            [metrics]
            avg_wkg = 3
            max_hr = 4
            "#,
        )
        .unwrap();
        assert_eq!(map.min_columns(), 5);
        assert_eq!(map.distance(), Some(2));
        assert_eq!(map.category(), None);
        assert_eq!(map.metrics()[&Metric::MaxHr], 4);
        assert!(map.estimate_duration());
    }
}
