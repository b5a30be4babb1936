use std::collections::BTreeMap;

use clap::ValueEnum;
use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::schema::{Category, EventName, RaceDate, Record};

/// Which fields decide that two records are the same result.
///
/// `date-name` merges two same-day races with the same name; the stricter keys keep them apart
/// when they differ in category or position.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupKey {
    #[default]
    DateName,
    DateNameCategory,
    DateNameCategoryPosition,
}

type Key = (RaceDate, EventName, Option<Category>, Option<String>);

impl DedupKey {
    fn key_of(self, record: &Record) -> Key {
        let category = match self {
            DedupKey::DateName => None,
            DedupKey::DateNameCategory | DedupKey::DateNameCategoryPosition => record.category(),
        };
        let position = match self {
            DedupKey::DateNameCategoryPosition => record.position().clone(),
            DedupKey::DateName | DedupKey::DateNameCategory => None,
        };
        (
            record.date().clone(),
            record.event_name().clone(),
            category,
            position,
        )
    }
}

#[derive(Clone, PartialEq, Debug, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Summary {
    /// Records seen across all pages, duplicates included.
    #[getset(get_copy = "pub")]
    raw_count: usize,
    #[getset(get_copy = "pub")]
    unique_count: usize,
    #[getset(get = "pub")]
    date_range: Option<DateRange>,
    #[getset(get = "pub")]
    by_category: BTreeMap<Category, usize>,
    #[getset(get_copy = "pub")]
    uncategorized: usize,
}

#[derive(Clone, PartialEq, Eq, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct DateRange {
    earliest: RaceDate,
    latest: RaceDate,
}

#[derive(Clone, PartialEq, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct Merged {
    records: Vec<Record>,
    summary: Summary,
}

impl Merged {
    pub fn into_parts(self) -> (Vec<Record>, Summary) {
        (self.records, self.summary)
    }
}

/// Deduplicates records given in visit order and sorts them newest first.
///
/// A later record replaces an earlier one with the same key. Records on the same date keep
/// the order in which their keys were first seen.
pub fn finalize(records: impl IntoIterator<Item = Record>, key: DedupKey) -> Merged {
    let mut raw_count = 0;
    let mut unique = IndexMap::<Key, Record>::new();
    for record in records {
        raw_count += 1;
        unique.insert(key.key_of(&record), record);
    }
    let mut records = unique.into_values().collect_vec();
    records.sort_by(|x, y| y.date().cmp(x.date()));

    let date_range = match records.iter().map(Record::date).minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(date) => Some((date, date)),
        MinMaxResult::MinMax(earliest, latest) => Some((earliest, latest)),
    }
    .map(|(earliest, latest)| DateRange {
        earliest: earliest.clone(),
        latest: latest.clone(),
    });
    let mut by_category = BTreeMap::<Category, usize>::new();
    let mut uncategorized = 0;
    for record in &records {
        match record.category() {
            Some(category) => *by_category.entry(category).or_default() += 1,
            None => uncategorized += 1,
        }
    }

    let summary = Summary {
        raw_count,
        unique_count: records.len(),
        date_range,
        by_category,
        uncategorized,
    };
    Merged { records, summary }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use itertools::Itertools;

    use super::{finalize, DedupKey};
    use crate::schema::{Category, Record};

    fn record(date: &str, name: &str, category: Option<char>, position: &str) -> Record {
        Record::builder()
            .date(date.to_owned().into())
            .event_name(name.to_owned().into())
            .category(category.and_then(Category::new))
            .position(Some(position.to_owned()))
            .build()
    }

    fn dates(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.date().as_str()).collect_vec()
    }

    #[test]
    fn later_duplicate_wins() {
        let first = record("2025-05-24", "Stage 5", Some('D'), "#17");
        let second = Record::builder()
            .date("2025-05-24".to_owned().into())
            .event_name("Stage 5".to_owned().into())
            .category(Category::new('D'))
            .position(Some("#12".to_owned()))
            .distance_km(56.0)
            .build();
        let batches = vec![
            vec![first, record("2025-05-20", "Crit City", Some('D'), "#3")],
            vec![second.clone(), record("2025-05-01", "Volcano", None, "#9")],
        ];
        let merged = finalize(batches.into_iter().flatten(), DedupKey::DateName);
        let records = merged.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], second);
        assert_eq!(merged.summary().raw_count(), 4);
        assert_eq!(merged.summary().unique_count(), 3);
    }

    #[test]
    fn key_strictness() {
        let records = vec![
            record("2025-05-24", "Double Header", Some('C'), "#4"),
            record("2025-05-24", "Double Header", Some('B'), "#4"),
            record("2025-05-24", "Double Header", Some('B'), "#9"),
            record("2025-05-24", "Double Header", Some('B'), "#9"),
        ];
        let count = |key| finalize(records.clone(), key).records().len();
        assert_eq!(count(DedupKey::DateName), 1);
        assert_eq!(count(DedupKey::DateNameCategory), 2);
        assert_eq!(count(DedupKey::DateNameCategoryPosition), 3);
    }

    #[test]
    fn sorted_newest_first() {
        let records = vec![
            record("2024-12-31", "New Year's Eve Ride", None, "1"),
            record("2025-05-24", "Stage 5", Some('D'), "2"),
            record("1999-01-01", "Old Times", Some('A'), "3"),
            record("2025-05-24", "Second Race", Some('D'), "4"),
            record("2025-01-02", "Crit City", Some('D'), "5"),
        ];
        let merged = finalize(records, DedupKey::DateNameCategoryPosition);
        let records = merged.records();
        assert_eq!(
            dates(records),
            ["2025-05-24", "2025-05-24", "2025-01-02", "2024-12-31", "1999-01-01"]
        );
        assert!(records.windows(2).all(|w| w[0].date() >= w[1].date()));
        // Same date: first seen comes first.
        assert_eq!(records[0].event_name().as_str(), "Stage 5");

        let summary = merged.summary();
        let range = summary.date_range().as_ref().unwrap();
        assert_eq!(range.earliest().as_str(), "1999-01-01");
        assert_eq!(range.latest().as_str(), "2025-05-24");
        assert_eq!(
            summary.by_category(),
            &BTreeMap::from([
                (Category::new('A').unwrap(), 1),
                (Category::new('D').unwrap(), 3)
            ])
        );
        assert_eq!(summary.uncategorized(), 1);
    }

    #[test]
    fn empty_input() {
        let merged = finalize(vec![], DedupKey::default());
        assert!(merged.records().is_empty());
        assert_eq!(merged.summary().raw_count(), 0);
        assert_eq!(merged.summary().date_range(), &None);
        let json = serde_json::to_value(merged.summary()).unwrap();
        assert_eq!(json["date_range"], serde_json::Value::Null);
    }

    #[test]
    fn summary_json_uses_category_letters() {
        let merged = finalize(
            vec![record("2025-05-24", "Stage 5", Some('D'), "#17")],
            DedupKey::DateName,
        );
        let json = serde_json::to_value(merged.summary()).unwrap();
        assert_eq!(json["by_category"]["D"], 1);
        assert_eq!(json["date_range"]["earliest"], "2025-05-24");
    }
}
