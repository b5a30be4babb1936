use log::trace;

use crate::{
    column_map::ColumnMap,
    normalize::{
        estimate_duration_minutes, extract_event_id, extract_route_name, is_plausible_date,
        parse_category, parse_date, parse_distance_km, parse_elapsed_minutes,
        parse_numeric_suffixed, parse_position,
    },
    schema::{Measurement, Record},
};

/// Text of one table cell, with the target of its first hyperlink if it has one.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct RawCell {
    pub text: String,
    pub link: Option<String>,
}

impl RawCell {
    pub fn with_link(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(link.into()),
        }
    }
}

impl From<&str> for RawCell {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            link: None,
        }
    }
}

impl From<String> for RawCell {
    fn from(text: String) -> Self {
        Self { text, link: None }
    }
}

pub type RawRow = Vec<RawCell>;

/// Reads one table row. Returns `None` for rows that are not race results:
/// rows shorter than the layout, and rows without a real date or a meaningful event name
/// (category headings and other decoration share the table markup).
pub fn parse_row(cells: &[RawCell], map: &ColumnMap) -> Option<Record> {
    if cells.len() < map.min_columns() {
        trace!(
            "Skipping a row with {} cells (expected at least {})",
            cells.len(),
            map.min_columns()
        );
        return None;
    }
    let text = |index: usize| cells.get(index).map_or("", |cell| cell.text.trim());

    let date = parse_date(text(map.date()));
    let event_name = text(map.event());
    if !is_plausible_date(&date) || event_name.chars().count() <= 3 {
        trace!("Skipping a non-result row: date={date:?}, event={event_name:?}");
        return None;
    }

    let event_link = cells
        .get(map.event())
        .and_then(|cell| cell.link.as_deref())
        .unwrap_or_default()
        .trim();
    let category = map.category().map(text).and_then(parse_category);
    let distance_km = map.distance().map(text).map_or(0., parse_distance_km);
    let elapsed_text = map.elapsed_time().map(text).and_then(parse_position);
    let metrics = map
        .metrics()
        .iter()
        .map(|(&metric, &index)| {
            let raw = text(index);
            let value = parse_numeric_suffixed(raw, metric.unit());
            (metric, Measurement::new(raw.to_owned(), value))
        })
        .collect();

    Some(
        Record::builder()
            .date(date)
            .event_name(event_name.to_owned().into())
            .event_id(extract_event_id(event_link))
            .category(category)
            .position(map.position().map(text).and_then(parse_position))
            .distance_km(distance_km)
            .estimated_minutes(
                map.estimate_duration()
                    .then(|| estimate_duration_minutes(distance_km, category)),
            )
            .elapsed_minutes(elapsed_text.as_deref().and_then(parse_elapsed_minutes))
            .elapsed_text(elapsed_text)
            .metrics(metrics)
            .route_name(extract_route_name(event_name))
            .event_link(event_link.to_owned())
            .build(),
    )
}
