//! Conversions from table cell text to typed values.
//!
//! Every function here is total: malformed text turns into a fallback value
//! (`0`, `None`, or the text itself), never into an error.

use chrono::NaiveDate;
use scraping_utils::regex;

use crate::schema::{Category, EventId, RaceDate};

/// `M/D/YY` becomes `YYYY-MM-DD`, with `YY < 50` read as 20YY and anything else as 19YY.
/// Text in any other shape is returned unchanged.
pub fn parse_date(raw: &str) -> RaceDate {
    match regex!(r"^([0-9]{1,2})/([0-9]{1,2})/([0-9]{2})$").captures(raw) {
        Some(captures) => {
            let (month, day, short_year) = (&captures[1], &captures[2], &captures[3]);
            let century = if short_year < "50" { "20" } else { "19" };
            format!("{century}{short_year}-{month:0>2}-{day:0>2}").into()
        }
        None => raw.to_owned().into(),
    }
}

/// Whether `date` names a real day in `YYYY-MM-DD` form.
pub fn is_plausible_date(date: &RaceDate) -> bool {
    let date = date.as_str();
    regex!(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").is_match(date)
        && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

pub fn parse_distance_km(raw: &str) -> f64 {
    let distance = parse_numeric_suffixed(raw, "km");
    if distance > 0.0 {
        distance
    } else {
        0.0
    }
}

/// Reads the number at the start of `raw` after dropping a trailing `unit`.
/// Blank or non-numeric text reads as `0`.
pub fn parse_numeric_suffixed(raw: &str, unit: &str) -> f64 {
    let number = strip_unit(raw.trim(), unit);
    regex!(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)")
        .find(number)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn strip_unit<'a>(text: &'a str, unit: &str) -> &'a str {
    text.len()
        .checked_sub(unit.len())
        .and_then(|at| Some((text.get(..at)?, text.get(at..)?)))
        .filter(|(_, suffix)| suffix.eq_ignore_ascii_case(unit))
        .map_or(text, |(number, _)| number.trim_end())
}

pub fn parse_category(raw: &str) -> Option<Category> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Category::new(letter),
        _ => None,
    }
}

pub fn parse_position(raw: &str) -> Option<String> {
    let position = raw.trim();
    (!position.is_empty()).then(|| position.to_owned())
}

pub fn extract_event_id(link: &str) -> Option<EventId> {
    regex!(r"[?&]id=([0-9]+)")
        .captures(link)
        .and_then(|captures| captures[1].parse::<u64>().ok())
        .map(EventId::from)
}

/// `... Route: Name, ...` or `(Name) ...`, whichever appears first.
pub fn extract_route_name(event_name: &str) -> Option<String> {
    let captures = regex!(r"Route:\s*([^,\)]+)|^\s*\(([^\)]+)\)").captures(event_name)?;
    let name = captures.get(1).or_else(|| captures.get(2))?.as_str().trim();
    (!name.is_empty()).then(|| name.to_owned())
}

/// Average race speed in km/h by category.
fn average_speed_kmh(category: Option<Category>) -> f64 {
    match category.map(Category::get) {
        Some('A') => 40.,
        Some('B') => 36.,
        Some('C') => 33.,
        Some('D') => 30.,
        Some('E') => 28.,
        _ => 30.,
    }
}

/// A rough guess of how long a race took, from its distance and the category's typical speed.
/// This is not a measurement and should not be treated as one.
pub fn estimate_duration_minutes(distance_km: f64, category: Option<Category>) -> u32 {
    if !(distance_km > 0.0) {
        return 0;
    }
    (distance_km / average_speed_kmh(category) * 60.).round() as u32
}

/// `H:MM:SS` or `MM:SS` to whole minutes. `DNF`, `DQ`, and anything unreadable give `None`.
pub fn parse_elapsed_minutes(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains("DNF") || raw.contains("DQ") {
        return None;
    }
    let parts = raw
        .split(':')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts[..] {
        [hours, minutes, _] => hours.checked_mul(60)?.checked_add(minutes),
        [minutes, _] => Some(minutes),
        _ => None,
    }
}
