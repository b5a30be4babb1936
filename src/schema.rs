use std::collections::BTreeMap;

use derive_more::{AsRef, Display, From};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use strum::EnumIter;
use typed_builder::TypedBuilder;

#[derive(Clone, PartialEq, Debug, TypedBuilder, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Record {
    #[getset(get = "pub")]
    date: RaceDate,
    #[getset(get = "pub")]
    event_name: EventName,
    #[getset(get_copy = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<EventId>,
    #[getset(get_copy = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
    #[getset(get = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<String>,
    #[getset(get_copy = "pub")]
    #[builder(default)]
    distance_km: f64,
    /// Rough duration guessed from distance and category speed; never measured.
    #[getset(get_copy = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_minutes: Option<u32>,
    #[getset(get_copy = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    elapsed_minutes: Option<u32>,
    #[getset(get = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    elapsed_text: Option<String>,
    #[getset(get = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metrics: BTreeMap<Metric, Measurement>,
    #[getset(get = "pub")]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    route_name: Option<String>,
    #[getset(get = "pub")]
    #[builder(default)]
    #[serde(default)]
    event_link: String,
}

impl Record {
    /// `date-event_name`, used to tell whether pagination actually moved.
    pub fn fingerprint(&self) -> String {
        format!("{}-{}", self.date, self.event_name)
    }
}

/// Either `YYYY-MM-DD` or, when the cell was not in a known date format, the cell text as is.
#[derive(
    Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, From, AsRef, Display, Serialize, Deserialize,
)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct RaceDate(String);

impl RaceDate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(
    Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, From, AsRef, Display, Serialize, Deserialize,
)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, From, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Race category letter, always upper case.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Category(char);

impl Category {
    pub fn new(letter: char) -> Option<Self> {
        letter
            .is_ascii_alphabetic()
            .then(|| Self(letter.to_ascii_uppercase()))
    }
    pub fn get(self) -> char {
        self.0
    }
}

impl TryFrom<char> for Category {
    type Error = String;
    fn try_from(letter: char) -> Result<Self, Self::Error> {
        Self::new(letter).ok_or_else(|| format!("Not a category letter: {letter:?}"))
    }
}

impl From<Category> for char {
    fn from(category: Category) -> char {
        category.0
    }
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Serialize,
    Deserialize,
    EnumIter,
    strum::Display,
)]
pub enum Metric {
    #[serde(rename = "power_20m")]
    #[strum(serialize = "power_20m")]
    Power20m,
    #[serde(rename = "power_5m")]
    #[strum(serialize = "power_5m")]
    Power5m,
    #[serde(rename = "power_1m")]
    #[strum(serialize = "power_1m")]
    Power1m,
    #[serde(rename = "power_15s")]
    #[strum(serialize = "power_15s")]
    Power15s,
    #[serde(rename = "power_5s")]
    #[strum(serialize = "power_5s")]
    Power5s,
    #[serde(rename = "avg_power")]
    #[strum(serialize = "avg_power")]
    AvgPower,
    #[serde(rename = "normalized_power")]
    #[strum(serialize = "normalized_power")]
    NormalizedPower,
    #[serde(rename = "avg_wkg")]
    #[strum(serialize = "avg_wkg")]
    AvgWkg,
    #[serde(rename = "weight")]
    #[strum(serialize = "weight")]
    Weight,
    #[serde(rename = "avg_hr")]
    #[strum(serialize = "avg_hr")]
    AvgHr,
    #[serde(rename = "max_hr")]
    #[strum(serialize = "max_hr")]
    MaxHr,
    #[serde(rename = "score")]
    #[strum(serialize = "score")]
    Score,
}

impl Metric {
    /// Suffix the results table appends to the number.
    pub fn unit(self) -> &'static str {
        use Metric::*;
        match self {
            Power20m | Power5m | Power1m | Power15s | Power5s | AvgPower | NormalizedPower => "w",
            AvgWkg => "w/kg",
            Weight => "kg",
            AvgHr | MaxHr => "bpm",
            Score => "",
        }
    }
}

/// A numeric cell, kept together with its text. `value` is 0 when the text could not be read.
#[derive(Clone, PartialEq, Debug, CopyGetters, Getters, Serialize, Deserialize)]
pub struct Measurement {
    #[getset(get = "pub")]
    text: String,
    #[getset(get_copy = "pub")]
    value: f64,
}

impl Measurement {
    pub fn new(text: String, value: f64) -> Self {
        Self { text, value }
    }
}
