//! Trip data model.
//!
//! These types mirror the trip file shape. Shapes and ranges are validated
//! upstream by the parsing collaborator; the planner trusts what it gets.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A time of day in whole minutes since local midnight.
///
/// Travels through the trip file as an `"HH:MM"` string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u32);

impl ClockTime {
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub const fn hm(hour: u32, minute: u32) -> Self {
        Self(hour * 60 + minute)
    }

    /// Minutes since midnight as the planner's working unit.
    pub fn minutes(self) -> f64 {
        f64::from(self.0)
    }

    pub fn parse(text: &str) -> Result<Self, chrono::ParseError> {
        let time = NaiveTime::parse_from_str(text.trim(), "%H:%M")?;
        Ok(Self(time.hour() * 60 + time.minute()))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ClockTime::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Render fractional minutes since midnight as `HH:MM`, rounding to the minute.
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.round().max(0.0) as u32;
    ClockTime::from_minutes(total).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Fixed start or end location of a day. Never scored, never a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl Anchor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate,
        }
    }
}

/// One `[open, close]` window of a store's day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow(pub ClockTime, pub ClockTime);

impl OpenWindow {
    pub const fn new(open: ClockTime, close: ClockTime) -> Self {
        Self(open, close)
    }

    pub fn open(&self) -> f64 {
        self.0.minutes()
    }

    pub fn close(&self) -> f64 {
        self.1.minutes()
    }
}

/// Weekday to ordered opening windows.
pub type OpenHours = HashMap<Weekday, Vec<OpenWindow>>;

/// Opening state of a store on the active weekday.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayHours<'a> {
    /// No opening-hour data, or no active weekday to check against.
    Unrestricted,
    Closed,
    Open(&'a [OpenWindow]),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default, alias = "dwellMinutes")]
    pub dwell_min: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub open_hours: Option<OpenHours>,
    #[serde(default)]
    pub day_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Store {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate,
            dwell_min: None,
            score: None,
            tags: Vec::new(),
            open_hours: None,
            day_id: None,
            address: None,
        }
    }

    pub fn with_dwell(mut self, minutes: f64) -> Self {
        self.dwell_min = Some(minutes);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_day(mut self, day_id: impl Into<String>) -> Self {
        self.day_id = Some(day_id.into());
        self
    }

    pub fn with_hours(mut self, weekday: Weekday, windows: Vec<OpenWindow>) -> Self {
        self.open_hours.get_or_insert_with(HashMap::new).insert(weekday, windows);
        self
    }

    /// Opening state for `weekday`. Hours are only enforced when both the
    /// store carries hour data and the day names its weekday.
    pub fn hours_on(&self, weekday: Option<Weekday>) -> DayHours<'_> {
        let (Some(hours), Some(weekday)) = (self.open_hours.as_ref(), weekday) else {
            return DayHours::Unrestricted;
        };
        match hours.get(&weekday) {
            Some(windows) if !windows.is_empty() => DayHours::Open(windows),
            _ => DayHours::Closed,
        }
    }

    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// Relative slot a locked store must occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockPosition {
    /// First entry after the start anchor.
    First,
    /// Final entry before the end anchor; nothing may follow it.
    Last,
    /// The n-th store entry (0-based), counting stores only.
    Index(usize),
}

impl fmt::Display for LockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockPosition::First => write!(f, "first"),
            LockPosition::Last => write!(f, "last"),
            LockPosition::Index(index) => write!(f, "store slot {index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSpec {
    pub store_id: String,
    pub position: LockPosition,
}

impl LockSpec {
    pub fn new(store_id: impl Into<String>, position: LockPosition) -> Self {
        Self {
            store_id: store_id.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeWindow {
    pub const fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }
}

/// A required pause. The break entry occupies this window directly.
pub type BreakWindow = TimeWindow;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayConfig {
    pub day_id: String,
    pub start: Anchor,
    pub end: Anchor,
    pub window: TimeWindow,
    pub mph: Option<f64>,
    pub default_dwell_min: Option<f64>,
    #[serde(default)]
    pub must_visit_ids: Vec<String>,
    /// Stores carrying any of these tags are mandatory for the day.
    #[serde(default)]
    pub must_visit_tags: Vec<String>,
    #[serde(default)]
    pub locks: Vec<LockSpec>,
    pub max_drive_time: Option<f64>,
    pub max_stops: Option<usize>,
    pub break_window: Option<BreakWindow>,
    pub robustness_factor: Option<f64>,
    pub risk_threshold_min: Option<f64>,
    pub day_of_week: Option<Weekday>,
}

impl DayConfig {
    pub fn new(day_id: impl Into<String>, start: Anchor, end: Anchor, window: TimeWindow) -> Self {
        Self {
            day_id: day_id.into(),
            start,
            end,
            window,
            mph: None,
            default_dwell_min: None,
            must_visit_ids: Vec::new(),
            must_visit_tags: Vec::new(),
            locks: Vec::new(),
            max_drive_time: None,
            max_stops: None,
            break_window: None,
            robustness_factor: None,
            risk_threshold_min: None,
            day_of_week: None,
        }
    }
}

/// Trip-wide defaults, overridden per day and per run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripConfig {
    pub mph: Option<f64>,
    pub default_dwell_min: Option<f64>,
    pub seed: Option<u64>,
    pub lambda: Option<f64>,
    pub robustness_factor: Option<f64>,
    pub risk_threshold_min: Option<f64>,
    pub run_note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub config: TripConfig,
    pub days: Vec<DayConfig>,
    pub stores: Vec<Store>,
}

impl Trip {
    pub fn day(&self, day_id: &str) -> Option<&DayConfig> {
        self.days.iter().find(|day| day.day_id == day_id)
    }

    pub fn day_ids(&self) -> Vec<&str> {
        self.days.iter().map(|day| day.day_id.as_str()).collect()
    }
}
