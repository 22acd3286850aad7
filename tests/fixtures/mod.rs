//! Test fixtures for trip-planner.
//!
//! Provides:
//! - an equator grid where one degree of longitude is exactly one hour of
//!   driving, so leg times are predictable
//! - a trip builder with sensible defaults
//! - a small Detroit trip in trip-file JSON shape

#![allow(dead_code)]

pub mod detroit_trip;

use std::f64::consts::PI;

use chrono::Weekday;
use trip_planner::context::{RunOptions, SchedulingContext};
use trip_planner::model::{
    Anchor, ClockTime, Coordinate, DayConfig, LockPosition, LockSpec, OpenWindow, Store, TimeWindow, Trip,
};

/// Miles per degree of longitude on the equator. Used as the speed, it makes
/// every degree exactly 60 minutes of driving.
pub const DEGREE_MILES: f64 = 3958.8 * PI / 180.0;

pub const DAY: &str = "D1";

/// Tolerance for comparing simulated minutes in tests.
pub const TOL: f64 = 1e-6;

pub fn hm(hour: u32, minute: u32) -> ClockTime {
    ClockTime::hm(hour, minute)
}

/// A point `minutes` of driving east of the depot (west when negative).
pub fn east(minutes: f64) -> Coordinate {
    Coordinate::new(0.0, minutes / 60.0)
}

/// A store `minutes` of driving from the depot with no dwell.
pub fn store(id: &str, minutes: f64) -> Store {
    Store::new(id, format!("Store {id}"), east(minutes)).with_dwell(0.0)
}

pub fn window(open: ClockTime, close: ClockTime) -> OpenWindow {
    OpenWindow::new(open, close)
}

/// Builder for single-day test trips with sensible defaults.
///
/// Depot at the origin for both anchors, 08:00-18:00, speed such that one
/// degree of longitude takes an hour, zero default dwell.
pub struct TripBuilder {
    trip: Trip,
}

impl TripBuilder {
    pub fn new() -> Self {
        let depot = Anchor::new("depot", "Depot", east(0.0));
        let mut day = DayConfig::new(DAY, depot.clone(), depot, TimeWindow::new(hm(8, 0), hm(18, 0)));
        day.mph = Some(DEGREE_MILES);
        day.default_dwell_min = Some(0.0);

        let mut trip = Trip::default();
        trip.days.push(day);
        Self { trip }
    }

    fn day(&mut self) -> &mut DayConfig {
        &mut self.trip.days[0]
    }

    pub fn window(mut self, start: ClockTime, end: ClockTime) -> Self {
        self.day().window = TimeWindow::new(start, end);
        self
    }

    pub fn weekday(mut self, weekday: Weekday) -> Self {
        self.day().day_of_week = Some(weekday);
        self
    }

    pub fn store(mut self, store: Store) -> Self {
        self.trip.stores.push(store);
        self
    }

    pub fn must_visit(mut self, id: &str) -> Self {
        self.day().must_visit_ids.push(id.to_string());
        self
    }

    pub fn must_visit_tag(mut self, tag: &str) -> Self {
        self.day().must_visit_tags.push(tag.to_string());
        self
    }

    pub fn lock(mut self, id: &str, position: LockPosition) -> Self {
        self.day().locks.push(LockSpec::new(id, position));
        self
    }

    pub fn max_stops(mut self, cap: usize) -> Self {
        self.day().max_stops = Some(cap);
        self
    }

    pub fn max_drive_time(mut self, minutes: f64) -> Self {
        self.day().max_drive_time = Some(minutes);
        self
    }

    pub fn break_window(mut self, start: ClockTime, end: ClockTime) -> Self {
        self.day().break_window = Some(TimeWindow::new(start, end));
        self
    }

    pub fn default_dwell(mut self, minutes: f64) -> Self {
        self.day().default_dwell_min = Some(minutes);
        self
    }

    pub fn end_at(mut self, coordinate: Coordinate) -> Self {
        self.day().end = Anchor::new("end", "End", coordinate);
        self
    }

    pub fn build(self) -> Trip {
        self.trip
    }
}

/// Resolve the scheduling context of the test day.
pub fn context(trip: &Trip, options: &RunOptions) -> SchedulingContext {
    SchedulingContext::build(trip, &trip.days[0], options).0
}

pub fn order(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
