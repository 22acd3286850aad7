//! Timeline simulation for an ordered stop sequence.
//!
//! Walks the order from the start anchor at the window's opening, computing
//! arrival and departure at every entry and the projected return to the end
//! anchor. It never fails on lateness: opening-hour and break problems are
//! recorded as violations so callers can probe many orders cheaply.

use std::fmt;

use crate::context::{BREAK_ID, SchedulingContext};
use crate::model::{DayHours, OpenWindow, format_minutes};
use crate::plan::{StopKind, StopPlan};
use crate::traits::TravelEstimator;

/// Tolerance for comparing simulated minutes.
pub const EPSILON: f64 = 1e-6;

/// A schedule problem found while simulating.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleViolation {
    /// The store has hour data but no window on the active weekday.
    ClosedToday { store_id: String },
    /// No opening window can hold the full dwell.
    AfterClose { store_id: String, depart: f64, close: f64 },
    /// The route reaches the break after it was due to start.
    BreakMissed { arrive: f64, start: f64 },
    /// The order names an id the context does not know.
    UnknownEntry { id: String },
}

impl ScheduleViolation {
    /// Minutes by which the violation misses, used to rank repair moves.
    pub fn overrun(&self) -> f64 {
        match self {
            ScheduleViolation::ClosedToday { .. } | ScheduleViolation::UnknownEntry { .. } => 24.0 * 60.0,
            ScheduleViolation::AfterClose { depart, close, .. } => (depart - close).max(1.0),
            ScheduleViolation::BreakMissed { arrive, start } => (arrive - start).max(1.0),
        }
    }
}

impl fmt::Display for ScheduleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleViolation::ClosedToday { store_id } => write!(f, "{store_id} is closed on the active weekday"),
            ScheduleViolation::AfterClose { store_id, depart, close } => write!(
                f,
                "{store_id} would be left at {} but closes at {}",
                format_minutes(*depart),
                format_minutes(*close)
            ),
            ScheduleViolation::BreakMissed { arrive, start } => write!(
                f,
                "break due at {} cannot be reached before {}",
                format_minutes(*start),
                format_minutes(*arrive)
            ),
            ScheduleViolation::UnknownEntry { id } => write!(f, "unknown stop {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineResult {
    /// Realized stops, start and end anchors included.
    pub stops: Vec<StopPlan>,
    pub total_drive_minutes: f64,
    pub total_dwell_minutes: f64,
    pub total_distance_miles: f64,
    pub projected_return_minutes: f64,
    pub violations: Vec<ScheduleViolation>,
}

impl TimelineResult {
    pub fn store_count(&self) -> usize {
        self.stops.iter().filter(|stop| stop.kind == StopKind::Store).count()
    }

    pub fn total_score(&self) -> f64 {
        self.stops.iter().filter_map(|stop| stop.score).sum()
    }
}

/// Simulate `order` with the context's own estimator.
pub fn simulate<S: AsRef<str>>(order: &[S], ctx: &SchedulingContext) -> TimelineResult {
    simulate_with(order, ctx, &ctx.estimator())
}

/// Simulate `order` with an explicit leg estimator.
pub fn simulate_with<S, E>(order: &[S], ctx: &SchedulingContext, estimator: &E) -> TimelineResult
where
    S: AsRef<str>,
    E: TravelEstimator,
{
    let mut clock = ctx.window_start;
    let mut here = ctx.start.coordinate;
    let mut stops = Vec::with_capacity(order.len() + 2);
    let mut violations = Vec::new();
    let mut total_drive = 0.0;
    let mut total_dwell = 0.0;
    let mut total_distance = 0.0;

    stops.push(StopPlan::anchor(&ctx.start, StopKind::Start, clock, None));

    for id in order {
        let id = id.as_ref();

        if id == BREAK_ID {
            let Some(window) = ctx.break_window else {
                violations.push(ScheduleViolation::UnknownEntry { id: id.to_string() });
                continue;
            };
            let start = window.start.minutes();
            if clock > start + EPSILON {
                violations.push(ScheduleViolation::BreakMissed { arrive: clock, start });
            }
            let arrive = clock.max(start);
            let depart = window.end.minutes().max(arrive);
            stops.push(StopPlan {
                id: BREAK_ID.to_string(),
                name: "Break".to_string(),
                kind: StopKind::Break,
                arrive,
                depart,
                coordinate: here,
                dwell_minutes: Some(depart - arrive),
                score: None,
                incoming_leg: None,
                tags: Vec::new(),
            });
            clock = depart;
            continue;
        }

        let Some(store) = ctx.store(id) else {
            violations.push(ScheduleViolation::UnknownEntry { id: id.to_string() });
            continue;
        };

        let leg = estimator.leg(here, store.coordinate);
        let dwell = ctx.dwell_for(store);
        let mut arrive = clock + leg.drive_minutes;

        match store.hours_on(ctx.weekday) {
            DayHours::Unrestricted => {}
            DayHours::Closed => violations.push(ScheduleViolation::ClosedToday {
                store_id: store.id.clone(),
            }),
            DayHours::Open(windows) => match fit_window(arrive, dwell, windows) {
                Ok(start) => arrive = start,
                Err(window) => {
                    arrive = arrive.max(window.open());
                    violations.push(ScheduleViolation::AfterClose {
                        store_id: store.id.clone(),
                        depart: arrive + dwell,
                        close: window.close(),
                    });
                }
            },
        }

        let stop = StopPlan::store(store, arrive, dwell, leg);
        clock = stop.depart;
        here = store.coordinate;
        total_drive += leg.drive_minutes;
        total_dwell += dwell;
        total_distance += leg.distance_miles;
        stops.push(stop);
    }

    let home = estimator.leg(here, ctx.end.coordinate);
    total_drive += home.drive_minutes;
    total_distance += home.distance_miles;
    let projected_return = clock + home.drive_minutes;
    stops.push(StopPlan::anchor(&ctx.end, StopKind::End, projected_return, Some(home)));

    TimelineResult {
        stops,
        total_drive_minutes: total_drive,
        total_dwell_minutes: total_dwell,
        total_distance_miles: total_distance,
        projected_return_minutes: projected_return,
        violations,
    }
}

/// Earliest service start inside a window that holds the whole dwell.
///
/// On failure returns the window the visit was closest to: the first one
/// still open at `arrive`, else the last of the day.
fn fit_window(arrive: f64, dwell: f64, windows: &[OpenWindow]) -> Result<f64, OpenWindow> {
    for window in windows {
        let start = arrive.max(window.open());
        if start + dwell <= window.close() + EPSILON {
            return Ok(start);
        }
    }

    let nearest = windows
        .iter()
        .find(|window| window.close() >= arrive)
        .or(windows.last())
        .copied()
        .unwrap_or_default();
    Err(nearest)
}
