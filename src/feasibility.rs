//! Post-hoc feasibility, slack, lateness risk and cap classification.

use serde::Serialize;

use crate::context::SchedulingContext;
use crate::timeline::{EPSILON, TimelineResult, simulate};

/// Width of the on-time risk band at a zero threshold, in minutes.
pub const RISK_BAND_MIN: f64 = 60.0;

pub const MAX_DRIVE_TIME: &str = "maxDriveTime";
pub const MAX_STOPS: &str = "maxStops";

/// True iff every opening window and the break are respected and the
/// projected return does not pass the window's close.
pub fn is_feasible<S: AsRef<str>>(order: &[S], ctx: &SchedulingContext) -> bool {
    timeline_is_feasible(&simulate(order, ctx), ctx)
}

pub fn timeline_is_feasible(timeline: &TimelineResult, ctx: &SchedulingContext) -> bool {
    timeline.violations.is_empty() && timeline.projected_return_minutes <= ctx.window_end + EPSILON
}

/// Spare minutes between the projected return and the window end. Never negative.
pub fn slack_min<S: AsRef<str>>(order: &[S], ctx: &SchedulingContext) -> f64 {
    timeline_slack(&simulate(order, ctx), ctx.window_end)
}

pub fn timeline_slack(timeline: &TimelineResult, window_end: f64) -> f64 {
    (window_end - timeline.projected_return_minutes).max(0.0)
}

/// Lateness risk of a timeline in `[0, 1]`.
pub fn on_time_risk(timeline: &TimelineResult, window_end: f64, threshold_min: f64) -> f64 {
    lateness_risk(timeline.projected_return_minutes - window_end, threshold_min)
}

/// Risk for a given lateness (`projectedReturn - windowEnd`).
///
/// 1 at or past the window end. Otherwise the slack is interpolated over a
/// band that narrows as the threshold grows, reaching 0 once the slack
/// covers the band.
pub fn lateness_risk(lateness: f64, threshold_min: f64) -> f64 {
    if lateness >= 0.0 {
        return 1.0;
    }
    let slack = -lateness;
    let band = RISK_BAND_MIN / (1.0 + threshold_min.max(0.0) / RISK_BAND_MIN);
    (1.0 - slack / band).clamp(0.0, 1.0)
}

/// How a realized value sits against a configured cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStatus {
    Under,
    /// Exactly at the cap.
    Binding,
    Violated,
}

pub fn classify(limit: f64, realized: f64) -> LimitStatus {
    if realized > limit + EPSILON {
        LimitStatus::Violated
    } else if (realized - limit).abs() <= EPSILON {
        LimitStatus::Binding
    } else {
        LimitStatus::Under
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitReport {
    pub binding: Vec<String>,
    pub violations: Vec<String>,
}

/// Classify every configured cap against a realized timeline.
pub fn classify_limits(ctx: &SchedulingContext, timeline: &TimelineResult) -> LimitReport {
    let mut report = LimitReport::default();
    let caps = [
        (MAX_DRIVE_TIME, ctx.max_drive_time, timeline.total_drive_minutes),
        (
            MAX_STOPS,
            ctx.max_stops.map(|cap| cap as f64),
            timeline.store_count() as f64,
        ),
    ];

    for (name, limit, realized) in caps {
        let Some(limit) = limit else { continue };
        match classify(limit, realized) {
            LimitStatus::Under => {}
            LimitStatus::Binding => report.binding.push(name.to_string()),
            LimitStatus::Violated => report.violations.push(name.to_string()),
        }
    }
    report
}

/// True when no configured cap is exceeded.
pub fn within_caps(ctx: &SchedulingContext, timeline: &TimelineResult) -> bool {
    let drive_ok = ctx
        .max_drive_time
        .is_none_or(|cap| timeline.total_drive_minutes <= cap + EPSILON);
    let stops_ok = ctx.max_stops.is_none_or(|cap| timeline.store_count() <= cap);
    drive_ok && stops_ok
}

/// Total amount by which a timeline misses its constraints, 0 when feasible.
pub fn overrun(timeline: &TimelineResult, ctx: &SchedulingContext) -> f64 {
    let late = (timeline.projected_return_minutes - ctx.window_end).max(0.0);
    late + timeline.violations.iter().map(|v| v.overrun()).sum::<f64>()
}
