//! Orchestrator: resolves a day, runs the heuristic and analyzers, and
//! assembles the finished plan or a diagnosed failure.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::advisor;
use crate::context::{RunOptions, SchedulingContext};
use crate::error::{ConstraintError, PlanError, UsageError};
use crate::feasibility::{classify_limits, on_time_risk, timeline_slack};
use crate::heuristic::plan_order;
use crate::model::{Trip, format_minutes};
use crate::plan::{DayMetrics, DayPlan, ExcludedStop, ExclusionReason};
use crate::timeline::simulate;

/// Outcome of one day of a multi-day solve.
#[derive(Debug, Clone)]
pub struct DayOutcome {
    pub day_id: String,
    pub result: Result<DayPlan, PlanError>,
}

/// Plan one day of `trip`.
///
/// Returns a complete feasible plan, or fails: `UsageError` for an unknown
/// day, `ConstraintError` with suggestions when the mandatory set cannot fit.
pub fn solve_day(trip: &Trip, day_id: &str, options: &RunOptions) -> Result<DayPlan, PlanError> {
    let day = trip.day(day_id).ok_or_else(|| UsageError::UnknownDay {
        day_id: day_id.to_string(),
        known: trip.day_ids().join(", "),
    })?;

    let (ctx, mut excluded) = SchedulingContext::build(trip, day, options);
    info!(
        day_id = %ctx.day_id,
        candidates = ctx.stores.len(),
        mandatory = ctx.mandatory.len(),
        seed = ctx.seed,
        lambda = ctx.lambda,
        "planning day"
    );

    let mut rng = StdRng::seed_from_u64(ctx.seed);
    let order = match plan_order(&ctx, &mut rng, options.progress.as_deref()) {
        Ok(order) => order,
        Err(failure) => {
            let suggestions = advisor::suggest(&ctx, &failure.resolved_order);
            let message = format!(
                "mandatory stops for day {} cannot fit {}-{}: {}",
                ctx.day_id,
                format_minutes(ctx.window_start),
                format_minutes(ctx.window_end),
                failure.reason
            );
            warn!(day_id = %ctx.day_id, suggestions = suggestions.len(), "{message}");
            return Err(ConstraintError::new(message, suggestions).into());
        }
    };

    let timeline = simulate(&order, &ctx);
    let limits = classify_limits(&ctx, &timeline);
    if !limits.violations.is_empty() {
        warn!(day_id = %ctx.day_id, violations = ?limits.violations, "mandatory stops exceed configured caps");
    }

    excluded.extend(
        ctx.stores
            .values()
            .filter(|store| !order.contains(&store.id))
            .map(|store| ExcludedStop::new(store, ExclusionReason::NotSelected)),
    );

    let metrics = DayMetrics {
        store_count: timeline.store_count(),
        total_score: timeline.total_score(),
        total_drive_minutes: timeline.total_drive_minutes,
        total_dwell_minutes: timeline.total_dwell_minutes,
        total_distance_miles: timeline.total_distance_miles,
        projected_return_minutes: timeline.projected_return_minutes,
        slack_minutes: timeline_slack(&timeline, ctx.window_end),
        on_time_risk: on_time_risk(&timeline, ctx.window_end, ctx.risk_threshold_min),
        binding_constraints: limits.binding,
        limit_violations: limits.violations,
        seed: ctx.seed,
        lambda: ctx.lambda,
    };

    info!(
        day_id = %ctx.day_id,
        stores = metrics.store_count,
        score = metrics.total_score,
        drive_minutes = metrics.total_drive_minutes,
        slack_minutes = metrics.slack_minutes,
        "day planned"
    );

    Ok(DayPlan {
        day_id: ctx.day_id,
        stops: timeline.stops,
        excluded_stops: excluded,
        metrics,
    })
}

/// Plan every day of `trip` independently, in parallel, in trip order.
pub fn solve_trip(trip: &Trip, options: &RunOptions) -> Vec<DayOutcome> {
    trip.days
        .par_iter()
        .map(|day| DayOutcome {
            day_id: day.day_id.clone(),
            result: solve_day(trip, &day.day_id, options),
        })
        .collect()
}
