//! Remediation suggestions for a mandatory set that cannot fit the day.
//!
//! Read-only: every probe runs on a private copy of the context and the
//! trip is never touched or re-solved.

use serde::Serialize;
use tracing::debug;

use crate::context::{BREAK_ID, SchedulingContext};
use crate::feasibility::timeline_is_feasible;
use crate::heuristic::resolve_mandatory;
use crate::model::format_minutes;
use crate::timeline::{EPSILON, simulate};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Suggestion {
    /// Grow the day window by `minutes`.
    #[serde(rename_all = "camelCase")]
    ExtendEnd { minutes: i64, reason: String },
    /// Drop one non-locked mandatory store.
    #[serde(rename_all = "camelCase")]
    DropMustVisit {
        store_id: String,
        score_loss: f64,
        reason: String,
    },
    /// Lift the lock on a store while keeping it mandatory.
    #[serde(rename_all = "camelCase")]
    RelaxLock { store_id: String, reason: String },
}

impl Suggestion {
    pub fn reason(&self) -> &str {
        match self {
            Suggestion::ExtendEnd { reason, .. }
            | Suggestion::DropMustVisit { reason, .. }
            | Suggestion::RelaxLock { reason, .. } => reason,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Suggestion::ExtendEnd { .. } => "extendEnd",
            Suggestion::DropMustVisit { .. } => "dropMustVisit",
            Suggestion::RelaxLock { .. } => "relaxLock",
        }
    }
}

/// Ranked suggestions for making the mandatory set of `ctx` feasible.
///
/// `resolved_order` is the mandatory chain as the heuristic seeded it.
pub fn suggest(ctx: &SchedulingContext, resolved_order: &[String]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    suggestions.extend(extend_end(ctx, resolved_order));
    suggestions.extend(drop_must_visit(ctx));
    suggestions.extend(relax_locks(ctx));
    debug!(day_id = %ctx.day_id, count = suggestions.len(), "advisor suggestions computed");
    suggestions
}

/// Extend the window by the chain's lateness, when lateness is the only problem.
fn extend_end(ctx: &SchedulingContext, resolved_order: &[String]) -> Option<Suggestion> {
    let timeline = simulate(resolved_order, ctx);
    let late = timeline.projected_return_minutes - ctx.window_end;
    if late <= EPSILON {
        return None;
    }

    let extended = ctx.with_window_end(timeline.projected_return_minutes);
    if !timeline_is_feasible(&simulate(resolved_order, &extended), &extended) {
        return None;
    }

    let minutes = (late.round() as i64).max(1);
    Some(Suggestion::ExtendEnd {
        minutes,
        reason: format!(
            "mandatory stops return at {}, {minutes} min after the window closes at {}",
            format_minutes(timeline.projected_return_minutes),
            format_minutes(ctx.window_end)
        ),
    })
}

/// Each non-locked mandatory store whose removal lets the rest fit,
/// cheapest score loss first.
fn drop_must_visit(ctx: &SchedulingContext) -> Vec<Suggestion> {
    let mut candidates: Vec<(f64, &str)> = ctx
        .mandatory
        .iter()
        .map(String::as_str)
        .filter(|id| *id != BREAK_ID && !ctx.is_locked(id))
        .filter(|id| resolve_mandatory(&ctx.without_mandatory(id)).is_ok())
        .map(|id| (ctx.store(id).map_or(0.0, |store| store.score_or_zero()), id))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .map(|(score_loss, id)| {
            let name = ctx.store(id).map_or(id, |store| store.name.as_str());
            Suggestion::DropMustVisit {
                store_id: id.to_string(),
                score_loss,
                reason: format!(
                    "dropping must-visit {id} ({name}, score {score_loss:.2}) lets the remaining mandatory stops fit {}-{}",
                    format_minutes(ctx.window_start),
                    format_minutes(ctx.window_end)
                ),
            }
        })
        .collect()
}

/// Each lock whose removal lets the mandatory set fit.
fn relax_locks(ctx: &SchedulingContext) -> Vec<Suggestion> {
    ctx.locks
        .iter()
        .filter(|lock| resolve_mandatory(&ctx.without_lock(&lock.store_id)).is_ok())
        .map(|lock| Suggestion::RelaxLock {
            store_id: lock.store_id.clone(),
            reason: format!(
                "the {} lock on {} cannot be honored; unlocking it lets the mandatory stops fit",
                lock.position, lock.store_id
            ),
        })
        .collect()
}
