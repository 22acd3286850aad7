//! Order heuristic.
//!
//! Builds the stop order in three phases:
//!
//! 1. Seed: place locked stores in their slots, then insert the remaining
//!    mandatory entries (break included) at their least-damaging positions,
//!    most urgent first, and repair with relocate moves if needed.
//! 2. Insert: repeatedly add the optional store with the best objective gain
//!    at its cheapest feasible position, within `maxStops`/`maxDriveTime`.
//!    Ties (gains within `TIE_TOLERANCE`) are taken in id order and one is
//!    drawn with the caller's seeded generator.
//! 3. Improve: bounded 2-opt to shorten driving, followed by another insert
//!    pass when it freed time.
//!
//! Only the seed can fail. Every phase terminates within a step count
//! bounded by the candidate count and `max_iterations`.

use std::ops::RangeInclusive;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::context::{BREAK_ID, SchedulingContext};
use crate::feasibility::{overrun, timeline_is_feasible, within_caps};
use crate::model::{DayHours, LockPosition, Store, format_minutes};
use crate::timeline::{EPSILON, TimelineResult, simulate};
use crate::traits::{ProgressObserver, SearchProgress};

/// Gains closer than this are treated as tied.
pub const TIE_TOLERANCE: f64 = 1e-9;

/// The mandatory set cannot be placed feasibly.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}")]
pub struct MandatoryInfeasible {
    /// Mandatory entries in the order the seed resolved them.
    pub resolved_order: Vec<String>,
    pub reason: String,
}

/// Build a feasible order for `ctx`.
///
/// `rng` only breaks ties; identical inputs and seed give identical orders.
pub fn plan_order<R: Rng>(
    ctx: &SchedulingContext,
    rng: &mut R,
    progress: Option<&dyn ProgressObserver>,
) -> Result<Vec<String>, MandatoryInfeasible> {
    let (mut order, slots) = seed(ctx)?;
    report(progress, SearchProgress::Seeded { entries: order.len() });
    debug!(day_id = %ctx.day_id, entries = order.len(), "mandatory entries seeded");

    let mut remaining: Vec<&Store> = ctx
        .stores
        .values()
        .filter(|store| !ctx.mandatory.contains(&store.id))
        .collect();

    insert_optional(ctx, &slots, &mut order, &mut remaining, rng, progress);
    if improve(ctx, &slots, &mut order, progress) {
        insert_optional(ctx, &slots, &mut order, &mut remaining, rng, progress);
    }

    let stores = store_count(&order);
    report(progress, SearchProgress::Finished { stores });
    Ok(order)
}

/// Order the mandatory set alone, without optional stores.
///
/// Deterministic and free of randomness, so the advisor can probe
/// variations of the mandatory set with it.
pub fn resolve_mandatory(ctx: &SchedulingContext) -> Result<Vec<String>, MandatoryInfeasible> {
    seed(ctx).map(|(order, _)| order)
}

// ============================================================================
// Lock slots
// ============================================================================

#[derive(Debug, Clone, Default)]
struct LockSlots {
    first: Option<String>,
    last: Option<String>,
    /// Store-slot locks sorted by slot.
    indexed: Vec<(usize, String)>,
}

impl LockSlots {
    fn new(ctx: &SchedulingContext) -> Result<Self, String> {
        let mut slots = Self::default();
        for lock in &ctx.locks {
            let id = &lock.store_id;
            if slots.is_locked(id) {
                return Err(format!("{id} is locked to more than one slot"));
            }
            let taken = match lock.position {
                LockPosition::First => slots.first.replace(id.clone()),
                LockPosition::Last => slots.last.replace(id.clone()),
                LockPosition::Index(slot) => {
                    let other = slots
                        .indexed
                        .iter()
                        .find(|(taken, _)| *taken == slot)
                        .map(|(_, other)| other.clone());
                    if other.is_none() {
                        slots.indexed.push((slot, id.clone()));
                    }
                    other
                }
            };
            if let Some(other) = taken {
                return Err(format!("locks on {other} and {id} both claim the {} slot", lock.position));
            }
        }
        slots.indexed.sort();
        Ok(slots)
    }

    fn is_locked(&self, id: &str) -> bool {
        self.first.as_deref() == Some(id)
            || self.last.as_deref() == Some(id)
            || self.indexed.iter().any(|(_, locked)| locked == id)
    }

    /// Insert positions that leave the first/last locks in place.
    fn open_range(&self, len: usize) -> RangeInclusive<usize> {
        let lo = usize::from(self.first.is_some()).min(len);
        let hi = len.saturating_sub(usize::from(self.last.is_some())).max(lo);
        lo..=hi
    }

    fn satisfied(&self, order: &[String]) -> bool {
        if self.first.as_ref().is_some_and(|first| order.first() != Some(first)) {
            return false;
        }
        if self.last.as_ref().is_some_and(|last| order.last() != Some(last)) {
            return false;
        }
        self.indexed
            .iter()
            .all(|(slot, id)| order.iter().filter(|entry| *entry != BREAK_ID).nth(*slot) == Some(id))
    }

    /// First open position with exactly `slot` stores before it.
    fn index_position(&self, order: &[String], slot: usize) -> Option<usize> {
        self.open_range(order.len())
            .find(|&position| store_count(&order[..position]) == slot)
    }
}

// ============================================================================
// Seed
// ============================================================================

fn seed(ctx: &SchedulingContext) -> Result<(Vec<String>, LockSlots), MandatoryInfeasible> {
    let slots = LockSlots::new(ctx).map_err(|reason| MandatoryInfeasible {
        resolved_order: ctx.mandatory.iter().cloned().collect(),
        reason,
    })?;

    let mut order: Vec<String> = Vec::with_capacity(ctx.mandatory.len());
    order.extend(slots.first.iter().cloned());
    order.extend(slots.last.iter().cloned());

    let mut pending: Vec<&str> = ctx
        .mandatory
        .iter()
        .map(String::as_str)
        .filter(|id| !slots.is_locked(id))
        .collect();
    pending.sort_by(|a, b| deadline(ctx, a).total_cmp(&deadline(ctx, b)).then_with(|| a.cmp(b)));

    for id in pending {
        let position = least_damaging_position(ctx, &slots, &order, id);
        order.insert(position, id.to_string());
    }

    for (slot, id) in &slots.indexed {
        match slots.index_position(&order, *slot) {
            Some(position) => order.insert(position, id.clone()),
            None => {
                let available = store_count(&order);
                order.push(id.clone());
                return Err(MandatoryInfeasible {
                    resolved_order: order,
                    reason: format!(
                        "{id} is locked to store slot {slot} but only {available} mandatory stores can precede it"
                    ),
                });
            }
        }
    }

    if !slots.satisfied(&order) {
        return Err(MandatoryInfeasible {
            reason: "locked slots conflict with each other".to_string(),
            resolved_order: order,
        });
    }

    repair(ctx, &slots, &mut order);

    let timeline = simulate(&order, ctx);
    if timeline_is_feasible(&timeline, ctx) {
        Ok((order, slots))
    } else {
        Err(MandatoryInfeasible {
            reason: describe(&timeline, ctx),
            resolved_order: order,
        })
    }
}

/// Latest instant an entry can still be served; earlier deadlines seed first.
fn deadline(ctx: &SchedulingContext, id: &str) -> f64 {
    if id == BREAK_ID {
        return ctx.break_window.map_or(ctx.window_end, |window| window.start.minutes());
    }
    match ctx.store(id).map(|store| store.hours_on(ctx.weekday)) {
        Some(DayHours::Open(windows)) => windows
            .iter()
            .map(|window| window.close())
            .fold(f64::NEG_INFINITY, f64::max)
            .min(ctx.window_end),
        _ => ctx.window_end,
    }
}

/// Position with the smallest overrun, then the least driving.
fn least_damaging_position(ctx: &SchedulingContext, slots: &LockSlots, order: &[String], id: &str) -> usize {
    let mut best = (usize::MAX, f64::INFINITY, f64::INFINITY);
    for position in slots.open_range(order.len()) {
        let candidate = inserted(order, position, id);
        let timeline = simulate(&candidate, ctx);
        let miss = overrun(&timeline, ctx);
        let drive = timeline.total_drive_minutes;
        if miss < best.1 - EPSILON || ((miss - best.1).abs() <= EPSILON && drive < best.2 - EPSILON) {
            best = (position, miss, drive);
        }
    }
    best.0.min(order.len())
}

/// Relocate unlocked entries while that reduces the overrun.
fn repair(ctx: &SchedulingContext, slots: &LockSlots, order: &mut Vec<String>) {
    let mut current = overrun(&simulate(order, ctx), ctx);
    for _ in 0..ctx.max_iterations {
        if current <= EPSILON {
            return;
        }
        match relocate_move(ctx, slots, order, current) {
            Some((candidate, value)) => {
                debug!(day_id = %ctx.day_id, overrun = value, "seed repaired by relocation");
                *order = candidate;
                current = value;
            }
            None => return,
        }
    }
}

/// First relocation of an unlocked entry that lowers the overrun.
fn relocate_move(
    ctx: &SchedulingContext,
    slots: &LockSlots,
    order: &[String],
    current: f64,
) -> Option<(Vec<String>, f64)> {
    for from in 0..order.len() {
        if slots.is_locked(&order[from]) {
            continue;
        }
        let mut base = order.to_vec();
        let item = base.remove(from);
        for to in slots.open_range(base.len()) {
            if to == from {
                continue;
            }
            let candidate = inserted(&base, to, &item);
            if !slots.satisfied(&candidate) {
                continue;
            }
            let value = overrun(&simulate(&candidate, ctx), ctx);
            if value < current - EPSILON {
                return Some((candidate, value));
            }
        }
    }
    None
}

fn describe(timeline: &TimelineResult, ctx: &SchedulingContext) -> String {
    let mut problems: Vec<String> = timeline.violations.iter().map(ToString::to_string).collect();
    let late = timeline.projected_return_minutes - ctx.window_end;
    if late > EPSILON {
        problems.push(format!(
            "projected return at {} is {:.0} min after the window closes at {}",
            format_minutes(timeline.projected_return_minutes),
            late.round(),
            format_minutes(ctx.window_end)
        ));
    }
    problems.join("; ")
}

// ============================================================================
// Optional insertion
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Insertion {
    index: usize,
    position: usize,
    gain: f64,
}

fn insert_optional<R: Rng>(
    ctx: &SchedulingContext,
    slots: &LockSlots,
    order: &mut Vec<String>,
    remaining: &mut Vec<&Store>,
    rng: &mut R,
    progress: Option<&dyn ProgressObserver>,
) {
    while !remaining.is_empty() {
        if ctx.max_stops.is_some_and(|cap| store_count(order) >= cap) {
            break;
        }

        let base_return = simulate(order, ctx).projected_return_minutes;
        let mut tied: Vec<Insertion> = Vec::new();
        let mut best_gain = f64::NEG_INFINITY;

        for (index, store) in remaining.iter().enumerate() {
            let Some((position, consumed)) = cheapest_insertion(ctx, slots, order, &store.id, base_return) else {
                continue;
            };
            let gain = insertion_gain(ctx, store, consumed);
            if gain < -TIE_TOLERANCE {
                continue;
            }
            if gain > best_gain + TIE_TOLERANCE {
                best_gain = gain;
                tied.clear();
                tied.push(Insertion { index, position, gain });
            } else if (gain - best_gain).abs() <= TIE_TOLERANCE {
                tied.push(Insertion { index, position, gain });
            }
        }

        // `remaining` follows id order, so `tied` does too.
        let chosen = match tied.len() {
            0 => break,
            1 => tied[0],
            n => tied[rng.gen_range(0..n)],
        };

        let store = remaining.remove(chosen.index);
        order.insert(chosen.position, store.id.clone());
        let stores = store_count(order);
        if ctx.verbose {
            info!(day_id = %ctx.day_id, store_id = %store.id, gain = chosen.gain, stores, "store inserted");
        } else {
            debug!(day_id = %ctx.day_id, store_id = %store.id, gain = chosen.gain, stores, "store inserted");
        }
        report(
            progress,
            SearchProgress::Inserted {
                store_id: store.id.clone(),
                stores,
                gain: chosen.gain,
            },
        );
    }
}

/// Cheapest feasible, lock-consistent, within-cap position for `id`, with
/// the minutes it adds to the projected return.
fn cheapest_insertion(
    ctx: &SchedulingContext,
    slots: &LockSlots,
    order: &[String],
    id: &str,
    base_return: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for position in slots.open_range(order.len()) {
        let candidate = inserted(order, position, id);
        if !slots.satisfied(&candidate) {
            continue;
        }
        let timeline = simulate(&candidate, ctx);
        if !timeline_is_feasible(&timeline, ctx) || !within_caps(ctx, &timeline) {
            continue;
        }
        let consumed = timeline.projected_return_minutes - base_return;
        let drive = timeline.total_drive_minutes;
        let better = best.is_none_or(|(_, best_consumed, best_drive)| {
            consumed < best_consumed - EPSILON
                || ((consumed - best_consumed).abs() <= EPSILON && drive < best_drive - EPSILON)
        });
        if better {
            best = Some((position, consumed, drive));
        }
    }
    best.map(|(position, consumed, _)| (position, consumed))
}

/// Objective change of adding `store`:
/// `lambda * score - (1 - lambda) * (consumed / windowMinutes - 1)`.
///
/// The coverage term is positive for any insertion that fits the window,
/// so `lambda = 0` maximizes stop count and `lambda = 1` ranks by score.
pub fn insertion_gain(ctx: &SchedulingContext, store: &Store, consumed_minutes: f64) -> f64 {
    let time_penalty = consumed_minutes / ctx.window_minutes() - 1.0;
    ctx.lambda * store.score_or_zero() - (1.0 - ctx.lambda) * time_penalty
}

// ============================================================================
// Improvement
// ============================================================================

/// 2-opt until no reversal shortens driving or the round limit is hit.
/// Returns true if the order changed.
fn improve(
    ctx: &SchedulingContext,
    slots: &LockSlots,
    order: &mut Vec<String>,
    progress: Option<&dyn ProgressObserver>,
) -> bool {
    let mut changed = false;
    let mut current = simulate(order, ctx).total_drive_minutes;

    for round in 0..ctx.max_iterations {
        let Some((candidate, drive)) = two_opt_move(ctx, slots, order, current) else {
            break;
        };
        debug!(day_id = %ctx.day_id, round, drive_minutes = drive, "2-opt improvement");
        report(
            progress,
            SearchProgress::Improved {
                round,
                drive_minutes: drive,
            },
        );
        *order = candidate;
        current = drive;
        changed = true;
    }

    changed
}

/// First segment reversal that keeps the order valid and drives less.
fn two_opt_move(
    ctx: &SchedulingContext,
    slots: &LockSlots,
    order: &[String],
    current: f64,
) -> Option<(Vec<String>, f64)> {
    let n = order.len();
    if n < 2 {
        return None;
    }

    for i in 0..n - 1 {
        for j in i + 1..n {
            let mut candidate = order.to_vec();
            candidate[i..=j].reverse();
            if !slots.satisfied(&candidate) {
                continue;
            }
            let timeline = simulate(&candidate, ctx);
            if timeline_is_feasible(&timeline, ctx)
                && within_caps(ctx, &timeline)
                && timeline.total_drive_minutes < current - EPSILON
            {
                return Some((candidate, timeline.total_drive_minutes));
            }
        }
    }

    None
}

// ============================================================================
// Helpers
// ============================================================================

fn inserted(order: &[String], position: usize, id: &str) -> Vec<String> {
    let mut candidate = Vec::with_capacity(order.len() + 1);
    candidate.extend_from_slice(&order[..position]);
    candidate.push(id.to_string());
    candidate.extend_from_slice(&order[position..]);
    candidate
}

fn store_count(order: &[String]) -> usize {
    order.iter().filter(|entry| *entry != BREAK_ID).count()
}

fn report(progress: Option<&dyn ProgressObserver>, event: SearchProgress) {
    if let Some(observer) = progress {
        observer.on_progress(&event);
    }
}
