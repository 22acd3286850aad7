//! Scheduling context: the resolved configuration of a single solve.
//!
//! Built fresh for every solve from the trip, the selected day and the run
//! options. Precedence, highest first: run options, day config, trip
//! config, built-in defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::Weekday;
use tracing::warn;

use crate::haversine::{DEFAULT_MPH, HaversineEstimator};
use crate::model::{Anchor, BreakWindow, ClockTime, Coordinate, DayConfig, DayHours, LockSpec, Store, Trip};
use crate::plan::{ExcludedStop, ExclusionReason};
use crate::traits::ProgressObserver;

/// Order entry standing in for the mandatory break.
pub const BREAK_ID: &str = "__break__";

pub const DEFAULT_DWELL_MIN: f64 = 10.0;
pub const DEFAULT_SEED: u64 = 1;
pub const DEFAULT_LAMBDA: f64 = 0.5;
pub const DEFAULT_ROBUSTNESS: f64 = 1.0;
pub const DEFAULT_RISK_THRESHOLD_MIN: f64 = 30.0;
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Per-solve options. Unset fields fall back to day, then trip config.
#[derive(Clone, Default)]
pub struct RunOptions {
    pub mph: Option<f64>,
    pub default_dwell_min: Option<f64>,
    pub seed: Option<u64>,
    /// Promote per-insertion heuristic events from debug to info.
    pub verbose: bool,
    /// Extra locks. A run lock replaces a day lock on the same store.
    pub locks: Vec<LockSpec>,
    /// Stores already visited; dropped from candidates and the mandatory set.
    pub completed_ids: BTreeSet<String>,
    pub progress: Option<Arc<dyn ProgressObserver>>,
    /// Score weight of the objective in `[0, 1]`.
    pub lambda: Option<f64>,
    pub robustness_factor: Option<f64>,
    pub risk_threshold_min: Option<f64>,
    /// Replacement start coordinate for mid-route re-optimization.
    pub start_override: Option<Coordinate>,
    /// Replacement window opening for mid-route re-optimization.
    pub start_time_override: Option<ClockTime>,
    /// Round limit of the 2-opt improvement phase.
    pub max_iterations: Option<usize>,
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("mph", &self.mph)
            .field("default_dwell_min", &self.default_dwell_min)
            .field("seed", &self.seed)
            .field("verbose", &self.verbose)
            .field("locks", &self.locks)
            .field("completed_ids", &self.completed_ids)
            .field("progress", &self.progress.is_some())
            .field("lambda", &self.lambda)
            .field("robustness_factor", &self.robustness_factor)
            .field("risk_threshold_min", &self.risk_threshold_min)
            .field("start_override", &self.start_override)
            .field("start_time_override", &self.start_time_override)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl RunOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = Some(lambda);
        self
    }

    pub fn with_mph(mut self, mph: f64) -> Self {
        self.mph = Some(mph);
        self
    }

    pub fn with_default_dwell(mut self, minutes: f64) -> Self {
        self.default_dwell_min = Some(minutes);
        self
    }

    pub fn with_lock(mut self, lock: LockSpec) -> Self {
        self.locks.push(lock);
        self
    }

    pub fn with_completed(mut self, store_id: impl Into<String>) -> Self {
        self.completed_ids.insert(store_id.into());
        self
    }

    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    pub fn with_robustness_factor(mut self, factor: f64) -> Self {
        self.robustness_factor = Some(factor);
        self
    }

    pub fn with_risk_threshold(mut self, minutes: f64) -> Self {
        self.risk_threshold_min = Some(minutes);
        self
    }

    pub fn with_start(mut self, coordinate: Coordinate, at: ClockTime) -> Self {
        self.start_override = Some(coordinate);
        self.start_time_override = Some(at);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_max_iterations(mut self, rounds: usize) -> Self {
        self.max_iterations = Some(rounds);
        self
    }
}

/// Merged runtime configuration for one solve.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    pub day_id: String,
    pub start: Anchor,
    pub end: Anchor,
    pub window_start: f64,
    pub window_end: f64,
    pub mph: f64,
    pub default_dwell_min: f64,
    /// Candidate stores by id, mandatory stores included.
    pub stores: BTreeMap<String, Store>,
    pub max_drive_time: Option<f64>,
    pub max_stops: Option<usize>,
    pub break_window: Option<BreakWindow>,
    pub robustness_factor: f64,
    pub risk_threshold_min: f64,
    pub weekday: Option<Weekday>,
    pub lambda: f64,
    pub seed: u64,
    pub max_iterations: usize,
    pub locks: Vec<LockSpec>,
    /// Resolved mandatory ids, break sentinel included when configured.
    pub mandatory: BTreeSet<String>,
    pub verbose: bool,
}

impl SchedulingContext {
    /// Resolve the context for `day`, returning it with the stores filtered
    /// out before the search.
    pub fn build(trip: &Trip, day: &DayConfig, options: &RunOptions) -> (Self, Vec<ExcludedStop>) {
        let config = &trip.config;
        let mph = options.mph.or(day.mph).or(config.mph).unwrap_or(DEFAULT_MPH);
        let default_dwell_min = options
            .default_dwell_min
            .or(day.default_dwell_min)
            .or(config.default_dwell_min)
            .unwrap_or(DEFAULT_DWELL_MIN);
        let robustness_factor = options
            .robustness_factor
            .or(day.robustness_factor)
            .or(config.robustness_factor)
            .unwrap_or(DEFAULT_ROBUSTNESS)
            .max(1.0);
        let risk_threshold_min = options
            .risk_threshold_min
            .or(day.risk_threshold_min)
            .or(config.risk_threshold_min)
            .unwrap_or(DEFAULT_RISK_THRESHOLD_MIN);
        let lambda = options.lambda.or(config.lambda).unwrap_or(DEFAULT_LAMBDA).clamp(0.0, 1.0);
        let seed = options.seed.or(config.seed).unwrap_or(DEFAULT_SEED);

        let mut start = day.start.clone();
        if let Some(coordinate) = options.start_override {
            start.coordinate = coordinate;
        }
        let window_start = options.start_time_override.unwrap_or(day.window.start).minutes();

        let locks = merge_locks(&day.locks, &options.locks, &options.completed_ids);
        let mandatory_stores = resolve_mandatory_stores(trip, day, &locks, &options.completed_ids);

        let mut stores = BTreeMap::new();
        let mut excluded = Vec::new();
        for store in &trip.stores {
            let reason = if options.completed_ids.contains(&store.id) {
                Some(ExclusionReason::Completed)
            } else if mandatory_stores.contains(&store.id) {
                None
            } else if store.day_id.as_ref().is_some_and(|id| *id != day.day_id) {
                Some(ExclusionReason::OtherDay)
            } else if store.hours_on(day.day_of_week) == DayHours::Closed {
                Some(ExclusionReason::Closed)
            } else {
                None
            };

            match reason {
                Some(reason) => excluded.push(ExcludedStop::new(store, reason)),
                None => {
                    stores.insert(store.id.clone(), store.clone());
                }
            }
        }

        let mut mandatory: BTreeSet<String> = mandatory_stores
            .into_iter()
            .filter(|id| {
                let known = stores.contains_key(id);
                if !known {
                    warn!(day_id = %day.day_id, store_id = %id, "mandatory store not in trip, ignoring");
                }
                known
            })
            .collect();
        let break_window = day
            .break_window
            .filter(|window| break_pending(window, window_start, &options.completed_ids));
        if break_window.is_some() {
            mandatory.insert(BREAK_ID.to_string());
        }
        let locks = locks
            .into_iter()
            .filter(|lock| {
                let known = stores.contains_key(&lock.store_id);
                if !known {
                    warn!(day_id = %day.day_id, store_id = %lock.store_id, "locked store not in trip, ignoring lock");
                }
                known
            })
            .collect();

        let context = Self {
            day_id: day.day_id.clone(),
            start,
            end: day.end.clone(),
            window_start,
            window_end: day.window.end.minutes(),
            mph,
            default_dwell_min,
            stores,
            max_drive_time: day.max_drive_time,
            max_stops: day.max_stops,
            break_window,
            robustness_factor,
            risk_threshold_min,
            weekday: day.day_of_week,
            lambda,
            seed,
            max_iterations: options.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            locks,
            mandatory,
            verbose: options.verbose,
        };
        (context, excluded)
    }

    /// Leg estimator configured with this context's speed and buffer.
    pub fn estimator(&self) -> HaversineEstimator {
        HaversineEstimator::new(self.mph).with_robustness(self.robustness_factor)
    }

    pub fn store(&self, id: &str) -> Option<&Store> {
        self.stores.get(id)
    }

    pub fn dwell_for(&self, store: &Store) -> f64 {
        store.dwell_min.unwrap_or(self.default_dwell_min)
    }

    pub fn window_minutes(&self) -> f64 {
        (self.window_end - self.window_start).max(1.0)
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.locks.iter().any(|lock| lock.store_id == id)
    }

    /// Copy of this context with one id removed from the mandatory set.
    pub fn without_mandatory(&self, id: &str) -> Self {
        let mut context = self.clone();
        context.mandatory.remove(id);
        context
    }

    /// Copy of this context with the lock on `store_id` lifted. The store
    /// stays mandatory.
    pub fn without_lock(&self, store_id: &str) -> Self {
        let mut context = self.clone();
        context.locks.retain(|lock| lock.store_id != store_id);
        context
    }

    pub fn with_window_end(&self, window_end: f64) -> Self {
        let mut context = self.clone();
        context.window_end = window_end;
        context
    }
}

fn merge_locks(day_locks: &[LockSpec], run_locks: &[LockSpec], completed: &BTreeSet<String>) -> Vec<LockSpec> {
    let mut locks: Vec<LockSpec> = day_locks
        .iter()
        .filter(|lock| !run_locks.iter().any(|run| run.store_id == lock.store_id))
        .cloned()
        .collect();
    locks.extend(run_locks.iter().cloned());
    locks.retain(|lock| !completed.contains(&lock.store_id));
    locks
}

/// The break still has to be planned: not marked completed, and the window
/// opens no later than the break starts. A re-plan starting after that is
/// taken to have had its break already.
fn break_pending(window: &BreakWindow, window_start: f64, completed: &BTreeSet<String>) -> bool {
    !completed.contains(BREAK_ID) && window_start <= window.start.minutes()
}

/// Explicit ids and locks are mandatory unconditionally. Tags only mark
/// stores that are eligible for the day: assigned to it (or unassigned) and
/// not closed on its weekday.
fn resolve_mandatory_stores(
    trip: &Trip,
    day: &DayConfig,
    locks: &[LockSpec],
    completed: &BTreeSet<String>,
) -> BTreeSet<String> {
    let tagged = trip.stores.iter().filter(|store| {
        store.tags.iter().any(|tag| day.must_visit_tags.contains(tag))
            && store.day_id.as_ref().is_none_or(|id| *id == day.day_id)
            && store.hours_on(day.day_of_week) != DayHours::Closed
    });

    day.must_visit_ids
        .iter()
        .cloned()
        .chain(tagged.map(|store| store.id.clone()))
        .chain(locks.iter().map(|lock| lock.store_id.clone()))
        .filter(|id| !completed.contains(id))
        .collect()
}
