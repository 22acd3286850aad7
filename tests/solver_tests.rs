//! Orchestrator tests
//!
//! End-to-end `solve_day`/`solve_trip` behavior: day resolution, candidate
//! filtering, metrics, cap classification and re-optimization overrides.

mod fixtures;

use std::collections::BTreeSet;

use chrono::Weekday;
use fixtures::detroit_trip::DETROIT_TRIP_JSON;
use fixtures::*;
use trip_planner::context::{BREAK_ID, RunOptions};
use trip_planner::error::{PlanError, UsageError};
use trip_planner::feasibility::{MAX_DRIVE_TIME, MAX_STOPS};
use trip_planner::model::{Coordinate, Store, Trip};
use trip_planner::plan::{DayPlan, ExclusionReason, StopKind};
use trip_planner::solver::{solve_day, solve_trip};

fn detroit() -> Trip {
    serde_json::from_str(DETROIT_TRIP_JSON).expect("fixture trip should parse")
}

fn reason_of(plan: &DayPlan, id: &str) -> Option<ExclusionReason> {
    plan.excluded_stops.iter().find(|stop| stop.id == id).map(|stop| stop.reason)
}

fn assert_time_flows(plan: &DayPlan) {
    for pair in plan.stops.windows(2) {
        assert!(pair[1].arrive >= pair[0].depart - TOL, "{} arrives before {} departs", pair[1].id, pair[0].id);
    }
    for stop in &plan.stops {
        assert!(stop.depart >= stop.arrive - TOL, "{} departs before it arrives", stop.id);
    }
}

/// Stores around a depot at the origin, none on a line through the depot
/// with another, so every added store lengthens the route.
fn scattered(builder: TripBuilder) -> Trip {
    builder
        .store(Store::new("p", "P", Coordinate::new(0.1, 0.2)).with_dwell(0.0).with_score(3.0))
        .store(Store::new("q", "Q", Coordinate::new(-0.15, 0.1)).with_dwell(0.0).with_score(2.0))
        .store(Store::new("r", "R", Coordinate::new(0.2, -0.1)).with_dwell(0.0).with_score(1.0))
        .build()
}

// ============================================================================
// Day resolution
// ============================================================================

#[test]
fn test_unknown_day_is_a_usage_error() {
    let trip = detroit();

    let error = solve_day(&trip, "D9", &RunOptions::default()).unwrap_err();

    assert!(matches!(
        &error,
        PlanError::Usage(UsageError::UnknownDay { day_id, .. }) if day_id == "D9"
    ));
    assert!(error.as_constraint().is_none());
    assert!(error.to_string().contains("D1, D2"));
}

// ============================================================================
// Fixture trip
// ============================================================================

#[test]
fn test_detroit_day_plan() {
    let trip = detroit();

    let plan = solve_day(&trip, "D1", &RunOptions::default()).unwrap();

    assert_eq!(plan.day_id, "D1");
    assert_eq!(plan.stops.first().map(|stop| stop.id.as_str()), Some("DU-START"));
    assert_eq!(plan.stops.last().map(|stop| stop.id.as_str()), Some("DU-END"));
    assert!(plan.store_ids().contains(&"DU-001"), "must-visit store is planned");
    assert!(plan.stop(BREAK_ID).is_some(), "configured break is planned");
    assert_time_flows(&plan);

    assert_eq!(reason_of(&plan, "DU-004"), Some(ExclusionReason::Closed));
    assert_eq!(reason_of(&plan, "DU-005"), Some(ExclusionReason::OtherDay));

    assert_eq!(plan.metrics.seed, 2024);
    assert!(plan.metrics.slack_minutes >= 0.0);
    assert!((0.0..=1.0).contains(&plan.metrics.on_time_risk));
}

#[test]
fn test_every_store_is_planned_or_excluded_once() {
    let trip = detroit();

    let plan = solve_day(&trip, "D1", &RunOptions::default()).unwrap();

    let planned: BTreeSet<&str> = plan.store_ids().into_iter().collect();
    let excluded: BTreeSet<&str> = plan.excluded_stops.iter().map(|stop| stop.id.as_str()).collect();
    assert_eq!(planned.len(), plan.store_ids().len(), "no store appears twice");
    assert!(planned.is_disjoint(&excluded));

    let all: BTreeSet<&str> = trip.stores.iter().map(|store| store.id.as_str()).collect();
    let covered: BTreeSet<&str> = planned.union(&excluded).copied().collect();
    assert_eq!(covered, all);
}

#[test]
fn test_metrics_match_stops() {
    let trip = detroit();

    let plan = solve_day(&trip, "D1", &RunOptions::default()).unwrap();

    let stores: Vec<_> = plan.stops.iter().filter(|stop| stop.kind == StopKind::Store).collect();
    let score: f64 = stores.iter().filter_map(|stop| stop.score).sum();
    let dwell: f64 = stores.iter().filter_map(|stop| stop.dwell_minutes).sum();
    let drive: f64 = plan
        .stops
        .iter()
        .filter_map(|stop| stop.incoming_leg)
        .map(|leg| leg.drive_minutes)
        .sum();

    assert_eq!(plan.metrics.store_count, stores.len());
    assert!((plan.metrics.total_score - score).abs() < TOL);
    assert!((plan.metrics.total_dwell_minutes - dwell).abs() < TOL);
    assert!((plan.metrics.total_drive_minutes - drive).abs() < TOL);
    let end = plan.stops.last().unwrap();
    assert!((plan.metrics.projected_return_minutes - end.arrive).abs() < TOL);
}

#[test]
fn test_plan_serializes_identically() {
    let trip = detroit();
    let options = RunOptions::default().with_seed(77);

    let first = serde_json::to_string(&solve_day(&trip, "D1", &options).unwrap()).unwrap();
    let second = serde_json::to_string(&solve_day(&trip, "D1", &options).unwrap()).unwrap();

    assert_eq!(first, second);
    assert!(first.contains("\"excludedStops\""));
    assert!(first.contains("\"type\":\"break\""));
}

#[test]
fn test_solve_trip_plans_every_day_in_order() {
    let trip = detroit();

    let outcomes = solve_trip(&trip, &RunOptions::default());

    let days: Vec<&str> = outcomes.iter().map(|outcome| outcome.day_id.as_str()).collect();
    assert_eq!(days, vec!["D1", "D2"]);

    let thursday = outcomes[1].result.as_ref().unwrap();
    assert!(thursday.metrics.store_count <= 3);
    assert!(!thursday.store_ids().contains(&"DU-001"));
    assert_eq!(reason_of(thursday, "DU-001"), Some(ExclusionReason::OtherDay));
    assert_eq!(reason_of(thursday, "DU-006"), Some(ExclusionReason::Closed));
    assert!(thursday.stop(BREAK_ID).is_none());

    let wednesday = solve_day(&trip, "D1", &RunOptions::default()).unwrap();
    assert_eq!(outcomes[0].result.as_ref().unwrap(), &wednesday);
}

// ============================================================================
// Caps
// ============================================================================

#[test]
fn test_binding_caps_are_reported() {
    let capped = scattered(TripBuilder::new().max_stops(1));
    let by_stops = solve_day(&capped, DAY, &RunOptions::default()).unwrap();

    assert_eq!(by_stops.metrics.store_count, 1);
    assert!(by_stops.metrics.binding_constraints.contains(&MAX_STOPS.to_string()));
    assert!(by_stops.metrics.limit_violations.is_empty());

    let drive = by_stops.metrics.total_drive_minutes;
    let budgeted = scattered(TripBuilder::new().max_drive_time(drive));
    let by_drive = solve_day(&budgeted, DAY, &RunOptions::default()).unwrap();

    assert_eq!(by_drive.store_ids(), by_stops.store_ids());
    assert!(by_drive.metrics.binding_constraints.contains(&MAX_DRIVE_TIME.to_string()));
    assert!(by_drive.metrics.limit_violations.is_empty());
}

#[test]
fn test_mandatory_stores_may_exceed_caps() {
    let trip = TripBuilder::new()
        .store(store("a", 10.0))
        .store(store("b", -10.0))
        .must_visit("a")
        .must_visit("b")
        .max_stops(1)
        .build();

    let plan = solve_day(&trip, DAY, &RunOptions::default()).unwrap();

    assert_eq!(plan.metrics.store_count, 2);
    assert_eq!(plan.metrics.limit_violations, vec![MAX_STOPS.to_string()]);
}

#[test]
fn test_unselected_stores_are_reported() {
    let trip = TripBuilder::new()
        .window(hm(8, 0), hm(10, 0))
        .store(store("X", 40.0).with_score(1.0))
        .store(store("Y", -40.0).with_score(5.0))
        .build();

    let plan = solve_day(&trip, DAY, &RunOptions::default().with_lambda(1.0)).unwrap();

    assert_eq!(reason_of(&plan, "X"), Some(ExclusionReason::NotSelected));
    assert_eq!(plan.metrics.lambda, 1.0);
}

// ============================================================================
// Run options
// ============================================================================

#[test]
fn test_reoptimization_from_current_position() {
    let trip = TripBuilder::new()
        .store(store("a", 10.0))
        .store(store("b", 30.0))
        .store(store("c", -20.0))
        .must_visit("a")
        .build();
    let here = east(30.0);
    let options = RunOptions::default().with_completed("a").with_start(here, hm(12, 0));

    let plan = solve_day(&trip, DAY, &options).unwrap();

    let start = &plan.stops[0];
    assert_eq!(start.kind, StopKind::Start);
    assert_eq!(start.coordinate, here);
    assert!((start.depart - 720.0).abs() < TOL);
    assert!(!plan.store_ids().contains(&"a"));
    assert_eq!(reason_of(&plan, "a"), Some(ExclusionReason::Completed));
    assert!(plan.stops.iter().all(|stop| stop.arrive >= 720.0 - TOL));
}

/// Depot day with a 12:00-12:30 break and a store on either side.
fn day_with_break() -> Trip {
    TripBuilder::new()
        .store(store("a", 20.0).with_score(2.0))
        .store(store("b", -25.0).with_score(1.0))
        .break_window(hm(12, 0), hm(12, 30))
        .build()
}

#[test]
fn test_replan_after_completed_break() {
    let trip = day_with_break();
    let options = RunOptions::default().with_completed(BREAK_ID).with_start(east(0.0), hm(13, 0));

    let plan = solve_day(&trip, DAY, &options).unwrap();

    assert!(plan.stop(BREAK_ID).is_none());
    assert_eq!(plan.metrics.store_count, 2);
    assert!(plan.stops.iter().all(|stop| stop.arrive >= 780.0 - TOL));
}

#[test]
fn test_replan_once_break_has_started() {
    let trip = day_with_break();
    let options = RunOptions::default().with_start(east(0.0), hm(13, 0));

    let plan = solve_day(&trip, DAY, &options).unwrap();

    assert!(plan.stop(BREAK_ID).is_none());
    assert_eq!(plan.metrics.store_count, 2);
}

#[test]
fn test_replan_before_break_still_plans_it() {
    let trip = day_with_break();
    let options = RunOptions::default().with_start(east(0.0), hm(11, 0));

    let plan = solve_day(&trip, DAY, &options).unwrap();

    let pause = plan.stop(BREAK_ID).expect("break still due");
    assert!((pause.arrive - 720.0).abs() < TOL);
}

#[test]
fn test_closed_tagged_store_does_not_block_day() {
    let trip = TripBuilder::new()
        .weekday(Weekday::Wed)
        .store(store("open", 15.0).with_tag("market"))
        .store(store("shut", 10.0).with_tag("market").with_hours(Weekday::Thu, vec![window(hm(9, 0), hm(17, 0))]))
        .must_visit_tag("market")
        .build();

    let plan = solve_day(&trip, DAY, &RunOptions::default()).unwrap();

    assert_eq!(plan.store_ids(), vec!["open"]);
    assert_eq!(reason_of(&plan, "shut"), Some(ExclusionReason::Closed));
}

#[test]
fn test_robustness_inflates_reported_drive() {
    let trip = TripBuilder::new().store(store("a", 30.0)).must_visit("a").build();

    let plain = solve_day(&trip, DAY, &RunOptions::default()).unwrap();
    let buffered = solve_day(&trip, DAY, &RunOptions::default().with_robustness_factor(1.5)).unwrap();

    assert!((plain.metrics.total_drive_minutes - 60.0).abs() < TOL);
    assert!((buffered.metrics.total_drive_minutes - 90.0).abs() < TOL);
    assert_eq!(plain.metrics.total_distance_miles, buffered.metrics.total_distance_miles);
}

#[test]
fn test_risk_threshold_lowers_risk() {
    let trip = TripBuilder::new()
        .window(hm(8, 0), hm(9, 20))
        .store(store("a", 30.0))
        .must_visit("a")
        .build();

    let strict = solve_day(&trip, DAY, &RunOptions::default().with_risk_threshold(0.0)).unwrap();
    let lenient = solve_day(&trip, DAY, &RunOptions::default().with_risk_threshold(120.0)).unwrap();

    assert!(strict.metrics.on_time_risk > 0.0);
    assert!(lenient.metrics.on_time_risk <= strict.metrics.on_time_risk);
}

#[test]
fn test_verbose_does_not_change_plan() {
    let trip = detroit();

    let quiet = solve_day(&trip, "D1", &RunOptions::default()).unwrap();
    let verbose = solve_day(&trip, "D1", &RunOptions::default().with_verbose(true)).unwrap();

    assert_eq!(quiet, verbose);
}
