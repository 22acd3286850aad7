//! Finished plan values handed to rendering collaborators.
//!
//! Nothing here is format-aware; everything derives `Serialize` and keeps
//! ordered containers so identical plans serialize byte-for-byte identically.

use serde::Serialize;

use crate::model::{Anchor, Coordinate, Store};
use crate::traits::Leg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Start,
    Store,
    Break,
    End,
}

/// One realized stop of a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPlan {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: StopKind,
    /// Minutes since midnight.
    pub arrive: f64,
    pub depart: f64,
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dwell_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_leg: Option<Leg>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl StopPlan {
    pub fn anchor(anchor: &Anchor, kind: StopKind, at: f64, incoming_leg: Option<Leg>) -> Self {
        Self {
            id: anchor.id.clone(),
            name: anchor.name.clone(),
            kind,
            arrive: at,
            depart: at,
            coordinate: anchor.coordinate,
            dwell_minutes: None,
            score: None,
            incoming_leg,
            tags: Vec::new(),
        }
    }

    pub fn store(store: &Store, arrive: f64, dwell: f64, incoming_leg: Leg) -> Self {
        Self {
            id: store.id.clone(),
            name: store.name.clone(),
            kind: StopKind::Store,
            arrive,
            depart: arrive + dwell,
            coordinate: store.coordinate,
            dwell_minutes: Some(dwell),
            score: store.score,
            incoming_leg: Some(incoming_leg),
            tags: store.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExclusionReason {
    /// Already visited earlier in the day.
    Completed,
    /// Assigned to a different day.
    OtherDay,
    /// Not open on the active weekday.
    Closed,
    /// Eligible, but the heuristic left it out.
    NotSelected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedStop {
    pub id: String,
    pub name: String,
    pub reason: ExclusionReason,
}

impl ExcludedStop {
    pub fn new(store: &Store, reason: ExclusionReason) -> Self {
        Self {
            id: store.id.clone(),
            name: store.name.clone(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMetrics {
    pub store_count: usize,
    pub total_score: f64,
    pub total_drive_minutes: f64,
    pub total_dwell_minutes: f64,
    pub total_distance_miles: f64,
    pub projected_return_minutes: f64,
    pub slack_minutes: f64,
    pub on_time_risk: f64,
    /// Caps met exactly by the plan.
    pub binding_constraints: Vec<String>,
    /// Caps exceeded, only possible when mandatory stops force it.
    pub limit_violations: Vec<String>,
    pub seed: u64,
    pub lambda: f64,
}

/// A finished, immutable day plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day_id: String,
    pub stops: Vec<StopPlan>,
    pub excluded_stops: Vec<ExcludedStop>,
    pub metrics: DayMetrics,
}

impl DayPlan {
    /// Ids of store-type stops in visiting order.
    pub fn store_ids(&self) -> Vec<&str> {
        self.stops
            .iter()
            .filter(|stop| stop.kind == StopKind::Store)
            .map(|stop| stop.id.as_str())
            .collect()
    }

    pub fn stop(&self, id: &str) -> Option<&StopPlan> {
        self.stops.iter().find(|stop| stop.id == id)
    }
}
