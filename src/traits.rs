//! Seams between the planning core and its collaborators.
//!
//! A leg estimator the simulator drives through, and an observer the
//! heuristic reports to.

use serde::Serialize;

use crate::model::Coordinate;

/// Drive time and distance of one leg between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub drive_minutes: f64,
    pub distance_miles: f64,
}

/// Estimates a travel leg between two coordinates.
pub trait TravelEstimator {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Leg;
}

/// Incremental status emitted by the order heuristic.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchProgress {
    /// Mandatory and locked entries placed.
    Seeded { entries: usize },
    /// An optional store was accepted into the route.
    Inserted { store_id: String, stores: usize, gain: f64 },
    /// A 2-opt move shortened the route.
    Improved { round: usize, drive_minutes: f64 },
    Finished { stores: usize },
}

/// Receives heuristic progress. Observers cannot influence the result.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &SearchProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&SearchProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &SearchProgress) {
        self(progress)
    }
}
