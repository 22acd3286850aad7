//! Haversine leg estimator.
//!
//! Uses great-circle distance and a constant speed to estimate drive time.
//! Ignores roads and traffic; the robustness factor inflates drive time
//! uniformly to model a worst-case buffer.

use crate::model::Coordinate;
use crate::traits::{Leg, TravelEstimator};

/// Average driving speed assumed when nothing else is configured.
pub const DEFAULT_MPH: f64 = 30.0;

/// Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Constant-speed estimator over great-circle distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaversineEstimator {
    /// Assumed average driving speed in mph.
    pub mph: f64,
    /// Multiplier applied to drive time only. Never below 1.
    pub robustness_factor: f64,
}

impl Default for HaversineEstimator {
    fn default() -> Self {
        Self {
            mph: DEFAULT_MPH,
            robustness_factor: 1.0,
        }
    }
}

impl HaversineEstimator {
    pub fn new(mph: f64) -> Self {
        Self {
            mph,
            robustness_factor: 1.0,
        }
    }

    pub fn with_robustness(mut self, factor: f64) -> Self {
        self.robustness_factor = factor.max(1.0);
        self
    }

    /// Great-circle distance between two points in miles.
    pub fn haversine_miles(from: Coordinate, to: Coordinate) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lon = (to.lon - from.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_MILES * c
    }

    /// Convert miles to buffered drive minutes.
    fn miles_to_minutes(&self, miles: f64) -> f64 {
        miles / self.mph * 60.0 * self.robustness_factor
    }
}

impl TravelEstimator for HaversineEstimator {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Leg {
        let distance_miles = Self::haversine_miles(from, to);
        Leg {
            drive_minutes: self.miles_to_minutes(distance_miles),
            distance_miles,
        }
    }
}
