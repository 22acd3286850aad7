//! trip-planner core
//!
//! Plans one vehicle's stops for one day: selects and orders candidate
//! stores against a time window and operational constraints, or explains
//! why the mandatory stops cannot fit.

pub mod advisor;
pub mod context;
pub mod error;
pub mod feasibility;
pub mod haversine;
pub mod heuristic;
pub mod model;
pub mod plan;
pub mod solver;
pub mod timeline;
pub mod traits;
