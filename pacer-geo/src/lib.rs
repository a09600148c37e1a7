//! # pacer-geo
//!
//! Pure geodesy and signal-filtering primitives for the pacer
//! race-tracking core.
//!
//! Everything in this crate is CPU-only and infallible: great-circle
//! distance and bearing on a spherical Earth model, and the per-axis
//! scalar Kalman filters used to smooth raw GPS fixes before map
//! matching. No I/O, no async.

pub mod geodesy;
pub mod kalman;

pub use geodesy::{EARTH_RADIUS_M, bearing_deg, distance_m, heading_delta_deg};
pub use kalman::{AxisFilter, FilteredFix, GpsKalman, MeasurementTrust};
