//! # pacer-course
//!
//! Turns raw GPX track data into the course model the correction
//! pipeline runs against: an ordered list of route points at a uniform
//! along-route spacing, with checkpoints tagged structurally during the
//! build (never inferred downstream by string inspection).
//!
//! The pipeline is two stages:
//!
//! 1. [`gpx::parse_gpx`] extracts `<trkpt lat lon>` / `<ele>` pairs in
//!    document order.
//! 2. [`builder::build_course`] inserts interpolated points so no two
//!    consecutive points are farther apart than the configured interval,
//!    accumulates along-route distance, and tags START / CP{n} / FINISH.

pub mod builder;
pub mod error;
pub mod gpx;
pub mod model;

pub use builder::{CourseOptions, build_course};
pub use error::{CourseError, GpxError};
pub use gpx::{TrackPoint, parse_gpx};
pub use model::{Course, LocationAtDistance, PointKind, RoutePoint};
