//! Course materialisation: fetching GPX bytes, building the course and
//! serving it from a TTL cache.

pub mod cache;
pub mod fetch;

pub use cache::{CourseCache, CourseRecord};
pub use fetch::{FetchError, GpxFetcher, HttpGpxFetcher, StaticGpxFetcher};
