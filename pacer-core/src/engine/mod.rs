//! The per-fix CPU pipeline: map matching onto the course polyline and
//! progress/checkpoint detection. Pure functions over the course and
//! the participant's prior state; all I/O stays in the service layer.

pub mod matcher;
pub mod progress;

pub use matcher::{MatchResult, MatcherConfig, match_fix};
pub use progress::{ProgressConfig, ProgressOutcome, advance};
