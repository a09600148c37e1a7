//! Tuning knobs the core honours. Defaults match the values the
//! correction pipeline was calibrated with; the simulator and tests
//! override individual fields.

use std::time::Duration;

use crate::store::leaderboard::DEFAULT_SCORE_WEIGHT;

#[derive(Debug, Clone, Copy)]
pub struct CoreConfig {
    /// Maximum spacing between consecutive course points, metres.
    pub interpolation_interval_m: f64,
    /// Checkpoint thinning interval for course builds; 0 = every
    /// waypoint is a checkpoint.
    pub checkpoint_distance_interval_m: f64,
    /// A fix farther than this from every segment is unmatched.
    pub match_distance_threshold_m: f64,
    /// Crossing radius around a checkpoint.
    pub checkpoint_capture_radius_m: f64,
    /// How long a materialised course stays served from cache.
    pub course_cache_ttl: Duration,
    /// Leaderboard score weight; must exceed any feasible race
    /// duration in seconds.
    pub leaderboard_score_weight: f64,
    /// Overall deadline for one correction request.
    pub correction_deadline: Duration,
    /// Matcher score weights.
    pub weight_distance: f64,
    pub weight_bearing: f64,
    /// Bounded-retry policy for conflicting or transiently failing
    /// store writes.
    pub store_retry_attempts: u32,
    pub store_retry_base_delay: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            interpolation_interval_m: 100.0,
            checkpoint_distance_interval_m: 0.0,
            match_distance_threshold_m: 100.0,
            checkpoint_capture_radius_m: 50.0,
            course_cache_ttl: Duration::from_secs(86_400),
            leaderboard_score_weight: DEFAULT_SCORE_WEIGHT,
            correction_deadline: Duration::from_millis(2_000),
            weight_distance: 0.6,
            weight_bearing: 0.4,
            store_retry_attempts: 3,
            store_retry_base_delay: Duration::from_millis(100),
        }
    }
}

impl CoreConfig {
    pub(crate) fn course_options(&self) -> pacer_course::CourseOptions {
        pacer_course::CourseOptions {
            interpolation_interval_m: self.interpolation_interval_m,
            checkpoint_distance_interval_m: self.checkpoint_distance_interval_m,
        }
    }

    pub(crate) fn matcher_config(&self) -> crate::engine::MatcherConfig {
        crate::engine::MatcherConfig {
            match_distance_threshold_m: self.match_distance_threshold_m,
            weight_distance: self.weight_distance,
            weight_bearing: self.weight_bearing,
        }
    }

    pub(crate) fn progress_config(&self) -> crate::engine::ProgressConfig {
        crate::engine::ProgressConfig {
            checkpoint_capture_radius_m: self.checkpoint_capture_radius_m,
        }
    }
}
