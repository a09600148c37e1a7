//! Progress and checkpoint detection.
//!
//! Given the matcher output and the participant's prior persisted
//! state, compute the new monotone along-route distance, detect
//! checkpoint crossings (one-shot per checkpoint), and produce the
//! split bookkeeping the store and leaderboard need.

use pacer_contracts::CheckpointReach;
use pacer_course::Course;
use pacer_geo::distance_m;

use crate::store::{ParticipantLocation, SegmentRecord};

#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    /// A corrected fix within this distance of a checkpoint counts as a
    /// crossing even before the along-route distance reaches it.
    pub checkpoint_capture_radius_m: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            checkpoint_capture_radius_m: 50.0,
        }
    }
}

/// Everything one fix changes about a participant's race state.
#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub distance_covered_m: f64,
    pub cumulative_time_s: f64,
    pub race_start_epoch_s: Option<f64>,
    pub farthest_cp_id: Option<String>,
    pub farthest_cp_index: Option<i32>,
    pub cumulative_time_at_farthest_cp_s: Option<f64>,
    /// Checkpoints crossed by this fix, in course order.
    pub reaches: Vec<CheckpointReach>,
    /// Segment records to persist: the START anchor (on the first
    /// matched fix) plus one per crossing.
    pub segment_records: Vec<(String, SegmentRecord)>,
}

/// Advance a participant's race state by one fix.
///
/// Only matched fixes move the race forward: an off-course fix carries
/// the prior distance, checkpoint and leaderboard state through
/// untouched. The first matched fix anchors the race clock at `t_now`
/// (START record `{0, 0}`, farthest checkpoint 0) without emitting a
/// reach.
pub fn advance(
    course: &Course,
    prev: Option<&ParticipantLocation>,
    matched: bool,
    corrected_lat: f64,
    corrected_lon: f64,
    progress_distance_m: f64,
    t_now: f64,
    config: &ProgressConfig,
) -> ProgressOutcome {
    let prev_distance = prev.map(|p| p.distance_covered_m).unwrap_or(0.0);
    let prev_race_start = prev.and_then(|p| p.race_start_epoch_s);
    let prev_farthest_index = prev.and_then(|p| p.farthest_cp_index);
    let prev_farthest_id = prev.and_then(|p| p.farthest_cp_id.clone());
    let prev_cum_at_farthest = prev.and_then(|p| p.cumulative_time_at_farthest_cp_s);

    if !matched {
        // The clock keeps running once anchored, but nothing advances
        let cumulative = prev_race_start.map(|rs| (t_now - rs).max(0.0)).unwrap_or(0.0);
        return ProgressOutcome {
            distance_covered_m: prev_distance,
            cumulative_time_s: cumulative,
            race_start_epoch_s: prev_race_start,
            farthest_cp_id: prev_farthest_id,
            farthest_cp_index: prev_farthest_index,
            cumulative_time_at_farthest_cp_s: prev_cum_at_farthest,
            reaches: vec![],
            segment_records: vec![],
        };
    }

    let anchoring = prev_race_start.is_none();
    let race_start = prev_race_start.unwrap_or(t_now);
    let cumulative_now = (t_now - race_start).max(0.0);
    let distance_covered = prev_distance.max(progress_distance_m);

    let mut farthest_index = prev_farthest_index.unwrap_or(0);
    let mut farthest_id = prev_farthest_id.or_else(|| Some("START".to_string()));
    let mut cum_at_farthest = prev_cum_at_farthest.unwrap_or(0.0);
    let mut last_cp_cumulative = cum_at_farthest;

    let mut reaches = Vec::new();
    let mut segment_records: Vec<(String, SegmentRecord)> = Vec::new();

    if anchoring {
        tracing::debug!(t_now, "race clock anchored at first matched fix");
        segment_records.push((
            "START".to_string(),
            SegmentRecord {
                segment_duration_s: 0.0,
                cumulative_time_s: 0.0,
            },
        ));
    }

    for checkpoint in course.checkpoints() {
        let (Some(cp_index), Some(cp_id)) = (checkpoint.cp_index, checkpoint.cp_id.as_deref())
        else {
            continue;
        };
        if cp_index <= farthest_index {
            continue;
        }

        let crossed_by_distance = distance_covered >= checkpoint.distance_from_start_m;
        let crossed_by_radius = distance_m(
            corrected_lat,
            corrected_lon,
            checkpoint.lat,
            checkpoint.lon,
        ) <= config.checkpoint_capture_radius_m;

        if !(crossed_by_distance || crossed_by_radius) {
            continue;
        }

        // All checkpoints crossed by one fix share its timestamp;
        // follow-on crossings in the burst get zero segment durations
        let segment_duration = cumulative_now - last_cp_cumulative;
        reaches.push(CheckpointReach {
            cp_id: cp_id.to_string(),
            cp_index,
            pass_time_epoch_s: t_now,
            segment_duration_s: segment_duration,
            cumulative_time_s: cumulative_now,
        });
        segment_records.push((
            cp_id.to_string(),
            SegmentRecord {
                segment_duration_s: segment_duration,
                cumulative_time_s: cumulative_now,
            },
        ));

        farthest_index = cp_index;
        farthest_id = Some(cp_id.to_string());
        cum_at_farthest = cumulative_now;
        last_cp_cumulative = cumulative_now;
    }

    ProgressOutcome {
        distance_covered_m: distance_covered,
        cumulative_time_s: cumulative_now,
        race_start_epoch_s: Some(race_start),
        farthest_cp_id: farthest_id,
        farthest_cp_index: Some(farthest_index),
        cumulative_time_at_farthest_cp_s: Some(cum_at_farthest),
        reaches,
        segment_records,
    }
}
