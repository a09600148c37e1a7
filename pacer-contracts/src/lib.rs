//! Shared contracts between the pacer core, the simulator and any
//! transport layer sitting in front of the core. Pure data; the only
//! behaviour is timestamp normalisation.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Epoch values at or above this are interpreted as milliseconds.
/// (10¹¹ seconds is the year 5138; no race runs that long.)
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimestampError {
    #[error("unparseable timestamp '{0}': expected RFC-3339 or Unix epoch")]
    Unparseable(String),

    #[error("non-finite epoch timestamp")]
    NonFinite,
}

/// A fix timestamp as clients send it: RFC-3339 text or a Unix epoch
/// number in seconds or milliseconds. Numeric strings are tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(f64),
    Text(String),
}

impl Timestamp {
    /// Normalise to Unix epoch seconds.
    pub fn to_epoch_seconds(&self) -> Result<f64, TimestampError> {
        match self {
            Timestamp::Epoch(v) => normalize_epoch(*v),
            Timestamp::Text(s) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Ok(dt.timestamp_millis() as f64 / 1000.0);
                }
                if let Ok(v) = s.trim().parse::<f64>() {
                    return normalize_epoch(v);
                }
                Err(TimestampError::Unparseable(s.clone()))
            }
        }
    }
}

fn normalize_epoch(v: f64) -> Result<f64, TimestampError> {
    if !v.is_finite() {
        return Err(TimestampError::NonFinite);
    }
    if v.abs() >= EPOCH_MILLIS_THRESHOLD {
        Ok(v / 1000.0)
    } else {
        Ok(v)
    }
}

/// One inbound GPS fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Device-reported horizontal accuracy, metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Ground speed, m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Course over ground, degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    pub timestamp: Timestamp,
}

/// Input to the correction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub user_id: String,
    pub event_id: String,
    pub event_detail_id: String,
    pub fixes: Vec<GpsFix>,
}

/// A checkpoint crossed while processing a fix batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointReach {
    pub cp_id: String,
    pub cp_index: i32,
    /// When the crossing was observed, Unix epoch seconds.
    pub pass_time_epoch_s: f64,
    pub segment_duration_s: f64,
    pub cumulative_time_s: f64,
}

/// The corrected position after a batch of fixes, plus any checkpoint
/// crossings the batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResponse {
    pub user_id: String,
    pub event_id: String,
    pub event_detail_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Timestamp of the last processed fix, Unix epoch seconds.
    pub timestamp_epoch_s: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkpoint_reaches: Vec<CheckpointReach>,
    pub matched: bool,
    pub distance_to_route_m: f64,
    pub progress_distance_m: f64,
}

/// Summary returned when a course is ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub event_id: String,
    pub event_detail_id: String,
    pub total_distance_m: f64,
    pub point_count: usize,
    pub checkpoint_count: usize,
}

// --- Event-detail read model views ---

/// A course category (event-detail row) under an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCategoryView {
    pub event_detail_id: String,
    pub course_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// A participant's latest corrected position for the map view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLocationView {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bib_number: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    pub heading: f64,
    pub distance_covered_m: f64,
    pub cumulative_time_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farthest_cp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farthest_cp_index: Option<i32>,
    pub last_updated_epoch_s: f64,
}

/// One leaderboard row enriched with profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankerView {
    pub rank: u32,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bib_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    pub cp_index: i32,
    pub cumulative_time_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farthest_cp_id: Option<String>,
}

/// The composed map/leaderboard view for one event detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailView {
    pub event_id: String,
    pub event_name: String,
    pub event_detail_id: String,
    pub course_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    pub categories: Vec<CourseCategoryView>,
    pub participants_locations: Vec<ParticipantLocationView>,
    pub top_rankers: Vec<RankerView>,
}
