//! The live state store: per-participant location records, per-checkpoint
//! split records and the leaderboard sorted set.
//!
//! All state is keyed by the three families in [`keys`]. Every mutation
//! of a location record is an optimistic compare-and-set on the record's
//! `version`; segment records are append-only hash entries; leaderboard
//! mutations are single-key atomic in the backing store.

mod memory;
mod redis_store;

pub mod leaderboard;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;

/// Key builders for the three store families. All state lives under
/// these shapes; nothing else writes to the store.
pub mod keys {
    /// Latest location record for a participant on a course.
    pub fn location(user_id: &str, event_detail_id: &str) -> String {
        format!("location:{user_id}:{event_detail_id}")
    }

    /// Per-checkpoint split records for a participant.
    pub fn segment_records(user_id: &str, event_id: &str, event_detail_id: &str) -> String {
        format!("participantSegmentRecords:{user_id}:{event_id}:{event_detail_id}")
    }

    /// Leaderboard sorted set for a course.
    pub fn leaderboard(event_detail_id: &str) -> String {
        format!("leaderboard:{event_detail_id}")
    }

    /// Patterns covering every key the store owns, used by reset.
    pub const FAMILY_PATTERNS: [&str; 3] = [
        "location:*",
        "participantSegmentRecords:*",
        "leaderboard:*",
    ];
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O-level failure talking to the backing store. Transient cases
    /// are retried by the caller with bounded backoff.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Optimistic CAS miss on a location record.
    #[error("concurrent update conflict on {0}")]
    Conflict(String),

    #[error("corrupt record at {key}: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// The latest known state of one participant on one course.
///
/// `distance_covered_m` and `farthest_cp_index` are monotonically
/// non-decreasing for the life of the record. `version` is the CAS
/// token; the store bumps it on every successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLocation {
    pub user_id: String,
    pub event_id: String,
    pub event_detail_id: String,

    pub raw_lat: f64,
    pub raw_lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_speed: Option<f64>,
    pub raw_time_epoch_s: f64,

    pub corrected_lat: f64,
    pub corrected_lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_altitude: Option<f64>,
    pub heading_deg: f64,

    pub distance_covered_m: f64,
    /// Seconds since the participant's race start, as of the last fix.
    pub cumulative_time_s: f64,
    /// Anchor for cumulative times: the timestamp of the first matched
    /// fix. Unset until the participant has been matched onto the course.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_start_epoch_s: Option<f64>,
    pub last_updated_epoch_s: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farthest_cp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farthest_cp_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_time_at_farthest_cp_s: Option<f64>,

    #[serde(default)]
    pub version: u64,
}

/// Split timing for one crossed checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub segment_duration_s: f64,
    pub cumulative_time_s: f64,
}

/// The key-value service behind the core: strings (location records,
/// JSON), hashes (segment records) and sorted sets (leaderboards).
///
/// Implementations must make `put_location` atomic per key: the write
/// succeeds only when the stored record's version equals
/// `expected_version` (0 = the record must not exist yet). Sorted-set
/// operations are single-key atomic.
pub trait LiveStore: Send + Sync {
    fn get_location(
        &self,
        user_id: &str,
        event_detail_id: &str,
    ) -> impl Future<Output = Result<Option<ParticipantLocation>, StoreError>> + Send;

    /// Compare-and-set write of a location record. On success the
    /// stored record carries `expected_version + 1`.
    fn put_location(
        &self,
        location: &ParticipantLocation,
        expected_version: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn segment_records(
        &self,
        user_id: &str,
        event_id: &str,
        event_detail_id: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, SegmentRecord>, StoreError>> + Send;

    fn put_segment_record(
        &self,
        user_id: &str,
        event_id: &str,
        event_detail_id: &str,
        cp_id: &str,
        record: &SegmentRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Upsert a leaderboard member with its score.
    fn board_upsert(
        &self,
        event_detail_id: &str,
        user_id: &str,
        score: f64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Best `count` members, highest score first.
    fn board_top(
        &self,
        event_detail_id: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<(String, f64)>, StoreError>> + Send;

    /// 0-based position of a member in descending score order.
    fn board_rank(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<u64>, StoreError>> + Send;

    fn board_score(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<f64>, StoreError>> + Send;

    /// Members between the 0-based positions `start..=stop` in
    /// descending score order.
    fn board_range(
        &self,
        event_detail_id: &str,
        start: usize,
        stop: usize,
    ) -> impl Future<Output = Result<Vec<(String, f64)>, StoreError>> + Send;

    /// Delete everything under the three key families. Returns the
    /// number of deleted keys.
    fn reset(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
