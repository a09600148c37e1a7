//! The correction pipeline: one call takes a participant's fix batch
//! through filtering, map matching, progress detection and the store
//! writes, in timestamp order, serialized per participant.

use tracing::{debug, warn};

use pacer_contracts::{CheckpointReach, CorrectionRequest, CorrectionResponse, GpsFix};
use pacer_course::Course;
use pacer_geo::{GpsKalman, MeasurementTrust, bearing_deg, distance_m};

use crate::course::GpxFetcher;
use crate::engine::{MatchResult, match_fix, progress};
use crate::error::CoreError;
use crate::retry::with_backoff;
use crate::service::{TrackingService, require_id};
use crate::store::{LiveStore, ParticipantLocation, StoreError, keys};

/// Headings inferred from consecutive corrected positions need at
/// least this much separation to be meaningful.
const HEADING_MIN_TRAVEL_M: f64 = 1.0;

struct FixOutcome {
    location: ParticipantLocation,
    match_result: MatchResult,
    reaches: Vec<CheckpointReach>,
}

impl<S: LiveStore, F: GpxFetcher> TrackingService<S, F> {
    /// Correct a batch of GPS fixes for one participant.
    ///
    /// Fixes are processed in timestamp order under the participant's
    /// stripe lock; each fix is an atomic read-modify-write against the
    /// location record. The whole call runs under the configured
    /// deadline: on expiry the current fix's uncommitted writes are
    /// abandoned, while fixes already committed stay committed.
    pub async fn correct_location(
        &self,
        request: CorrectionRequest,
    ) -> Result<CorrectionResponse, CoreError> {
        let fixes = validate_request(&request)?;
        let CorrectionRequest {
            user_id,
            event_id,
            event_detail_id,
            ..
        } = request;

        match tokio::time::timeout(
            self.config().correction_deadline,
            self.process_batch(&user_id, &event_id, &event_detail_id, fixes),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CoreError::DeadlineExceeded),
        }
    }

    async fn process_batch(
        &self,
        user_id: &str,
        event_id: &str,
        event_detail_id: &str,
        fixes: Vec<(GpsFix, f64)>,
    ) -> Result<CorrectionResponse, CoreError> {
        let course_record = self.course_cache.get(event_id, event_detail_id).await?;
        let course = &course_record.course;

        let lock_key = keys::location(user_id, event_detail_id);
        let _guard = self.participant_locks.lock(&lock_key).await;

        // Filter state rolls across the fixes of this batch only
        let mut filter_state: Option<GpsKalman> = None;
        let mut reaches: Vec<CheckpointReach> = Vec::new();
        let mut last: Option<FixOutcome> = None;

        for (fix, t_now) in fixes {
            let outcome = self
                .process_fix(
                    course,
                    user_id,
                    event_id,
                    event_detail_id,
                    &fix,
                    t_now,
                    &mut filter_state,
                )
                .await?;
            reaches.extend(outcome.reaches.iter().cloned());
            last = Some(outcome);
        }

        let FixOutcome {
            location,
            match_result,
            ..
        } = last.ok_or_else(|| CoreError::InvalidInput("empty fix list".to_string()))?;

        Ok(CorrectionResponse {
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            event_detail_id: event_detail_id.to_string(),
            latitude: location.corrected_lat,
            longitude: location.corrected_lon,
            altitude: location.corrected_altitude,
            speed: location.raw_speed,
            timestamp_epoch_s: location.raw_time_epoch_s,
            checkpoint_reaches: reaches,
            matched: match_result.matched,
            distance_to_route_m: match_result.distance_to_route_m,
            progress_distance_m: location.distance_covered_m,
        })
    }

    /// One fix's read-modify-write, retried on CAS conflicts.
    #[allow(clippy::too_many_arguments)]
    async fn process_fix(
        &self,
        course: &Course,
        user_id: &str,
        event_id: &str,
        event_detail_id: &str,
        fix: &GpsFix,
        t_now: f64,
        filter_state: &mut Option<GpsKalman>,
    ) -> Result<FixOutcome, CoreError> {
        let config = self.config();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let prior = with_backoff(
                config.store_retry_attempts,
                config.store_retry_base_delay,
                || self.store.get_location(user_id, event_detail_id),
            )
            .await?;

            // Seed the filter once per batch: from the prior corrected
            // coordinates when the participant is known, else from the
            // incoming measurement itself
            let base_filter = match (&*filter_state, &prior) {
                (Some(existing), _) => existing.clone(),
                (None, Some(p)) => {
                    GpsKalman::seeded(p.corrected_lat, p.corrected_lon, p.corrected_altitude)
                }
                (None, None) => GpsKalman::new(),
            };
            let mut filter = base_filter;
            let filtered = filter.filter(
                fix.lat,
                fix.lon,
                fix.altitude,
                MeasurementTrust {
                    accuracy_m: fix.accuracy,
                    confidence: None,
                },
            );

            let heading = fix.heading.or_else(|| {
                prior.as_ref().and_then(|p| {
                    let travelled =
                        distance_m(p.corrected_lat, p.corrected_lon, filtered.lat, filtered.lon);
                    (travelled > HEADING_MIN_TRAVEL_M).then(|| {
                        bearing_deg(p.corrected_lat, p.corrected_lon, filtered.lat, filtered.lon)
                    })
                })
            });

            let match_result = match_fix(
                course,
                filtered.lat,
                filtered.lon,
                heading,
                &config.matcher_config(),
            );

            // Matched fixes snap to the course; unmatched fall back to
            // the raw coordinates
            let (corrected_lat, corrected_lon) = if match_result.matched {
                (match_result.projected_lat, match_result.projected_lon)
            } else {
                (fix.lat, fix.lon)
            };

            let outcome = progress::advance(
                course,
                prior.as_ref(),
                match_result.matched,
                corrected_lat,
                corrected_lon,
                match_result.progress_distance_m,
                t_now,
                &config.progress_config(),
            );

            let expected_version = prior.as_ref().map(|p| p.version).unwrap_or(0);
            let location = ParticipantLocation {
                user_id: user_id.to_string(),
                event_id: event_id.to_string(),
                event_detail_id: event_detail_id.to_string(),
                raw_lat: fix.lat,
                raw_lon: fix.lon,
                raw_altitude: fix.altitude,
                raw_accuracy: fix.accuracy,
                raw_speed: fix.speed,
                raw_time_epoch_s: t_now,
                corrected_lat,
                corrected_lon,
                corrected_altitude: filtered.altitude,
                heading_deg: heading.unwrap_or(0.0),
                distance_covered_m: outcome.distance_covered_m,
                cumulative_time_s: outcome.cumulative_time_s,
                race_start_epoch_s: outcome.race_start_epoch_s,
                last_updated_epoch_s: t_now,
                farthest_cp_id: outcome.farthest_cp_id.clone(),
                farthest_cp_index: outcome.farthest_cp_index,
                cumulative_time_at_farthest_cp_s: outcome.cumulative_time_at_farthest_cp_s,
                version: expected_version,
            };

            let write = with_backoff(
                config.store_retry_attempts,
                config.store_retry_base_delay,
                || self.store.put_location(&location, expected_version),
            )
            .await;

            match write {
                Ok(()) => {
                    *filter_state = Some(filter);

                    // Split and leaderboard bookkeeping is
                    // reconstructable from the next fix: log failures,
                    // never fail the correction after the location write
                    for (cp_id, record) in &outcome.segment_records {
                        if let Err(e) = self
                            .store
                            .put_segment_record(user_id, event_id, event_detail_id, cp_id, record)
                            .await
                        {
                            warn!(user_id, cp_id, error = %e, "segment record write failed");
                        }
                    }
                    let board = self.leaderboard();
                    for reach in &outcome.reaches {
                        if let Err(e) = board
                            .record(
                                event_detail_id,
                                user_id,
                                reach.cp_index,
                                reach.cumulative_time_s,
                            )
                            .await
                        {
                            warn!(user_id, cp_index = reach.cp_index, error = %e, "leaderboard upsert failed");
                        }
                    }

                    debug!(
                        user_id,
                        matched = match_result.matched,
                        distance_to_route_m = match_result.distance_to_route_m,
                        progress_m = outcome.distance_covered_m,
                        crossings = outcome.reaches.len(),
                        "fix corrected"
                    );

                    return Ok(FixOutcome {
                        location,
                        match_result,
                        reaches: outcome.reaches,
                    });
                }
                Err(StoreError::Conflict(key)) if attempt < config.store_retry_attempts => {
                    warn!(%key, attempt, "location CAS conflict, retrying read-modify-write");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Reject bad input before any state is touched. Returns the fixes
/// paired with normalised epoch-second timestamps, oldest first.
fn validate_request(request: &CorrectionRequest) -> Result<Vec<(GpsFix, f64)>, CoreError> {
    require_id("userId", &request.user_id)?;
    require_id("eventId", &request.event_id)?;
    require_id("eventDetailId", &request.event_detail_id)?;

    if request.fixes.is_empty() {
        return Err(CoreError::InvalidInput("empty fix list".to_string()));
    }

    let mut fixes = Vec::with_capacity(request.fixes.len());
    for (i, fix) in request.fixes.iter().enumerate() {
        if !(-90.0..=90.0).contains(&fix.lat) {
            return Err(CoreError::InvalidInput(format!(
                "fix {i}: latitude {} out of range",
                fix.lat
            )));
        }
        if !(-180.0..=180.0).contains(&fix.lon) {
            return Err(CoreError::InvalidInput(format!(
                "fix {i}: longitude {} out of range",
                fix.lon
            )));
        }
        let epoch = fix
            .timestamp
            .to_epoch_seconds()
            .map_err(|e| CoreError::InvalidInput(format!("fix {i}: {e}")))?;
        fixes.push((fix.clone(), epoch));
    }

    fixes.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(fixes)
}
