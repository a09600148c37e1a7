//! The read-only map/leaderboard view for one course: static event
//! metadata, the category list, the leading and followed participants'
//! latest corrected positions, and the top rankers.

use std::collections::HashMap;

use pacer_contracts::{
    CourseCategoryView, EventDetailView, ParticipantLocationView, RankerView,
};

use crate::course::GpxFetcher;
use crate::db::models::ParticipantRow;
use crate::db::queries;
use crate::error::CoreError;
use crate::retry::with_backoff;
use crate::service::{TrackingService, require_id};
use crate::store::{LiveStore, ParticipantLocation};

/// How many leaderboard rows the view carries.
const TOP_RANKER_COUNT: usize = 10;
/// How many leaders are always shown on the map.
const TOP_LOCATION_COUNT: usize = 3;

impl<S: LiveStore, F: GpxFetcher> TrackingService<S, F> {
    /// Compose the event-detail view. Pure read: no store mutation.
    pub async fn get_event_detail(
        &self,
        event_id: &str,
        event_detail_id: &str,
        current_user_id: Option<&str>,
    ) -> Result<EventDetailView, CoreError> {
        require_id("eventId", event_id)?;
        require_id("eventDetailId", event_detail_id)?;

        let event = queries::events::get_event(&self.pool, event_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("event {event_id}")))?;
        let detail = queries::events::get_event_detail(&self.pool, event_detail_id)
            .await?
            .filter(|d| d.event_id == event.id)
            .ok_or_else(|| {
                CoreError::NotFound(format!("event detail {event_detail_id} under {event_id}"))
            })?;

        let categories: Vec<CourseCategoryView> =
            queries::events::list_event_details(&self.pool, event_id)
                .await?
                .into_iter()
                .map(|row| CourseCategoryView {
                    event_detail_id: row.id,
                    course_name: row.course_name,
                    distance_km: row.distance_km,
                })
                .collect();

        let config = self.config();
        let board = self.leaderboard();
        let rankers = with_backoff(
            config.store_retry_attempts,
            config.store_retry_base_delay,
            || board.top(event_detail_id, TOP_RANKER_COUNT),
        )
        .await?;

        // Map participants: top leaders ∪ the current user ∪ whoever
        // they track, deduped in that priority order
        let mut map_user_ids: Vec<String> = rankers
            .iter()
            .take(TOP_LOCATION_COUNT)
            .map(|e| e.user_id.clone())
            .collect();
        if let Some(current) = current_user_id {
            push_unique(&mut map_user_ids, current.to_string());
            let tracked =
                queries::trackers::tracked_user_ids(&self.pool, current, event_detail_id).await?;
            for target in tracked {
                push_unique(&mut map_user_ids, target);
            }
        }

        // One profile pass covers both the map list and the rankers
        let mut profile_ids = map_user_ids.clone();
        for entry in &rankers {
            push_unique(&mut profile_ids, entry.user_id.clone());
        }
        let profiles: HashMap<String, ParticipantRow> =
            queries::participants::get_participants(&self.pool, event_detail_id, &profile_ids)
                .await?
                .into_iter()
                .map(|row| (row.user_id.clone(), row))
                .collect();

        let mut locations: HashMap<String, ParticipantLocation> = HashMap::new();
        for user_id in &profile_ids {
            let location = with_backoff(
                config.store_retry_attempts,
                config.store_retry_base_delay,
                || self.store.get_location(user_id, event_detail_id),
            )
            .await?;
            if let Some(location) = location {
                locations.insert(user_id.clone(), location);
            }
        }

        let participants_locations: Vec<ParticipantLocationView> = map_user_ids
            .iter()
            .filter_map(|user_id| {
                let location = locations.get(user_id)?;
                let profile = profiles.get(user_id);
                Some(location_view(location, profile))
            })
            .collect();

        let top_rankers: Vec<RankerView> = rankers
            .iter()
            .map(|entry| {
                let profile = profiles.get(&entry.user_id);
                let location = locations.get(&entry.user_id);
                RankerView {
                    rank: entry.rank,
                    user_id: entry.user_id.clone(),
                    name: profile.and_then(|p| p.name.clone()),
                    bib_number: profile.and_then(|p| p.bib_number.clone()),
                    profile_image_url: profile.and_then(|p| p.profile_image_url.clone()),
                    cp_index: entry.cp_index,
                    cumulative_time_s: entry.cumulative_time_s,
                    farthest_cp_id: location.and_then(|l| l.farthest_cp_id.clone()),
                }
            })
            .collect();

        Ok(EventDetailView {
            event_id: event.id,
            event_name: event.name,
            event_detail_id: detail.id,
            course_name: detail.course_name,
            starts_at: event.starts_at,
            venue: event.venue,
            categories,
            participants_locations,
            top_rankers,
        })
    }
}

fn push_unique(ids: &mut Vec<String>, id: String) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn location_view(
    location: &ParticipantLocation,
    profile: Option<&ParticipantRow>,
) -> ParticipantLocationView {
    ParticipantLocationView {
        user_id: location.user_id.clone(),
        name: profile.and_then(|p| p.name.clone()),
        bib_number: profile.and_then(|p| p.bib_number.clone()),
        lat: location.corrected_lat,
        lon: location.corrected_lon,
        altitude: location.corrected_altitude,
        heading: location.heading_deg,
        distance_covered_m: location.distance_covered_m,
        cumulative_time_s: location.cumulative_time_s,
        farthest_cp_id: location.farthest_cp_id.clone(),
        farthest_cp_index: location.farthest_cp_index,
        last_updated_epoch_s: location.last_updated_epoch_s,
    }
}
