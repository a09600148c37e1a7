//! The public surface of the core: one service struct, five
//! operations. Collaborators (the live store, the relational read-model
//! pool and the GPX fetcher) are explicit constructor parameters, so
//! every environment (production, tests, simulator) wires its own.

mod correction;
mod event_detail;
mod locks;

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use pacer_contracts::CourseSummary;
use pacer_course::{CourseOptions, build_course, parse_gpx};

use crate::config::CoreConfig;
use crate::course::{CourseCache, CourseRecord, GpxFetcher};
use crate::error::CoreError;
use crate::retry::with_backoff;
use crate::store::LiveStore;
use crate::store::leaderboard::Leaderboard;
use locks::StripedLocks;

/// The correction core. One instance serves all events and
/// participants; everything per-request lives on the stack.
pub struct TrackingService<S: LiveStore, F: GpxFetcher> {
    config: CoreConfig,
    store: S,
    pool: SqlitePool,
    course_cache: CourseCache<F>,
    participant_locks: StripedLocks,
}

impl<S: LiveStore, F: GpxFetcher> TrackingService<S, F> {
    pub fn new(config: CoreConfig, store: S, pool: SqlitePool, fetcher: F) -> Self {
        let course_cache = CourseCache::new(
            pool.clone(),
            fetcher,
            config.course_options(),
            config.course_cache_ttl,
        );
        Self {
            config,
            store,
            pool,
            course_cache,
            participant_locks: StripedLocks::new(64),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub(crate) fn leaderboard(&self) -> Leaderboard<'_, S> {
        Leaderboard::new(&self.store, self.config.leaderboard_score_weight)
    }

    /// Parse and register a course from raw GPX bytes, replacing any
    /// cached copy for the key.
    pub async fn upload_course_from_bytes(
        &self,
        event_id: &str,
        event_detail_id: &str,
        bytes: &[u8],
        options: Option<CourseOptions>,
    ) -> Result<CourseSummary, CoreError> {
        require_id("eventId", event_id)?;
        require_id("eventDetailId", event_detail_id)?;

        let track = parse_gpx(bytes)?;
        let options = options.unwrap_or_else(|| self.config.course_options());
        let course = build_course(&track, &options)?;

        let record = self
            .course_cache
            .insert(event_id, event_detail_id, course)
            .await;
        let summary = record.summary();
        info!(
            event_id,
            event_detail_id,
            points = summary.point_count,
            checkpoints = summary.checkpoint_count,
            total_m = summary.total_distance_m,
            "course uploaded"
        );
        Ok(summary)
    }

    /// The course for a key, materialising on demand.
    pub async fn get_course(
        &self,
        event_id: &str,
        event_detail_id: &str,
    ) -> Result<Arc<CourseRecord>, CoreError> {
        require_id("eventId", event_id)?;
        require_id("eventDetailId", event_detail_id)?;

        self.course_cache
            .get(event_id, event_detail_id)
            .await
            .map_err(|e| match e {
                CoreError::CourseUnavailable { reason, .. } => CoreError::NotFound(format!(
                    "course for {event_id}/{event_detail_id}: {reason}"
                )),
                other => other,
            })
    }

    /// Drop everything in the live store. Operational tooling only.
    pub async fn reset_store(&self) -> Result<u64, CoreError> {
        let deleted = with_backoff(
            self.config.store_retry_attempts,
            self.config.store_retry_base_delay,
            || self.store.reset(),
        )
        .await?;
        info!(deleted, "live store reset");
        Ok(deleted)
    }
}

pub(crate) fn require_id(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidInput(format!("missing {field}")));
    }
    Ok(())
}
