//! The course cache: materialise on demand from the recorded GPX URL,
//! serve hot for the TTL, coalesce concurrent misses per key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use pacer_contracts::CourseSummary;
use pacer_course::{Course, CourseOptions, build_course, parse_gpx};

use crate::course::fetch::GpxFetcher;
use crate::db;
use crate::error::CoreError;

/// A materialised course plus its identity.
#[derive(Debug, Clone)]
pub struct CourseRecord {
    pub event_id: String,
    pub event_detail_id: String,
    pub course: Course,
    pub created_at: DateTime<Utc>,
}

impl CourseRecord {
    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            event_id: self.event_id.clone(),
            event_detail_id: self.event_detail_id.clone(),
            total_distance_m: self.course.total_distance_m,
            point_count: self.course.points.len(),
            checkpoint_count: self.course.checkpoint_count(),
        }
    }
}

type CourseKey = (String, String);

struct CachedEntry {
    record: Arc<CourseRecord>,
    loaded_at: Instant,
}

/// Per-key slots keep materialisation single-flighted: concurrent
/// misses on one course run the GPX pipeline once, while other courses
/// proceed independently.
pub struct CourseCache<F: GpxFetcher> {
    pool: SqlitePool,
    fetcher: F,
    options: CourseOptions,
    ttl: Duration,
    slots: Mutex<HashMap<CourseKey, Arc<AsyncMutex<Option<CachedEntry>>>>>,
}

impl<F: GpxFetcher> CourseCache<F> {
    pub fn new(pool: SqlitePool, fetcher: F, options: CourseOptions, ttl: Duration) -> Self {
        Self {
            pool,
            fetcher,
            options,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the course for `(event_id, event_detail_id)`, loading it
    /// if the cache has no fresh copy.
    pub async fn get(
        &self,
        event_id: &str,
        event_detail_id: &str,
    ) -> Result<Arc<CourseRecord>, CoreError> {
        let slot = self.slot(event_id, event_detail_id);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.loaded_at.elapsed() < self.ttl {
                return Ok(entry.record.clone());
            }
        }

        let record = self.materialize(event_id, event_detail_id).await?;
        *guard = Some(CachedEntry {
            record: record.clone(),
            loaded_at: Instant::now(),
        });
        Ok(record)
    }

    /// Store an explicitly built course (the upload path), replacing
    /// whatever the cache held for the key.
    pub async fn insert(
        &self,
        event_id: &str,
        event_detail_id: &str,
        course: Course,
    ) -> Arc<CourseRecord> {
        let record = Arc::new(CourseRecord {
            event_id: event_id.to_string(),
            event_detail_id: event_detail_id.to_string(),
            course,
            created_at: Utc::now(),
        });

        let slot = self.slot(event_id, event_detail_id);
        let mut guard = slot.lock().await;
        *guard = Some(CachedEntry {
            record: record.clone(),
            loaded_at: Instant::now(),
        });
        record
    }

    /// Drop the cached copy so the next `get` rebuilds it.
    pub async fn invalidate(&self, event_id: &str, event_detail_id: &str) {
        let slot = self.slot(event_id, event_detail_id);
        let mut guard = slot.lock().await;
        *guard = None;
    }

    fn slot(&self, event_id: &str, event_detail_id: &str) -> Arc<AsyncMutex<Option<CachedEntry>>> {
        let key = (event_id.to_string(), event_detail_id.to_string());
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key).or_default().clone()
    }

    async fn materialize(
        &self,
        event_id: &str,
        event_detail_id: &str,
    ) -> Result<Arc<CourseRecord>, CoreError> {
        let unavailable = |reason: String| CoreError::CourseUnavailable {
            event_id: event_id.to_string(),
            event_detail_id: event_detail_id.to_string(),
            reason,
        };

        let url = db::queries::events::gpx_url(&self.pool, event_id, event_detail_id)
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .ok_or_else(|| unavailable("no gpx file recorded".to_string()))?;

        let bytes = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let track = parse_gpx(&bytes).map_err(|e| {
            warn!(event_id, event_detail_id, error = %e, "course gpx failed to parse");
            unavailable(e.to_string())
        })?;
        let course = build_course(&track, &self.options).map_err(|e| unavailable(e.to_string()))?;

        info!(
            event_id,
            event_detail_id,
            points = course.points.len(),
            checkpoints = course.checkpoint_count(),
            total_m = course.total_distance_m,
            "course materialised"
        );

        Ok(Arc::new(CourseRecord {
            event_id: event_id.to_string(),
            event_detail_id: event_detail_id.to_string(),
            course,
            created_at: Utc::now(),
        }))
    }
}
