//! In-process implementation of [`LiveStore`], used by tests and the
//! simulator. Mirrors the Redis implementation's semantics, including
//! the CAS behaviour of `put_location`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::{LiveStore, ParticipantLocation, SegmentRecord, StoreError, keys};

#[derive(Debug, Default)]
struct Inner {
    locations: HashMap<String, ParticipantLocation>,
    segments: HashMap<String, BTreeMap<String, SegmentRecord>>,
    boards: HashMap<String, HashMap<String, f64>>,
}

/// Single-process live store backed by plain maps. Cheap to clone;
/// clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens when a test thread panicked while
        // holding the guard; propagate the panic there, not here.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LiveStore for MemoryStore {
    async fn get_location(
        &self,
        user_id: &str,
        event_detail_id: &str,
    ) -> Result<Option<ParticipantLocation>, StoreError> {
        let key = keys::location(user_id, event_detail_id);
        Ok(self.lock().locations.get(&key).cloned())
    }

    async fn put_location(
        &self,
        location: &ParticipantLocation,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let key = keys::location(&location.user_id, &location.event_detail_id);
        let mut inner = self.lock();

        let current_version = inner.locations.get(&key).map(|l| l.version).unwrap_or(0);
        if current_version != expected_version {
            return Err(StoreError::Conflict(key));
        }

        let mut stored = location.clone();
        stored.version = expected_version + 1;
        inner.locations.insert(key, stored);
        Ok(())
    }

    async fn segment_records(
        &self,
        user_id: &str,
        event_id: &str,
        event_detail_id: &str,
    ) -> Result<BTreeMap<String, SegmentRecord>, StoreError> {
        let key = keys::segment_records(user_id, event_id, event_detail_id);
        Ok(self.lock().segments.get(&key).cloned().unwrap_or_default())
    }

    async fn put_segment_record(
        &self,
        user_id: &str,
        event_id: &str,
        event_detail_id: &str,
        cp_id: &str,
        record: &SegmentRecord,
    ) -> Result<(), StoreError> {
        let key = keys::segment_records(user_id, event_id, event_detail_id);
        self.lock()
            .segments
            .entry(key)
            .or_default()
            .insert(cp_id.to_string(), *record);
        Ok(())
    }

    async fn board_upsert(
        &self,
        event_detail_id: &str,
        user_id: &str,
        score: f64,
    ) -> Result<(), StoreError> {
        let key = keys::leaderboard(event_detail_id);
        self.lock()
            .boards
            .entry(key)
            .or_default()
            .insert(user_id.to_string(), score);
        Ok(())
    }

    async fn board_top(
        &self,
        event_detail_id: &str,
        count: usize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let mut entries = self.sorted_board(event_detail_id);
        entries.truncate(count);
        Ok(entries)
    }

    async fn board_rank(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> Result<Option<u64>, StoreError> {
        Ok(self
            .sorted_board(event_detail_id)
            .iter()
            .position(|(member, _)| member == user_id)
            .map(|p| p as u64))
    }

    async fn board_score(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> Result<Option<f64>, StoreError> {
        let key = keys::leaderboard(event_detail_id);
        Ok(self
            .lock()
            .boards
            .get(&key)
            .and_then(|board| board.get(user_id).copied()))
    }

    async fn board_range(
        &self,
        event_detail_id: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let entries = self.sorted_board(event_detail_id);
        if start >= entries.len() {
            return Ok(vec![]);
        }
        let stop = stop.min(entries.len() - 1);
        Ok(entries[start..=stop].to_vec())
    }

    async fn reset(&self) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let count = inner.locations.len() + inner.segments.len() + inner.boards.len();
        inner.locations.clear();
        inner.segments.clear();
        inner.boards.clear();
        Ok(count as u64)
    }
}

impl MemoryStore {
    /// Board entries in descending score order; ties break on member id
    /// for deterministic output.
    fn sorted_board(&self, event_detail_id: &str) -> Vec<(String, f64)> {
        let key = keys::leaderboard(event_detail_id);
        let mut entries: Vec<(String, f64)> = self
            .lock()
            .boards
            .get(&key)
            .map(|board| board.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_location(user_id: &str) -> ParticipantLocation {
        ParticipantLocation {
            user_id: user_id.to_string(),
            event_id: "ev1".to_string(),
            event_detail_id: "full".to_string(),
            raw_lat: 37.5663,
            raw_lon: 126.9779,
            raw_altitude: None,
            raw_accuracy: Some(8.0),
            raw_speed: None,
            raw_time_epoch_s: 1_722_500_000.0,
            corrected_lat: 37.5663,
            corrected_lon: 126.9779,
            corrected_altitude: None,
            heading_deg: 0.0,
            distance_covered_m: 0.0,
            cumulative_time_s: 0.0,
            race_start_epoch_s: Some(1_722_500_000.0),
            last_updated_epoch_s: 1_722_500_000.0,
            farthest_cp_id: Some("START".to_string()),
            farthest_cp_index: Some(0),
            cumulative_time_at_farthest_cp_s: Some(0.0),
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_location_cas_create_and_update() {
        let store = MemoryStore::new();
        let location = sample_location("u1");

        store.put_location(&location, 0).await.unwrap();
        let stored = store.get_location("u1", "full").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);

        store.put_location(&stored, 1).await.unwrap();
        let stored = store.get_location("u1", "full").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_location_cas_conflict_on_stale_version() {
        let store = MemoryStore::new();
        let location = sample_location("u1");
        store.put_location(&location, 0).await.unwrap();

        // A writer that still believes version 0 must be rejected
        let err = store.put_location(&location, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_requires_absent_record() {
        let store = MemoryStore::new();
        let location = sample_location("u1");
        // Expecting version 3 of a record that does not exist
        let err = store.put_location(&location, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_segment_records_accumulate() {
        let store = MemoryStore::new();
        let start = SegmentRecord {
            segment_duration_s: 0.0,
            cumulative_time_s: 0.0,
        };
        let cp1 = SegmentRecord {
            segment_duration_s: 310.0,
            cumulative_time_s: 310.0,
        };
        store
            .put_segment_record("u1", "ev1", "full", "START", &start)
            .await
            .unwrap();
        store
            .put_segment_record("u1", "ev1", "full", "CP1", &cp1)
            .await
            .unwrap();

        let records = store.segment_records("u1", "ev1", "full").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["CP1"], cp1);
    }

    #[tokio::test]
    async fn test_board_ordering_and_rank() {
        let store = MemoryStore::new();
        store.board_upsert("full", "a", 2_999_100.0).await.unwrap();
        store.board_upsert("full", "b", 1_999_200.0).await.unwrap();
        store.board_upsert("full", "c", 1_999_150.0).await.unwrap();

        let top = store.board_top("full", 2).await.unwrap();
        assert_eq!(top[0].0, "a");
        assert_eq!(top[1].0, "b");

        assert_eq!(store.board_rank("full", "c").await.unwrap(), Some(2));
        assert_eq!(store.board_rank("full", "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_board_range_clamps() {
        let store = MemoryStore::new();
        store.board_upsert("full", "a", 3.0).await.unwrap();
        store.board_upsert("full", "b", 2.0).await.unwrap();

        let range = store.board_range("full", 1, 10).await.unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range[0].0, "b");

        assert!(store.board_range("full", 5, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = MemoryStore::new();
        store
            .put_location(&sample_location("u1"), 0)
            .await
            .unwrap();
        store.board_upsert("full", "u1", 0.0).await.unwrap();

        let deleted = store.reset().await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get_location("u1", "full").await.unwrap().is_none());
    }
}
