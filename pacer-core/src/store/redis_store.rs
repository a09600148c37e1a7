//! Redis implementation of [`LiveStore`].
//!
//! Location records are JSON strings guarded by a Lua compare-and-set
//! on the embedded `version` field, segment records are hash entries,
//! leaderboards are native sorted sets. Everything the correction path
//! touches is a single-key server-side atomic operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use super::{LiveStore, ParticipantLocation, SegmentRecord, StoreError, keys};

/// CAS write of a location record. ARGV[1] = expected version
/// (0 = create), ARGV[2] = new JSON payload. Returns 1 when applied.
const LOCATION_CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
local expected = tonumber(ARGV[1])
if current == false then
  if expected == 0 then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
  end
  return 0
end
local version = cjson.decode(current)['version']
if version == expected then
  redis.call('SET', KEYS[1], ARGV[2])
  return 1
end
return 0
"#;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    cas_script: Arc<Script>,
}

impl RedisStore {
    /// Connect to Redis, e.g. `redis://127.0.0.1:6379/0`. The
    /// connection manager reconnects on its own after transient drops.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(StoreError::from)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(StoreError::from)?;
        Ok(Self {
            conn,
            cas_script: Arc::new(Script::new(LOCATION_CAS_SCRIPT)),
        })
    }

    fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

impl LiveStore for RedisStore {
    async fn get_location(
        &self,
        user_id: &str,
        event_detail_id: &str,
    ) -> Result<Option<ParticipantLocation>, StoreError> {
        let key = keys::location(user_id, event_detail_id);
        let mut conn = self.connection();
        let raw: Option<String> = conn.get(&key).await?;
        match raw {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { key, source }),
        }
    }

    async fn put_location(
        &self,
        location: &ParticipantLocation,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let key = keys::location(&location.user_id, &location.event_detail_id);

        let mut stored = location.clone();
        stored.version = expected_version + 1;
        let payload = serde_json::to_string(&stored).map_err(|source| StoreError::Corrupt {
            key: key.clone(),
            source,
        })?;

        let mut conn = self.connection();
        let applied: i64 = self
            .cas_script
            .key(&key)
            .arg(expected_version)
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;

        if applied == 1 {
            Ok(())
        } else {
            Err(StoreError::Conflict(key))
        }
    }

    async fn segment_records(
        &self,
        user_id: &str,
        event_id: &str,
        event_detail_id: &str,
    ) -> Result<BTreeMap<String, SegmentRecord>, StoreError> {
        let key = keys::segment_records(user_id, event_id, event_detail_id);
        let mut conn = self.connection();
        let raw: HashMap<String, String> = conn.hgetall(&key).await?;

        let mut records = BTreeMap::new();
        for (cp_id, json) in raw {
            let record = serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
                key: key.clone(),
                source,
            })?;
            records.insert(cp_id, record);
        }
        Ok(records)
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
        let payload = serde_json::to_string(record).map_err(|source| StoreError::Corrupt {
            key: key.clone(),
            source,
        })?;
        let mut conn = self.connection();
        let _: () = conn.hset(&key, cp_id, payload).await?;
        Ok(())
    }

    async fn board_upsert(
        &self,
        event_detail_id: &str,
        user_id: &str,
        score: f64,
    ) -> Result<(), StoreError> {
        let key = keys::leaderboard(event_detail_id);
        let mut conn = self.connection();
        let _: () = conn.zadd(&key, user_id, score).await?;
        Ok(())
    }

    async fn board_top(
        &self,
        event_detail_id: &str,
        count: usize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        if count == 0 {
            return Ok(vec![]);
        }
        let key = keys::leaderboard(event_detail_id);
        let mut conn = self.connection();
        let entries: Vec<(String, f64)> = conn
            .zrevrange_withscores(&key, 0, count as isize - 1)
            .await?;
        Ok(entries)
    }

    async fn board_rank(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> Result<Option<u64>, StoreError> {
        let key = keys::leaderboard(event_detail_id);
        let mut conn = self.connection();
        let rank: Option<u64> = conn.zrevrank(&key, user_id).await?;
        Ok(rank)
    }

    async fn board_score(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> Result<Option<f64>, StoreError> {
        let key = keys::leaderboard(event_detail_id);
        let mut conn = self.connection();
        let score: Option<f64> = conn.zscore(&key, user_id).await?;
        Ok(score)
    }

    async fn board_range(
        &self,
        event_detail_id: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let key = keys::leaderboard(event_detail_id);
        let mut conn = self.connection();
        let entries: Vec<(String, f64)> = conn
            .zrevrange_withscores(&key, start as isize, stop as isize)
            .await?;
        Ok(entries)
    }

    async fn reset(&self) -> Result<u64, StoreError> {
        let mut deleted = 0u64;
        for pattern in keys::FAMILY_PATTERNS {
            let matched: Vec<String> = {
                let mut scan_conn = self.connection();
                let mut iter: redis::AsyncIter<'_, String> =
                    scan_conn.scan_match(pattern).await?;
                let mut matched = Vec::new();
                while let Some(key) = iter.next_item().await {
                    matched.push(key);
                }
                matched
            };

            if !matched.is_empty() {
                let mut conn = self.connection();
                let n: u64 = conn.del(&matched).await?;
                deleted += n;
            }
        }
        Ok(deleted)
    }
}
