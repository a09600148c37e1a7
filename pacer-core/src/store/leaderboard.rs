//! The leaderboard engine: one composite score per participant makes
//! the farthest checkpoint dominant over the lower cumulative time.
//!
//! `S = cpIndex · W − cumulativeTime_s`, with the weight `W` at least
//! the maximum feasible race duration in seconds, so that any
//! participant one checkpoint ahead outranks any cumulative time.

use crate::store::{LiveStore, StoreError};

/// Default score weight: 10⁶ seconds, far above any race duration.
pub const DEFAULT_SCORE_WEIGHT: f64 = 1_000_000.0;

/// One decoded leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    /// 1-based display rank.
    pub rank: u32,
    pub user_id: String,
    pub score: f64,
    pub cp_index: i32,
    pub cumulative_time_s: f64,
}

/// A view over one store's leaderboard sorted sets.
pub struct Leaderboard<'a, S: LiveStore> {
    store: &'a S,
    weight: f64,
}

impl<'a, S: LiveStore> Leaderboard<'a, S> {
    pub fn new(store: &'a S, weight: f64) -> Self {
        Self { store, weight }
    }

    /// Encode a checkpoint index and cumulative time into the composite
    /// score. Higher score = better rank.
    pub fn score(&self, cp_index: i32, cumulative_time_s: f64) -> f64 {
        cp_index as f64 * self.weight - cumulative_time_s
    }

    /// Recover `(cp_index, cumulative_time_s)` from a score.
    ///
    /// The ceiling (not the floor) of `S / W` is the checkpoint index:
    /// any non-zero cumulative time pushes the score just below
    /// `cpIndex · W`, so flooring would land one checkpoint short.
    pub fn decode(&self, score: f64) -> (i32, f64) {
        let cp_index = (score / self.weight).ceil() as i32;
        (cp_index, cp_index as f64 * self.weight - score)
    }

    /// Upsert a participant after a checkpoint crossing.
    pub async fn record(
        &self,
        event_detail_id: &str,
        user_id: &str,
        cp_index: i32,
        cumulative_time_s: f64,
    ) -> Result<(), StoreError> {
        let score = self.score(cp_index, cumulative_time_s);
        tracing::debug!(
            user_id = %user_id,
            event_detail_id = %event_detail_id,
            cp_index,
            cumulative_time_s,
            score,
            "leaderboard upsert"
        );
        self.store
            .board_upsert(event_detail_id, user_id, score)
            .await
    }

    /// Best `count` entries with 1-based ranks.
    pub async fn top(
        &self,
        event_detail_id: &str,
        count: usize,
    ) -> Result<Vec<RankedEntry>, StoreError> {
        let entries = self.store.board_top(event_detail_id, count).await?;
        Ok(self.decorate(entries, 0))
    }

    /// 1-based rank of a participant, if they are on the board.
    pub async fn rank(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> Result<Option<u64>, StoreError> {
        let position = self.store.board_rank(event_detail_id, user_id).await?;
        Ok(position.map(|p| p + 1))
    }

    /// Decoded entry for one participant.
    pub async fn entry(
        &self,
        event_detail_id: &str,
        user_id: &str,
    ) -> Result<Option<(i32, f64)>, StoreError> {
        let score = self.store.board_score(event_detail_id, user_id).await?;
        Ok(score.map(|s| self.decode(s)))
    }

    /// Entries around a participant: `before` better-ranked and `after`
    /// worse-ranked neighbours, the participant included. Empty when the
    /// participant is not on the board.
    pub async fn range_around(
        &self,
        event_detail_id: &str,
        user_id: &str,
        before: usize,
        after: usize,
    ) -> Result<Vec<RankedEntry>, StoreError> {
        let Some(position) = self.store.board_rank(event_detail_id, user_id).await? else {
            return Ok(vec![]);
        };
        let start = (position as usize).saturating_sub(before);
        let stop = position as usize + after;
        let entries = self.store.board_range(event_detail_id, start, stop).await?;
        Ok(self.decorate(entries, start))
    }

    fn decorate(&self, entries: Vec<(String, f64)>, first_position: usize) -> Vec<RankedEntry> {
        entries
            .into_iter()
            .enumerate()
            .map(|(offset, (user_id, score))| {
                let (cp_index, cumulative_time_s) = self.decode(score);
                RankedEntry {
                    rank: (first_position + offset) as u32 + 1,
                    user_id,
                    score,
                    cp_index,
                    cumulative_time_s,
                }
            })
            .collect()
    }
}
