//! Time-decayed popularity scoring and per-target hot rankings.
//!
//! `hot_score` is pure. [`ScoreEngine`] applies it to stored comments, both
//! right after interaction events and in a periodic sweep that rebuilds the
//! top-K snapshot of each target and swaps it in whole.

use std::{cmp::Ordering, sync::Arc};

use anyhow::Result;
use dashmap::DashMap;
use serde::Serialize;

use crate::{
    model::{Comment, CommentId, CommentStatus, TargetRef},
    store::CommentStore,
};

const LIKE_WEIGHT: f64 = 0.6;
const DISLIKE_WEIGHT: f64 = 0.1;
const REPLY_WEIGHT: f64 = 0.3;
const DECAY_HOURS: f64 = 24.0;
const DECAY_SCALE: f64 = 10.0;
const POPULAR_LIKES: i64 = 100;
const POPULAR_MULTIPLIER: f64 = 1.2;
const AUTHOR_MULTIPLIER: f64 = 1.3;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Inputs of the popularity formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    /// Likes received.
    pub like_count: i64,
    /// Dislikes received.
    pub dislike_count: i64,
    /// Replies in the thread.
    pub reply_count: i64,
    /// Written by the owner of the target.
    pub author_authored: bool,
    /// Creation time in ms; `<= 0` means unknown.
    pub created_at: i64,
}

impl ScoreInput {
    /// Roots count every reply under them, replies count their direct ones.
    pub fn from_comment(comment: &Comment) -> Self {
        let reply_count = if comment.is_root() {
            comment.counters.total_reply_count
        } else {
            comment.counters.direct_reply_count
        };
        Self {
            like_count: comment.counters.like_count,
            dislike_count: comment.counters.dislike_count,
            reply_count,
            author_authored: comment.flags.author_authored,
            created_at: comment.created_at,
        }
    }
}

/// Popularity at `now_ms`, or `None` when the creation time is unknown.
pub fn hot_score(input: &ScoreInput, now_ms: i64) -> Option<f64> {
    if input.created_at <= 0 {
        return None;
    }
    let base = input.like_count as f64 * LIKE_WEIGHT
        - input.dislike_count as f64 * DISLIKE_WEIGHT
        + input.reply_count as f64 * REPLY_WEIGHT;
    // Clock skew must not turn decay into growth.
    let hours = (now_ms - input.created_at).max(0) as f64 / MS_PER_HOUR;
    let mut score = base * (-hours / DECAY_HOURS).exp() * DECAY_SCALE;
    if input.like_count > POPULAR_LIKES {
        score *= POPULAR_MULTIPLIER;
    }
    if input.author_authored {
        score *= AUTHOR_MULTIPLIER;
    }
    Some(score)
}

/// Laplace-smoothed approval ratio on a 0..100 scale.
pub fn quality_score(like_count: i64, dislike_count: i64) -> f64 {
    let likes = like_count.max(0) as f64;
    let dislikes = dislike_count.max(0) as f64;
    (likes + 1.0) / (likes + dislikes + 2.0) * 100.0
}

/// One ranked comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotEntry {
    /// Ranked root comment.
    pub comment_id: CommentId,
    /// Score at snapshot time.
    pub hot_score: f64,
    /// Floor of the comment.
    pub floor_number: i64,
}

/// Ranking of one target as of `generated_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotSnapshot {
    /// Ranked target.
    pub target: TargetRef,
    /// Highest scores first, at most `top_k` entries.
    pub entries: Vec<HotEntry>,
    /// Snapshot time in milliseconds.
    pub generated_at: i64,
}

/// Counts of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Comments whose score was stored.
    pub scored: usize,
    /// Comments without a creation time; they keep their previous score.
    pub skipped: usize,
    /// Comments whose score could not be stored.
    pub failed: usize,
}

impl SweepReport {
    fn absorb(&mut self, other: SweepReport) {
        self.scored += other.scored;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Scores comments and keeps the latest hot snapshot of every swept target.
pub struct ScoreEngine {
    top_k: usize,
    snapshots: DashMap<TargetRef, Arc<HotSnapshot>>,
}

impl ScoreEngine {
    /// Engine keeping `top_k` entries per snapshot; at least one.
    pub fn new(top_k: usize) -> Self {
        Self { top_k: top_k.max(1), snapshots: DashMap::new() }
    }

    /// Size of each snapshot.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Recomputes and stores the scores of one comment. Returns the new hot
    /// score, or `None` when the comment is gone or cannot be scored.
    pub async fn rescore_comment<S>(
        &self,
        store: &S,
        id: CommentId,
        now_ms: i64,
    ) -> Result<Option<f64>>
    where
        S: CommentStore + ?Sized,
    {
        let Some(comment) = store.get_comment(id).await? else {
            return Ok(None);
        };
        self.rescore_loaded(store, &comment, now_ms).await
    }

    /// Like [`ScoreEngine::rescore_comment`] for a row the caller already holds.
    pub async fn rescore_loaded<S>(
        &self,
        store: &S,
        comment: &Comment,
        now_ms: i64,
    ) -> Result<Option<f64>>
    where
        S: CommentStore + ?Sized,
    {
        let Some(score) = hot_score(&ScoreInput::from_comment(comment), now_ms) else {
            tracing::warn!("skip scoring comment {}: missing creation time", comment.id);
            return Ok(None);
        };
        let quality = quality_score(comment.counters.like_count, comment.counters.dislike_count);
        store.set_scores(comment.id, score, quality).await?;
        Ok(Some(score))
    }

    /// Rescores every comment of `target` one by one, then rebuilds and swaps
    /// its hot snapshot and flags its members.
    pub async fn sweep_target<S>(
        &self,
        store: &S,
        target: TargetRef,
        now_ms: i64,
    ) -> Result<SweepReport>
    where
        S: CommentStore + ?Sized,
    {
        let comments = store.list_all_by_target(target).await?;
        let mut report = SweepReport::default();
        let mut ranked = Vec::with_capacity(comments.len());

        for comment in &comments {
            let Some(score) = hot_score(&ScoreInput::from_comment(comment), now_ms) else {
                report.skipped += 1;
                tracing::warn!("sweep skipped comment {}: missing creation time", comment.id);
                if comment.status == CommentStatus::Normal {
                    ranked.push(entry(comment, comment.hot_score));
                }
                continue;
            };
            let counters = &comment.counters;
            let quality = quality_score(counters.like_count, counters.dislike_count);
            if let Err(err) = store.set_scores(comment.id, score, quality).await {
                report.failed += 1;
                tracing::error!("sweep failed to store score of comment {}: {err:#}", comment.id);
                continue;
            }
            report.scored += 1;
            if comment.status == CommentStatus::Normal {
                ranked.push(entry(comment, score));
            }
        }

        ranked.sort_by(rank_order);
        ranked.truncate(self.top_k);
        let member_ids: Vec<CommentId> = ranked.iter().map(|hot| hot.comment_id).collect();
        store.set_hot_members(target, &member_ids).await?;

        self.snapshots.insert(
            target,
            Arc::new(HotSnapshot { target, entries: ranked, generated_at: now_ms }),
        );
        tracing::debug!(
            "hot sweep {target}: scored={} skipped={} failed={}",
            report.scored,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Sweeps every target known to the store. A target whose sweep fails is
    /// logged and left with its previous snapshot.
    pub async fn sweep_all<S>(&self, store: &S, now_ms: i64) -> Result<SweepReport>
    where
        S: CommentStore + ?Sized,
    {
        let mut total = SweepReport::default();
        for target in store.list_targets().await? {
            match self.sweep_target(store, target, now_ms).await {
                Ok(report) => total.absorb(report),
                Err(err) => tracing::error!("hot sweep of {target} failed: {err:#}"),
            }
        }
        Ok(total)
    }

    /// Last swapped ranking of `target`, if it was ever swept.
    pub fn hot_snapshot(&self, target: TargetRef) -> Option<Arc<HotSnapshot>> {
        self.snapshots.get(&target).map(|snapshot| Arc::clone(snapshot.value()))
    }
}

fn entry(comment: &Comment, hot_score: f64) -> HotEntry {
    HotEntry { comment_id: comment.id, hot_score, floor_number: comment.floor_number }
}

fn rank_order(left: &HotEntry, right: &HotEntry) -> Ordering {
    right
        .hot_score
        .total_cmp(&left.hot_score)
        .then(left.floor_number.cmp(&right.floor_number))
        .then(left.comment_id.cmp(&right.comment_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{AuditStatus, CommentDraft, ContentKind, CounterDelta, RiskLevel, TargetKind},
        store::MemoryCommentStore,
    };

    const HOUR_MS: i64 = 3_600_000;
    const T0: i64 = 1_700_000_000_000;

    fn input(like_count: i64, dislike_count: i64, reply_count: i64) -> ScoreInput {
        ScoreInput {
            like_count,
            dislike_count,
            reply_count,
            author_authored: false,
            created_at: T0,
        }
    }

    fn draft(target: TargetRef, created_at: i64) -> CommentDraft {
        CommentDraft {
            target,
            author_id: 1,
            parent_id: 0,
            reply_to_user_id: None,
            reply_to_comment_id: None,
            content: "ranking candidate".to_string(),
            content_kind: ContentKind::Text,
            status: CommentStatus::Normal,
            audit_status: AuditStatus::Approved,
            risk_level: RiskLevel::Normal,
            author_authored: false,
            created_at,
        }
    }

    #[test]
    fn score_strictly_decreases_with_age() {
        let fixed = input(10, 2, 4);
        let mut previous = f64::INFINITY;
        for hours in [0, 1, 6, 24, 48, 96] {
            let score = hot_score(&fixed, T0 + hours * HOUR_MS).unwrap_or(f64::NAN);
            assert!(score < previous, "score at {hours}h did not decrease");
            previous = score;
        }
    }

    #[test]
    fn fresh_score_matches_formula() {
        let score = hot_score(&input(10, 2, 4), T0).unwrap_or_default();
        // (6.0 - 0.2 + 1.2) * 10
        assert!((score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn multipliers_compound_in_order() {
        let mut popular = input(101, 0, 0);
        let plain = hot_score(&popular, T0).unwrap_or_default();
        assert!((plain - 101.0 * 0.6 * 10.0 * 1.2).abs() < 1e-9);

        popular.author_authored = true;
        let authored = hot_score(&popular, T0).unwrap_or_default();
        assert!((authored - plain * 1.3).abs() < 1e-9);
    }

    #[test]
    fn missing_creation_time_cannot_be_scored() {
        let mut unknown = input(5, 0, 0);
        unknown.created_at = 0;
        assert_eq!(hot_score(&unknown, T0), None);
    }

    #[test]
    fn quality_is_smoothed() {
        assert_eq!(quality_score(0, 0), 50.0);
        assert!(quality_score(9, 0) > 90.0);
        assert!(quality_score(0, 9) < 10.0);
    }

    #[tokio::test]
    async fn sweep_swaps_top_k_and_flags_members() -> Result<()> {
        let store = MemoryCommentStore::new();
        let target = TargetRef::new(TargetKind::Article, 42);
        let mut ids = Vec::new();
        for likes in [1, 9, 4] {
            let comment = store
                .insert_threaded(draft(target, T0))
                .await?
                .ok_or_else(|| anyhow::anyhow!("insert failed"))?;
            store.apply_counters(comment.id, CounterDelta { like: likes, dislike: 0 }).await?;
            ids.push(comment.id);
        }
        let legacy = store
            .insert_threaded(draft(target, 0))
            .await?
            .ok_or_else(|| anyhow::anyhow!("insert failed"))?;

        let engine = ScoreEngine::new(2);
        let report = engine.sweep_target(&store, target, T0 + HOUR_MS).await?;
        assert_eq!(report, SweepReport { scored: 3, skipped: 1, failed: 0 });

        let snapshot = engine.hot_snapshot(target).ok_or_else(|| anyhow::anyhow!("no snapshot"))?;
        let ranked: Vec<_> = snapshot.entries.iter().map(|hot| hot.comment_id).collect();
        assert_eq!(ranked, vec![ids[1], ids[2]]);

        let top = store.get_comment(ids[1]).await?.ok_or_else(|| anyhow::anyhow!("gone"))?;
        let low = store.get_comment(ids[0]).await?.ok_or_else(|| anyhow::anyhow!("gone"))?;
        assert!(top.flags.hot);
        assert!(!low.flags.hot);
        assert!(top.quality_score > low.quality_score);

        let legacy = store.get_comment(legacy.id).await?.ok_or_else(|| anyhow::anyhow!("gone"))?;
        assert_eq!(legacy.hot_score, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn rescore_of_missing_comment_is_none() -> Result<()> {
        let store = MemoryCommentStore::new();
        let engine = ScoreEngine::new(10);
        assert_eq!(engine.rescore_comment(&store, 404, T0).await?, None);
        assert!(engine.hot_snapshot(TargetRef::new(TargetKind::Qa, 1)).is_none());
        Ok(())
    }
}
