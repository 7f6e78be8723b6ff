//! Persistence contracts consumed by the engine, plus two implementations:
//! an in-process arena ([`MemoryCommentStore`]) and SQLite
//! ([`SqliteCommentStore`]).
//!
//! Every step the engine needs to be atomic is a single call here. In
//! particular [`CommentStore::insert_threaded`] reads the scoped floor counter,
//! places the comment and bumps the ancestors' reply counters in one critical
//! section, and [`ReportStore::insert_report`] returns the report count read
//! after its own insert committed.

mod memory;
mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryCommentStore;
pub use sqlite::SqliteCommentStore;

use crate::model::{
    Comment, CommentDraft, CommentId, CommentReport, CommentStatus, CounterDelta,
    FloorBuildingRecord, NewReportInput, OwnerFlag, PageRequest, ReportId, ReportResolution,
    ReportStatus, SensitiveWord, TargetRef, ThreadOrder, UserId,
};

/// Outcome of [`ReportStore::insert_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportInsert {
    /// Stored.
    Created {
        /// The stored report.
        report: CommentReport,
        /// Reports of the comment, this one included.
        report_count: usize,
    },
    /// The reporter already has a pending report on this comment.
    Duplicate,
}

/// Outcome of [`ReportStore::resolve_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportResolve {
    /// The report moved to its terminal state.
    Resolved(CommentReport),
    /// The report already left `pending`; carries its current state.
    AlreadyResolved(CommentReport),
    /// No report has this id.
    NotFound,
}

/// Comment records.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Places and inserts `draft` atomically per scope (target for roots,
    /// parent for replies). Returns `None` when the parent does not exist.
    async fn insert_threaded(&self, draft: CommentDraft) -> Result<Option<Comment>>;

    /// Any status, deleted included.
    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>>;

    /// Root comments of a target whose status is listed. Pinned first.
    async fn list_roots(
        &self,
        target: TargetRef,
        order: ThreadOrder,
        page: PageRequest,
    ) -> Result<Vec<Comment>>;

    /// Direct replies of `parent_id` by ascending sub-floor, listed statuses.
    async fn list_replies(&self, parent_id: CommentId, page: PageRequest) -> Result<Vec<Comment>>;

    /// Comments of an author, newest first, excluding deleted ones.
    async fn list_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Vec<Comment>>;

    /// Every non-deleted comment under a target; input of the hot sweep.
    async fn list_all_by_target(&self, target: TargetRef) -> Result<Vec<Comment>>;

    /// Targets that have at least one comment.
    async fn list_targets(&self) -> Result<Vec<TargetRef>>;

    /// Highest floor under `target`.
    async fn max_floor(&self, target: TargetRef) -> Result<Option<i64>>;

    /// Highest sub-floor under `parent_id`.
    async fn max_sub_floor(&self, parent_id: CommentId) -> Result<Option<i64>>;

    /// Increments counters in place and returns the updated row.
    async fn apply_counters(&self, id: CommentId, delta: CounterDelta) -> Result<Option<Comment>>;

    /// Returns the updated row, `None` when the comment does not exist.
    async fn update_status(
        &self,
        id: CommentId,
        status: CommentStatus,
        now_ms: i64,
    ) -> Result<Option<Comment>>;

    /// Returns how many rows changed.
    async fn batch_update_status(
        &self,
        ids: &[CommentId],
        status: CommentStatus,
        now_ms: i64,
    ) -> Result<usize>;

    /// Moves a `normal` or `auditing` comment to `folded`. Returns whether
    /// this call performed the transition.
    async fn fold_if_visible(&self, id: CommentId, now_ms: i64) -> Result<bool>;

    /// Marks the comment deleted and returns it.
    async fn soft_delete(&self, id: CommentId, now_ms: i64) -> Result<Option<Comment>>;

    /// Hard delete. Returns whether a row existed.
    async fn purge(&self, id: CommentId) -> Result<bool>;

    /// Sets or clears an owner flag and returns the updated row.
    async fn set_owner_flag(
        &self,
        id: CommentId,
        flag: OwnerFlag,
        value: bool,
        now_ms: i64,
    ) -> Result<Option<Comment>>;

    /// Stores the latest popularity and quality scores.
    async fn set_scores(&self, id: CommentId, hot_score: f64, quality_score: f64) -> Result<()>;

    /// Sets the `hot` flag on `ids` and clears it on the rest of the target.
    async fn set_hot_members(&self, target: TargetRef, ids: &[CommentId]) -> Result<()>;
}

/// Comment reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Stores a report unless the reporter already reported the comment.
    async fn insert_report(&self, input: NewReportInput) -> Result<ReportInsert>;

    /// Report by id.
    async fn get_report(&self, id: ReportId) -> Result<Option<CommentReport>>;

    /// Newest first.
    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: usize,
    ) -> Result<Vec<CommentReport>>;

    /// Applies `resolution` only if the report is still pending.
    async fn resolve_report(
        &self,
        id: ReportId,
        resolution: ReportResolution,
    ) -> Result<ReportResolve>;
}

/// Administrator-managed sensitive words.
#[async_trait]
pub trait WordStore: Send + Sync {
    /// Every word, or only the enabled ones.
    async fn list_words(&self, enabled_only: bool) -> Result<Vec<SensitiveWord>>;

    /// Keyed by the case-folded word.
    async fn upsert_word(&self, word: SensitiveWord) -> Result<()>;

    /// Returns whether the word exists.
    async fn set_word_enabled(&self, word: &str, enabled: bool) -> Result<bool>;

    /// Returns whether the word existed.
    async fn delete_word(&self, word: &str) -> Result<bool>;
}

/// Runs of consecutive comments by one author under one target.
#[async_trait]
pub trait FloorBuildingStore: Send + Sync {
    /// Appends `comment_id` to the author's run and ends every other
    /// author's run on the same target.
    async fn record_floor_building(
        &self,
        target: TargetRef,
        author_id: UserId,
        comment_id: CommentId,
        now_ms: i64,
    ) -> Result<FloorBuildingRecord>;

    /// The author's current run under `target`, if any.
    async fn get_floor_building(
        &self,
        target: TargetRef,
        author_id: UserId,
    ) -> Result<Option<FloorBuildingRecord>>;
}

/// Everything the comment service needs from persistence.
pub trait EngineStore: CommentStore + ReportStore + WordStore + FloorBuildingStore {}

impl<T> EngineStore for T where T: CommentStore + ReportStore + WordStore + FloorBuildingStore {}

pub(crate) fn word_key(word: &str) -> String {
    word.trim().to_lowercase()
}
