use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    word_key, CommentStore, FloorBuildingStore, ReportInsert, ReportResolve, ReportStore,
    WordStore,
};
use crate::{
    model::{
        Comment, CommentDraft, CommentId, CommentReport, CommentStatus, CounterDelta,
        FloorBuildingRecord, NewReportInput, OwnerFlag, PageRequest, ReportId, ReportResolution,
        ReportStatus, SensitiveWord, TargetRef, ThreadOrder, UserId,
    },
    thread_builder,
};

#[derive(Default)]
struct MemoryState {
    last_comment_id: CommentId,
    comments: BTreeMap<CommentId, Comment>,
    floor_counters: HashMap<TargetRef, i64>,
    sub_floor_counters: HashMap<CommentId, i64>,
    last_report_id: ReportId,
    reports: BTreeMap<ReportId, CommentReport>,
    words: BTreeMap<String, SensitiveWord>,
    floor_building: HashMap<(TargetRef, UserId), FloorBuildingRecord>,
}

/// In-process store. One lock guards all state, so every call is atomic.
#[derive(Default)]
pub struct MemoryCommentStore {
    state: RwLock<MemoryState>,
}

impl MemoryCommentStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored comments, deleted ones included.
    pub fn comment_count(&self) -> usize {
        self.state.read().comments.len()
    }
}

fn sort_roots(rows: &mut [Comment], order: ThreadOrder) {
    rows.sort_by(|left, right| {
        right.flags.pinned.cmp(&left.flags.pinned).then_with(|| match order {
            ThreadOrder::Floor => left.floor_number.cmp(&right.floor_number),
            ThreadOrder::Hot => right
                .hot_score
                .total_cmp(&left.hot_score)
                .then_with(|| left.floor_number.cmp(&right.floor_number)),
            ThreadOrder::Newest => right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id)),
        })
    });
}

fn paginate(rows: Vec<Comment>, page: PageRequest) -> Vec<Comment> {
    rows.into_iter()
        .skip(page.offset())
        .take(page.limit())
        .collect()
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert_threaded(&self, draft: CommentDraft) -> Result<Option<Comment>> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let position = if draft.parent_id == 0 {
            let counter = state.floor_counters.entry(draft.target).or_insert(0);
            let position = thread_builder::root_position(Some(*counter));
            *counter = position.floor_number;
            position
        } else {
            let Some(parent) = state.comments.get(&draft.parent_id) else {
                return Ok(None);
            };
            let counter = state.sub_floor_counters.entry(parent.id).or_insert(0);
            let position = thread_builder::reply_position(parent, Some(*counter));
            *counter = position.sub_floor_number;
            position
        };

        state.last_comment_id += 1;
        let comment = thread_builder::assemble(state.last_comment_id, draft, position);

        if !comment.is_root() {
            if let Some(parent) = state.comments.get_mut(&comment.parent_id) {
                parent.counters.direct_reply_count += 1;
            }
            if let Some(root) = state.comments.get_mut(&comment.root_id) {
                root.counters.total_reply_count += 1;
            }
        }

        state.comments.insert(comment.id, comment.clone());
        Ok(Some(comment))
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.state.read().comments.get(&id).cloned())
    }

    async fn list_roots(
        &self,
        target: TargetRef,
        order: ThreadOrder,
        page: PageRequest,
    ) -> Result<Vec<Comment>> {
        let mut rows: Vec<Comment> = self
            .state
            .read()
            .comments
            .values()
            .filter(|row| row.target == target && row.is_root() && row.status.is_listed())
            .cloned()
            .collect();
        sort_roots(&mut rows, order);
        Ok(paginate(rows, page))
    }

    async fn list_replies(&self, parent_id: CommentId, page: PageRequest) -> Result<Vec<Comment>> {
        let mut rows: Vec<Comment> = self
            .state
            .read()
            .comments
            .values()
            .filter(|row| row.parent_id == parent_id && parent_id != 0 && row.status.is_listed())
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.sub_floor_number);
        Ok(paginate(rows, page))
    }

    async fn list_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Vec<Comment>> {
        let mut rows: Vec<Comment> = self
            .state
            .read()
            .comments
            .values()
            .filter(|row| row.author_id == user_id && row.status != CommentStatus::Deleted)
            .cloned()
            .collect();
        rows.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(paginate(rows, page))
    }

    async fn list_all_by_target(&self, target: TargetRef) -> Result<Vec<Comment>> {
        Ok(self
            .state
            .read()
            .comments
            .values()
            .filter(|row| row.target == target && row.status != CommentStatus::Deleted)
            .cloned()
            .collect())
    }

    async fn list_targets(&self) -> Result<Vec<TargetRef>> {
        let mut targets: Vec<TargetRef> =
            self.state.read().comments.values().map(|row| row.target).collect();
        targets.sort();
        targets.dedup();
        Ok(targets)
    }

    async fn max_floor(&self, target: TargetRef) -> Result<Option<i64>> {
        Ok(self
            .state
            .read()
            .comments
            .values()
            .filter(|row| row.target == target && row.is_root())
            .map(|row| row.floor_number)
            .max())
    }

    async fn max_sub_floor(&self, parent_id: CommentId) -> Result<Option<i64>> {
        Ok(self
            .state
            .read()
            .comments
            .values()
            .filter(|row| row.parent_id == parent_id && parent_id != 0)
            .map(|row| row.sub_floor_number)
            .max())
    }

    async fn apply_counters(&self, id: CommentId, delta: CounterDelta) -> Result<Option<Comment>> {
        let mut state = self.state.write();
        Ok(state.comments.get_mut(&id).map(|row| {
            row.counters.apply(delta);
            row.clone()
        }))
    }

    async fn update_status(
        &self,
        id: CommentId,
        status: CommentStatus,
        now_ms: i64,
    ) -> Result<Option<Comment>> {
        let mut state = self.state.write();
        Ok(state.comments.get_mut(&id).map(|row| {
            row.status = status;
            row.updated_at = now_ms;
            row.clone()
        }))
    }

    async fn batch_update_status(
        &self,
        ids: &[CommentId],
        status: CommentStatus,
        now_ms: i64,
    ) -> Result<usize> {
        let mut state = self.state.write();
        let mut changed = 0;
        for id in ids {
            if let Some(row) = state.comments.get_mut(id) {
                if row.status != status {
                    row.status = status;
                    row.updated_at = now_ms;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn fold_if_visible(&self, id: CommentId, now_ms: i64) -> Result<bool> {
        let mut state = self.state.write();
        match state.comments.get_mut(&id) {
            Some(row) if matches!(row.status, CommentStatus::Normal | CommentStatus::Auditing) => {
                row.status = CommentStatus::Folded;
                row.updated_at = now_ms;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn soft_delete(&self, id: CommentId, now_ms: i64) -> Result<Option<Comment>> {
        let mut state = self.state.write();
        Ok(state.comments.get_mut(&id).map(|row| {
            if row.status != CommentStatus::Deleted {
                row.status = CommentStatus::Deleted;
                row.deleted_at = Some(now_ms);
                row.updated_at = now_ms;
            }
            row.clone()
        }))
    }

    async fn purge(&self, id: CommentId) -> Result<bool> {
        Ok(self.state.write().comments.remove(&id).is_some())
    }

    async fn set_owner_flag(
        &self,
        id: CommentId,
        flag: OwnerFlag,
        value: bool,
        now_ms: i64,
    ) -> Result<Option<Comment>> {
        let mut state = self.state.write();
        Ok(state.comments.get_mut(&id).map(|row| {
            match flag {
                OwnerFlag::Pinned => row.flags.pinned = value,
                OwnerFlag::Featured => row.flags.featured = value,
            }
            row.updated_at = now_ms;
            row.clone()
        }))
    }

    async fn set_scores(&self, id: CommentId, hot_score: f64, quality_score: f64) -> Result<()> {
        if let Some(row) = self.state.write().comments.get_mut(&id) {
            row.hot_score = hot_score;
            row.quality_score = quality_score;
        }
        Ok(())
    }

    async fn set_hot_members(&self, target: TargetRef, ids: &[CommentId]) -> Result<()> {
        let mut state = self.state.write();
        for row in state.comments.values_mut().filter(|row| row.target == target) {
            row.flags.hot = ids.contains(&row.id);
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryCommentStore {
    async fn insert_report(&self, input: NewReportInput) -> Result<ReportInsert> {
        let mut state = self.state.write();
        let duplicate = state.reports.values().any(|report| {
            report.comment_id == input.comment_id
                && report.reporter_id == input.reporter_id
                && report.status == ReportStatus::Pending
        });
        if duplicate {
            return Ok(ReportInsert::Duplicate);
        }

        state.last_report_id += 1;
        let report = CommentReport {
            id: state.last_report_id,
            comment_id: input.comment_id,
            reporter_id: input.reporter_id,
            reason: input.reason,
            description: input.description,
            status: ReportStatus::Pending,
            handler_id: None,
            handled_at: None,
            handle_result: None,
            created_at: input.created_at,
        };
        state.reports.insert(report.id, report.clone());
        let report_count = state
            .reports
            .values()
            .filter(|row| row.comment_id == report.comment_id)
            .count();
        Ok(ReportInsert::Created { report, report_count })
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<CommentReport>> {
        Ok(self.state.read().reports.get(&id).cloned())
    }

    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: usize,
    ) -> Result<Vec<CommentReport>> {
        Ok(self
            .state
            .read()
            .reports
            .values()
            .rev()
            .filter(|report| status.map_or(true, |status| report.status == status))
            .take(limit.max(1))
            .cloned()
            .collect())
    }

    async fn resolve_report(
        &self,
        id: ReportId,
        resolution: ReportResolution,
    ) -> Result<ReportResolve> {
        let mut state = self.state.write();
        let Some(report) = state.reports.get_mut(&id) else {
            return Ok(ReportResolve::NotFound);
        };
        if report.status != ReportStatus::Pending {
            return Ok(ReportResolve::AlreadyResolved(report.clone()));
        }
        report.status = resolution.status;
        report.handler_id = Some(resolution.handler_id);
        report.handled_at = Some(resolution.handled_at);
        report.handle_result = resolution.handle_result;
        Ok(ReportResolve::Resolved(report.clone()))
    }
}

#[async_trait]
impl WordStore for MemoryCommentStore {
    async fn list_words(&self, enabled_only: bool) -> Result<Vec<SensitiveWord>> {
        Ok(self
            .state
            .read()
            .words
            .values()
            .filter(|word| !enabled_only || word.enabled)
            .cloned()
            .collect())
    }

    async fn upsert_word(&self, word: SensitiveWord) -> Result<()> {
        let key = word_key(&word.word);
        if key.is_empty() {
            anyhow::bail!("sensitive word cannot be blank");
        }
        self.state.write().words.insert(key, word);
        Ok(())
    }

    async fn set_word_enabled(&self, word: &str, enabled: bool) -> Result<bool> {
        let mut state = self.state.write();
        Ok(state
            .words
            .get_mut(&word_key(word))
            .map(|entry| entry.enabled = enabled)
            .is_some())
    }

    async fn delete_word(&self, word: &str) -> Result<bool> {
        Ok(self.state.write().words.remove(&word_key(word)).is_some())
    }
}

#[async_trait]
impl FloorBuildingStore for MemoryCommentStore {
    async fn record_floor_building(
        &self,
        target: TargetRef,
        author_id: UserId,
        comment_id: CommentId,
        now_ms: i64,
    ) -> Result<FloorBuildingRecord> {
        let mut state = self.state.write();
        state.floor_building.retain(|(scope, author), _| *scope != target || *author == author_id);
        let record = state
            .floor_building
            .entry((target, author_id))
            .or_insert_with(|| FloorBuildingRecord {
                target,
                author_id,
                comment_ids: Vec::new(),
                count: 0,
                updated_at: now_ms,
            });
        record.comment_ids.push(comment_id);
        record.count = record.count.saturating_add(1);
        record.updated_at = now_ms;
        Ok(record.clone())
    }

    async fn get_floor_building(
        &self,
        target: TargetRef,
        author_id: UserId,
    ) -> Result<Option<FloorBuildingRecord>> {
        Ok(self.state.read().floor_building.get(&(target, author_id)).cloned())
    }
}
