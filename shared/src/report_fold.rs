//! User reports, threshold-driven folding and the admin review transition.
//!
//! A report is `pending` until an administrator approves it (the comment is
//! soft-deleted) or rejects it. Both outcomes are terminal. Folding is decided
//! on the count the store returns from the same atomic step that inserted the
//! report, and the transition itself is conditional, so a retried or
//! concurrent report can never fold a comment twice.

use serde::Serialize;

use crate::{
    collaborators::{NotificationEvent, NotificationSink},
    error::{CommentError, CommentResult},
    fold_rules::{FoldRuleSet, RuleContext},
    model::{
        CommentReport, CommentStatus, NewReportInput, ReportId, ReportResolution, ReportStatus,
        UserId,
    },
    store::{CommentStore, ReportInsert, ReportResolve, ReportStore},
};

/// Administrator decision on a pending report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// The comment violates the rules and is removed.
    Approve,
    /// The report is dismissed and the comment stays as it is.
    Reject,
}

impl ReviewDecision {
    fn status(self) -> ReportStatus {
        match self {
            ReviewDecision::Approve => ReportStatus::Approved,
            ReviewDecision::Reject => ReportStatus::Rejected,
        }
    }
}

/// Result of filing a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    /// The stored report.
    pub report: CommentReport,
    /// Reports of the comment including this one.
    pub report_count: usize,
    /// Whether this report moved the comment to `folded`.
    pub folded: bool,
}

/// Files and resolves reports, folding comments that cross the rule table.
pub struct ReportFoldEngine {
    rules: FoldRuleSet,
}

impl ReportFoldEngine {
    /// Engine evaluating `rules`.
    pub fn new(rules: FoldRuleSet) -> Self {
        Self { rules }
    }

    /// Rule table in effect.
    pub fn rules(&self) -> &FoldRuleSet {
        &self.rules
    }

    /// Files a report and folds the comment when a rule fires.
    pub async fn report<S>(
        &self,
        store: &S,
        notifier: &dyn NotificationSink,
        input: NewReportInput,
        now_ms: i64,
    ) -> CommentResult<ReportOutcome>
    where
        S: CommentStore + ReportStore + ?Sized,
    {
        let comment = store
            .get_comment(input.comment_id)
            .await?
            .filter(|comment| comment.status != CommentStatus::Deleted)
            .ok_or_else(|| CommentError::comment_not_found(input.comment_id))?;
        let (comment_id, reporter_id) = (input.comment_id, input.reporter_id);

        let (report, report_count) = match store.insert_report(input).await? {
            ReportInsert::Created { report, report_count } => (report, report_count),
            ReportInsert::Duplicate => {
                return Err(CommentError::Conflict(format!(
                    "user {reporter_id} already has a pending report on comment {comment_id}"
                )));
            },
        };

        let mut folded = false;
        let ctx = RuleContext { report_count };
        if let Some(rule) = self.rules.first_match(&ctx) {
            folded = store.fold_if_visible(comment_id, now_ms).await?;
            if folded {
                tracing::info!(
                    "comment {comment_id} folded by rule {} after {report_count} reports",
                    rule.name
                );
                notifier.dispatch(NotificationEvent::CommentFolded {
                    comment_id,
                    author_id: comment.author_id,
                    report_count,
                });
            }
        }

        Ok(ReportOutcome { report, report_count, folded })
    }

    /// Resolves a pending report. Approval soft-deletes the comment.
    pub async fn review<S>(
        &self,
        store: &S,
        notifier: &dyn NotificationSink,
        report_id: ReportId,
        decision: ReviewDecision,
        handler_id: UserId,
        note: Option<String>,
        now_ms: i64,
    ) -> CommentResult<CommentReport>
    where
        S: CommentStore + ReportStore + ?Sized,
    {
        let resolution = ReportResolution {
            status: decision.status(),
            handler_id,
            handled_at: now_ms,
            handle_result: note,
        };
        let report = match store.resolve_report(report_id, resolution).await? {
            ReportResolve::Resolved(report) => report,
            ReportResolve::AlreadyResolved(report) => {
                return Err(CommentError::Conflict(format!(
                    "report {report_id} is already {}",
                    report.status.as_str()
                )));
            },
            ReportResolve::NotFound => return Err(CommentError::report_not_found(report_id)),
        };

        if decision == ReviewDecision::Approve
            && store.soft_delete(report.comment_id, now_ms).await?.is_none()
        {
            tracing::warn!(
                "report {report_id} approved but comment {} no longer exists",
                report.comment_id
            );
        }

        notifier.dispatch(NotificationEvent::ReportResolved {
            report_id,
            comment_id: report.comment_id,
            reporter_id: report.reporter_id,
            status: report.status,
        });
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collaborators::RecordingNotifier,
        model::{
            AuditStatus, CommentDraft, ContentKind, ReportReason, RiskLevel, TargetKind, TargetRef,
        },
        store::MemoryCommentStore,
    };

    async fn seeded() -> (MemoryCommentStore, i64) {
        let store = MemoryCommentStore::new();
        let comment = store
            .insert_threaded(CommentDraft {
                target: TargetRef::new(TargetKind::Post, 7),
                author_id: 50,
                parent_id: 0,
                reply_to_user_id: None,
                reply_to_comment_id: None,
                content: "controversial take".to_string(),
                content_kind: ContentKind::Text,
                status: CommentStatus::Normal,
                audit_status: AuditStatus::Approved,
                risk_level: RiskLevel::Normal,
                author_authored: false,
                created_at: 1,
            })
            .await
            .expect("insert")
            .expect("root has no parent");
        (store, comment.id)
    }

    fn report_by(comment_id: i64, reporter_id: i64) -> NewReportInput {
        NewReportInput {
            comment_id,
            reporter_id,
            reason: ReportReason::Spam,
            description: None,
            created_at: 10,
        }
    }

    #[tokio::test]
    async fn third_report_folds_once() {
        let (store, id) = seeded().await;
        let engine = ReportFoldEngine::new(FoldRuleSet::with_report_threshold(3));
        let notifier = RecordingNotifier::new();

        for reporter in 1..=2 {
            let outcome = engine.report(&store, &notifier, report_by(id, reporter), 20).await;
            assert!(!outcome.expect("report accepted").folded);
        }
        let third = engine.report(&store, &notifier, report_by(id, 3), 20).await.expect("third");
        assert!(third.folded);
        assert_eq!(third.report_count, 3);

        let fourth = engine.report(&store, &notifier, report_by(id, 4), 21).await.expect("fourth");
        assert!(!fourth.folded);
        assert_eq!(fourth.report_count, 4);

        let comment = store.get_comment(id).await.expect("load").expect("exists");
        assert_eq!(comment.status, CommentStatus::Folded);
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_pending_report_conflicts() {
        let (store, id) = seeded().await;
        let engine = ReportFoldEngine::new(FoldRuleSet::with_report_threshold(3));
        engine.report(&store, &notifier(), report_by(id, 1), 20).await.expect("first");
        let err = engine.report(&store, &notifier(), report_by(id, 1), 21).await.unwrap_err();
        assert!(matches!(err, CommentError::Conflict(_)));
    }

    #[tokio::test]
    async fn approval_deletes_and_second_decision_conflicts() {
        let (store, id) = seeded().await;
        let engine = ReportFoldEngine::new(FoldRuleSet::with_report_threshold(3));
        let notifier = RecordingNotifier::new();
        let filed = engine.report(&store, &notifier, report_by(id, 1), 20).await.expect("filed");

        let resolved = engine
            .review(&store, &notifier, filed.report.id, ReviewDecision::Approve, 99, None, 30)
            .await
            .expect("approved");
        assert_eq!(resolved.status, ReportStatus::Approved);
        assert_eq!(resolved.handler_id, Some(99));

        let comment = store.get_comment(id).await.expect("load").expect("kept");
        assert_eq!(comment.status, CommentStatus::Deleted);
        assert_eq!(comment.deleted_at, Some(30));

        let again = engine
            .review(&store, &notifier, filed.report.id, ReviewDecision::Reject, 99, None, 31)
            .await
            .unwrap_err();
        assert!(matches!(again, CommentError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_targets_are_not_found() {
        let (store, _) = seeded().await;
        let engine = ReportFoldEngine::new(FoldRuleSet::with_report_threshold(3));
        let err = engine.report(&store, &notifier(), report_by(999, 1), 20).await.unwrap_err();
        assert!(matches!(err, CommentError::NotFound { entity: "comment", id: 999 }));

        let err = engine
            .review(&store, &notifier(), 77, ReviewDecision::Reject, 1, None, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::NotFound { entity: "report", .. }));
    }

    fn notifier() -> RecordingNotifier {
        RecordingNotifier::new()
    }
}
