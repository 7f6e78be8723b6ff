//! `CommentService`: the operations callers actually invoke.
//!
//! It ties moderation, threading, scoring and reporting to the store and the
//! collaborator contracts. Every public method returns [`CommentResult`].

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    collaborators::{
        NotificationEvent, NotificationSink, TargetOwnership, UserDirectory, UserProfile,
    },
    config::EngineConfig,
    error::{CommentError, CommentResult},
    model::{
        AuditStatus, Comment, CommentDraft, CommentId, CommentReport, CommentStatus, ContentKind,
        CounterDelta, FloorBuildingRecord, NewReportInput, OwnerFlag, PageRequest, ReportId,
        ReportReason, SensitiveWord, TargetRef, ThreadOrder, UserId, WordAction, SEVERITY_SERIOUS,
    },
    moderation::{ModerationPipeline, ModerationVerdict},
    report_fold::{ReportFoldEngine, ReportOutcome, ReviewDecision},
    score::{HotSnapshot, ScoreEngine, SweepReport},
    store::EngineStore,
    word_list::{self, SensitiveWordList},
    word_matcher::WordMatcher,
};

const MASK_CHAR: char = '*';

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Collaborators supplied by the embedding application.
#[derive(Clone)]
pub struct Collaborators {
    /// Resolves author display data.
    pub users: Arc<dyn UserDirectory>,
    /// Decides who owns a target.
    pub ownership: Arc<dyn TargetOwnership>,
    /// Receives reply, mention and report events.
    pub notifier: Arc<dyn NotificationSink>,
}

/// A new comment as submitted by an authenticated actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCommentInput {
    /// Content to comment on.
    pub target: TargetRef,
    /// Authenticated writer.
    pub author_id: UserId,
    /// `0` for a root comment.
    #[serde(default)]
    pub parent_id: CommentId,
    /// User to @-mention.
    #[serde(default)]
    pub reply_to_user_id: Option<UserId>,
    /// Comment the mention refers to.
    #[serde(default)]
    pub reply_to_comment_id: Option<CommentId>,
    /// Raw text before moderation.
    pub content: String,
    /// Format of `content`.
    #[serde(default)]
    pub content_kind: ContentKind,
    /// Ask for the reply to be marked as written by the target owner.
    #[serde(default)]
    pub reply_as_author: bool,
}

/// A comment denormalised for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    /// The stored comment.
    #[serde(flatten)]
    pub comment: Comment,
    /// Display data of the author, if found.
    pub author: Option<UserProfile>,
    /// Name of the mentioned user, if found.
    pub reply_to_username: Option<String>,
}

/// Entry point of every comment operation.
pub struct CommentService {
    store: Arc<dyn EngineStore>,
    collaborators: Collaborators,
    words: Option<SensitiveWordList>,
    moderation: ModerationPipeline,
    scores: Arc<ScoreEngine>,
    reports: ReportFoldEngine,
    config: EngineConfig,
    clock: Clock,
}

impl CommentService {
    /// Service over `store` using the process-wide word list.
    pub fn new(
        store: Arc<dyn EngineStore>,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            collaborators,
            words: None,
            moderation: ModerationPipeline::new(config.min_content_chars),
            scores: Arc::new(ScoreEngine::new(config.hot_top_k)),
            reports: ReportFoldEngine::new(config.fold_rule_set()),
            config,
            clock: Arc::new(now_ms),
        }
    }

    /// Uses `words` instead of the process-wide default list.
    pub fn with_word_list(mut self, words: SensitiveWordList) -> Self {
        self.words = Some(words);
        self
    }

    /// Overrides the millisecond clock.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn EngineStore> {
        &self.store
    }

    /// Shared with the periodic sweep worker.
    pub fn score_engine(&self) -> Arc<ScoreEngine> {
        Arc::clone(&self.scores)
    }

    /// Tunables in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn word_list(&self) -> Option<&SensitiveWordList> {
        self.words.as_ref().or_else(|| word_list::default_list())
    }

    /// Snapshot of the active word list, if one is loaded.
    pub fn word_matcher(&self) -> Option<Arc<WordMatcher>> {
        self.word_list().map(SensitiveWordList::snapshot)
    }

    /// Validates, moderates, places and stores a new comment.
    ///
    /// A comment rejected by moderation is still stored (folded, audit
    /// `rejected`) and then reported as [`CommentError::ContentRejected`].
    pub async fn create_comment(&self, input: CreateCommentInput) -> CommentResult<Comment> {
        self.validate_content(&input.content)?;

        let parent = if input.parent_id == 0 {
            None
        } else {
            let parent = self
                .store
                .get_comment(input.parent_id)
                .await?
                .filter(|parent| parent.status != CommentStatus::Deleted)
                .ok_or_else(|| CommentError::parent_not_found(input.parent_id))?;
            if parent.target != input.target {
                return Err(CommentError::ValidationFailed(format!(
                    "parent comment {} belongs to {}, not {}",
                    parent.id, parent.target, input.target
                )));
            }
            Some(parent)
        };

        let is_owner =
            self.collaborators.ownership.is_owner(input.target, input.author_id).await?;
        if input.reply_as_author && !is_owner {
            return Err(CommentError::PermissionDenied(format!(
                "user {} does not own {} and cannot reply as its author",
                input.author_id, input.target
            )));
        }

        let matcher = self.word_matcher();
        let verdict = self.moderation.evaluate(&input.content, is_owner, matcher.as_deref());
        let content = match matcher.as_deref() {
            Some(matcher) => matcher.replace(&input.content, MASK_CHAR),
            None => input.content.clone(),
        };
        let now = self.now();

        let draft = CommentDraft {
            target: input.target,
            author_id: input.author_id,
            parent_id: input.parent_id,
            reply_to_user_id: input.reply_to_user_id,
            reply_to_comment_id: input.reply_to_comment_id,
            content,
            content_kind: input.content_kind,
            status: initial_status(&verdict),
            audit_status: verdict.audit_status,
            risk_level: verdict.risk_level,
            author_authored: is_owner,
            created_at: now,
        };
        let mut comment = self
            .store
            .insert_threaded(draft)
            .await?
            .ok_or_else(|| CommentError::parent_not_found(input.parent_id))?;

        if let Err(err) = self
            .store
            .record_floor_building(comment.target, comment.author_id, comment.id, now)
            .await
        {
            tracing::warn!("failed to record floor building for comment {}: {err:#}", comment.id);
        }

        if verdict.is_rejected() {
            tracing::info!(
                "comment {} on {} rejected by moderation: {:?}",
                comment.id,
                comment.target,
                verdict.reasons
            );
            return Err(CommentError::ContentRejected {
                comment_id: comment.id,
                blocked_words: rejected_words(&verdict),
            });
        }

        if comment.status == CommentStatus::Normal {
            self.notify_new_comment(&comment, parent.as_ref());
        }

        match self.scores.rescore_loaded(self.store.as_ref(), &comment, now).await {
            Ok(Some(score)) => comment.hot_score = score,
            Ok(None) => {},
            Err(err) => tracing::warn!("failed to score new comment {}: {err:#}", comment.id),
        }
        Ok(comment)
    }

    fn validate_content(&self, content: &str) -> CommentResult<()> {
        if content.trim().is_empty() {
            return Err(CommentError::ValidationFailed("content is empty".to_string()));
        }
        let chars = content.chars().count();
        if chars > self.config.max_content_chars {
            return Err(CommentError::ValidationFailed(format!(
                "content has {chars} characters, limit is {}",
                self.config.max_content_chars
            )));
        }
        Ok(())
    }

    fn notify_new_comment(&self, comment: &Comment, parent: Option<&Comment>) {
        let notifier = &self.collaborators.notifier;
        let parent_author = parent.map(|parent| parent.author_id);
        if let Some(recipient_id) = parent_author.filter(|author| *author != comment.author_id) {
            notifier.dispatch(NotificationEvent::ReplyReceived {
                comment_id: comment.id,
                target: comment.target,
                replier_id: comment.author_id,
                recipient_id,
            });
        }
        if let Some(mentioned_user_id) = comment
            .reply_to_user_id
            .filter(|user| *user != comment.author_id && Some(*user) != parent_author)
        {
            notifier.dispatch(NotificationEvent::Mentioned {
                comment_id: comment.id,
                target: comment.target,
                author_id: comment.author_id,
                mentioned_user_id,
            });
        }
    }

    /// A comment that exists and is not soft-deleted.
    pub async fn get_comment(&self, id: CommentId) -> CommentResult<Comment> {
        self.store
            .get_comment(id)
            .await?
            .filter(|comment| comment.status != CommentStatus::Deleted)
            .ok_or_else(|| CommentError::comment_not_found(id))
    }

    /// Adds a like.
    pub async fn like(&self, id: CommentId) -> CommentResult<Comment> {
        self.interact(id, CounterDelta { like: 1, dislike: 0 }).await
    }

    /// Withdraws a like.
    pub async fn unlike(&self, id: CommentId) -> CommentResult<Comment> {
        self.interact(id, CounterDelta { like: -1, dislike: 0 }).await
    }

    /// Adds a dislike.
    pub async fn dislike(&self, id: CommentId) -> CommentResult<Comment> {
        self.interact(id, CounterDelta { like: 0, dislike: 1 }).await
    }

    /// Withdraws a dislike.
    pub async fn undislike(&self, id: CommentId) -> CommentResult<Comment> {
        self.interact(id, CounterDelta { like: 0, dislike: -1 }).await
    }

    async fn interact(&self, id: CommentId, delta: CounterDelta) -> CommentResult<Comment> {
        self.get_comment(id).await?;
        let mut comment = self
            .store
            .apply_counters(id, delta)
            .await?
            .ok_or_else(|| CommentError::comment_not_found(id))?;
        if let Some(score) =
            self.scores.rescore_loaded(self.store.as_ref(), &comment, self.now()).await?
        {
            comment.hot_score = score;
        }
        Ok(comment)
    }

    /// Pins a comment. Only the target owner may do this.
    pub async fn pin(&self, actor_id: UserId, id: CommentId) -> CommentResult<Comment> {
        self.set_owner_flag(actor_id, id, OwnerFlag::Pinned, true).await
    }

    /// Unpins a comment. Owner only.
    pub async fn unpin(&self, actor_id: UserId, id: CommentId) -> CommentResult<Comment> {
        self.set_owner_flag(actor_id, id, OwnerFlag::Pinned, false).await
    }

    /// Features a comment. Owner only.
    pub async fn feature(&self, actor_id: UserId, id: CommentId) -> CommentResult<Comment> {
        self.set_owner_flag(actor_id, id, OwnerFlag::Featured, true).await
    }

    /// Clears the featured flag. Owner only.
    pub async fn unfeature(&self, actor_id: UserId, id: CommentId) -> CommentResult<Comment> {
        self.set_owner_flag(actor_id, id, OwnerFlag::Featured, false).await
    }

    async fn set_owner_flag(
        &self,
        actor_id: UserId,
        id: CommentId,
        flag: OwnerFlag,
        value: bool,
    ) -> CommentResult<Comment> {
        let comment = self.get_comment(id).await?;
        if !self.collaborators.ownership.is_owner(comment.target, actor_id).await? {
            return Err(CommentError::PermissionDenied(format!(
                "user {actor_id} does not own {}",
                comment.target
            )));
        }
        self.store
            .set_owner_flag(id, flag, value, self.now())
            .await?
            .ok_or_else(|| CommentError::comment_not_found(id))
    }

    /// Soft delete by the comment author or the target owner.
    pub async fn delete_comment(&self, actor_id: UserId, id: CommentId) -> CommentResult<Comment> {
        let comment = self
            .store
            .get_comment(id)
            .await?
            .ok_or_else(|| CommentError::comment_not_found(id))?;
        if comment.status == CommentStatus::Deleted {
            return Ok(comment);
        }
        if comment.author_id != actor_id
            && !self.collaborators.ownership.is_owner(comment.target, actor_id).await?
        {
            return Err(CommentError::PermissionDenied(format!(
                "user {actor_id} may not delete comment {id}"
            )));
        }
        self.store
            .soft_delete(id, self.now())
            .await?
            .ok_or_else(|| CommentError::comment_not_found(id))
    }

    /// Administrative hard delete.
    pub async fn purge_comment(&self, id: CommentId) -> CommentResult<()> {
        if !self.store.purge(id).await? {
            return Err(CommentError::comment_not_found(id));
        }
        tracing::info!("comment {id} purged");
        Ok(())
    }

    /// Files a report and folds the comment once the rule table says so.
    /// A second report by the same user is a conflict.
    pub async fn report_comment(
        &self,
        comment_id: CommentId,
        reporter_id: UserId,
        reason: ReportReason,
        description: Option<String>,
    ) -> CommentResult<ReportOutcome> {
        let now = self.now();
        let input =
            NewReportInput { comment_id, reporter_id, reason, description, created_at: now };
        self.reports
            .report(self.store.as_ref(), self.collaborators.notifier.as_ref(), input, now)
            .await
    }

    /// Resolves a pending report. Approving soft-deletes the comment.
    pub async fn review_report(
        &self,
        report_id: ReportId,
        handler_id: UserId,
        decision: ReviewDecision,
        note: Option<String>,
    ) -> CommentResult<CommentReport> {
        self.reports
            .review(
                self.store.as_ref(),
                self.collaborators.notifier.as_ref(),
                report_id,
                decision,
                handler_id,
                note,
                self.now(),
            )
            .await
    }

    /// Root comments of a target; pinned first, deleted ones excluded.
    pub async fn list_thread(
        &self,
        target: TargetRef,
        order: ThreadOrder,
        page: PageRequest,
    ) -> CommentResult<Vec<CommentView>> {
        let roots = self.store.list_roots(target, order, page).await?;
        Ok(self.denormalise(roots).await)
    }

    /// Direct replies of `parent_id` by sub-floor.
    pub async fn list_replies(
        &self,
        parent_id: CommentId,
        page: PageRequest,
    ) -> CommentResult<Vec<CommentView>> {
        self.get_comment(parent_id).await?;
        let replies = self.store.list_replies(parent_id, page).await?;
        Ok(self.denormalise(replies).await)
    }

    /// An author's comments, newest first.
    pub async fn list_user_comments(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> CommentResult<Vec<CommentView>> {
        let comments = self.store.list_by_user(user_id, page).await?;
        Ok(self.denormalise(comments).await)
    }

    /// Administrative moderation of many comments at once.
    pub async fn batch_update_status(
        &self,
        ids: &[CommentId],
        status: CommentStatus,
    ) -> CommentResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let changed = self.store.batch_update_status(ids, status, self.now()).await?;
        tracing::info!(
            "batch status {} applied to {changed}/{} comments",
            status.as_str(),
            ids.len()
        );
        Ok(changed)
    }

    /// Profile lookups are display-only; a failing directory leaves the
    /// fields empty.
    async fn denormalise(&self, comments: Vec<Comment>) -> Vec<CommentView> {
        let mut profiles: HashMap<UserId, Option<UserProfile>> = HashMap::new();
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let author = self.profile(&mut profiles, comment.author_id).await;
            let reply_to_username = match comment.reply_to_user_id {
                Some(user_id) => {
                    self.profile(&mut profiles, user_id).await.map(|profile| profile.username)
                },
                None => None,
            };
            views.push(CommentView { comment, author, reply_to_username });
        }
        views
    }

    async fn profile(
        &self,
        cache: &mut HashMap<UserId, Option<UserProfile>>,
        user_id: UserId,
    ) -> Option<UserProfile> {
        if let Some(cached) = cache.get(&user_id) {
            return cached.clone();
        }
        let profile = match self.collaborators.users.find_by_id(user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!("user directory lookup failed for {user_id}: {err:#}");
                None
            },
        };
        cache.insert(user_id, profile.clone());
        profile
    }

    /// The author's current run of consecutive comments under `target`.
    pub async fn floor_building(
        &self,
        target: TargetRef,
        author_id: UserId,
    ) -> CommentResult<Option<FloorBuildingRecord>> {
        Ok(self.store.get_floor_building(target, author_id).await?)
    }

    /// Recomputes scores and the hot snapshot of one target.
    pub async fn rescore_target(&self, target: TargetRef) -> CommentResult<SweepReport> {
        Ok(self.scores.sweep_target(self.store.as_ref(), target, self.now()).await?)
    }

    /// Sweeps every target that has comments.
    pub async fn rescore_all(&self) -> CommentResult<SweepReport> {
        Ok(self.scores.sweep_all(self.store.as_ref(), self.now()).await?)
    }

    /// Latest hot ranking of `target`, if it was swept.
    pub fn hot_snapshot(&self, target: TargetRef) -> Option<Arc<HotSnapshot>> {
        self.scores.hot_snapshot(target)
    }

    /// Persists a word and makes it effective immediately.
    pub async fn add_word(&self, word: SensitiveWord) -> CommentResult<()> {
        if word.word.trim().is_empty() {
            return Err(CommentError::ValidationFailed("sensitive word is blank".to_string()));
        }
        self.store.upsert_word(word.clone()).await?;
        match self.word_list() {
            Some(list) if word.enabled => list.add_word(&word),
            // A disabled overwrite must drop the word from the live trie.
            _ => {
                self.reload_words().await?;
            },
        }
        Ok(())
    }

    /// Enables or disables a stored word and reloads the live list.
    pub async fn set_word_enabled(&self, word: &str, enabled: bool) -> CommentResult<()> {
        if !self.store.set_word_enabled(word, enabled).await? {
            return Err(CommentError::ValidationFailed(format!("unknown sensitive word {word}")));
        }
        self.reload_words().await?;
        Ok(())
    }

    /// Deletes a stored word and reloads the live list.
    pub async fn remove_word(&self, word: &str) -> CommentResult<()> {
        if !self.store.delete_word(word).await? {
            return Err(CommentError::ValidationFailed(format!("unknown sensitive word {word}")));
        }
        self.reload_words().await?;
        Ok(())
    }

    /// Rebuilds the active word list from the store, installing the
    /// process-wide list if none is active yet. Returns the word count.
    pub async fn reload_words(&self) -> CommentResult<usize> {
        let words = self.store.list_words(true).await?;
        match self.word_list() {
            Some(list) => Ok(list.reload(&words)),
            None => {
                tracing::info!("no active word list; installing the default list");
                Ok(word_list::init(&words).len())
            },
        }
    }
}

/// High-risk and rejected comments are hidden at creation; pending ones wait
/// for a moderator.
fn initial_status(verdict: &ModerationVerdict) -> CommentStatus {
    if verdict.is_rejected() || verdict.should_fold() {
        CommentStatus::Folded
    } else if verdict.audit_status == AuditStatus::Pending {
        CommentStatus::Auditing
    } else {
        CommentStatus::Normal
    }
}

fn rejected_words(verdict: &ModerationVerdict) -> Vec<String> {
    let mut words: Vec<String> = verdict
        .matches
        .iter()
        .filter(|hit| hit.level >= SEVERITY_SERIOUS || hit.action == WordAction::Block)
        .map(|hit| hit.word.clone())
        .collect();
    words.dedup();
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collaborators::{RecordingNotifier, StaticOwnership, StaticUserDirectory},
        model::{RiskLevel, TargetKind},
        store::{MemoryCommentStore, WordStore},
    };

    const OWNER: UserId = 1;
    const ALICE: UserId = 2;
    const BOB: UserId = 3;
    const NOW: i64 = 1_700_000_000_000;

    fn target() -> TargetRef {
        TargetRef::new(TargetKind::Article, 42)
    }

    async fn service() -> (CommentService, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let collaborators = Collaborators {
            users: Arc::new(
                StaticUserDirectory::new()
                    .with_user(OWNER, "owner", None)
                    .with_user(ALICE, "alice", Some("/a.png"))
                    .with_user(BOB, "bob", None),
            ),
            ownership: Arc::new(StaticOwnership::new().with_owner(target(), OWNER)),
            notifier: notifier.clone(),
        };
        let words = [
            SensitiveWord::new("spam", 2, WordAction::Block, None),
            SensitiveWord::new("xx", 3, WordAction::Replace, Some("**")),
            SensitiveWord::new("darn", 1, WordAction::Replace, None),
        ];
        let store = MemoryCommentStore::new();
        for word in &words {
            store.upsert_word(word.clone()).await.expect("seed word");
        }
        let service = CommentService::new(Arc::new(store), collaborators, EngineConfig::default())
            .with_word_list(SensitiveWordList::new(&words))
        .with_clock(|| NOW);
        (service, notifier)
    }

    fn input(author_id: UserId, parent_id: CommentId, content: &str) -> CreateCommentInput {
        CreateCommentInput {
            target: target(),
            author_id,
            parent_id,
            reply_to_user_id: None,
            reply_to_comment_id: None,
            content: content.to_string(),
            content_kind: ContentKind::Text,
            reply_as_author: false,
        }
    }

    #[tokio::test]
    async fn clean_reply_notifies_parent_author() {
        let (service, notifier) = service().await;
        let root = service.create_comment(input(ALICE, 0, "first thoughts")).await.expect("root");
        let mut reply = input(BOB, root.id, "agreed with this");
        reply.reply_to_user_id = Some(OWNER);
        let reply = service.create_comment(reply).await.expect("reply");

        assert_eq!(root.status, CommentStatus::Normal);
        assert_eq!(reply.root_id, root.id);
        let kinds: Vec<_> = notifier.events().iter().map(NotificationEvent::kind).collect();
        assert_eq!(kinds, vec!["reply_received", "mentioned"]);
    }

    #[tokio::test]
    async fn mild_words_are_masked_in_stored_content() {
        let (service, _) = service().await;
        let comment = service.create_comment(input(ALICE, 0, "well darn it")).await.expect("ok");
        assert_eq!(comment.content, "well **** it");
        assert_eq!(comment.risk_level, RiskLevel::Medium);
        assert_eq!(comment.status, CommentStatus::Auditing);
    }

    #[tokio::test]
    async fn serious_word_is_stored_then_rejected() {
        let (service, _) = service().await;
        let err = service.create_comment(input(ALICE, 0, "axxb is bad")).await.unwrap_err();
        let (comment_id, blocked_words) = match err {
            CommentError::ContentRejected { comment_id, blocked_words } => {
                (comment_id, blocked_words)
            },
            other => panic!("expected rejection, got {other:?}"),
        };
        assert_eq!(blocked_words, vec!["xx".to_string()]);

        let stored = service.store().get_comment(comment_id).await.expect("load").expect("kept");
        assert_eq!(stored.status, CommentStatus::Folded);
        assert_eq!(stored.audit_status, AuditStatus::Rejected);
    }

    #[tokio::test]
    async fn owner_checks_guard_author_replies_and_pins() {
        let (service, _) = service().await;
        let root = service.create_comment(input(ALICE, 0, "question here")).await.expect("root");

        let mut as_author = input(BOB, root.id, "official answer");
        as_author.reply_as_author = true;
        let err = service.create_comment(as_author.clone()).await.unwrap_err();
        assert!(matches!(err, CommentError::PermissionDenied(_)));

        as_author.author_id = OWNER;
        let answer = service.create_comment(as_author).await.expect("owner reply");
        assert!(answer.flags.author_authored);

        assert!(matches!(
            service.pin(ALICE, root.id).await.unwrap_err(),
            CommentError::PermissionDenied(_)
        ));
        assert!(service.pin(OWNER, root.id).await.expect("pinned").flags.pinned);
        assert!(service.feature(OWNER, root.id).await.expect("featured").flags.featured);
    }

    #[tokio::test]
    async fn validation_and_parent_errors() {
        let (service, _) = service().await;
        assert!(matches!(
            service.create_comment(input(ALICE, 0, "   ")).await.unwrap_err(),
            CommentError::ValidationFailed(_)
        ));
        assert!(matches!(
            service.create_comment(input(ALICE, 0, &"a".repeat(2001))).await.unwrap_err(),
            CommentError::ValidationFailed(_)
        ));
        assert!(matches!(
            service.create_comment(input(ALICE, 77, "orphaned reply")).await.unwrap_err(),
            CommentError::NotFound { entity: "parent comment", id: 77 }
        ));
    }

    #[tokio::test]
    async fn likes_rescore_and_floor_at_zero() {
        let (service, _) = service().await;
        let root = service.create_comment(input(ALICE, 0, "score me please")).await.expect("root");
        let liked = service.like(root.id).await.expect("liked");
        assert_eq!(liked.counters.like_count, 1);
        assert!(liked.hot_score > 0.0);

        service.unlike(root.id).await.expect("unliked");
        let floored = service.unlike(root.id).await.expect("unliked again");
        assert_eq!(floored.counters.like_count, 0);
    }

    #[tokio::test]
    async fn delete_requires_author_or_owner() {
        let (service, _) = service().await;
        let root = service.create_comment(input(ALICE, 0, "to be removed")).await.expect("root");
        assert!(matches!(
            service.delete_comment(BOB, root.id).await.unwrap_err(),
            CommentError::PermissionDenied(_)
        ));
        let deleted = service.delete_comment(OWNER, root.id).await.expect("owner delete");
        assert_eq!(deleted.status, CommentStatus::Deleted);
        assert_eq!(deleted.deleted_at, Some(NOW));
        let listed = service
            .list_thread(target(), ThreadOrder::Floor, PageRequest::default())
            .await
            .expect("list");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn thread_views_carry_profiles() {
        let (service, _) = service().await;
        let root = service.create_comment(input(ALICE, 0, "hello readers")).await.expect("root");
        let mut reply = input(BOB, root.id, "hello alice");
        reply.reply_to_user_id = Some(ALICE);
        service.create_comment(reply).await.expect("reply");

        let replies = service.list_replies(root.id, PageRequest::default()).await.expect("list");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].author.as_ref().map(|a| a.username.as_str()), Some("bob"));
        assert_eq!(replies[0].reply_to_username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn word_admin_takes_effect_without_restart() {
        let (service, _) = service().await;
        service
            .add_word(SensitiveWord::new("meh", 1, WordAction::Block, None))
            .await
            .expect("added");
        let pending = service.create_comment(input(ALICE, 0, "meh whatever")).await.expect("ok");
        assert_eq!(pending.status, CommentStatus::Auditing);

        service.remove_word("meh").await.expect("removed");
        let clean = service.create_comment(input(ALICE, 0, "meh whatever")).await.expect("ok");
        assert_eq!(clean.status, CommentStatus::Normal);

        let matcher = service.word_matcher().expect("active list");
        assert!(matcher.contains("spam") && matcher.contains("darn") && matcher.contains("xx"));
        let held = service.create_comment(input(ALICE, 0, "buy spam now")).await.expect("ok");
        assert_eq!(held.status, CommentStatus::Auditing);
    }

    #[tokio::test]
    async fn readding_a_word_disabled_drops_it_from_the_live_list() {
        let (service, _) = service().await;
        service
            .add_word(SensitiveWord::new("meh", 1, WordAction::Block, None))
            .await
            .expect("added");
        let mut disabled = SensitiveWord::new("meh", 1, WordAction::Block, None);
        disabled.enabled = false;
        service.add_word(disabled).await.expect("overwritten");

        assert!(!service.word_matcher().expect("active list").contains("meh"));
        let comment = service.create_comment(input(ALICE, 0, "meh whatever")).await.expect("ok");
        assert_eq!(comment.status, CommentStatus::Normal);
        assert!(service.word_matcher().expect("active list").contains("spam"));
    }

    #[tokio::test]
    async fn another_author_ends_a_floor_building_run() {
        let (service, _) = service().await;
        let first = service.create_comment(input(ALICE, 0, "one for me")).await.expect("ok");
        let second = service.create_comment(input(ALICE, 0, "two for me")).await.expect("ok");

        let run = service.floor_building(target(), ALICE).await.expect("read").expect("run");
        assert_eq!(run.comment_ids, vec![first.id, second.id]);
        assert_eq!(run.count, 2);

        let interloper = service.create_comment(input(BOB, 0, "my turn now")).await.expect("ok");
        assert!(service.floor_building(target(), ALICE).await.expect("read").is_none());
        let bob = service.floor_building(target(), BOB).await.expect("read").expect("run");
        assert_eq!(bob.comment_ids, vec![interloper.id]);
    }
}
