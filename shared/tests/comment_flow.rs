//! End-to-end comment flows against both store implementations.

use std::{collections::HashSet, sync::Arc};

use anyhow::{Context, Result};
use floor_flow_shared::{
    collaborators::{NotificationEvent, RecordingNotifier, StaticOwnership, StaticUserDirectory},
    model::{
        CommentStatus, PageRequest, ReportReason, SensitiveWord, TargetKind, TargetRef,
        ThreadOrder, WordAction,
    },
    report_fold::ReviewDecision,
    store::{EngineStore, MemoryCommentStore, SqliteCommentStore},
    thread_builder,
    word_list::SensitiveWordList,
    Collaborators, CommentError, CommentService, CreateCommentInput, EngineConfig,
};

const OWNER: i64 = 1;
const NOW: i64 = 1_700_000_000_000;

fn article() -> TargetRef {
    TargetRef::new(TargetKind::Article, 42)
}

fn build(store: Arc<dyn EngineStore>) -> (Arc<CommentService>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let collaborators = Collaborators {
        users: Arc::new(StaticUserDirectory::new().with_user(OWNER, "owner", None)),
        ownership: Arc::new(StaticOwnership::new().with_owner(article(), OWNER)),
        notifier: notifier.clone(),
    };
    let words = SensitiveWordList::new(&[
        SensitiveWord::new("spam", 2, WordAction::Block, None),
        SensitiveWord::new("xx", 3, WordAction::Replace, Some("**")),
    ]);
    let service = CommentService::new(store, collaborators, EngineConfig::default())
        .with_word_list(words)
        .with_clock(|| NOW);
    (Arc::new(service), notifier)
}

fn root(author_id: i64, content: &str) -> CreateCommentInput {
    CreateCommentInput {
        target: article(),
        author_id,
        parent_id: 0,
        reply_to_user_id: None,
        reply_to_comment_id: None,
        content: content.to_string(),
        content_kind: Default::default(),
        reply_as_author: false,
    }
}

fn reply(author_id: i64, parent_id: i64, content: &str) -> CreateCommentInput {
    CreateCommentInput { parent_id, ..root(author_id, content) }
}

#[tokio::test]
async fn nested_thread_on_sqlite() -> Result<()> {
    let dir = tempfile::tempdir().context("temp dir")?;
    let store = Arc::new(SqliteCommentStore::open(dir.path().join("floorflow.db"))?);
    let (service, _) = build(store);

    let a = service.create_comment(root(10, "root comment A")).await?;
    let b = service.create_comment(reply(11, a.id, "reply B to A")).await?;
    let c = service.create_comment(reply(12, b.id, "reply C to B")).await?;

    assert_eq!(a.floor_number, 1);
    assert_eq!((b.sub_floor_number, b.depth, b.root_id), (1, 1, a.id));
    assert_eq!(b.reply_chain, vec![a.id]);
    assert_eq!((c.sub_floor_number, c.depth, c.root_id), (1, 2, a.id));
    assert_eq!(c.reply_chain, vec![a.id, b.id]);

    let a_reloaded = service.get_comment(a.id).await?;
    let b_reloaded = service.get_comment(b.id).await?;
    thread_builder::check_link(&a_reloaded, &b_reloaded).map_err(anyhow::Error::msg)?;
    thread_builder::check_link(&b_reloaded, &c).map_err(anyhow::Error::msg)?;
    assert_eq!(a_reloaded.counters.total_reply_count, 2);
    assert_eq!(b_reloaded.counters.direct_reply_count, 1);
    Ok(())
}

#[tokio::test]
async fn sequential_roots_have_no_gaps() -> Result<()> {
    let (service, _) = build(Arc::new(MemoryCommentStore::new()));
    let mut floors = Vec::new();
    for n in 0..5 {
        floors.push(service.create_comment(root(20 + n, "another root")).await?.floor_number);
    }
    assert_eq!(floors, vec![1, 2, 3, 4, 5]);

    let page = service.list_thread(article(), ThreadOrder::Floor, PageRequest::new(2, 2)).await?;
    let listed: Vec<_> = page.iter().map(|view| view.comment.floor_number).collect();
    assert_eq!(listed, vec![3, 4]);
    Ok(())
}

async fn concurrent_roots(store: Arc<dyn EngineStore>) -> Result<()> {
    let (service, _) = build(store);
    let mut handles = Vec::new();
    for author in 0..32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.create_comment(root(100 + author, "racing for a floor")).await
        }));
    }
    let mut floors = HashSet::new();
    for handle in handles {
        let comment = handle.await.context("task panicked")??;
        assert!(floors.insert(comment.floor_number), "duplicate floor {}", comment.floor_number);
    }
    assert_eq!(floors, (1..=32).collect::<HashSet<i64>>());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_roots_get_unique_floors_in_memory() -> Result<()> {
    concurrent_roots(Arc::new(MemoryCommentStore::new())).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_roots_get_unique_floors_in_sqlite() -> Result<()> {
    let dir = tempfile::tempdir().context("temp dir")?;
    concurrent_roots(Arc::new(SqliteCommentStore::open(dir.path().join("race.db"))?)).await
}

async fn concurrent_replies(store: Arc<dyn EngineStore>) -> Result<()> {
    let (service, _) = build(store);
    let parent = service.create_comment(root(1, "popular parent")).await?;
    let mut handles = Vec::new();
    for author in 0..16 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.create_comment(reply(200 + author, parent.id, "me first please")).await
        }));
    }
    let mut sub_floors = HashSet::new();
    for handle in handles {
        let comment = handle.await.context("task panicked")??;
        assert!(sub_floors.insert(comment.sub_floor_number));
    }
    assert_eq!(sub_floors, (1..=16).collect::<HashSet<i64>>());
    assert_eq!(service.get_comment(parent.id).await?.counters.direct_reply_count, 16);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replies_get_unique_sub_floors_in_memory() -> Result<()> {
    concurrent_replies(Arc::new(MemoryCommentStore::new())).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replies_get_unique_sub_floors_in_sqlite() -> Result<()> {
    let dir = tempfile::tempdir().context("temp dir")?;
    concurrent_replies(Arc::new(SqliteCommentStore::open(dir.path().join("replies.db"))?)).await
}

#[tokio::test]
async fn block_words_hold_comment_for_review() -> Result<()> {
    let (service, notifier) = build(Arc::new(MemoryCommentStore::new()));
    let parent = service.create_comment(root(5, "original post")).await?;
    let held = service.create_comment(reply(6, parent.id, "this is spam content")).await?;
    assert_eq!(held.status, CommentStatus::Auditing);
    assert!(notifier.events().is_empty(), "hidden comments do not notify");

    let listed = service.list_replies(parent.id, PageRequest::default()).await?;
    assert!(listed.is_empty());
    Ok(())
}

#[tokio::test]
async fn serious_word_keeps_an_audit_trail() -> Result<()> {
    let (service, _) = build(Arc::new(MemoryCommentStore::new()));
    let err = service
        .create_comment(root(7, "axxb"))
        .await
        .err()
        .context("comment should be rejected")?;
    let CommentError::ContentRejected { comment_id, .. } = err else {
        anyhow::bail!("unexpected error kind");
    };
    let stored = service
        .store()
        .get_comment(comment_id)
        .await?
        .context("rejected comment is kept")?;
    assert_eq!(stored.content, "a**b");
    assert_eq!(stored.status, CommentStatus::Folded);
    Ok(())
}

#[tokio::test]
async fn reports_fold_on_third_and_stay_folded() -> Result<()> {
    let dir = tempfile::tempdir().context("temp dir")?;
    let store = Arc::new(SqliteCommentStore::open(dir.path().join("reports.db"))?);
    let (service, notifier) = build(store);
    let target = service.create_comment(root(9, "hot take incoming")).await?;

    let mut folded = Vec::new();
    for reporter in 1..=4 {
        let outcome = service
            .report_comment(target.id, 300 + reporter, ReportReason::Abuse, None)
            .await?;
        folded.push(outcome.folded);
        let status = service.get_comment(target.id).await?.status;
        let expected = if reporter >= 3 { CommentStatus::Folded } else { CommentStatus::Normal };
        assert_eq!(status, expected, "after report {reporter}");
    }
    assert_eq!(folded, vec![false, false, true, false]);

    let folds = notifier
        .events()
        .into_iter()
        .filter(|event| matches!(event, NotificationEvent::CommentFolded { .. }))
        .count();
    assert_eq!(folds, 1);
    Ok(())
}

#[tokio::test]
async fn approved_report_deletes_comment() -> Result<()> {
    let (service, _) = build(Arc::new(MemoryCommentStore::new()));
    let target = service.create_comment(root(9, "questionable claim")).await?;
    let outcome = service
        .report_comment(target.id, 400, ReportReason::Spam, Some("ad".to_string()))
        .await?;

    service.review_report(outcome.report.id, OWNER, ReviewDecision::Approve, None).await?;
    assert!(matches!(
        service.get_comment(target.id).await,
        Err(CommentError::NotFound { .. })
    ));
    assert!(matches!(
        service.review_report(outcome.report.id, OWNER, ReviewDecision::Approve, None).await,
        Err(CommentError::Conflict(_))
    ));
    Ok(())
}

#[tokio::test]
async fn sweep_publishes_hot_snapshot() -> Result<()> {
    let (service, _) = build(Arc::new(MemoryCommentStore::new()));
    let quiet = service.create_comment(root(1, "quiet comment")).await?;
    let loud = service.create_comment(root(2, "loud comment")).await?;
    for _ in 0..3 {
        service.like(loud.id).await?;
    }

    let report = service.rescore_target(article()).await?;
    assert_eq!(report.scored, 2);
    let snapshot = service.hot_snapshot(article()).context("snapshot after sweep")?;
    assert_eq!(snapshot.entries.first().map(|hot| hot.comment_id), Some(loud.id));

    let hot = service.list_thread(article(), ThreadOrder::Hot, PageRequest::default()).await?;
    let order: Vec<_> = hot.iter().map(|view| view.comment.id).collect();
    assert_eq!(order, vec![loud.id, quiet.id]);
    Ok(())
}
