//! Runs in its own process: it installs the process-wide word list.

use std::sync::Arc;

use anyhow::Result;
use floor_flow_shared::{
    collaborators::{NoopNotifier, StaticOwnership, StaticUserDirectory},
    model::{CommentStatus, SensitiveWord, TargetKind, TargetRef, WordAction},
    store::{MemoryCommentStore, WordStore},
    word_list, Collaborators, CommentService, CreateCommentInput, EngineConfig,
};

#[tokio::test]
async fn reload_installs_a_missing_word_list() -> Result<()> {
    assert!(word_list::default_list().is_none());
    let store = Arc::new(MemoryCommentStore::new());
    let service = CommentService::new(
        store.clone(),
        Collaborators {
            users: Arc::new(StaticUserDirectory::new()),
            ownership: Arc::new(StaticOwnership::new()),
            notifier: Arc::new(NoopNotifier),
        },
        EngineConfig::default(),
    );
    assert!(service.word_matcher().is_none());

    store.upsert_word(SensitiveWord::new("spam", 2, WordAction::Block, None)).await?;
    assert_eq!(service.reload_words().await?, 1);
    assert!(word_list::default_list().is_some());

    let comment = service
        .create_comment(CreateCommentInput {
            target: TargetRef::new(TargetKind::Post, 1),
            author_id: 7,
            parent_id: 0,
            reply_to_user_id: None,
            reply_to_comment_id: None,
            content: "this is spam content".to_string(),
            content_kind: Default::default(),
            reply_as_author: false,
        })
        .await?;
    assert_eq!(comment.status, CommentStatus::Auditing);
    Ok(())
}
