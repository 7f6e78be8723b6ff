//! Contracts the engine consumes from the surrounding application, and small
//! in-process implementations for tests and tooling.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::{CommentId, ReportId, ReportStatus, TargetRef, UserId};

/// Display data of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub username: String,
    /// Avatar URL, if the user set one.
    pub avatar: Option<String>,
}

/// Looks up display data of comment authors.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the user does not exist.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserProfile>>;
}

/// Decides who owns a comment target.
#[async_trait]
pub trait TargetOwnership: Send + Sync {
    /// Whether `user_id` owns the content the comments hang off.
    async fn is_owner(&self, target: TargetRef, user_id: UserId) -> Result<bool>;
}

/// Events produced by comment operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Someone replied to one of the recipient's comments.
    ReplyReceived {
        /// The reply.
        comment_id: CommentId,
        /// Target of the thread.
        target: TargetRef,
        /// Author of the reply.
        replier_id: UserId,
        /// Author of the parent comment.
        recipient_id: UserId,
    },
    /// A comment mentioned the recipient.
    Mentioned {
        /// The mentioning comment.
        comment_id: CommentId,
        /// Target of the thread.
        target: TargetRef,
        /// Author of the comment.
        author_id: UserId,
        /// The mentioned user.
        mentioned_user_id: UserId,
    },
    /// Reports hid the recipient's comment.
    CommentFolded {
        /// The folded comment.
        comment_id: CommentId,
        /// Author of the comment.
        author_id: UserId,
        /// Reports filed against it so far.
        report_count: usize,
    },
    /// An administrator resolved the recipient's report.
    ReportResolved {
        /// The resolved report.
        report_id: ReportId,
        /// The reported comment.
        comment_id: CommentId,
        /// User who filed the report.
        reporter_id: UserId,
        /// Final report state.
        status: ReportStatus,
    },
}

impl NotificationEvent {
    /// User the event is delivered to.
    pub fn recipient(&self) -> UserId {
        match self {
            NotificationEvent::ReplyReceived { recipient_id, .. } => *recipient_id,
            NotificationEvent::Mentioned { mentioned_user_id, .. } => *mentioned_user_id,
            NotificationEvent::CommentFolded { author_id, .. } => *author_id,
            NotificationEvent::ReportResolved { reporter_id, .. } => *reporter_id,
        }
    }

    /// Stable snake_case name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::ReplyReceived { .. } => "reply_received",
            NotificationEvent::Mentioned { .. } => "mentioned",
            NotificationEvent::CommentFolded { .. } => "comment_folded",
            NotificationEvent::ReportResolved { .. } => "report_resolved",
        }
    }
}

/// Fire-and-forget delivery. Implementations must not block and cannot fail
/// the operation that produced the event.
pub trait NotificationSink: Send + Sync {
    /// Queues `event` for delivery.
    fn dispatch(&self, event: NotificationEvent);
}

/// Fixed user table.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: HashMap<UserId, UserProfile>,
}

impl StaticUserDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user.
    pub fn with_user(mut self, id: UserId, username: &str, avatar: Option<&str>) -> Self {
        self.users.insert(
            id,
            UserProfile { username: username.to_string(), avatar: avatar.map(str::to_string) },
        );
        self
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.users.get(&id).cloned())
    }
}

/// Fixed ownership table; unknown targets have no owner.
#[derive(Debug, Clone, Default)]
pub struct StaticOwnership {
    owners: HashMap<TargetRef, UserId>,
}

impl StaticOwnership {
    /// No target has an owner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `owner` the owner of `target`.
    pub fn with_owner(mut self, target: TargetRef, owner: UserId) -> Self {
        self.owners.insert(target, owner);
        self
    }
}

#[async_trait]
impl TargetOwnership for StaticOwnership {
    async fn is_owner(&self, target: TargetRef, user_id: UserId) -> Result<bool> {
        Ok(self.owners.get(&target) == Some(&user_id))
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
    fn dispatch(&self, event: NotificationEvent) {
        tracing::debug!("dropping {} notification for user {}", event.kind(), event.recipient());
    }
}

/// Keeps every dispatched event in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events dispatched so far, oldest first.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn dispatch(&self, event: NotificationEvent) {
        self.events.lock().push(event);
    }
}
