//! Records shared by every part of the comment engine.
//!
//! Enumerations persist as short lowercase strings (or numeric codes where the
//! administrator tooling speaks codes), so every enum carries an `as_str` /
//! `FromStr` pair used by the SQLite store and the CLI.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Database identity of a comment. `0` means "no comment" (e.g. no parent).
pub type CommentId = i64;
/// Identity of a user supplied by the caller's auth layer.
pub type UserId = i64;
/// Identity of a sensitive-word report.
pub type ReportId = i64;

/// Kind of content a comment thread hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Blog article.
    Article,
    /// Video page.
    Video,
    /// Question/answer entry.
    Qa,
    /// Community post.
    Post,
}

impl TargetKind {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Article => "article",
            TargetKind::Video => "video",
            TargetKind::Qa => "qa",
            TargetKind::Post => "post",
        }
    }
}

impl FromStr for TargetKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "article" => Ok(TargetKind::Article),
            "video" => Ok(TargetKind::Video),
            "qa" => Ok(TargetKind::Qa),
            "post" => Ok(TargetKind::Post),
            other => anyhow::bail!("unknown target kind: {other}"),
        }
    }
}

/// The `(targetType, targetId)` pair a comment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    /// Content kind.
    pub kind: TargetKind,
    /// Content id within its kind.
    pub id: i64,
}

impl TargetRef {
    /// Builds a target reference.
    pub fn new(kind: TargetKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// Visibility state of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    /// Visible.
    Normal,
    /// Waiting for a moderator.
    Auditing,
    /// Soft-deleted.
    Deleted,
    /// Hidden from default views, still stored.
    Folded,
    /// Blocked by an administrator.
    Blocked,
}

impl CommentStatus {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            CommentStatus::Normal => "normal",
            CommentStatus::Auditing => "auditing",
            CommentStatus::Deleted => "deleted",
            CommentStatus::Folded => "folded",
            CommentStatus::Blocked => "blocked",
        }
    }

    /// Whether the comment is shown in default thread listings.
    pub fn is_listed(self) -> bool {
        matches!(self, CommentStatus::Normal | CommentStatus::Folded)
    }
}

impl FromStr for CommentStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(CommentStatus::Normal),
            "auditing" => Ok(CommentStatus::Auditing),
            "deleted" => Ok(CommentStatus::Deleted),
            "folded" => Ok(CommentStatus::Folded),
            "blocked" => Ok(CommentStatus::Blocked),
            other => anyhow::bail!("unknown comment status: {other}"),
        }
    }
}

/// Outcome of the moderation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Needs a human decision.
    Pending,
    /// Published without review.
    Approved,
    /// Kept for the audit trail only.
    Rejected,
}

impl AuditStatus {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Pending => "pending",
            AuditStatus::Approved => "approved",
            AuditStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for AuditStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AuditStatus::Pending),
            "approved" => Ok(AuditStatus::Approved),
            "rejected" => Ok(AuditStatus::Rejected),
            other => anyhow::bail!("unknown audit status: {other}"),
        }
    }
}

/// Content risk, ordered from harmless to dangerous.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Nothing suspicious.
    #[default]
    Normal,
    /// Cosmetic issue.
    Low,
    /// Worth a look.
    Medium,
    /// Hidden until reviewed.
    High,
}

impl RiskLevel {
    /// Numeric code stored alongside the comment.
    pub fn code(self) -> i32 {
        match self {
            RiskLevel::Normal => 0,
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }

    /// Inverse of [`RiskLevel::code`]; out-of-range codes clamp.
    pub fn from_code(code: i32) -> Self {
        match code {
            i32::MIN..=0 => RiskLevel::Normal,
            1 => RiskLevel::Low,
            2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

/// How the comment body should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Plain text.
    #[default]
    Text,
    /// Markdown source.
    Markdown,
    /// Text with attached images.
    Image,
}

impl ContentKind {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Markdown => "markdown",
            ContentKind::Image => "image",
        }
    }
}

impl FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ContentKind::Text),
            "markdown" => Ok(ContentKind::Markdown),
            "image" => Ok(ContentKind::Image),
            other => anyhow::bail!("unknown content kind: {other}"),
        }
    }
}

/// Boolean presentation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentFlags {
    /// Pinned to the top of the thread by the target owner.
    pub pinned: bool,
    /// Written by the owner of the target.
    pub author_authored: bool,
    /// Member of the latest hot snapshot.
    pub hot: bool,
    /// Featured by the target owner.
    pub featured: bool,
}

/// Interaction counters. Updated in place, never recomputed from a stale read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCounters {
    /// Likes.
    pub like_count: i64,
    /// Dislikes.
    pub dislike_count: i64,
    /// Replies whose parent is this comment.
    pub direct_reply_count: i64,
    /// Replies anywhere under this root (only maintained on roots).
    pub total_reply_count: i64,
}

/// A comment in a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Store-assigned id.
    pub id: CommentId,
    /// Content the comment hangs off.
    pub target: TargetRef,
    /// Writer of the comment.
    pub author_id: UserId,
    /// Structural parent; `0` for a root.
    pub parent_id: CommentId,
    /// Id of the root comment; equals `id` for a root.
    pub root_id: CommentId,
    /// User addressed with an @-mention, if any.
    pub reply_to_user_id: Option<UserId>,
    /// Comment the mention refers to, if any.
    pub reply_to_comment_id: Option<CommentId>,
    /// Root-level ordinal under the target, shared by the whole thread.
    pub floor_number: i64,
    /// Ordinal among the parent's direct replies; `0` for a root.
    pub sub_floor_number: i64,
    /// Ancestor ids from the root down to the parent.
    pub reply_chain: Vec<CommentId>,
    /// `0` for a root, parent depth plus one otherwise.
    pub depth: u32,
    /// Stored text, with replace-action words masked.
    pub content: String,
    /// Format of `content`.
    pub content_kind: ContentKind,
    /// Visibility state.
    pub status: CommentStatus,
    /// Owner and ranking flags.
    pub flags: CommentFlags,
    /// Interaction counters.
    pub counters: CommentCounters,
    /// Last computed decayed popularity.
    pub hot_score: f64,
    /// Last computed approval ratio in `0..=100`.
    pub quality_score: f64,
    /// Moderation outcome.
    pub audit_status: AuditStatus,
    /// Highest risk found by moderation.
    pub risk_level: RiskLevel,
    /// Creation time in milliseconds; `0` when unknown.
    pub created_at: i64,
    /// Last modification time in milliseconds.
    pub updated_at: i64,
    /// Soft-delete time in milliseconds.
    pub deleted_at: Option<i64>,
}

impl Comment {
    /// Root comments have no structural parent.
    pub fn is_root(&self) -> bool {
        self.parent_id == 0
    }
}

/// Everything needed to persist a new comment except its structural
/// position, which the store assigns atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentDraft {
    /// Content the comment hangs off.
    pub target: TargetRef,
    /// Writer of the comment.
    pub author_id: UserId,
    /// Structural parent; `0` for a root.
    pub parent_id: CommentId,
    /// User addressed with an @-mention, if any.
    pub reply_to_user_id: Option<UserId>,
    /// Comment the mention refers to, if any.
    pub reply_to_comment_id: Option<CommentId>,
    /// Text after masking.
    pub content: String,
    /// Format of `content`.
    pub content_kind: ContentKind,
    /// Initial visibility decided by moderation.
    pub status: CommentStatus,
    /// Moderation outcome.
    pub audit_status: AuditStatus,
    /// Highest risk found by moderation.
    pub risk_level: RiskLevel,
    /// Written by the owner of the target.
    pub author_authored: bool,
    /// Creation time in milliseconds.
    pub created_at: i64,
}

/// Signed change applied to interaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    /// Change of the like counter.
    pub like: i64,
    /// Change of the dislike counter.
    pub dislike: i64,
}

impl CommentCounters {
    /// Applies `delta`, flooring each counter at zero.
    pub fn apply(&mut self, delta: CounterDelta) {
        self.like_count = (self.like_count + delta.like).max(0);
        self.dislike_count = (self.dislike_count + delta.dislike).max(0);
    }
}

/// What a matched sensitive word does to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordAction {
    /// Mask the span.
    Replace,
    /// Refuse the text.
    Block,
    /// Let it through but raise it for review.
    Flag,
}

impl WordAction {
    /// Administrator-facing numeric code (1 replace, 2 block, 3 flag).
    pub fn code(self) -> i32 {
        match self {
            WordAction::Replace => 1,
            WordAction::Block => 2,
            WordAction::Flag => 3,
        }
    }

    /// Inverse of [`WordAction::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(WordAction::Replace),
            2 => Some(WordAction::Block),
            3 => Some(WordAction::Flag),
            _ => None,
        }
    }
}

/// Severity of a sensitive word at which a comment is rejected outright.
pub const SEVERITY_SERIOUS: u8 = 3;

/// Administrator-managed sensitive word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveWord {
    /// Surface form; matched case-insensitively.
    pub word: String,
    /// 1 (mild) to 3 (serious).
    pub level: u8,
    /// Effect of a match.
    pub action: WordAction,
    #[serde(default)]
    /// Text used by replace-action words instead of the fill character.
    pub replacement: Option<String>,
    #[serde(default = "default_enabled")]
    /// Disabled words stay stored but never match.
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SensitiveWord {
    /// Convenience constructor for an enabled word.
    pub fn new(word: &str, level: u8, action: WordAction, replacement: Option<&str>) -> Self {
        Self {
            word: word.to_string(),
            level: level.clamp(1, 3),
            action,
            replacement: replacement.map(str::to_string),
            enabled: true,
        }
    }
}

/// Why a user reported a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    /// Unsolicited advertising or flooding.
    Spam,
    /// Harassment or insults.
    Abuse,
    /// Illegal content.
    Illegal,
    /// Sexual content.
    Pornography,
    /// Anything else; see the description.
    Other,
}

impl ReportReason {
    /// Stored reason code.
    pub fn code(self) -> i32 {
        match self {
            ReportReason::Spam => 1,
            ReportReason::Abuse => 2,
            ReportReason::Illegal => 3,
            ReportReason::Pornography => 4,
            ReportReason::Other => 5,
        }
    }

    /// Unknown codes map to `Other`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ReportReason::Spam,
            2 => ReportReason::Abuse,
            3 => ReportReason::Illegal,
            4 => ReportReason::Pornography,
            _ => ReportReason::Other,
        }
    }
}

/// Review state of a report. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Waiting for an administrator.
    Pending,
    /// Violation confirmed.
    Approved,
    /// Dismissed.
    Rejected,
}

impl ReportStatus {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "approved" => Ok(ReportStatus::Approved),
            "rejected" => Ok(ReportStatus::Rejected),
            other => anyhow::bail!("unknown report status: {other}"),
        }
    }
}

/// A user's complaint about a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentReport {
    /// Store-assigned id.
    pub id: ReportId,
    /// Reported comment.
    pub comment_id: CommentId,
    /// User who filed the report.
    pub reporter_id: UserId,
    /// Category picked by the reporter.
    pub reason: ReportReason,
    /// Free-form details from the reporter.
    pub description: Option<String>,
    /// Review state.
    pub status: ReportStatus,
    /// Administrator who resolved the report.
    pub handler_id: Option<UserId>,
    /// Resolution time in milliseconds.
    pub handled_at: Option<i64>,
    /// Note left by the handler.
    pub handle_result: Option<String>,
    /// Filing time in milliseconds.
    pub created_at: i64,
}

/// Input for a new report; id and status are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReportInput {
    /// Reported comment.
    pub comment_id: CommentId,
    /// User filing the report.
    pub reporter_id: UserId,
    /// Category picked by the reporter.
    pub reason: ReportReason,
    /// Free-form details from the reporter.
    pub description: Option<String>,
    /// Filing time in milliseconds.
    pub created_at: i64,
}

/// Admin decision recorded on a pending report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResolution {
    /// Terminal state to move to.
    pub status: ReportStatus,
    /// Administrator resolving the report.
    pub handler_id: UserId,
    /// Resolution time in milliseconds.
    pub handled_at: i64,
    /// Note left by the handler.
    pub handle_result: Option<String>,
}

/// One author's current run of consecutive comments under one target. A comment
/// by anyone else ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorBuildingRecord {
    /// Target the run belongs to.
    pub target: TargetRef,
    /// Author of the run.
    pub author_id: UserId,
    /// Comments of the run in posting order.
    pub comment_ids: Vec<CommentId>,
    /// Length of the run.
    pub count: u32,
    /// Time of the latest comment in milliseconds.
    pub updated_at: i64,
}

/// One-based pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, page_size: 20 }
    }
}

impl PageRequest {
    /// Builds a request, clamping the page size to `1..=100`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page: page.max(1), page_size: page_size.clamp(1, 100) }
    }

    /// Rows to skip.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.limit()
    }

    /// Rows to return.
    pub fn limit(&self) -> usize {
        self.page_size.clamp(1, 100) as usize
    }
}

/// Ordering of a thread listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadOrder {
    /// Ascending floor number.
    #[default]
    Floor,
    /// Descending hot score.
    Hot,
    /// Newest first.
    Newest,
}

/// Fields the owner of a target may toggle on a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFlag {
    /// Shown above the other roots.
    Pinned,
    /// Highlighted by the owner.
    Featured,
}
