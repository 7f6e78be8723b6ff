use std::{path::Path, str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{
    params, types::Type, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

use super::{
    word_key, CommentStore, FloorBuildingStore, ReportInsert, ReportResolve, ReportStore,
    WordStore,
};
use crate::{
    model::{
        AuditStatus, Comment, CommentCounters, CommentDraft, CommentFlags, CommentId,
        CommentReport, CommentStatus, CounterDelta, FloorBuildingRecord, NewReportInput,
        OwnerFlag, PageRequest, ReportId, ReportReason, ReportResolution, ReportStatus,
        RiskLevel, SensitiveWord, TargetKind, TargetRef, ThreadOrder, UserId, WordAction,
    },
    thread_builder,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_type TEXT NOT NULL,
    target_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    parent_id INTEGER NOT NULL DEFAULT 0,
    root_id INTEGER NOT NULL DEFAULT 0,
    reply_to_user_id INTEGER,
    reply_to_comment_id INTEGER,
    floor_number INTEGER NOT NULL,
    sub_floor_number INTEGER NOT NULL,
    reply_chain TEXT NOT NULL DEFAULT '[]',
    depth INTEGER NOT NULL DEFAULT 0,
    content TEXT NOT NULL,
    content_kind TEXT NOT NULL DEFAULT 'text',
    status TEXT NOT NULL,
    is_pinned INTEGER NOT NULL DEFAULT 0,
    is_author INTEGER NOT NULL DEFAULT 0,
    is_hot INTEGER NOT NULL DEFAULT 0,
    is_featured INTEGER NOT NULL DEFAULT 0,
    like_count INTEGER NOT NULL DEFAULT 0,
    dislike_count INTEGER NOT NULL DEFAULT 0,
    direct_reply_count INTEGER NOT NULL DEFAULT 0,
    total_reply_count INTEGER NOT NULL DEFAULT 0,
    hot_score REAL NOT NULL DEFAULT 0,
    quality_score REAL NOT NULL DEFAULT 0,
    audit_status TEXT NOT NULL,
    risk_level INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0,
    deleted_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_comments_target ON comments (target_type, target_id, parent_id);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments (parent_id);
CREATE INDEX IF NOT EXISTS idx_comments_author ON comments (author_id);

CREATE TABLE IF NOT EXISTS thread_counters (
    scope TEXT PRIMARY KEY,
    last_value INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS comment_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    comment_id INTEGER NOT NULL,
    reporter_id INTEGER NOT NULL,
    reason_code INTEGER NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    handler_id INTEGER,
    handled_at INTEGER,
    handle_result TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reports_comment ON comment_reports (comment_id);

CREATE TABLE IF NOT EXISTS sensitive_words (
    word_key TEXT PRIMARY KEY,
    word TEXT NOT NULL,
    level INTEGER NOT NULL,
    action_code INTEGER NOT NULL,
    replacement TEXT,
    enabled INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS floor_building (
    target_type TEXT NOT NULL,
    target_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    comment_ids TEXT NOT NULL,
    count INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (target_type, target_id, author_id)
);
"#;

const COMMENT_COLUMNS: &str = "id, target_type, target_id, author_id, parent_id, root_id, \
                               reply_to_user_id, reply_to_comment_id, floor_number, \
                               sub_floor_number, reply_chain, depth, content, content_kind, \
                               status, is_pinned, is_author, is_hot, is_featured, like_count, \
                               dislike_count, direct_reply_count, total_reply_count, hot_score, \
                               quality_score, audit_status, risk_level, created_at, updated_at, \
                               deleted_at";

const REPORT_COLUMNS: &str = "id, comment_id, reporter_id, reason_code, description, status, \
                              handler_id, handled_at, handle_result, created_at";

const LISTED_STATUSES: &str = "('normal', 'folded')";

/// SQLite-backed store. Calls run on the blocking pool; atomic steps use
/// `BEGIN IMMEDIATE` so concurrent processes sharing the file serialise too.
#[derive(Clone)]
pub struct SqliteCommentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCommentStore {
    /// Opens or creates the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open comments sqlite {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("failed to enable WAL")?;
        Self::init(conn)
    }

    /// Private database that lives as long as the store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("failed to set sqlite busy timeout")?;
        conn.execute_batch(SCHEMA)
            .context("failed to create comment tables")?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            op(&mut guard)
        })
        .await
        .context("sqlite task panicked")?
    }
}

fn immediate(conn: &mut Connection) -> Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin immediate transaction")
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|err| conversion_error(idx, err))
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let kind: TargetKind = parse_text(row, 1)?;
    let chain_raw: String = row.get(10)?;
    let reply_chain: Vec<CommentId> =
        serde_json::from_str(&chain_raw).map_err(|err| conversion_error(10, err))?;
    let depth: i64 = row.get(11)?;

    Ok(Comment {
        id: row.get(0)?,
        target: TargetRef::new(kind, row.get(2)?),
        author_id: row.get(3)?,
        parent_id: row.get(4)?,
        root_id: row.get(5)?,
        reply_to_user_id: row.get(6)?,
        reply_to_comment_id: row.get(7)?,
        floor_number: row.get(8)?,
        sub_floor_number: row.get(9)?,
        reply_chain,
        depth: u32::try_from(depth).unwrap_or_default(),
        content: row.get(12)?,
        content_kind: parse_text(row, 13)?,
        status: parse_text(row, 14)?,
        flags: CommentFlags {
            pinned: row.get(15)?,
            author_authored: row.get(16)?,
            hot: row.get(17)?,
            featured: row.get(18)?,
        },
        counters: CommentCounters {
            like_count: row.get(19)?,
            dislike_count: row.get(20)?,
            direct_reply_count: row.get(21)?,
            total_reply_count: row.get(22)?,
        },
        hot_score: row.get(23)?,
        quality_score: row.get(24)?,
        audit_status: parse_text::<AuditStatus>(row, 25)?,
        risk_level: RiskLevel::from_code(row.get(26)?),
        created_at: row.get(27)?,
        updated_at: row.get(28)?,
        deleted_at: row.get(29)?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<CommentReport> {
    Ok(CommentReport {
        id: row.get(0)?,
        comment_id: row.get(1)?,
        reporter_id: row.get(2)?,
        reason: ReportReason::from_code(row.get(3)?),
        description: row.get(4)?,
        status: parse_text(row, 5)?,
        handler_id: row.get(6)?,
        handled_at: row.get(7)?,
        handle_result: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn word_from_row(row: &Row<'_>) -> rusqlite::Result<SensitiveWord> {
    let level: i64 = row.get(1)?;
    let action_code: i32 = row.get(2)?;
    let action = WordAction::from_code(action_code)
        .ok_or_else(|| conversion_error(2, format!("unknown word action code {action_code}")))?;
    Ok(SensitiveWord {
        word: row.get(0)?,
        level: u8::try_from(level.clamp(1, 3)).unwrap_or(1),
        action,
        replacement: row.get(3)?,
        enabled: row.get(4)?,
    })
}

fn load_comment(conn: &Connection, id: CommentId) -> Result<Option<Comment>> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
        params![id],
        comment_from_row,
    )
    .optional()
    .with_context(|| format!("failed to load comment {id}"))
}

fn load_report(conn: &Connection, id: ReportId) -> Result<Option<CommentReport>> {
    conn.query_row(
        &format!("SELECT {REPORT_COLUMNS} FROM comment_reports WHERE id = ?1"),
        params![id],
        report_from_row,
    )
    .optional()
    .with_context(|| format!("failed to load report {id}"))
}

fn query_comments(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(sql).context("failed to prepare comment query")?;
    let rows = stmt
        .query_map(params, comment_from_row)
        .context("failed to run comment query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to decode comment rows")?;
    Ok(rows)
}

/// Bumps the counter of `scope`, seeding it from the largest existing number
/// so rows written before the counter existed are never duplicated.
fn next_scoped_number(tx: &Transaction<'_>, scope: &str, existing_max: i64) -> Result<i64> {
    tx.query_row(
        "INSERT INTO thread_counters (scope, last_value) VALUES (?1, ?2 + 1) \
         ON CONFLICT(scope) DO UPDATE \
         SET last_value = MAX(last_value, excluded.last_value - 1) + 1 \
         RETURNING last_value",
        params![scope, existing_max],
        |row| row.get(0),
    )
    .with_context(|| format!("failed to bump thread counter {scope}"))
}

fn order_clause(order: ThreadOrder) -> &'static str {
    match order {
        ThreadOrder::Floor => "is_pinned DESC, floor_number ASC",
        ThreadOrder::Hot => "is_pinned DESC, hot_score DESC, floor_number ASC",
        ThreadOrder::Newest => "is_pinned DESC, created_at DESC, id DESC",
    }
}

#[async_trait]
impl CommentStore for SqliteCommentStore {
    async fn insert_threaded(&self, draft: CommentDraft) -> Result<Option<Comment>> {
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;

            let position = if draft.parent_id == 0 {
                let existing: i64 = tx
                    .query_row(
                        "SELECT COALESCE(MAX(floor_number), 0) FROM comments \
                         WHERE target_type = ?1 AND target_id = ?2 AND parent_id = 0",
                        params![draft.target.kind.as_str(), draft.target.id],
                        |row| row.get(0),
                    )
                    .context("failed to read max floor")?;
                let scope = format!("floor:{}", draft.target);
                let next = next_scoped_number(&tx, &scope, existing)?;
                thread_builder::root_position(Some(next - 1))
            } else {
                let Some(parent) = load_comment(&tx, draft.parent_id)? else {
                    return Ok(None);
                };
                let existing: i64 = tx
                    .query_row(
                        "SELECT COALESCE(MAX(sub_floor_number), 0) FROM comments \
                         WHERE parent_id = ?1",
                        params![parent.id],
                        |row| row.get(0),
                    )
                    .context("failed to read max sub floor")?;
                let scope = format!("sub:{}", parent.id);
                let next = next_scoped_number(&tx, &scope, existing)?;
                thread_builder::reply_position(&parent, Some(next - 1))
            };

            let reply_chain =
                serde_json::to_string(&position.reply_chain).context("failed to encode chain")?;
            tx.execute(
                "INSERT INTO comments (target_type, target_id, author_id, parent_id, root_id, \
                 reply_to_user_id, reply_to_comment_id, floor_number, sub_floor_number, \
                 reply_chain, depth, content, content_kind, status, is_author, audit_status, \
                 risk_level, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                 ?17, ?18, ?18)",
                params![
                    draft.target.kind.as_str(),
                    draft.target.id,
                    draft.author_id,
                    draft.parent_id,
                    position.root_id,
                    draft.reply_to_user_id,
                    draft.reply_to_comment_id,
                    position.floor_number,
                    position.sub_floor_number,
                    reply_chain,
                    position.depth,
                    draft.content,
                    draft.content_kind.as_str(),
                    draft.status.as_str(),
                    draft.author_authored,
                    draft.audit_status.as_str(),
                    draft.risk_level.code(),
                    draft.created_at,
                ],
            )
            .context("failed to insert comment")?;
            let id = tx.last_insert_rowid();

            if draft.parent_id == 0 {
                tx.execute("UPDATE comments SET root_id = ?1 WHERE id = ?1", params![id])
                    .context("failed to set root id")?;
            } else {
                tx.execute(
                    "UPDATE comments SET direct_reply_count = direct_reply_count + 1 WHERE id = ?1",
                    params![draft.parent_id],
                )
                .context("failed to bump parent reply count")?;
                tx.execute(
                    "UPDATE comments SET total_reply_count = total_reply_count + 1 WHERE id = ?1",
                    params![position.root_id],
                )
                .context("failed to bump root reply count")?;
            }

            let comment = load_comment(&tx, id)?
                .with_context(|| format!("inserted comment {id} vanished"))?;
            tx.commit().context("failed to commit comment insert")?;
            Ok(Some(comment))
        })
        .await
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        self.with_conn(move |conn| load_comment(conn, id)).await
    }

    async fn list_roots(
        &self,
        target: TargetRef,
        order: ThreadOrder,
        page: PageRequest,
    ) -> Result<Vec<Comment>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE target_type = ?1 AND target_id = ?2 \
                 AND parent_id = 0 AND status IN {LISTED_STATUSES} ORDER BY {} LIMIT ?3 OFFSET ?4",
                order_clause(order)
            );
            query_comments(
                conn,
                &sql,
                params![target.kind.as_str(), target.id, page.limit() as i64, page.offset() as i64],
            )
        })
        .await
    }

    async fn list_replies(&self, parent_id: CommentId, page: PageRequest) -> Result<Vec<Comment>> {
        if parent_id == 0 {
            return Ok(vec![]);
        }
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE parent_id = ?1 \
                 AND status IN {LISTED_STATUSES} ORDER BY sub_floor_number ASC LIMIT ?2 OFFSET ?3"
            );
            query_comments(
                conn,
                &sql,
                params![parent_id, page.limit() as i64, page.offset() as i64],
            )
        })
        .await
    }

    async fn list_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Vec<Comment>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE author_id = ?1 \
                 AND status != 'deleted' ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
            );
            query_comments(conn, &sql, params![user_id, page.limit() as i64, page.offset() as i64])
        })
        .await
    }

    async fn list_all_by_target(&self, target: TargetRef) -> Result<Vec<Comment>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE target_type = ?1 AND target_id = ?2 \
                 AND status != 'deleted' ORDER BY id ASC"
            );
            query_comments(conn, &sql, params![target.kind.as_str(), target.id])
        })
        .await
    }

    async fn list_targets(&self) -> Result<Vec<TargetRef>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT target_type, target_id FROM comments \
                     ORDER BY target_type, target_id",
                )
                .context("failed to prepare target query")?;
            let rows = stmt
                .query_map([], |row| Ok(TargetRef::new(parse_text(row, 0)?, row.get(1)?)))
                .context("failed to list targets")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to decode targets")?;
            Ok(rows)
        })
        .await
    }

    async fn max_floor(&self, target: TargetRef) -> Result<Option<i64>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT MAX(floor_number) FROM comments \
                 WHERE target_type = ?1 AND target_id = ?2 AND parent_id = 0",
                params![target.kind.as_str(), target.id],
                |row| row.get(0),
            )
            .context("failed to read max floor")
        })
        .await
    }

    async fn max_sub_floor(&self, parent_id: CommentId) -> Result<Option<i64>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT MAX(sub_floor_number) FROM comments WHERE parent_id = ?1 AND ?1 != 0",
                params![parent_id],
                |row| row.get(0),
            )
            .context("failed to read max sub floor")
        })
        .await
    }

    async fn apply_counters(&self, id: CommentId, delta: CounterDelta) -> Result<Option<Comment>> {
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            tx.execute(
                "UPDATE comments SET like_count = MAX(like_count + ?1, 0), \
                 dislike_count = MAX(dislike_count + ?2, 0) WHERE id = ?3",
                params![delta.like, delta.dislike, id],
            )
            .with_context(|| format!("failed to update counters of comment {id}"))?;
            let comment = load_comment(&tx, id)?;
            tx.commit().context("failed to commit counter update")?;
            Ok(comment)
        })
        .await
    }

    async fn update_status(
        &self,
        id: CommentId,
        status: CommentStatus,
        now_ms: i64,
    ) -> Result<Option<Comment>> {
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            tx.execute(
                "UPDATE comments SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now_ms, id],
            )
            .with_context(|| format!("failed to update status of comment {id}"))?;
            let comment = load_comment(&tx, id)?;
            tx.commit().context("failed to commit status update")?;
            Ok(comment)
        })
        .await
    }

    async fn batch_update_status(
        &self,
        ids: &[CommentId],
        status: CommentStatus,
        now_ms: i64,
    ) -> Result<usize> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            let mut changed = 0;
            {
                let mut stmt = tx
                    .prepare(
                        "UPDATE comments SET status = ?1, updated_at = ?2 \
                         WHERE id = ?3 AND status != ?1",
                    )
                    .context("failed to prepare batch status update")?;
                for id in ids {
                    changed += stmt
                        .execute(params![status.as_str(), now_ms, id])
                        .with_context(|| format!("failed to update status of comment {id}"))?;
                }
            }
            tx.commit().context("failed to commit batch status update")?;
            Ok(changed)
        })
        .await
    }

    async fn fold_if_visible(&self, id: CommentId, now_ms: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE comments SET status = 'folded', updated_at = ?1 \
                     WHERE id = ?2 AND status IN ('normal', 'auditing')",
                    params![now_ms, id],
                )
                .with_context(|| format!("failed to fold comment {id}"))?;
            Ok(changed == 1)
        })
        .await
    }

    async fn soft_delete(&self, id: CommentId, now_ms: i64) -> Result<Option<Comment>> {
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            tx.execute(
                "UPDATE comments SET status = 'deleted', deleted_at = ?1, updated_at = ?1 \
                 WHERE id = ?2 AND status != 'deleted'",
                params![now_ms, id],
            )
            .with_context(|| format!("failed to soft delete comment {id}"))?;
            let comment = load_comment(&tx, id)?;
            tx.commit().context("failed to commit soft delete")?;
            Ok(comment)
        })
        .await
    }

    async fn purge(&self, id: CommentId) -> Result<bool> {
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM comments WHERE id = ?1", params![id])
                .with_context(|| format!("failed to purge comment {id}"))?;
            Ok(removed > 0)
        })
        .await
    }

    async fn set_owner_flag(
        &self,
        id: CommentId,
        flag: OwnerFlag,
        value: bool,
        now_ms: i64,
    ) -> Result<Option<Comment>> {
        self.with_conn(move |conn| {
            let column = match flag {
                OwnerFlag::Pinned => "is_pinned",
                OwnerFlag::Featured => "is_featured",
            };
            let tx = immediate(conn)?;
            tx.execute(
                &format!("UPDATE comments SET {column} = ?1, updated_at = ?2 WHERE id = ?3"),
                params![value, now_ms, id],
            )
            .with_context(|| format!("failed to set {column} on comment {id}"))?;
            let comment = load_comment(&tx, id)?;
            tx.commit().context("failed to commit flag update")?;
            Ok(comment)
        })
        .await
    }

    async fn set_scores(&self, id: CommentId, hot_score: f64, quality_score: f64) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE comments SET hot_score = ?1, quality_score = ?2 WHERE id = ?3",
                params![hot_score, quality_score, id],
            )
            .with_context(|| format!("failed to store scores of comment {id}"))?;
            Ok(())
        })
        .await
    }

    async fn set_hot_members(&self, target: TargetRef, ids: &[CommentId]) -> Result<()> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            tx.execute(
                "UPDATE comments SET is_hot = 0 WHERE target_type = ?1 AND target_id = ?2",
                params![target.kind.as_str(), target.id],
            )
            .context("failed to clear hot flags")?;
            {
                let mut stmt = tx
                    .prepare(
                        "UPDATE comments SET is_hot = 1 \
                         WHERE id = ?1 AND target_type = ?2 AND target_id = ?3",
                    )
                    .context("failed to prepare hot flag update")?;
                for id in ids {
                    stmt.execute(params![id, target.kind.as_str(), target.id])
                        .with_context(|| format!("failed to flag comment {id} as hot"))?;
                }
            }
            tx.commit().context("failed to commit hot flags")
        })
        .await
    }
}

#[async_trait]
impl ReportStore for SqliteCommentStore {
    async fn insert_report(&self, input: NewReportInput) -> Result<ReportInsert> {
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            let duplicate: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM comment_reports WHERE comment_id = ?1 \
                     AND reporter_id = ?2 AND status = 'pending')",
                    params![input.comment_id, input.reporter_id],
                    |row| row.get(0),
                )
                .context("failed to check duplicate report")?;
            if duplicate {
                return Ok(ReportInsert::Duplicate);
            }

            tx.execute(
                "INSERT INTO comment_reports (comment_id, reporter_id, reason_code, description, \
                 status, created_at) VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                params![
                    input.comment_id,
                    input.reporter_id,
                    input.reason.code(),
                    input.description,
                    input.created_at,
                ],
            )
            .context("failed to insert report")?;
            let id = tx.last_insert_rowid();
            let report_count: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM comment_reports WHERE comment_id = ?1",
                    params![input.comment_id],
                    |row| row.get(0),
                )
                .context("failed to count reports")?;
            let report =
                load_report(&tx, id)?.with_context(|| format!("inserted report {id} vanished"))?;
            tx.commit().context("failed to commit report")?;
            Ok(ReportInsert::Created {
                report,
                report_count: usize::try_from(report_count).unwrap_or_default(),
            })
        })
        .await
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<CommentReport>> {
        self.with_conn(move |conn| load_report(conn, id)).await
    }

    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: usize,
    ) -> Result<Vec<CommentReport>> {
        self.with_conn(move |conn| {
            let limit = limit.max(1) as i64;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {REPORT_COLUMNS} FROM comment_reports \
                     WHERE (?1 IS NULL OR status = ?1) ORDER BY id DESC LIMIT ?2"
                ))
                .context("failed to prepare report query")?;
            let rows = stmt
                .query_map(params![status.map(ReportStatus::as_str), limit], report_from_row)
                .context("failed to list reports")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to decode reports")?;
            Ok(rows)
        })
        .await
    }

    async fn resolve_report(
        &self,
        id: ReportId,
        resolution: ReportResolution,
    ) -> Result<ReportResolve> {
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            let Some(current) = load_report(&tx, id)? else {
                return Ok(ReportResolve::NotFound);
            };
            if current.status != ReportStatus::Pending {
                return Ok(ReportResolve::AlreadyResolved(current));
            }
            tx.execute(
                "UPDATE comment_reports SET status = ?1, handler_id = ?2, handled_at = ?3, \
                 handle_result = ?4 WHERE id = ?5 AND status = 'pending'",
                params![
                    resolution.status.as_str(),
                    resolution.handler_id,
                    resolution.handled_at,
                    resolution.handle_result,
                    id,
                ],
            )
            .with_context(|| format!("failed to resolve report {id}"))?;
            let report =
                load_report(&tx, id)?.with_context(|| format!("resolved report {id} vanished"))?;
            tx.commit().context("failed to commit report resolution")?;
            Ok(ReportResolve::Resolved(report))
        })
        .await
    }
}

#[async_trait]
impl WordStore for SqliteCommentStore {
    async fn list_words(&self, enabled_only: bool) -> Result<Vec<SensitiveWord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT word, level, action_code, replacement, enabled FROM sensitive_words \
                     WHERE (?1 = 0 OR enabled = 1) ORDER BY word_key",
                )
                .context("failed to prepare word query")?;
            let rows = stmt
                .query_map(params![enabled_only], word_from_row)
                .context("failed to list sensitive words")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to decode sensitive words")?;
            Ok(rows)
        })
        .await
    }

    async fn upsert_word(&self, word: SensitiveWord) -> Result<()> {
        let key = word_key(&word.word);
        if key.is_empty() {
            anyhow::bail!("sensitive word cannot be blank");
        }
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sensitive_words (word_key, word, level, action_code, replacement, \
                 enabled) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(word_key) DO UPDATE SET word = excluded.word, level = excluded.level, \
                 action_code = excluded.action_code, replacement = excluded.replacement, \
                 enabled = excluded.enabled",
                params![
                    key,
                    word.word.trim(),
                    word.level,
                    word.action.code(),
                    word.replacement,
                    word.enabled,
                ],
            )
            .with_context(|| format!("failed to upsert sensitive word {key}"))?;
            Ok(())
        })
        .await
    }

    async fn set_word_enabled(&self, word: &str, enabled: bool) -> Result<bool> {
        let key = word_key(word);
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE sensitive_words SET enabled = ?1 WHERE word_key = ?2",
                    params![enabled, key],
                )
                .context("failed to toggle sensitive word")?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_word(&self, word: &str) -> Result<bool> {
        let key = word_key(word);
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM sensitive_words WHERE word_key = ?1", params![key])
                .context("failed to delete sensitive word")?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl FloorBuildingStore for SqliteCommentStore {
    async fn record_floor_building(
        &self,
        target: TargetRef,
        author_id: UserId,
        comment_id: CommentId,
        now_ms: i64,
    ) -> Result<FloorBuildingRecord> {
        self.with_conn(move |conn| {
            let tx = immediate(conn)?;
            tx.execute(
                "DELETE FROM floor_building \
                 WHERE target_type = ?1 AND target_id = ?2 AND author_id <> ?3",
                params![target.kind.as_str(), target.id, author_id],
            )
            .context("failed to end other floor building runs")?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT comment_ids FROM floor_building \
                     WHERE target_type = ?1 AND target_id = ?2 AND author_id = ?3",
                    params![target.kind.as_str(), target.id, author_id],
                    |row| row.get(0),
                )
                .optional()
                .context("failed to read floor building record")?;
            let mut comment_ids: Vec<CommentId> = match existing {
                Some(raw) => serde_json::from_str(&raw).context("invalid floor building ids")?,
                None => Vec::new(),
            };
            comment_ids.push(comment_id);
            let count = u32::try_from(comment_ids.len()).unwrap_or(u32::MAX);
            let encoded = serde_json::to_string(&comment_ids).context("failed to encode ids")?;
            tx.execute(
                "INSERT INTO floor_building (target_type, target_id, author_id, comment_ids, \
                 count, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(target_type, target_id, author_id) DO UPDATE SET \
                 comment_ids = excluded.comment_ids, count = excluded.count, \
                 updated_at = excluded.updated_at",
                params![target.kind.as_str(), target.id, author_id, encoded, count, now_ms],
            )
            .context("failed to write floor building record")?;
            tx.commit().context("failed to commit floor building record")?;
            Ok(FloorBuildingRecord { target, author_id, comment_ids, count, updated_at: now_ms })
        })
        .await
    }

    async fn get_floor_building(
        &self,
        target: TargetRef,
        author_id: UserId,
    ) -> Result<Option<FloorBuildingRecord>> {
        self.with_conn(move |conn| {
            let row: Option<(String, u32, i64)> = conn
                .query_row(
                    "SELECT comment_ids, count, updated_at FROM floor_building \
                     WHERE target_type = ?1 AND target_id = ?2 AND author_id = ?3",
                    params![target.kind.as_str(), target.id, author_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .context("failed to read floor building record")?;
            row.map(|(raw, count, updated_at)| {
                let comment_ids =
                    serde_json::from_str(&raw).context("invalid floor building ids")?;
                Ok(FloorBuildingRecord { target, author_id, comment_ids, count, updated_at })
            })
            .transpose()
        })
        .await
    }
}
