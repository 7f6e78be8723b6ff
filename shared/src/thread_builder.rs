//! Structural placement of a comment inside its thread.
//!
//! These functions are pure: the store calls them inside the critical section
//! that also reads the scoped maximum and inserts the row, which is what makes
//! floor numbers unique under concurrent posting.

use serde::Serialize;

use crate::model::{Comment, CommentCounters, CommentDraft, CommentFlags, CommentId};

/// Position assigned to a new comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadPosition {
    /// Root-level ordinal under the target.
    pub floor_number: i64,
    /// Ordinal among the parent's replies; `0` for a root.
    pub sub_floor_number: i64,
    /// Distance from the root.
    pub depth: u32,
    /// Ancestor ids from the root down to the parent.
    pub reply_chain: Vec<CommentId>,
    /// `0` for a root until the store assigns its id.
    pub root_id: CommentId,
}

/// Position of a new root given the current maximum floor of its target.
pub fn root_position(max_floor: Option<i64>) -> ThreadPosition {
    ThreadPosition {
        floor_number: max_floor.unwrap_or(0) + 1,
        sub_floor_number: 0,
        depth: 0,
        reply_chain: Vec::new(),
        root_id: 0,
    }
}

/// Position of a reply given its parent and the parent's current maximum
/// sub-floor.
pub fn reply_position(parent: &Comment, max_sub_floor: Option<i64>) -> ThreadPosition {
    let mut reply_chain = Vec::with_capacity(parent.reply_chain.len() + 1);
    reply_chain.extend_from_slice(&parent.reply_chain);
    reply_chain.push(parent.id);

    let root_id = if parent.root_id == 0 || parent.is_root() {
        parent.id
    } else {
        parent.root_id
    };

    ThreadPosition {
        floor_number: parent.floor_number,
        sub_floor_number: max_sub_floor.unwrap_or(0) + 1,
        depth: parent.depth + 1,
        reply_chain,
        root_id,
    }
}

/// Materialises the stored comment once the store has an id for it.
pub fn assemble(id: CommentId, draft: CommentDraft, position: ThreadPosition) -> Comment {
    let root_id = if draft.parent_id == 0 { id } else { position.root_id };
    Comment {
        id,
        target: draft.target,
        author_id: draft.author_id,
        parent_id: draft.parent_id,
        root_id,
        reply_to_user_id: draft.reply_to_user_id,
        reply_to_comment_id: draft.reply_to_comment_id,
        floor_number: position.floor_number,
        sub_floor_number: position.sub_floor_number,
        reply_chain: position.reply_chain,
        depth: position.depth,
        content: draft.content,
        content_kind: draft.content_kind,
        status: draft.status,
        flags: CommentFlags { author_authored: draft.author_authored, ..Default::default() },
        counters: CommentCounters::default(),
        hot_score: 0.0,
        quality_score: 0.0,
        audit_status: draft.audit_status,
        risk_level: draft.risk_level,
        created_at: draft.created_at,
        updated_at: draft.created_at,
        deleted_at: None,
    }
}

/// Checks the parent/child structural invariants, returning the first
/// violation found.
pub fn check_link(parent: &Comment, child: &Comment) -> Result<(), String> {
    if child.parent_id != parent.id {
        return Err(format!("comment {} is not a child of {}", child.id, parent.id));
    }
    if child.depth != parent.depth + 1 {
        return Err(format!("comment {} depth {} != {} + 1", child.id, child.depth, parent.depth));
    }
    let mut expected_chain = parent.reply_chain.clone();
    expected_chain.push(parent.id);
    if child.reply_chain != expected_chain {
        return Err(format!("comment {} reply chain {:?}", child.id, child.reply_chain));
    }
    let expected_root = if parent.is_root() { parent.id } else { parent.root_id };
    if child.root_id != expected_root {
        return Err(format!("comment {} root {} != {expected_root}", child.id, child.root_id));
    }
    if child.floor_number != parent.floor_number {
        return Err(format!("comment {} left floor {}", child.id, parent.floor_number));
    }
    Ok(())
}
