//! Error types of the public engine surface.

use thiserror::Error;

use crate::model::{CommentId, ReportId};

/// Result alias for the public engine surface.
pub type CommentResult<T> = std::result::Result<T, CommentError>;

/// Typed failures of comment operations.
#[derive(Debug, Error)]
pub enum CommentError {
    /// A comment, parent comment or report does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// Id that was looked up.
        id: i64,
    },

    /// The actor may not perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed input such as empty or oversized content.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The comment was stored for the audit trail but will not be published.
    #[error("comment {comment_id} rejected by moderation (blocked words: {blocked_words:?})")]
    ContentRejected {
        /// Id of the stored, folded comment.
        comment_id: CommentId,
        /// Block-action words found in the content.
        blocked_words: Vec<String>,
    },

    /// The record is not in a state that allows the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A store or collaborator failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CommentError {
    pub(crate) fn comment_not_found(id: CommentId) -> Self {
        CommentError::NotFound { entity: "comment", id }
    }

    pub(crate) fn parent_not_found(id: CommentId) -> Self {
        CommentError::NotFound { entity: "parent comment", id }
    }

    pub(crate) fn report_not_found(id: ReportId) -> Self {
        CommentError::NotFound { entity: "report", id }
    }

    /// Whether the error is caused by the caller rather than infrastructure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CommentError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::CommentError;

    #[test]
    fn not_found_message_names_the_entity() {
        let err = CommentError::parent_not_found(12);
        assert_eq!(err.to_string(), "parent comment 12 not found");
        assert!(err.is_client_error());
    }

    #[test]
    fn storage_errors_wrap_anyhow() {
        let err: CommentError = anyhow::anyhow!("disk full").into();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "disk full");
    }
}
