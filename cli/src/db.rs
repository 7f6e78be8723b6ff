use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use floor_flow_shared::{
    collaborators::{NoopNotifier, StaticOwnership, StaticUserDirectory},
    store::{SqliteCommentStore, WordStore},
    word_list::SensitiveWordList,
    Collaborators, CommentService, EngineConfig,
};

/// Opens the database and wires a service around it. The CLI has no user
/// directory and delivers no notifications.
pub async fn open_service(db_path: &Path) -> Result<CommentService> {
    let store = Arc::new(
        SqliteCommentStore::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?,
    );
    let words = store.list_words(true).await.context("failed to load sensitive words")?;
    tracing::debug!("loaded {} sensitive words", words.len());

    let service = CommentService::new(
        store,
        Collaborators {
            users: Arc::new(StaticUserDirectory::new()),
            ownership: Arc::new(StaticOwnership::new()),
            notifier: Arc::new(NoopNotifier),
        },
        EngineConfig::default(),
    )
    .with_word_list(SensitiveWordList::new(&words));
    Ok(service)
}

/// Renders a millisecond timestamp for table output.
pub fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_millis() {
        assert_eq!(format_ms(0), "1970-01-01 00:00:00");
        assert_eq!(format_ms(86_400_000 + 1_500), "1970-01-02 00:00:01");
    }
}
