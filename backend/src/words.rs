use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use floor_flow_shared::{
    model::SensitiveWord, store::WordStore, word_list, CommentService,
};
use tokio::{task::JoinHandle, time};

/// Upserts every word of a JSON seed file into the store.
pub async fn seed_words(store: &dyn WordStore, path: &Path) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read words file {}", path.display()))?;
    let words: Vec<SensitiveWord> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid words file {}", path.display()))?;
    let mut seeded = 0;
    for word in words.into_iter().filter(|word| !word.word.trim().is_empty()) {
        store.upsert_word(word).await?;
        seeded += 1;
    }
    Ok(seeded)
}

/// Loads the enabled words into the process-wide list. A failure leaves the
/// list uninitialised and moderation runs its heuristics only.
pub async fn init_word_list(store: &dyn WordStore, seed_file: Option<&Path>) {
    if let Some(path) = seed_file {
        match seed_words(store, path).await {
            Ok(count) => tracing::info!("seeded {count} sensitive words from {}", path.display()),
            Err(err) => tracing::warn!("sensitive word seed skipped: {err:#}"),
        }
    }
    match store.list_words(true).await {
        Ok(words) => match word_list::default_list() {
            Some(list) => {
                list.reload(&words);
            },
            None => {
                word_list::init(&words);
            },
        },
        Err(err) => tracing::warn!("sensitive words unavailable, word scan disabled: {err:#}"),
    }
}

/// Periodically rebuilds the active word list from the store.
pub fn spawn_word_reload(service: Arc<CommentService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match service.reload_words().await {
                Ok(count) => tracing::debug!("sensitive word list refreshed ({count} words)"),
                Err(err) => tracing::warn!("sensitive word reload failed, keeping old list: {err}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use floor_flow_shared::{model::WordAction, store::SqliteCommentStore};

    use super::*;

    #[tokio::test]
    async fn seed_file_lands_in_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let seed = dir.path().join("words.json");
        std::fs::write(
            &seed,
            r#"[
                {"word": "spam", "level": 2, "action": "block"},
                {"word": "xx", "level": 3, "action": "replace", "replacement": "**"},
                {"word": "  ", "level": 1, "action": "flag"}
            ]"#,
        )?;
        let store = SqliteCommentStore::open(dir.path().join("words.db"))?;

        assert_eq!(seed_words(&store, &seed).await?, 2);
        let words = store.list_words(true).await?;
        assert_eq!(words.len(), 2);
        assert!(words.iter().any(|word| word.action == WordAction::Replace));

        init_word_list(&store, None).await;
        let list = word_list::default_list().context("list initialised")?;
        assert!(list.snapshot().contains("SPAM here"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_seed_file_is_an_error() {
        let store = SqliteCommentStore::open_in_memory().expect("store");
        assert!(seed_words(&store, Path::new("/nonexistent/words.json")).await.is_err());
    }
}
