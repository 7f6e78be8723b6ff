use anyhow::Result;
use floor_flow_shared::{
    model::{SensitiveWord, WordAction},
    moderation::ModerationPipeline,
    store::WordStore,
    CommentService, WordMatcher,
};

use crate::cli::OutputFormat;

pub async fn add(
    service: &CommentService,
    word: &str,
    level: u8,
    action: WordAction,
    replacement: Option<String>,
) -> Result<()> {
    service.add_word(SensitiveWord::new(word, level, action, replacement.as_deref())).await?;
    tracing::info!("sensitive word stored");
    println!("added {word} (level {level}, {action:?})");
    Ok(())
}

pub async fn list(service: &CommentService, all: bool, format: OutputFormat) -> Result<()> {
    let words = service.store().list_words(!all).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&words)?),
        OutputFormat::Table => {
            println!(
                "{:<24} {:>5} {:<8} {:<12} {}",
                "WORD", "LEVEL", "ACTION", "REPLACEMENT", "ON"
            );
            for word in &words {
                println!(
                    "{:<24} {:>5} {:<8} {:<12} {}",
                    word.word,
                    word.level,
                    format!("{:?}", word.action).to_lowercase(),
                    word.replacement.as_deref().unwrap_or("-"),
                    if word.enabled { "yes" } else { "no" }
                );
            }
            println!("{} words", words.len());
        },
    }
    Ok(())
}

pub async fn remove(service: &CommentService, word: &str) -> Result<()> {
    service.remove_word(word).await?;
    println!("removed {word}");
    Ok(())
}

/// Dry-run of moderation against the stored word list.
pub fn check(service: &CommentService, text: &str, author: bool) -> Result<()> {
    let matcher = current_matcher(service);
    let pipeline = ModerationPipeline::new(service.config().min_content_chars);
    let verdict = pipeline.evaluate(text, author, Some(&matcher));
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    println!("masked: {}", matcher.replace(text, '*'));
    Ok(())
}

fn current_matcher(service: &CommentService) -> std::sync::Arc<WordMatcher> {
    service.word_matcher().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_service;

    #[tokio::test]
    async fn check_reports_without_storing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = open_service(&dir.path().join("ff.db")).await?;
        check(&service, "perfectly fine words", false)?;
        assert!(service.store().list_words(false).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn add_then_remove_round_trips_through_database() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("ff.db");
        let service = open_service(&db_path).await?;

        add(&service, "Spam", 2, WordAction::Block, None).await?;
        drop(service);

        let reopened = open_service(&db_path).await?;
        let words = reopened.store().list_words(true).await?;
        assert_eq!(words.len(), 1);
        assert!(current_matcher(&reopened).contains("no SPAM please"));

        remove(&reopened, "spam").await?;
        assert!(reopened.store().list_words(false).await?.is_empty());
        Ok(())
    }
}
