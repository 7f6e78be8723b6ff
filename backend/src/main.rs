//! FloorFlow daemon: periodic hot-score sweeps, sensitive-word reloads and
//! notification delivery around a SQLite comment store.

mod config;
mod notify;
mod score_worker;
mod words;

use std::sync::Arc;

use anyhow::{Context, Result};
use floor_flow_shared::{
    collaborators::{StaticOwnership, StaticUserDirectory},
    store::SqliteCommentStore,
    Collaborators, CommentService,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::FloorFlowConfig::from_env();
    tracing::info!("Starting FloorFlow backend");
    tracing::info!("Comment database: {}", config.db_path.display());
    tracing::info!("Hot sweep interval: {:?}", config.sweep_interval);

    let store = Arc::new(SqliteCommentStore::open(&config.db_path)?);
    words::init_word_list(&*store, config.words_file.as_deref()).await;

    let (notifier, notify_worker) = notify::spawn_notification_worker(config.notify_queue);
    let service = Arc::new(CommentService::new(
        store,
        Collaborators {
            users: Arc::new(StaticUserDirectory::new()),
            ownership: Arc::new(StaticOwnership::new()),
            notifier: Arc::new(notifier),
        },
        config.engine_config()?,
    ));

    let mut workers = vec![score_worker::spawn_score_worker(
        Arc::clone(&service),
        config.sweep_interval,
        config.sweep_on_start,
    )];
    if let Some(period) = config.words_reload_interval {
        tracing::info!("Sensitive word reload interval: {period:?}");
        workers.push(words::spawn_word_reload(Arc::clone(&service), period));
    }

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("Shutting down FloorFlow backend");

    for worker in workers {
        worker.abort();
        let _ = worker.await;
    }
    drop(service);
    let delivered = notify_worker.await.context("notification worker panicked")?;
    tracing::info!("Delivered {delivered} notifications");
    Ok(())
}
