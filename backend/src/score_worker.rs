use std::{sync::Arc, time::Duration};

use floor_flow_shared::CommentService;
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

/// Rebuilds every target's hot ranking on a fixed period.
pub fn spawn_score_worker(
    service: Arc<CommentService>,
    period: Duration,
    sweep_on_start: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = if sweep_on_start { Instant::now() } else { Instant::now() + period };
        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_sweep(&service).await;
        }
    })
}

async fn run_sweep(service: &CommentService) {
    let started = Instant::now();
    match service.rescore_all().await {
        Ok(report) => tracing::info!(
            "hot sweep finished in {:?}: scored={} skipped={} failed={}",
            started.elapsed(),
            report.scored,
            report.skipped,
            report.failed
        ),
        Err(err) => tracing::error!("hot sweep failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use floor_flow_shared::{
        collaborators::{NoopNotifier, StaticOwnership, StaticUserDirectory},
        model::{TargetKind, TargetRef},
        store::MemoryCommentStore,
        Collaborators, CreateCommentInput, EngineConfig,
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sweeps_on_start_then_every_period() {
        let service = Arc::new(CommentService::new(
            Arc::new(MemoryCommentStore::new()),
            Collaborators {
                users: Arc::new(StaticUserDirectory::new()),
                ownership: Arc::new(StaticOwnership::new()),
                notifier: Arc::new(NoopNotifier),
            },
            EngineConfig::default(),
        ));
        let target = TargetRef::new(TargetKind::Video, 3);
        service
            .create_comment(CreateCommentInput {
                target,
                author_id: 8,
                parent_id: 0,
                reply_to_user_id: None,
                reply_to_comment_id: None,
                content: "first to comment".to_string(),
                content_kind: Default::default(),
                reply_as_author: false,
            })
            .await
            .expect("comment stored");

        let handle = spawn_score_worker(Arc::clone(&service), Duration::from_secs(60), true);
        tokio::task::yield_now().await;
        time::sleep(Duration::from_millis(10)).await;
        let first = service.hot_snapshot(target).expect("initial sweep ran");

        time::sleep(Duration::from_secs(61)).await;
        let second = service.hot_snapshot(target).expect("snapshot kept");
        assert!(!Arc::ptr_eq(&first, &second), "periodic sweep swaps the snapshot");
        handle.abort();
    }
}
