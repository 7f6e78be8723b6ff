use anyhow::Result;
use floor_flow_shared::{model::TargetRef, CommentService};

use crate::db::format_ms;

/// One sweep over a single target, or over every target when none is given.
pub async fn run(service: &CommentService, target: Option<TargetRef>) -> Result<()> {
    let report = match target {
        Some(target) => service.rescore_target(target).await?,
        None => service.rescore_all().await?,
    };
    tracing::info!("rescore finished");
    println!("scored={} skipped={} failed={}", report.scored, report.skipped, report.failed);

    if let Some(snapshot) = target.and_then(|target| service.hot_snapshot(target)) {
        println!("hot ranking as of {}:", format_ms(snapshot.generated_at));
        for (rank, entry) in snapshot.entries.iter().enumerate() {
            println!(
                "{:>3}. comment {} (floor {}) score {:.4}",
                rank + 1,
                entry.comment_id,
                entry.floor_number,
                entry.hot_score
            );
        }
    }
    Ok(())
}
