use anyhow::Result;
use floor_flow_shared::{
    model::{CommentReport, ReportStatus},
    report_fold::ReviewDecision,
    store::ReportStore,
    CommentService,
};

use crate::{
    cli::{OutputFormat, ReviewArgs},
    db::format_ms,
};

pub async fn list(
    service: &CommentService,
    status: Option<ReportStatus>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let reports = service.store().list_reports(status, limit).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Table => print_table(&reports),
    }
    Ok(())
}

fn print_table(reports: &[CommentReport]) {
    println!(
        "{:>6} {:>8} {:>8} {:<12} {:<9} {:<19} {}",
        "ID", "COMMENT", "REPORTER", "REASON", "STATUS", "CREATED", "DESCRIPTION"
    );
    for report in reports {
        println!(
            "{:>6} {:>8} {:>8} {:<12} {:<9} {:<19} {}",
            report.id,
            report.comment_id,
            report.reporter_id,
            format!("{:?}", report.reason).to_lowercase(),
            report.status.as_str(),
            format_ms(report.created_at),
            report.description.as_deref().unwrap_or("")
        );
    }
    println!("{} reports", reports.len());
}

pub async fn approve(service: &CommentService, args: ReviewArgs) -> Result<()> {
    review(service, args, ReviewDecision::Approve).await
}

pub async fn reject(service: &CommentService, args: ReviewArgs) -> Result<()> {
    review(service, args, ReviewDecision::Reject).await
}

async fn review(
    service: &CommentService,
    args: ReviewArgs,
    decision: ReviewDecision,
) -> Result<()> {
    let report = service.review_report(args.id, args.handler, decision, args.note).await?;
    println!(
        "report {} on comment {} is now {}",
        report.id,
        report.comment_id,
        report.status.as_str()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use floor_flow_shared::{
        model::{ReportReason, TargetKind, TargetRef},
        CommentError, CreateCommentInput,
    };

    use super::*;
    use crate::db::open_service;

    async fn reported_comment(service: &CommentService) -> Result<i64> {
        let comment = service
            .create_comment(CreateCommentInput {
                target: TargetRef::new(TargetKind::Post, 9),
                author_id: 4,
                parent_id: 0,
                reply_to_user_id: None,
                reply_to_comment_id: None,
                content: "an ordinary opinion".to_string(),
                content_kind: Default::default(),
                reply_as_author: false,
            })
            .await?;
        let outcome = service
            .report_comment(comment.id, 5, ReportReason::Spam, Some("ads".to_string()))
            .await?;
        Ok(outcome.report.id)
    }

    #[tokio::test]
    async fn approve_removes_the_comment() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = open_service(&dir.path().join("ff.db")).await?;
        let report_id = reported_comment(&service).await?;

        let pending = service.store().list_reports(Some(ReportStatus::Pending), 10).await?;
        assert_eq!(pending.len(), 1);

        approve(&service, ReviewArgs { id: report_id, handler: 1, note: None }).await?;
        let report = service.store().get_report(report_id).await?.expect("report kept");
        assert_eq!(report.status, ReportStatus::Approved);
        assert!(matches!(
            service.get_comment(report.comment_id).await,
            Err(CommentError::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn second_decision_is_refused() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = open_service(&dir.path().join("ff.db")).await?;
        let report_id = reported_comment(&service).await?;

        reject(&service, ReviewArgs { id: report_id, handler: 1, note: Some("ok".into()) })
            .await?;
        let again = approve(&service, ReviewArgs { id: report_id, handler: 1, note: None }).await;
        assert!(again.is_err());
        Ok(())
    }
}
