use anyhow::Result;
use floor_flow_shared::{
    model::{PageRequest, TargetRef, ThreadOrder},
    CommentService, CommentView,
};

use crate::{cli::OutputFormat, db::format_ms};

/// Replies listed per parent when `--replies` is set.
const REPLY_PAGE: PageRequest = PageRequest { page: 1, page_size: 100 };

pub async fn run(
    service: &CommentService,
    target: TargetRef,
    order: ThreadOrder,
    page: PageRequest,
    with_replies: bool,
    format: OutputFormat,
) -> Result<()> {
    let roots = service.list_thread(target, order, page).await?;
    let mut rows = Vec::with_capacity(roots.len());
    for root in roots {
        if with_replies {
            rows.extend(collect_subtree(service, root).await?);
        } else {
            rows.push(root);
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            for view in &rows {
                println!("{}", render_line(view));
            }
            println!("{} comments", rows.len());
        },
    }
    Ok(())
}

/// Depth-first walk in sub-floor order: a root followed by its replies.
async fn collect_subtree(
    service: &CommentService,
    root: CommentView,
) -> Result<Vec<CommentView>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(view) = stack.pop() {
        let id = view.comment.id;
        let has_replies = view.comment.counters.direct_reply_count > 0;
        out.push(view);
        if has_replies {
            let replies = service.list_replies(id, REPLY_PAGE).await?;
            stack.extend(replies.into_iter().rev());
        }
    }
    Ok(out)
}

fn render_line(view: &CommentView) -> String {
    let comment = &view.comment;
    let indent = "  ".repeat(comment.depth as usize);
    let position = if comment.is_root() {
        format!("#{}", comment.floor_number)
    } else {
        format!("#{}-{}", comment.floor_number, comment.sub_floor_number)
    };
    let author = view
        .author
        .as_ref()
        .map(|profile| profile.username.clone())
        .unwrap_or_else(|| format!("user {}", comment.author_id));
    let mut markers = String::new();
    if comment.flags.pinned {
        markers.push_str(" [pinned]");
    }
    if comment.flags.author_authored {
        markers.push_str(" [author]");
    }
    format!(
        "{indent}{position} {author} @ {}{markers} (+{} -{}): {}",
        format_ms(comment.created_at),
        comment.counters.like_count,
        comment.counters.dislike_count,
        comment.content
    )
}

#[cfg(test)]
mod tests {
    use floor_flow_shared::{model::TargetKind, CreateCommentInput};

    use super::*;
    use crate::db::open_service;

    fn input(target: TargetRef, parent_id: i64, content: &str) -> CreateCommentInput {
        CreateCommentInput {
            target,
            author_id: 3,
            parent_id,
            reply_to_user_id: None,
            reply_to_comment_id: None,
            content: content.to_string(),
            content_kind: Default::default(),
            reply_as_author: false,
        }
    }

    #[tokio::test]
    async fn subtree_follows_reply_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = open_service(&dir.path().join("ff.db")).await?;
        let target = TargetRef::new(TargetKind::Qa, 5);
        let root = service.create_comment(input(target, 0, "what about this one")).await?;
        let first = service.create_comment(input(target, root.id, "first answer")).await?;
        let nested = service.create_comment(input(target, first.id, "answer to answer")).await?;
        let second = service.create_comment(input(target, root.id, "second answer")).await?;

        let roots =
            service.list_thread(target, ThreadOrder::Floor, PageRequest::default()).await?;
        assert_eq!(roots.len(), 1);
        let tree = collect_subtree(&service, roots.into_iter().next().expect("root")).await?;
        let ids: Vec<i64> = tree.iter().map(|view| view.comment.id).collect();
        assert_eq!(ids, vec![root.id, first.id, nested.id, second.id]);

        assert!(render_line(&tree[2]).starts_with("    #1-"));
        let page = PageRequest::default();
        run(&service, target, ThreadOrder::Hot, page, true, OutputFormat::Table).await?;
        Ok(())
    }
}
