pub mod reports;
pub mod rescore;
pub mod thread;
pub mod words;

use anyhow::Result;

use crate::{
    cli::{Cli, Commands, ReportsCommand, WordsCommand},
    db::open_service,
};

pub async fn run(cli: Cli) -> Result<()> {
    let service = open_service(&cli.db_path).await?;
    match cli.command {
        Commands::Words { command } => match command {
            WordsCommand::Add { word, level, action, replacement } => {
                words::add(&service, &word, level, action.into(), replacement).await
            },
            WordsCommand::List { all, format } => words::list(&service, all, format).await,
            WordsCommand::Remove { word } => words::remove(&service, &word).await,
            WordsCommand::Check { text, author } => words::check(&service, &text, author),
        },
        Commands::Reports { command } => match command {
            ReportsCommand::List { status, limit, format } => {
                reports::list(&service, status.map(Into::into), limit, format).await
            },
            ReportsCommand::Approve(args) => reports::approve(&service, args).await,
            ReportsCommand::Reject(args) => reports::reject(&service, args).await,
        },
        Commands::Rescore { target_type, target_id } => {
            let target = target_type
                .zip(target_id)
                .map(|(kind, id)| floor_flow_shared::model::TargetRef::new(kind.into(), id));
            rescore::run(&service, target).await
        },
        Commands::Thread { target, order, page, page_size, replies, format } => {
            let page = floor_flow_shared::model::PageRequest::new(page, page_size);
            thread::run(&service, target.target(), order.into(), page, replies, format).await
        },
    }
}
