use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use floor_flow_shared::model::{ReportStatus, TargetKind, TargetRef, ThreadOrder, WordAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetKindArg {
    Article,
    Video,
    Qa,
    Post,
}

impl From<TargetKindArg> for TargetKind {
    fn from(value: TargetKindArg) -> Self {
        match value {
            TargetKindArg::Article => TargetKind::Article,
            TargetKindArg::Video => TargetKind::Video,
            TargetKindArg::Qa => TargetKind::Qa,
            TargetKindArg::Post => TargetKind::Post,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WordActionArg {
    Replace,
    Block,
    Flag,
}

impl From<WordActionArg> for WordAction {
    fn from(value: WordActionArg) -> Self {
        match value {
            WordActionArg::Replace => WordAction::Replace,
            WordActionArg::Block => WordAction::Block,
            WordActionArg::Flag => WordAction::Flag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThreadOrderArg {
    Floor,
    Hot,
    Newest,
}

impl From<ThreadOrderArg> for ThreadOrder {
    fn from(value: ThreadOrderArg) -> Self {
        match value {
            ThreadOrderArg::Floor => ThreadOrder::Floor,
            ThreadOrderArg::Hot => ThreadOrder::Hot,
            ThreadOrderArg::Newest => ThreadOrder::Newest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportStatusArg {
    Pending,
    Approved,
    Rejected,
}

impl From<ReportStatusArg> for ReportStatus {
    fn from(value: ReportStatusArg) -> Self {
        match value {
            ReportStatusArg::Pending => ReportStatus::Pending,
            ReportStatusArg::Approved => ReportStatus::Approved,
            ReportStatusArg::Rejected => ReportStatus::Rejected,
        }
    }
}

#[derive(Parser)]
#[command(name = "ff-cli", version, about = "FloorFlow comment administration CLI")]
pub struct Cli {
    /// SQLite comment database path.
    #[arg(long, global = true, default_value = "./data/floorflow.db")]
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the sensitive word list.
    Words {
        #[command(subcommand)]
        command: WordsCommand,
    },
    /// Review user reports.
    Reports {
        #[command(subcommand)]
        command: ReportsCommand,
    },
    /// Recompute hot scores and snapshots.
    Rescore {
        /// Only this target kind (requires --target-id).
        #[arg(long, value_enum, requires = "target_id")]
        target_type: Option<TargetKindArg>,
        #[arg(long, requires = "target_type")]
        target_id: Option<i64>,
    },
    /// Print the comment thread of a target.
    Thread {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long, value_enum, default_value_t = ThreadOrderArg::Floor, ignore_case = true)]
        order: ThreadOrderArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        /// Also print replies under each root.
        #[arg(long)]
        replies: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table, ignore_case = true)]
        format: OutputFormat,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct TargetArgs {
    #[arg(long, value_enum, ignore_case = true)]
    pub target_type: TargetKindArg,
    #[arg(long)]
    pub target_id: i64,
}

impl TargetArgs {
    pub fn target(&self) -> TargetRef {
        TargetRef::new(self.target_type.into(), self.target_id)
    }
}

#[derive(Subcommand)]
pub enum WordsCommand {
    /// Add or overwrite a word.
    Add {
        #[arg(long)]
        word: String,
        /// Severity 1 (mild) to 3 (serious).
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
        level: u8,
        #[arg(long, value_enum, default_value_t = WordActionArg::Replace, ignore_case = true)]
        action: WordActionArg,
        #[arg(long)]
        replacement: Option<String>,
    },
    List {
        /// Include disabled words.
        #[arg(long)]
        all: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table, ignore_case = true)]
        format: OutputFormat,
    },
    Remove {
        #[arg(long)]
        word: String,
    },
    /// Run moderation over a text without storing anything.
    Check {
        #[arg(long)]
        text: String,
        /// Evaluate as if written by the target owner.
        #[arg(long)]
        author: bool,
    },
}

#[derive(Subcommand)]
pub enum ReportsCommand {
    List {
        #[arg(long, value_enum, ignore_case = true)]
        status: Option<ReportStatusArg>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table, ignore_case = true)]
        format: OutputFormat,
    },
    /// Confirm a violation; the comment is soft-deleted.
    Approve(ReviewArgs),
    Reject(ReviewArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    #[arg(long)]
    pub id: i64,
    /// Administrator user id recorded as handler.
    #[arg(long)]
    pub handler: i64,
    #[arg(long)]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_thread_arguments() {
        let cli = Cli::try_parse_from([
            "ff-cli",
            "thread",
            "--target-type",
            "Article",
            "--target-id",
            "42",
            "--order",
            "hot",
        ])
        .expect("valid arguments");
        let Commands::Thread { target, order, .. } = cli.command else {
            panic!("expected thread command");
        };
        assert_eq!(target.target(), TargetRef::new(TargetKind::Article, 42));
        assert_eq!(order, ThreadOrderArg::Hot);
    }

    #[test]
    fn rejects_out_of_range_level() {
        let parsed = Cli::try_parse_from([
            "ff-cli", "words", "add", "--word", "spam", "--level", "4",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn rescore_target_flags_come_in_pairs() {
        assert!(Cli::try_parse_from(["ff-cli", "rescore", "--target-id", "1"]).is_err());
        assert!(Cli::try_parse_from(["ff-cli", "rescore"]).is_ok());
    }
}
