use super::open_existing;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use todo_seeder::report::{OutputFormat, ReportFormatter, ReportQuery, ReportRow};
use todo_seeder::Reporter;

/// Which report to run
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    /// Every user
    Users,
    /// Todo count per user
    TodoCounts,
    /// Completed versus outstanding todos per user
    Completion,
    /// Most recent todo per user
    Latest,
    /// Users with no completions among todos from the last 30 days, including users with none
    Inactive,
    /// Outstanding todos created in the last 7 days
    Stale,
    /// Outstanding todos past their due date
    Overdue,
    /// Todo count per status
    Statuses,
    /// One user's todos, newest first (needs --user-id)
    UserTodos,
    /// Completion report for one user (needs --user-id)
    UserReport,
}

/// Run a read-only report
#[derive(Args, Debug)]
#[command(after_help = "Examples:
  todo-seeder report todo-counts
  todo-seeder report overdue -f csv -o overdue.csv
  todo-seeder report user-todos --user-id 42 --limit 10 -f json")]
pub struct ReportArgs {
    /// Report to run
    #[arg(value_enum)]
    pub kind: ReportKind,

    /// SQLite database file
    #[arg(short = 'd', long = "db", default_value = "seed.db")]
    pub database: PathBuf,

    /// Output format: table, json, jsonl, csv, tsv
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Maximum rows to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// User id for user-todos and user-report
    #[arg(short, long)]
    pub user_id: Option<i64>,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let format: OutputFormat = args.format.parse()?;
    let store = open_existing(args.database.clone())?;
    let reporter = Reporter::new(store.conn());

    let user = || {
        args.user_id
            .ok_or_else(|| anyhow::anyhow!("--user-id is required for this report"))
    };

    let formatted = match args.kind {
        ReportKind::Users => render(reporter.users(), &args, format)?,
        ReportKind::TodoCounts => render(reporter.todo_count_by_user(), &args, format)?,
        ReportKind::Completion => render(reporter.completion_report(), &args, format)?,
        ReportKind::Latest => render(reporter.latest_todo_by_user(), &args, format)?,
        ReportKind::Inactive => render(reporter.inactive_users(), &args, format)?,
        ReportKind::Stale => render(reporter.stale_todos(), &args, format)?,
        ReportKind::Overdue => render(reporter.overdue_todos(), &args, format)?,
        ReportKind::Statuses => render(reporter.status_counts(), &args, format)?,
        ReportKind::UserTodos => render(reporter.todos_for_user(user()?), &args, format)?,
        ReportKind::UserReport => {
            render(reporter.completion_report_for_user(user()?), &args, format)?
        }
    };

    if let Some(ref output_path) = args.output {
        let file = File::create(output_path)
            .with_context(|| format!("Cannot create output file: {}", output_path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(formatted.as_bytes())?;
        writer.flush()?;
        eprintln!("Wrote {} report to {}", format, output_path.display());
    } else {
        io::stdout().write_all(formatted.as_bytes())?;
    }
    Ok(())
}

fn render<T: ReportRow>(
    query: ReportQuery<'_, T>,
    args: &ReportArgs,
    format: OutputFormat,
) -> Result<String> {
    let query = match args.limit {
        Some(limit) => query.limit(limit),
        None => query,
    };
    let rows = query.collect_all()?;
    Ok(ReportFormatter::format(&rows, format))
}
