mod admin;
mod report;
mod seed;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use todo_seeder::config::StoreConfig;
use todo_seeder::Store;

#[derive(Parser)]
#[command(name = "todo-seeder")]
#[command(version)]
#[command(about = "Seed a SQLite store with synthetic users and todos", long_about = None)]
pub struct Cli {
    /// Log progress details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recreate the schema, load users and todos, migrate, and run status updates
    Seed(seed::SeedArgs),

    /// Recreate the users/todos tables empty and apply the standard migrations
    Init {
        /// SQLite database file
        #[arg(short = 'd', long = "db", default_value = "seed.db")]
        database: PathBuf,
    },

    /// Run a read-only report against a seeded store
    Report(report::ReportArgs),

    /// Set the status of specific todos
    SetStatus {
        /// SQLite database file
        #[arg(short = 'd', long = "db", default_value = "seed.db")]
        database: PathBuf,

        /// New status: pending, in_progress, completed
        status: String,

        /// Todo ids (comma-separated)
        #[arg(long, required = true, value_delimiter = ',')]
        ids: Vec<i64>,
    },

    /// Delete a user and, through the cascading key, their todos
    DeleteUser {
        /// SQLite database file
        #[arg(short = 'd', long = "db", default_value = "seed.db")]
        database: PathBuf,

        user_id: i64,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Seed(args) => seed::run(args),
        Commands::Init { database } => admin::init(database),
        Commands::Report(args) => report::run(args),
        Commands::SetStatus {
            database,
            status,
            ids,
        } => admin::set_status(database, status, ids),
        Commands::DeleteUser { database, user_id } => admin::delete_user(database, user_id),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "todo-seeder", &mut io::stdout());
            Ok(())
        }
    }
}

/// Open an existing store file, refusing to create a new one
pub(crate) fn open_existing(database: PathBuf) -> anyhow::Result<Store> {
    if !database.exists() {
        anyhow::bail!("Database not found: {}", database.display());
    }
    let store = Store::open(&StoreConfig {
        path: database,
        ..Default::default()
    })?;
    Ok(store)
}
