use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use todo_seeder::seed::Seeder;
use todo_seeder::{SeedConfig, Store};

/// Seed a store from scratch
#[derive(Args, Debug)]
#[command(after_help = "Examples:
  todo-seeder seed
  todo-seeder seed -d demo.db --users 100 --todos-per-user 5 --progress
  todo-seeder seed --config seed.yaml --json")]
pub struct SeedArgs {
    /// YAML config file; flags below override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database file (created if missing, existing tables are dropped)
    #[arg(short = 'd', long = "db", value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Users to generate
    #[arg(long)]
    pub users: Option<u64>,

    /// Todos generated per user
    #[arg(long)]
    pub todos_per_user: Option<u64>,

    /// Rows per insert transaction
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Sample-and-update rounds after loading
    #[arg(long)]
    pub update_rounds: Option<usize>,

    /// Todo ids sampled per round
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Status written to sampled todos: pending, in_progress, completed
    #[arg(long)]
    pub status: Option<String>,

    /// Also add the nullable todos.description column
    #[arg(long)]
    pub add_description: bool,

    /// Show progress bars while loading
    #[arg(short, long)]
    pub progress: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl SeedArgs {
    fn into_config(self) -> Result<SeedConfig> {
        let mut config = match self.config {
            Some(ref path) => SeedConfig::from_file(path)
                .with_context(|| format!("Cannot load config: {}", path.display()))?,
            None => SeedConfig::default(),
        };
        if let Some(database) = self.database {
            config.store.path = database;
        }
        if let Some(users) = self.users {
            config.users = users;
        }
        if let Some(todos_per_user) = self.todos_per_user {
            config.todos_per_user = todos_per_user;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(rounds) = self.update_rounds {
            config.update.rounds = rounds;
        }
        if let Some(sample_size) = self.sample_size {
            config.update.sample_size = sample_size;
        }
        if let Some(status) = self.status {
            config.update.status = status;
        }
        config.add_description |= self.add_description;
        Ok(config)
    }
}

pub fn run(args: SeedArgs) -> Result<()> {
    let progress = args.progress;
    let json = args.json;
    let config = args.into_config()?;
    config.validate()?;

    let mut store = Store::open(&config.store)
        .with_context(|| format!("Cannot open database: {}", config.store.path.display()))?;

    eprintln!(
        "Seeding {} with {} users and {} todos...",
        config.store.path.display(),
        config.users,
        config.total_todos()
    );
    let summary = Seeder::new(&config)
        .with_progress(progress)
        .run(&mut store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}
