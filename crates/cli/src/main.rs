use std::path::PathBuf;

use anyhow::Context;
use bookshelf_db::migrate::{files, MigrationRunner};
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Manage bookshelf database migrations
#[derive(Debug, Parser)]
#[command(name = "migrate", version)]
struct Cli {
    /// Directory with migration files
    #[arg(long, global = true, default_value = "migrations")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate the DB to the most recent version available
    Up,
    /// Migrate the DB up by 1
    UpByOne,
    /// Migrate the DB to a specific VERSION
    UpTo { version: i64 },
    /// Roll back the version by 1
    Down,
    /// Roll back to a specific VERSION
    DownTo { version: i64 },
    /// Re-run the latest migration
    Redo,
    /// Roll back all migrations
    Reset,
    /// Dump the migration status for the current DB
    Status,
    /// Print the current version of the database
    Version,
    /// Create new migration files with the current timestamp
    Create {
        name: String,
        /// Migration type; only `sql` is supported
        kind: Option<String>,
    },
    /// Apply sequential ordering to migrations
    Fix,
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Command::Up => "up",
            Command::UpByOne => "up-by-one",
            Command::UpTo { .. } => "up-to",
            Command::Down => "down",
            Command::DownTo { .. } => "down-to",
            Command::Redo => "redo",
            Command::Reset => "reset",
            Command::Status => "status",
            Command::Version => "version",
            Command::Create { .. } => "create",
            Command::Fix => "fix",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    let label = cli.command.label();
    run(cli, &settings)
        .await
        .with_context(|| format!("migrate {}", label))
}

async fn run(cli: Cli, settings: &Settings) -> anyhow::Result<()> {
    // File-only commands never need a connection.
    match &cli.command {
        Command::Create { name, kind } => {
            for path in files::create(&cli.dir, name, kind.as_deref())? {
                println!("Created new file: {}", path.display());
            }
            return Ok(());
        }
        Command::Fix => {
            let renames = files::fix(&cli.dir)?;
            if renames.is_empty() {
                println!("Nothing to fix");
            }
            for rename in renames {
                println!("RENAMED {} => {}", rename.from.display(), rename.to.display());
            }
            return Ok(());
        }
        _ => {}
    }

    let pool = bookshelf_db::connect(&settings.database).await?;
    let runner = MigrationRunner::open(&cli.dir, pool.clone()).await?;

    let result = execute(&runner, &cli.command).await;
    pool.close().await;
    result
}

async fn execute(runner: &MigrationRunner, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Up => report_applied(&runner.up().await?),
        Command::UpByOne => match runner.up_by_one().await? {
            Some(version) => println!("OK    {}", version),
            None => println!("no migrations to run"),
        },
        Command::UpTo { version } => report_applied(&runner.up_to(*version).await?),
        Command::Down => match runner.down().await? {
            Some(version) => println!("REVERTED {}", version),
            None => println!("no migrations to roll back"),
        },
        Command::DownTo { version } => report_reverted(&runner.down_to(*version).await?),
        Command::Redo => println!("REDONE {}", runner.redo().await?),
        Command::Reset => report_reverted(&runner.reset().await?),
        Command::Status => {
            println!("    Applied At                  Migration");
            println!("    =======================================");
            for status in runner.status().await? {
                let applied = status
                    .applied_at
                    .map(|at| at.to_string())
                    .unwrap_or_else(|| "Pending".to_string());
                println!(
                    "    {:<27} {}_{}",
                    applied, status.version, status.description
                );
            }
        }
        Command::Version => println!("version {}", runner.version().await?),
        Command::Create { .. } | Command::Fix => {
            anyhow::bail!("{} does not use the database", command.label())
        }
    }
    Ok(())
}

fn report_applied(versions: &[i64]) {
    if versions.is_empty() {
        println!("no migrations to run");
    }
    for version in versions {
        println!("OK    {}", version);
    }
}

fn report_reverted(versions: &[i64]) {
    if versions.is_empty() {
        println!("no migrations to roll back");
    }
    for version in versions {
        println!("REVERTED {}", version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_use_kebab_case() {
        let cli = Cli::try_parse_from(["migrate", "up-by-one"]).unwrap();
        assert!(matches!(cli.command, Command::UpByOne));

        let cli = Cli::try_parse_from(["migrate", "down-to", "3"]).unwrap();
        assert!(matches!(cli.command, Command::DownTo { version: 3 }));
    }

    #[test]
    fn dir_defaults_and_is_global() {
        let cli = Cli::try_parse_from(["migrate", "status"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("migrations"));

        let cli = Cli::try_parse_from(["migrate", "status", "--dir", "db/migrations"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("db/migrations"));
    }

    #[test]
    fn create_takes_optional_kind() {
        let cli = Cli::try_parse_from(["migrate", "create", "add_isbn", "sql"]).unwrap();
        match cli.command {
            Command::Create { name, kind } => {
                assert_eq!(name, "add_isbn");
                assert_eq!(kind.as_deref(), Some("sql"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn version_arguments_must_be_numbers() {
        assert!(Cli::try_parse_from(["migrate", "up-to", "latest"]).is_err());
    }
}
