//! Schema migration runner
//!
//! Run with: cargo run --bin migration -- <up|down|status|fresh>

use anyhow::Context;
use clap::{Parser, Subcommand};
use migrations::{Migrator, MigratorTrait};
use tracing::info;

use inventory_admin::{config, db};

#[derive(Parser)]
#[command(name = "migration", about = "Apply or roll back the inventory schema", version)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations, newest first (one by default)
    Down {
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// List every migration and whether it has been applied
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::init_tracing("info", false);

    let url = match cli.database_url {
        Some(url) => url,
        None => config::load_config()
            .context("no --database-url given and configuration failed to load")?
            .database_url,
    };

    info!("Connecting to database");
    let pool = db::establish_connection(&url).await?;

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => Migrator::status(&pool).await?,
        Command::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Schema rebuilt from scratch");
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
