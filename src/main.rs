use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

mod config;
mod db;
mod error;
mod lang;
mod models;
mod report;
mod store;
mod telemetry;
mod view;

#[derive(Parser)]
#[command(name = "reengagement-status")]
#[command(about = "Re-engagement activity status pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo course, activity and learners
    Seed,
    /// Import in-progress records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Render the activity page for a user
    #[command(group(
        ArgGroup::new("entry")
            .args(["id", "a"])
            .multiple(false)
    ))]
    View {
        /// Course module id
        #[arg(long)]
        id: Option<i64>,
        /// Re-engagement instance id
        #[arg(long)]
        a: Option<i64>,
        /// Username of the viewer
        #[arg(long)]
        user: String,
        /// Write the page here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_subscriber("info");

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} in-progress records from {}.", csv.display());
        }
        Commands::View { id, a, user, out } => {
            let config = config::SiteConfig::from_env();
            let store = db::PgStore::new(pool);
            let params = view::ViewParams { id, a };

            let (page, result) =
                match view::view(&store, &config, params, &user, chrono::Utc::now()).await {
                    Ok(page) => (page, Ok(())),
                    Err(err) => {
                        error!(key = err.key(), "{err}");
                        let page = report::render_error_page(err.key(), &err.to_string());
                        (page, Err(anyhow::Error::new(err)))
                    }
                };

            match out {
                Some(path) => {
                    std::fs::write(&path, page)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!("Page written to {}.", path.display());
                }
                None => print!("{page}"),
            }

            result?;
        }
    }

    Ok(())
}
