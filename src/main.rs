use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod backfill;
mod db;
mod leaderboard;
mod models;
mod streak;
mod updater;

use models::Category;

#[derive(Parser)]
#[command(name = "founderhub-streaks")]
#[command(about = "Streak and leaderboard engine for the FounderHub community feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import historical activity events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record one qualifying activity event against its streak
    Record {
        #[arg(long)]
        user: Uuid,
        #[arg(long, value_enum)]
        category: Category,
        /// Event instant (RFC 3339); defaults to now
        #[arg(long)]
        occurred_at: Option<DateTime<Utc>>,
    },
    /// Show ranked streak leaderboards
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long = "category", value_enum)]
        categories: Vec<Category>,
        #[arg(long)]
        json: bool,
    },
    /// Recompute every streak from the full activity log
    Backfill {
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

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
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} activity events from {}.", csv.display());
        }
        Commands::Record {
            user,
            category,
            occurred_at,
        } => {
            let occurred_at = occurred_at.unwrap_or_else(Utc::now);
            match updater::record_activity(&pool, user, category, occurred_at).await {
                Ok(state) => {
                    let last_active = state
                        .last_active_date
                        .map_or_else(|| "never".to_string(), |date| date.to_string());
                    println!(
                        "{category} streak for {user}: current {}, longest {}, last active {last_active}",
                        state.current_streak, state.longest_streak
                    );
                }
                // the activity itself is already durable upstream; a failed
                // streak write must not fail the run
                Err(err) => {
                    tracing::warn!("streak update skipped for {user}/{category}: {err:#}");
                }
            }
        }
        Commands::Leaderboard {
            limit,
            categories,
            json,
        } => {
            let boards = leaderboard::get_leaderboards(&pool, Some(limit), &categories).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&boards)?);
            } else {
                for board in &boards {
                    println!("{} leaderboard:", board.category);
                    if board.entries.is_empty() {
                        println!("  (no streaks yet)");
                    }
                    for entry in &board.entries {
                        let last_active = entry
                            .last_active_date
                            .map_or_else(|| "never".to_string(), |date| date.to_string());
                        println!(
                            "  {}. {} (@{}) current {}, longest {}, last active {last_active}",
                            entry.rank,
                            entry.user.name,
                            entry.user.username,
                            entry.current_streak,
                            entry.longest_streak
                        );
                    }
                }
            }
        }
        Commands::Backfill { dry_run } => {
            let summary = backfill::run(&pool, dry_run).await?;
            if dry_run {
                println!(
                    "Dry run: {} events across {} streak groups; nothing written.",
                    summary.events, summary.groups
                );
            } else {
                println!(
                    "Recomputed {} streak groups from {} events: {} written, {} unchanged, {} failed.",
                    summary.groups,
                    summary.events,
                    summary.written,
                    summary.unchanged,
                    summary.failed
                );
            }
        }
    }

    Ok(())
}
