use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod db;
mod error;
mod models;
mod points;
mod report;
mod rollup;
mod roster;
mod schedule;

use models::{AggregatedResult, SessionKind, TableKind};
use points::SeasonTableSource;

#[derive(Parser)]
#[command(name = "paddock-pool")]
#[command(about = "Season points tracker for a grand prix fantasy pool", long_about = None)]
struct Cli {
    /// Roster JSON file overriding the built-in pool roster
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scope {
    Driver,
    Constructor,
    Fantasy,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic partial season of schedule and results
    Seed,
    /// Import schedule or result rows from a CSV file
    #[command(group(
        ArgGroup::new("input")
            .args(["schedule", "results"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        schedule: Option<PathBuf>,
        #[arg(long)]
        results: Option<PathBuf>,
    },
    /// Recompute the season points tables and store them
    Sync {
        #[arg(long)]
        season: i32,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Show driver, constructor, or fantasy-pool standings
    Standings {
        #[arg(long)]
        season: i32,
        #[arg(long, value_enum, default_value = "driver")]
        scope: Scope,
        #[arg(long, value_enum, default_value = "total")]
        kind: TableKind,
        /// Aggregate fresh from ingested results instead of the stored table
        #[arg(long)]
        recompute: bool,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Show one fantasy team's per-race points (requires the team PIN)
    Team {
        #[arg(long)]
        season: i32,
        #[arg(long)]
        name: String,
        #[arg(long)]
        pin: u32,
        #[arg(long)]
        recompute: bool,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Generate a markdown report for the pool
    Report {
        #[arg(long)]
        season: i32,
        #[arg(long)]
        recompute: bool,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    // Loaded and validated once, before any command runs.
    let teams = roster::load(cli.roster.as_deref())?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { schedule, results } => {
            if let Some(path) = schedule {
                let imported = db::import_schedule_csv(&pool, &path).await?;
                println!("Imported {imported} schedule rows from {}.", path.display());
            } else if let Some(path) = results {
                let imported = db::import_results_csv(&pool, &path).await?;
                println!("Imported {imported} result rows from {}.", path.display());
            }
        }
        Commands::Sync { season, as_of } => {
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let live = points::LiveAggregation { pool: &pool, as_of };

            let race = live.session_table(season, SessionKind::Race).await?;
            let sprint = live.session_table(season, SessionKind::Sprint).await?;
            let total = points::combined_table(&race, &sprint);

            db::save_season_table(&pool, season, TableKind::Race, &race).await?;
            db::save_season_table(&pool, season, TableKind::Sprint, &sprint).await?;
            db::save_season_table(&pool, season, TableKind::Total, &total).await?;
            println!(
                "Stored {} race rows and {} sprint rows for {season}.",
                race.len(),
                sprint.len()
            );
        }
        Commands::Standings {
            season,
            scope,
            kind,
            recompute,
            as_of,
            limit,
        } => {
            let table = resolve_table(&pool, season, kind, recompute, as_of).await?;

            match scope {
                Scope::Driver => {
                    let standings = points::driver_standings(&table);
                    if standings.is_empty() {
                        println!("No completed {kind} events for {season} yet.");
                        return Ok(());
                    }
                    println!("{season} driver standings ({kind}):");
                    for standing in standings.iter().take(limit) {
                        println!(
                            "- {} {} ({}): {:.1} points from {} events",
                            standing.abbreviation,
                            standing.broadcast_name,
                            standing.team_name,
                            standing.points,
                            standing.event_count
                        );
                    }
                }
                Scope::Constructor => {
                    let standings = points::constructor_standings(&table);
                    if standings.is_empty() {
                        println!("No completed {kind} events for {season} yet.");
                        return Ok(());
                    }
                    println!("{season} constructor standings ({kind}):");
                    for standing in standings.iter().take(limit) {
                        println!("- {}: {:.1} points", standing.team_name, standing.points);
                    }
                }
                Scope::Fantasy => {
                    let rows = rollup::rollup(&table, &teams);
                    let standings = rollup::fantasy_standings(&rows);
                    if standings.is_empty() {
                        println!("No results attributed to any team for {season} yet.");
                        return Ok(());
                    }
                    println!("{season} fantasy pool standings ({kind}):");
                    for standing in standings.iter().take(limit) {
                        let user = teams
                            .iter()
                            .find(|team| team.team == standing.team)
                            .map(|team| team.user.as_str())
                            .unwrap_or("unknown");
                        println!(
                            "- {} ({}): {:.1} points from {} scoring results",
                            standing.team, user, standing.points, standing.row_count
                        );
                    }
                }
            }
        }
        Commands::Team {
            season,
            name,
            pin,
            recompute,
            as_of,
        } => {
            let team = roster::team_for_pin(&teams, &name, pin)
                .context("unknown team name or wrong PIN")?;
            let table = resolve_table(&pool, season, TableKind::Total, recompute, as_of).await?;
            let rows = rollup::rollup(&table, std::slice::from_ref(team));

            if rows.is_empty() {
                println!("No points for {} in {season} yet.", team.team);
                return Ok(());
            }

            println!("{season} points for {} ({}):", team.team, team.user);
            let mut total = 0.0;
            for row in rows.iter() {
                println!(
                    "- Race {}: {} {:.1} points",
                    row.entry.race_number, row.entry.result.abbreviation, row.entry.result.points
                );
                total += row.entry.result.points;
            }
            println!("Total: {total:.1} points");
        }
        Commands::Report {
            season,
            recompute,
            as_of,
            out,
        } => {
            let race = resolve_table(&pool, season, TableKind::Race, recompute, as_of).await?;
            let sprint = resolve_table(&pool, season, TableKind::Sprint, recompute, as_of).await?;
            let total = resolve_table(&pool, season, TableKind::Total, recompute, as_of).await?;
            let rows = rollup::rollup(&total, &teams);

            let generated = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let report =
                report::build_report(season, generated, &race, &sprint, &total, &teams, &rows);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn resolve_table(
    pool: &PgPool,
    season: i32,
    kind: TableKind,
    recompute: bool,
    as_of: Option<NaiveDate>,
) -> anyhow::Result<Vec<AggregatedResult>> {
    let table = if recompute {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        points::LiveAggregation { pool, as_of }
            .season_table(season, kind)
            .await?
    } else {
        points::StoredSnapshot { pool }.season_table(season, kind).await?
    };
    Ok(table)
}
