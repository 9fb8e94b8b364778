use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::PoolError;
use crate::models::{AggregatedResult, Event, EventFormat, EventResult, SessionKind, TableKind};
use crate::points::ResultSource;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Full schedule for a season, ordered by round. A season the source knows
/// nothing about is an error, not an empty schedule.
pub async fn fetch_schedule(pool: &PgPool, season: i32) -> Result<Vec<Event>, PoolError> {
    let rows = sqlx::query(
        "SELECT round, event_date, name, format \
         FROM fantasy_pool.events WHERE season = $1 ORDER BY round",
    )
    .bind(season)
    .fetch_all(pool)
    .await
    .map_err(|source| PoolError::ScheduleUnavailable {
        season,
        source: Some(source),
    })?;

    if rows.is_empty() {
        return Err(PoolError::ScheduleUnavailable {
            season,
            source: None,
        });
    }

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let format: String = row.get("format");
        events.push(Event {
            round: row.get("round"),
            date: row.get("event_date"),
            name: row.get("name"),
            format: EventFormat::parse(&format)?,
        });
    }

    Ok(events)
}

/// Result source backed by previously ingested rows.
pub struct DbResultSource<'a> {
    pool: &'a PgPool,
}

impl<'a> DbResultSource<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ResultSource for DbResultSource<'_> {
    async fn event_results(
        &self,
        season: i32,
        event_name: &str,
        kind: SessionKind,
    ) -> Result<Vec<EventResult>, PoolError> {
        let rows = sqlx::query(
            "SELECT broadcast_name, abbreviation, team_name, team_color, headshot_url, \
             country_code, classified_position, points, race_time \
             FROM fantasy_pool.event_results \
             WHERE season = $1 AND event_name = $2 AND session = $3 \
             ORDER BY id",
        )
        .bind(season)
        .bind(event_name)
        .bind(kind.session_code())
        .fetch_all(self.pool)
        .await
        .map_err(|source| PoolError::EventResultUnavailable {
            season,
            event: event_name.to_string(),
            kind,
            source: Some(source),
        })?;

        // No rows means the event was never ingested (or never ran); an
        // empty table must not masquerade as a completed session.
        if rows.is_empty() {
            return Err(PoolError::EventResultUnavailable {
                season,
                event: event_name.to_string(),
                kind,
                source: None,
            });
        }

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let abbreviation: String = row.get("abbreviation");
            if abbreviation.len() != 3 {
                return Err(PoolError::MalformedResult {
                    detail: format!(
                        "{event_name}: entrant with invalid abbreviation {abbreviation:?}"
                    ),
                });
            }
            let points: f64 = row.get("points");
            if points < 0.0 {
                return Err(PoolError::MalformedResult {
                    detail: format!("{event_name}: {abbreviation} has negative points"),
                });
            }

            results.push(EventResult {
                broadcast_name: row.get("broadcast_name"),
                abbreviation,
                team_name: row.get("team_name"),
                team_color: row.get("team_color"),
                headshot_url: row.get("headshot_url"),
                country_code: row.get("country_code"),
                classified_position: row.get("classified_position"),
                points,
                race_time: row.get("race_time"),
            });
        }

        Ok(results)
    }
}

pub async fn import_schedule_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        season: i32,
        round: i32,
        name: String,
        event_date: NaiveDate,
        format: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if row.round <= 0 {
            return Err(PoolError::MalformedSchedule {
                detail: format!("{}: round must be positive, got {}", row.name, row.round),
            }
            .into());
        }
        let format = EventFormat::parse(&row.format)?;

        let result = sqlx::query(
            r#"
            INSERT INTO fantasy_pool.events (season, round, name, event_date, format)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (season, round) DO UPDATE
            SET name = EXCLUDED.name, event_date = EXCLUDED.event_date, format = EXCLUDED.format
            "#,
        )
        .bind(row.season)
        .bind(row.round)
        .bind(&row.name)
        .bind(row.event_date)
        .bind(format.as_str())
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            imported += 1;
        }
    }

    info!("imported {imported} schedule rows from {}", csv_path.display());
    Ok(imported)
}

pub async fn import_results_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        season: i32,
        event_name: String,
        session: String,
        broadcast_name: String,
        abbreviation: String,
        team_name: String,
        team_color: String,
        headshot_url: String,
        country_code: String,
        classified_position: String,
        points: f64,
        race_time: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if row.session != "R" && row.session != "S" {
            return Err(PoolError::MalformedResult {
                detail: format!("{}: session must be R or S, got {:?}", row.event_name, row.session),
            }
            .into());
        }
        if row.abbreviation.len() != 3 {
            return Err(PoolError::MalformedResult {
                detail: format!(
                    "{}: entrant with invalid abbreviation {:?}",
                    row.event_name, row.abbreviation
                ),
            }
            .into());
        }
        if row.points < 0.0 {
            return Err(PoolError::MalformedResult {
                detail: format!("{}: {} has negative points", row.event_name, row.abbreviation),
            }
            .into());
        }

        let result = sqlx::query(
            r#"
            INSERT INTO fantasy_pool.event_results
            (season, event_name, session, broadcast_name, abbreviation, team_name,
             team_color, headshot_url, country_code, classified_position, points, race_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (season, event_name, session, abbreviation) DO UPDATE
            SET broadcast_name = EXCLUDED.broadcast_name,
                team_name = EXCLUDED.team_name,
                team_color = EXCLUDED.team_color,
                headshot_url = EXCLUDED.headshot_url,
                country_code = EXCLUDED.country_code,
                classified_position = EXCLUDED.classified_position,
                points = EXCLUDED.points,
                race_time = EXCLUDED.race_time
            "#,
        )
        .bind(row.season)
        .bind(&row.event_name)
        .bind(&row.session)
        .bind(&row.broadcast_name)
        .bind(&row.abbreviation)
        .bind(&row.team_name)
        .bind(&row.team_color)
        .bind(&row.headshot_url)
        .bind(&row.country_code)
        .bind(&row.classified_position)
        .bind(row.points)
        .bind(row.race_time.as_deref())
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            imported += 1;
        }
    }

    info!("imported {imported} result rows from {}", csv_path.display());
    Ok(imported)
}

/// Replace the stored season table for (season, kind) in one transaction.
/// Row order is written out explicitly so a later load reproduces the
/// aggregation order exactly. The marker row in `season_tables` is what
/// distinguishes a synced-but-empty table from one that was never synced.
pub async fn save_season_table(
    pool: &PgPool,
    season: i32,
    kind: TableKind,
    table: &[AggregatedResult],
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO fantasy_pool.season_tables (season, kind, row_count, synced_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (season, kind) DO UPDATE
        SET row_count = EXCLUDED.row_count, synced_at = now()
        "#,
    )
    .bind(season)
    .bind(kind.as_str())
    .bind(table.len() as i32)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM fantasy_pool.season_points WHERE season = $1 AND kind = $2")
        .bind(season)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?;

    for (ord, row) in table.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO fantasy_pool.season_points
            (season, kind, row_ord, race_number, broadcast_name, abbreviation, team_name,
             team_color, headshot_url, country_code, classified_position, points, race_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(season)
        .bind(kind.as_str())
        .bind(ord as i32)
        .bind(row.race_number)
        .bind(&row.result.broadcast_name)
        .bind(&row.result.abbreviation)
        .bind(&row.result.team_name)
        .bind(&row.result.team_color)
        .bind(&row.result.headshot_url)
        .bind(&row.result.country_code)
        .bind(&row.result.classified_position)
        .bind(row.result.points)
        .bind(row.result.race_time.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("stored {} {kind} rows for season {season}", table.len());
    Ok(())
}

pub async fn load_season_table(
    pool: &PgPool,
    season: i32,
    kind: TableKind,
) -> Result<Vec<AggregatedResult>, PoolError> {
    let marker = sqlx::query(
        "SELECT row_count FROM fantasy_pool.season_tables WHERE season = $1 AND kind = $2",
    )
    .bind(season)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    if marker.is_none() {
        return Err(PoolError::SnapshotMissing { season, kind });
    }

    let rows = sqlx::query(
        "SELECT race_number, broadcast_name, abbreviation, team_name, team_color, \
         headshot_url, country_code, classified_position, points, race_time \
         FROM fantasy_pool.season_points \
         WHERE season = $1 AND kind = $2 \
         ORDER BY row_ord",
    )
    .bind(season)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;

    let table = rows
        .into_iter()
        .map(|row| AggregatedResult {
            race_number: row.get("race_number"),
            result: EventResult {
                broadcast_name: row.get("broadcast_name"),
                abbreviation: row.get("abbreviation"),
                team_name: row.get("team_name"),
                team_color: row.get("team_color"),
                headshot_url: row.get("headshot_url"),
                country_code: row.get("country_code"),
                classified_position: row.get("classified_position"),
                points: row.get("points"),
                race_time: row.get("race_time"),
            },
        })
        .collect();

    Ok(table)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let events: Vec<(i32, &str, &str, &str)> = vec![
        (1, "Bahrain Grand Prix", "2024-03-02", "conventional"),
        (2, "Saudi Arabian Grand Prix", "2024-03-09", "conventional"),
        (3, "Australian Grand Prix", "2024-03-24", "conventional"),
        (4, "Japanese Grand Prix", "2024-04-07", "conventional"),
        (5, "Chinese Grand Prix", "2024-04-21", "sprint_qualifying"),
        (6, "Miami Grand Prix", "2024-05-05", "sprint_qualifying"),
        (7, "Emilia Romagna Grand Prix", "2024-05-19", "conventional"),
        (8, "Monaco Grand Prix", "2024-05-26", "conventional"),
    ];

    for (round, name, date, format) in events {
        let event_date =
            NaiveDate::parse_from_str(date, "%Y-%m-%d").context("invalid seed date")?;
        sqlx::query(
            r#"
            INSERT INTO fantasy_pool.events (season, round, name, event_date, format)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (season, round) DO UPDATE
            SET name = EXCLUDED.name, event_date = EXCLUDED.event_date, format = EXCLUDED.format
            "#,
        )
        .bind(2024)
        .bind(round)
        .bind(name)
        .bind(event_date)
        .bind(format)
        .execute(pool)
        .await?;
    }

    // (event, session, broadcast name, code, team, color, country, position, points, time)
    let results: Vec<(&str, &str, &str, &str, &str, &str, &str, &str, f64, Option<&str>)> = vec![
        ("Bahrain Grand Prix", "R", "M VERSTAPPEN", "VER", "Red Bull Racing", "3671C6", "NED", "1", 26.0, Some("1:31:44.742")),
        ("Bahrain Grand Prix", "R", "S PEREZ", "PER", "Red Bull Racing", "3671C6", "MEX", "2", 18.0, Some("+22.457")),
        ("Bahrain Grand Prix", "R", "C SAINZ", "SAI", "Ferrari", "E8002D", "ESP", "3", 15.0, Some("+25.110")),
        ("Bahrain Grand Prix", "R", "C LECLERC", "LEC", "Ferrari", "E8002D", "MON", "4", 12.0, Some("+39.669")),
        ("Bahrain Grand Prix", "R", "G RUSSELL", "RUS", "Mercedes", "27F4D2", "GBR", "5", 10.0, Some("+46.788")),
        ("Bahrain Grand Prix", "R", "L NORRIS", "NOR", "McLaren", "FF8000", "GBR", "6", 8.0, Some("+48.458")),
        ("Bahrain Grand Prix", "R", "L HAMILTON", "HAM", "Mercedes", "27F4D2", "GBR", "7", 6.0, Some("+50.324")),
        ("Bahrain Grand Prix", "R", "O PIASTRI", "PIA", "McLaren", "FF8000", "AUS", "8", 4.0, Some("+56.082")),
        ("Bahrain Grand Prix", "R", "F ALONSO", "ALO", "Aston Martin", "229971", "ESP", "9", 2.0, Some("+74.887")),
        ("Bahrain Grand Prix", "R", "L STROLL", "STR", "Aston Martin", "229971", "CAN", "10", 1.0, Some("+93.216")),
        ("Chinese Grand Prix", "S", "M VERSTAPPEN", "VER", "Red Bull Racing", "3671C6", "NED", "1", 8.0, Some("32:04.660")),
        ("Chinese Grand Prix", "S", "L HAMILTON", "HAM", "Mercedes", "27F4D2", "GBR", "2", 7.0, Some("+13.043")),
        ("Chinese Grand Prix", "S", "S PEREZ", "PER", "Red Bull Racing", "3671C6", "MEX", "3", 6.0, Some("+15.258")),
        ("Chinese Grand Prix", "S", "C LECLERC", "LEC", "Ferrari", "E8002D", "MON", "4", 5.0, Some("+17.486")),
        ("Chinese Grand Prix", "S", "C SAINZ", "SAI", "Ferrari", "E8002D", "ESP", "5", 4.0, Some("+20.696")),
        ("Chinese Grand Prix", "S", "L NORRIS", "NOR", "McLaren", "FF8000", "GBR", "6", 3.0, Some("+22.088")),
        ("Chinese Grand Prix", "S", "O PIASTRI", "PIA", "McLaren", "FF8000", "AUS", "7", 2.0, Some("+24.713")),
        ("Chinese Grand Prix", "S", "G RUSSELL", "RUS", "Mercedes", "27F4D2", "GBR", "8", 1.0, Some("+27.335")),
    ];

    for (event, session, broadcast, code, team, color, country, position, points, time) in results {
        sqlx::query(
            r#"
            INSERT INTO fantasy_pool.event_results
            (season, event_name, session, broadcast_name, abbreviation, team_name,
             team_color, headshot_url, country_code, classified_position, points, race_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, '', $8, $9, $10, $11)
            ON CONFLICT (season, event_name, session, abbreviation) DO NOTHING
            "#,
        )
        .bind(2024)
        .bind(event)
        .bind(session)
        .bind(broadcast)
        .bind(code)
        .bind(team)
        .bind(color)
        .bind(country)
        .bind(position)
        .bind(points)
        .bind(time)
        .execute(pool)
        .await?;
    }

    Ok(())
}
