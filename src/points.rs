use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::error::PoolError;
use crate::models::{
    AggregatedResult, ConstructorStanding, DriverStanding, Event, EventResult, SessionKind,
    TableKind,
};
use crate::schedule;

/// Opaque per-event result source. Backed by previously ingested rows in
/// production; tests substitute an in-memory map.
pub trait ResultSource {
    async fn event_results(
        &self,
        season: i32,
        event_name: &str,
        kind: SessionKind,
    ) -> Result<Vec<EventResult>, PoolError>;
}

/// Fold the completed events of a season into one points table, stamping
/// each result batch with its event's round. The first fetch error aborts
/// the whole run; a partial table is never returned.
pub async fn aggregate<S: ResultSource>(
    source: &S,
    season: i32,
    kind: SessionKind,
    events: &[Event],
) -> Result<Vec<AggregatedResult>, PoolError> {
    let mut table = Vec::new();

    for event in events {
        let batch = source.event_results(season, &event.name, kind).await?;
        info!(
            "aggregated {} {} results for {} (round {})",
            batch.len(),
            kind,
            event.name,
            event.round
        );
        table.extend(batch.into_iter().map(|result| AggregatedResult {
            race_number: event.round,
            result,
        }));
    }

    Ok(table)
}

/// Combined table: the race table followed by the sprint table, orders
/// intact.
pub fn combined_table(
    race: &[AggregatedResult],
    sprint: &[AggregatedResult],
) -> Vec<AggregatedResult> {
    let mut table = race.to_vec();
    table.extend(sprint.iter().cloned());
    table
}

/// Group a season table by driver abbreviation and sum points. Groups keep
/// first-seen order; the sort on points is stable, so ties stay in that
/// order.
pub fn driver_standings(table: &[AggregatedResult]) -> Vec<DriverStanding> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, DriverStanding> = HashMap::new();

    for row in table {
        let entry = grouped
            .entry(row.result.abbreviation.clone())
            .or_insert_with(|| {
                order.push(row.result.abbreviation.clone());
                DriverStanding {
                    abbreviation: row.result.abbreviation.clone(),
                    broadcast_name: row.result.broadcast_name.clone(),
                    team_name: row.result.team_name.clone(),
                    points: 0.0,
                    event_count: 0,
                }
            });
        entry.points += row.result.points;
        entry.event_count += 1;
    }

    let mut standings: Vec<DriverStanding> = order
        .into_iter()
        .filter_map(|code| grouped.remove(&code))
        .collect();
    standings.sort_by(|a, b| b.points.partial_cmp(&a.points).unwrap_or(std::cmp::Ordering::Equal));
    standings
}

/// Constructor view of the same table: grouped by team name instead of
/// driver.
pub fn constructor_standings(table: &[AggregatedResult]) -> Vec<ConstructorStanding> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, f64> = HashMap::new();

    for row in table {
        let entry = grouped.entry(row.result.team_name.clone()).or_insert_with(|| {
            order.push(row.result.team_name.clone());
            0.0
        });
        *entry += row.result.points;
    }

    let mut standings: Vec<ConstructorStanding> = order
        .into_iter()
        .filter_map(|team_name| {
            grouped
                .remove(&team_name)
                .map(|points| ConstructorStanding { team_name, points })
        })
        .collect();
    standings.sort_by(|a, b| b.points.partial_cmp(&a.points).unwrap_or(std::cmp::Ordering::Equal));
    standings
}

/// Where a season table comes from: recomputed from ingested event results,
/// or read back from the stored snapshot written by `sync`.
pub trait SeasonTableSource {
    async fn season_table(
        &self,
        season: i32,
        kind: TableKind,
    ) -> Result<Vec<AggregatedResult>, PoolError>;
}

pub struct LiveAggregation<'a> {
    pub pool: &'a PgPool,
    pub as_of: NaiveDate,
}

impl LiveAggregation<'_> {
    pub async fn session_table(
        &self,
        season: i32,
        kind: SessionKind,
    ) -> Result<Vec<AggregatedResult>, PoolError> {
        let events = db::fetch_schedule(self.pool, season).await?;
        let completed = schedule::select_completed(&events, kind, self.as_of);
        let source = db::DbResultSource::new(self.pool);
        aggregate(&source, season, kind, &completed).await
    }
}

impl SeasonTableSource for LiveAggregation<'_> {
    async fn season_table(
        &self,
        season: i32,
        kind: TableKind,
    ) -> Result<Vec<AggregatedResult>, PoolError> {
        match kind {
            TableKind::Race => self.session_table(season, SessionKind::Race).await,
            TableKind::Sprint => self.session_table(season, SessionKind::Sprint).await,
            TableKind::Total => {
                let race = self.session_table(season, SessionKind::Race).await?;
                let sprint = self.session_table(season, SessionKind::Sprint).await?;
                Ok(combined_table(&race, &sprint))
            }
        }
    }
}

pub struct StoredSnapshot<'a> {
    pub pool: &'a PgPool,
}

impl SeasonTableSource for StoredSnapshot<'_> {
    async fn season_table(
        &self,
        season: i32,
        kind: TableKind,
    ) -> Result<Vec<AggregatedResult>, PoolError> {
        db::load_season_table(self.pool, season, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventFormat;

    fn sample_event(round: i32, name: &str) -> Event {
        Event {
            round,
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            name: name.to_string(),
            format: EventFormat::Conventional,
        }
    }

    fn sample_result(code: &str, team: &str, points: f64) -> EventResult {
        EventResult {
            broadcast_name: format!("{code} Driver"),
            abbreviation: code.to_string(),
            team_name: team.to_string(),
            team_color: "3671C6".to_string(),
            headshot_url: String::new(),
            country_code: "NED".to_string(),
            classified_position: "1".to_string(),
            points,
            race_time: None,
        }
    }

    struct StubSource {
        batches: HashMap<String, Vec<EventResult>>,
    }

    impl StubSource {
        fn new(batches: Vec<(&str, Vec<EventResult>)>) -> Self {
            Self {
                batches: batches
                    .into_iter()
                    .map(|(name, rows)| (name.to_string(), rows))
                    .collect(),
            }
        }
    }

    impl ResultSource for StubSource {
        async fn event_results(
            &self,
            season: i32,
            event_name: &str,
            kind: SessionKind,
        ) -> Result<Vec<EventResult>, PoolError> {
            self.batches.get(event_name).cloned().ok_or_else(|| {
                PoolError::EventResultUnavailable {
                    season,
                    event: event_name.to_string(),
                    kind,
                    source: None,
                }
            })
        }
    }

    #[tokio::test]
    async fn aggregate_stamps_each_batch_with_its_round() {
        let source = StubSource::new(vec![
            (
                "Bahrain Grand Prix",
                vec![sample_result("VER", "Red Bull Racing", 26.0), sample_result("PER", "Red Bull Racing", 18.0)],
            ),
            (
                "Chinese Grand Prix",
                vec![
                    sample_result("VER", "Red Bull Racing", 25.0),
                    sample_result("NOR", "McLaren", 18.0),
                    sample_result("PER", "Red Bull Racing", 15.0),
                ],
            ),
        ]);
        let events = vec![
            sample_event(1, "Bahrain Grand Prix"),
            sample_event(5, "Chinese Grand Prix"),
        ];

        let table = aggregate(&source, 2024, SessionKind::Race, &events)
            .await
            .unwrap();

        assert_eq!(table.len(), 5);
        let rounds: std::collections::HashSet<i32> =
            table.iter().map(|row| row.race_number).collect();
        assert_eq!(rounds, [1, 5].into_iter().collect());
        // Event iteration order, then source order within an event.
        assert_eq!(table[0].result.abbreviation, "VER");
        assert_eq!(table[2].race_number, 5);
    }

    #[tokio::test]
    async fn aggregate_is_deterministic() {
        let source = StubSource::new(vec![(
            "Bahrain Grand Prix",
            vec![sample_result("VER", "Red Bull Racing", 26.0), sample_result("SAI", "Ferrari", 15.0)],
        )]);
        let events = vec![sample_event(1, "Bahrain Grand Prix")];

        let first = aggregate(&source, 2024, SessionKind::Race, &events)
            .await
            .unwrap();
        let second = aggregate(&source, 2024, SessionKind::Race, &events)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn aggregate_aborts_on_first_missing_event() {
        let source = StubSource::new(vec![
            ("Bahrain Grand Prix", vec![sample_result("VER", "Red Bull Racing", 26.0)]),
            ("Australian Grand Prix", vec![sample_result("SAI", "Ferrari", 25.0)]),
        ]);
        // The middle event has no results; nothing from the run survives.
        let events = vec![
            sample_event(1, "Bahrain Grand Prix"),
            sample_event(2, "Saudi Arabian Grand Prix"),
            sample_event(3, "Australian Grand Prix"),
        ];

        let outcome = aggregate(&source, 2024, SessionKind::Race, &events).await;
        match outcome {
            Err(PoolError::EventResultUnavailable { event, .. }) => {
                assert_eq!(event, "Saudi Arabian Grand Prix");
            }
            other => panic!("expected EventResultUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn aggregate_of_no_events_is_empty() {
        let source = StubSource::new(vec![]);
        let table = aggregate(&source, 2024, SessionKind::Sprint, &[])
            .await
            .unwrap();
        assert!(table.is_empty());
    }

    fn row(race_number: i32, code: &str, team: &str, points: f64) -> AggregatedResult {
        AggregatedResult {
            race_number,
            result: sample_result(code, team, points),
        }
    }

    #[test]
    fn driver_standings_sum_across_rounds() {
        let table = vec![
            row(1, "VER", "Red Bull Racing", 26.0),
            row(1, "NOR", "McLaren", 18.0),
            row(2, "VER", "Red Bull Racing", 25.0),
            row(2, "NOR", "McLaren", 12.0),
        ];

        let standings = driver_standings(&table);
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].abbreviation, "VER");
        assert!((standings[0].points - 51.0).abs() < f64::EPSILON);
        assert_eq!(standings[0].event_count, 2);
        assert_eq!(standings[1].abbreviation, "NOR");
    }

    #[test]
    fn driver_standings_keep_first_seen_order_on_ties() {
        let table = vec![
            row(1, "ALO", "Aston Martin", 10.0),
            row(1, "GAS", "Alpine", 10.0),
        ];

        let standings = driver_standings(&table);
        assert_eq!(standings[0].abbreviation, "ALO");
        assert_eq!(standings[1].abbreviation, "GAS");
    }

    #[test]
    fn constructor_standings_group_by_team() {
        let table = vec![
            row(1, "VER", "Red Bull Racing", 26.0),
            row(1, "PER", "Red Bull Racing", 18.0),
            row(1, "NOR", "McLaren", 15.0),
        ];

        let standings = constructor_standings(&table);
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].team_name, "Red Bull Racing");
        assert!((standings[0].points - 44.0).abs() < f64::EPSILON);
    }

    #[test]
    fn combined_table_is_race_then_sprint() {
        let race = vec![row(1, "VER", "Red Bull Racing", 26.0), row(2, "NOR", "McLaren", 25.0)];
        let sprint = vec![row(5, "VER", "Red Bull Racing", 8.0)];

        let total = combined_table(&race, &sprint);
        assert_eq!(total.len(), 3);
        assert_eq!(total[0].race_number, 1);
        assert_eq!(total[1].race_number, 2);
        assert_eq!(total[2].race_number, 5);
        assert_eq!(total[2].result.abbreviation, "VER");
    }

    #[test]
    fn standings_of_empty_table_are_empty() {
        assert!(driver_standings(&[]).is_empty());
        assert!(constructor_standings(&[]).is_empty());
    }
}
