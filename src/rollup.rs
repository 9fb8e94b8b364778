use std::collections::HashMap;

use crate::models::{AggregatedResult, FantasyRollupRow, FantasyStanding, FantasyTeam};

/// Attribute season-table rows to fantasy teams by roster membership. A
/// driver on several rosters contributes a full copy of each row to every
/// one of them; a driver on none contributes nothing. Teams are processed
/// in the order given and the table's row order is preserved within each
/// team. Inputs are never mutated and the static `score` field is never
/// written.
pub fn rollup(points_table: &[AggregatedResult], teams: &[FantasyTeam]) -> Vec<FantasyRollupRow> {
    let mut rows = Vec::new();

    for team in teams {
        for entry in points_table {
            if team.drivers.iter().any(|code| code == &entry.result.abbreviation) {
                rows.push(FantasyRollupRow {
                    fantasy_team: team.team.clone(),
                    entry: entry.clone(),
                });
            }
        }
    }

    rows
}

/// Pool leaderboard: rollup rows grouped by fantasy team, points summed,
/// sorted descending. Teams with no attributed rows do not appear.
pub fn fantasy_standings(rows: &[FantasyRollupRow]) -> Vec<FantasyStanding> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, FantasyStanding> = HashMap::new();

    for row in rows {
        let entry = grouped.entry(row.fantasy_team.clone()).or_insert_with(|| {
            order.push(row.fantasy_team.clone());
            FantasyStanding {
                team: row.fantasy_team.clone(),
                points: 0.0,
                row_count: 0,
            }
        });
        entry.points += row.entry.result.points;
        entry.row_count += 1;
    }

    let mut standings: Vec<FantasyStanding> = order
        .into_iter()
        .filter_map(|team| grouped.remove(&team))
        .collect();
    standings.sort_by(|a, b| b.points.partial_cmp(&a.points).unwrap_or(std::cmp::Ordering::Equal));
    standings
}
