use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AggregatedResult, FantasyRollupRow, FantasyTeam};
use crate::points;
use crate::rollup;

pub fn build_report(
    season: i32,
    generated: NaiveDate,
    race_table: &[AggregatedResult],
    sprint_table: &[AggregatedResult],
    total_table: &[AggregatedResult],
    teams: &[FantasyTeam],
    rollup_rows: &[FantasyRollupRow],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {season} Fantasy Pool Report");
    let _ = writeln!(output, "Generated {generated}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Driver Standings");

    for (label, table) in [
        ("Race", race_table),
        ("Sprint", sprint_table),
        ("Total", total_table),
    ] {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {label}");
        write_driver_standings(&mut output, table);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Constructor Standings");
    let constructors = points::constructor_standings(total_table);
    if constructors.is_empty() {
        let _ = writeln!(output, "No completed events yet.");
    } else {
        for standing in constructors.iter() {
            let _ = writeln!(output, "- {}: {:.1} points", standing.team_name, standing.points);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fantasy Pool Standings");
    let standings = rollup::fantasy_standings(rollup_rows);
    if standings.is_empty() {
        let _ = writeln!(output, "No results attributed to any team yet.");
    } else {
        for standing in standings.iter() {
            let user = teams
                .iter()
                .find(|team| team.team == standing.team)
                .map(|team| team.user.as_str())
                .unwrap_or("unknown");
            let _ = writeln!(
                output,
                "- {} ({}): {:.1} points from {} scoring results",
                standing.team, user, standing.points, standing.row_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Team Breakdown");
    for team in teams.iter() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {} ({})", team.team, team.user);
        let entries: Vec<AggregatedResult> = rollup_rows
            .iter()
            .filter(|row| row.fantasy_team == team.team)
            .map(|row| row.entry.clone())
            .collect();
        if entries.is_empty() {
            let _ = writeln!(output, "No scoring drivers yet.");
            continue;
        }
        for driver in points::driver_standings(&entries).iter() {
            let _ = writeln!(
                output,
                "- {} {}: {:.1} points from {} events",
                driver.abbreviation, driver.broadcast_name, driver.points, driver.event_count
            );
        }
    }

    output
}

fn write_driver_standings(output: &mut String, table: &[AggregatedResult]) {
    let standings = points::driver_standings(table);
    if standings.is_empty() {
        let _ = writeln!(output, "No completed events yet.");
        return;
    }
    for standing in standings.iter() {
        let _ = writeln!(
            output,
            "- {} {} ({}): {:.1} points from {} events",
            standing.abbreviation,
            standing.broadcast_name,
            standing.team_name,
            standing.points,
            standing.event_count
        );
    }
}
