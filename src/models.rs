use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Session a points table is built from: the grand prix or the sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Race,
    Sprint,
}

impl SessionKind {
    /// Session code used by the result source ('R' or 'S').
    pub fn session_code(self) -> &'static str {
        match self {
            Self::Race => "R",
            Self::Sprint => "S",
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Race => write!(f, "race"),
            Self::Sprint => write!(f, "sprint"),
        }
    }
}

/// Key for a persisted season table. `Total` is the race table followed by
/// the sprint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TableKind {
    Race,
    Sprint,
    Total,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Sprint => "sprint",
            Self::Total => "total",
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFormat {
    Conventional,
    Sprint,
    SprintShootout,
    SprintQualifying,
    Testing,
}

impl EventFormat {
    pub fn parse(value: &str) -> Result<Self, PoolError> {
        match value {
            "conventional" => Ok(Self::Conventional),
            "sprint" => Ok(Self::Sprint),
            "sprint_shootout" => Ok(Self::SprintShootout),
            "sprint_qualifying" => Ok(Self::SprintQualifying),
            "testing" => Ok(Self::Testing),
            other => Err(PoolError::MalformedSchedule {
                detail: format!("unknown event format {other:?}"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conventional => "conventional",
            Self::Sprint => "sprint",
            Self::SprintShootout => "sprint_shootout",
            Self::SprintQualifying => "sprint_qualifying",
            Self::Testing => "testing",
        }
    }

    /// Weekends that run a sprint session in addition to the grand prix.
    pub fn is_sprint_weekend(&self) -> bool {
        matches!(self, Self::Sprint | Self::SprintShootout | Self::SprintQualifying)
    }

    /// Weekends that run a full grand prix. Sprint weekends still do;
    /// testing does not.
    pub fn runs_grand_prix(&self) -> bool {
        matches!(self, Self::Conventional) || self.is_sprint_weekend()
    }
}

/// One scheduled competition weekend within a season.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub round: i32,
    pub date: NaiveDate,
    pub name: String,
    pub format: EventFormat,
}

/// One entrant's classified result within a single session.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResult {
    pub broadcast_name: String,
    pub abbreviation: String,
    pub team_name: String,
    pub team_color: String,
    pub headshot_url: String,
    pub country_code: String,
    pub classified_position: String,
    pub points: f64,
    pub race_time: Option<String>,
}

/// An [`EventResult`] stamped with the round it came from. The full set for
/// a season and session kind is the season points table.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub race_number: i32,
    pub result: EventResult,
}

/// Static pool roster entry. `score` exists in the stored definition but is
/// never written at runtime; totals are derived from the rollup on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FantasyTeam {
    pub user: String,
    pub team: String,
    #[serde(rename = "PIN")]
    pub pin: u32,
    pub drivers: Vec<String>,
    #[serde(default)]
    pub score: f64,
}

/// A season-table row attributed to one fantasy team by roster membership.
#[derive(Debug, Clone, PartialEq)]
pub struct FantasyRollupRow {
    pub fantasy_team: String,
    pub entry: AggregatedResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverStanding {
    pub abbreviation: String,
    pub broadcast_name: String,
    pub team_name: String,
    pub points: f64,
    pub event_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorStanding {
    pub team_name: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FantasyStanding {
    pub team: String,
    pub points: f64,
    pub row_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_codes_match_source() {
        assert_eq!(SessionKind::Race.session_code(), "R");
        assert_eq!(SessionKind::Sprint.session_code(), "S");
    }

    #[test]
    fn format_round_trips_through_parse() {
        for format in [
            EventFormat::Conventional,
            EventFormat::Sprint,
            EventFormat::SprintShootout,
            EventFormat::SprintQualifying,
            EventFormat::Testing,
        ] {
            assert_eq!(EventFormat::parse(format.as_str()).unwrap(), format);
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(EventFormat::parse("exhibition").is_err());
    }

    #[test]
    fn sprint_weekends_still_run_a_grand_prix() {
        assert!(EventFormat::SprintShootout.runs_grand_prix());
        assert!(EventFormat::SprintQualifying.is_sprint_weekend());
        assert!(!EventFormat::Conventional.is_sprint_weekend());
        assert!(!EventFormat::Testing.runs_grand_prix());
    }
}
