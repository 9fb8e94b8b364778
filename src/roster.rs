use std::path::Path;

use anyhow::Context;

use crate::error::PoolError;
use crate::models::FantasyTeam;

/// Load the pool roster: the built-in list unless a JSON override is given.
/// Validation happens here, before any aggregation runs, so a bad roster
/// never gets as far as attribution.
pub fn load(path: Option<&Path>) -> anyhow::Result<Vec<FantasyTeam>> {
    let teams = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read roster file {}", path.display()))?;
            parse(&text).with_context(|| format!("failed to parse roster file {}", path.display()))?
        }
        None => default_roster(),
    };
    validate(&teams)?;
    Ok(teams)
}

pub fn parse(text: &str) -> anyhow::Result<Vec<FantasyTeam>> {
    let teams: Vec<FantasyTeam> = serde_json::from_str(text)?;
    Ok(teams)
}

pub fn validate(teams: &[FantasyTeam]) -> Result<(), PoolError> {
    let mut seen_names: std::collections::HashSet<&str> = std::collections::HashSet::new();

    for team in teams {
        if team.team.trim().is_empty() {
            return Err(PoolError::InvalidRoster {
                detail: format!("team owned by {:?} has no name", team.user),
            });
        }
        if !seen_names.insert(team.team.as_str()) {
            return Err(PoolError::InvalidRoster {
                detail: format!("duplicate team name {:?}", team.team),
            });
        }

        let mut seen_codes: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for code in &team.drivers {
            if code.len() != 3 {
                return Err(PoolError::InvalidRoster {
                    detail: format!("team {:?} lists invalid driver code {:?}", team.team, code),
                });
            }
            if !seen_codes.insert(code.as_str()) {
                return Err(PoolError::InvalidRoster {
                    detail: format!("team {:?} lists driver {:?} twice", team.team, code),
                });
            }
        }
    }

    Ok(())
}

/// Look up a team by name and PIN. The PIN is a lightweight access code for
/// the single-team view, not a security boundary.
pub fn team_for_pin<'a>(
    teams: &'a [FantasyTeam],
    name: &str,
    pin: u32,
) -> Option<&'a FantasyTeam> {
    teams.iter().find(|team| team.team == name && team.pin == pin)
}

pub fn default_roster() -> Vec<FantasyTeam> {
    let entries: Vec<(&str, &str, u32, &[&str])> = vec![
        (
            "Colin B.",
            "underDOGS",
            999,
            &["ALO", "LEC", "PIA", "GAS", "HUL", "ZHO", "RIC", "SAR", "MAG"],
        ),
        (
            "Mitz",
            "Maxing Maximum Maxs Maxima",
            42069,
            &["BOT", "RIC", "TSU", "VER", "ZHO"],
        ),
        (
            "Susan Tiffin",
            "Cheering for Red and Riccardo",
            16,
            &["LEC", "SAI", "BEA", "RIC", "PIA", "MAG", "TSU", "GAS", "HUL"],
        ),
        ("Mark Fitzowich", "Mark F1tzowich", 805, &["LEC", "NOR", "RUS", "ALB"]),
        ("Chapman Sun", "Mastercard CashApp", 2024, &["HAM", "NOR", "PIA", "GAS"]),
        ("Hayley G.", "Papaya Pit Crew", 4040, &["NOR", "PER", "PIA", "RIC", "ZHO"]),
        ("Jesse", "Crypto CashApp", 1111, &["VER", "ALB", "BOT", "RIC", "MAG"]),
        ("Michael Kissinger", "The WiQed Fasts", 9876, &["VER", "ALB", "BOT", "HUL"]),
        ("Richard Stuivenberg", "Flying Slap", 1997, &["ALO", "NOR", "RUS", "ALB"]),
        ("Alan Brazendale", "BrazenF1", 2468, &["LEC", "SAI", "BEA", "NOR"]),
    ];

    entries
        .into_iter()
        .map(|(user, team, pin, drivers)| FantasyTeam {
            user: user.to_string(),
            team: team.to_string(),
            pin,
            drivers: drivers.iter().map(|code| code.to_string()).collect(),
            score: 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str, drivers: &[&str]) -> FantasyTeam {
        FantasyTeam {
            user: "Tester".to_string(),
            team: name.to_string(),
            pin: 1234,
            drivers: drivers.iter().map(|code| code.to_string()).collect(),
            score: 0.0,
        }
    }

    #[test]
    fn default_roster_passes_validation() {
        let teams = default_roster();
        assert_eq!(teams.len(), 10);
        assert!(validate(&teams).is_ok());
    }

    #[test]
    fn rejects_unnamed_team() {
        let teams = vec![team("", &["ALO"])];
        assert!(matches!(
            validate(&teams),
            Err(PoolError::InvalidRoster { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_team_names() {
        let teams = vec![team("underDOGS", &["ALO"]), team("underDOGS", &["LEC"])];
        assert!(validate(&teams).is_err());
    }

    #[test]
    fn rejects_duplicate_driver_within_a_team() {
        let teams = vec![team("underDOGS", &["ALO", "ALO"])];
        assert!(validate(&teams).is_err());
    }

    #[test]
    fn rejects_malformed_driver_code() {
        let teams = vec![team("underDOGS", &["ALONSO"])];
        assert!(validate(&teams).is_err());
    }

    #[test]
    fn empty_driver_list_is_valid() {
        let teams = vec![team("Empty Garage", &[])];
        assert!(validate(&teams).is_ok());
    }

    #[test]
    fn parses_roster_json() {
        let text = r#"[
            {
                "User": "Colin B.",
                "Team": "underDOGS",
                "PIN": 999,
                "Drivers": ["ALO", "LEC"],
                "Score": 0.0
            }
        ]"#;

        let teams = parse(text).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].team, "underDOGS");
        assert_eq!(teams[0].pin, 999);
        assert_eq!(teams[0].drivers, vec!["ALO", "LEC"]);
    }

    #[test]
    fn score_defaults_to_zero_when_absent() {
        let text = r#"[{"User": "Mitz", "Team": "Maxima", "PIN": 42069, "Drivers": ["VER"]}]"#;
        let teams = parse(text).unwrap();
        assert_eq!(teams[0].score, 0.0);
    }

    #[test]
    fn pin_lookup_requires_both_name_and_pin() {
        let teams = default_roster();
        assert!(team_for_pin(&teams, "underDOGS", 999).is_some());
        assert!(team_for_pin(&teams, "underDOGS", 1000).is_none());
        assert!(team_for_pin(&teams, "no such team", 999).is_none());
    }
}
