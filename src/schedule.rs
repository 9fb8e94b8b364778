use chrono::NaiveDate;

use crate::models::{Event, SessionKind};

/// Select the events of `kind` that have completed on or before `as_of`,
/// ordered by round. Sprint weekends count for both kinds since they run a
/// grand prix as well as a sprint. An empty selection is a valid outcome
/// early in the season.
pub fn select_completed(events: &[Event], kind: SessionKind, as_of: NaiveDate) -> Vec<Event> {
    let mut selected: Vec<Event> = events
        .iter()
        .filter(|event| event.date <= as_of)
        .filter(|event| match kind {
            SessionKind::Race => event.format.runs_grand_prix(),
            SessionKind::Sprint => event.format.is_sprint_weekend(),
        })
        .cloned()
        .collect();

    selected.sort_by_key(|event| event.round);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventFormat;

    fn event(round: i32, format: EventFormat, date: NaiveDate) -> Event {
        Event {
            round,
            date,
            name: format!("Round {round} Grand Prix"),
            format,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn never_selects_events_after_as_of() {
        let events = vec![
            event(1, EventFormat::Conventional, day(2024, 3, 2)),
            event(2, EventFormat::Conventional, day(2024, 3, 9)),
            event(3, EventFormat::SprintQualifying, day(2024, 4, 21)),
        ];
        let as_of = day(2024, 3, 9);

        for kind in [SessionKind::Race, SessionKind::Sprint] {
            for selected in select_completed(&events, kind, as_of) {
                assert!(selected.date <= as_of);
            }
        }
    }

    #[test]
    fn race_selection_spans_conventional_and_sprint_weekends() {
        let events = vec![
            event(1, EventFormat::Conventional, day(2024, 3, 2)),
            event(2, EventFormat::SprintShootout, day(2024, 3, 16)),
            event(3, EventFormat::Testing, day(2024, 2, 23)),
        ];

        let races = select_completed(&events, SessionKind::Race, day(2024, 4, 1));
        let rounds: Vec<i32> = races.iter().map(|e| e.round).collect();
        assert_eq!(rounds, vec![1, 2]);
        assert!(races.iter().all(|e| e.format.runs_grand_prix()));
    }

    #[test]
    fn sprint_selection_requires_a_sprint_weekend() {
        let events = vec![
            event(1, EventFormat::Conventional, day(2024, 3, 2)),
            event(2, EventFormat::SprintShootout, day(2024, 3, 16)),
            event(3, EventFormat::SprintQualifying, day(2024, 4, 21)),
        ];

        let sprints = select_completed(&events, SessionKind::Sprint, day(2024, 4, 30));
        assert_eq!(sprints.len(), 2);
        assert!(sprints.iter().all(|e| e.format.is_sprint_weekend()));
    }

    #[test]
    fn date_boundary_between_rounds() {
        // Round 1 in the past, round 2 a sprint weekend in the future:
        // the race view sees only round 1, the sprint view sees nothing.
        let events = vec![
            event(1, EventFormat::Conventional, day(2024, 3, 2)),
            event(2, EventFormat::SprintShootout, day(2024, 6, 1)),
        ];
        let today = day(2024, 4, 15);

        let races = select_completed(&events, SessionKind::Race, today);
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].round, 1);

        let sprints = select_completed(&events, SessionKind::Sprint, today);
        assert!(sprints.is_empty());
    }

    #[test]
    fn selection_is_ordered_by_round() {
        let events = vec![
            event(4, EventFormat::Conventional, day(2024, 4, 7)),
            event(1, EventFormat::Conventional, day(2024, 3, 2)),
            event(3, EventFormat::SprintQualifying, day(2024, 3, 24)),
        ];

        let races = select_completed(&events, SessionKind::Race, day(2024, 5, 1));
        let rounds: Vec<i32> = races.iter().map(|e| e.round).collect();
        assert_eq!(rounds, vec![1, 3, 4]);
    }

    #[test]
    fn empty_schedule_yields_empty_selection() {
        assert!(select_completed(&[], SessionKind::Race, day(2024, 3, 1)).is_empty());
    }

    #[test]
    fn event_on_as_of_date_counts_as_completed() {
        let events = vec![event(1, EventFormat::Conventional, day(2024, 3, 2))];
        let races = select_completed(&events, SessionKind::Race, day(2024, 3, 2));
        assert_eq!(races.len(), 1);
    }
}
