use thiserror::Error;

use crate::models::{SessionKind, TableKind};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("schedule unavailable for season {season}")]
    ScheduleUnavailable {
        season: i32,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("no {kind} results available for {season} {event}")]
    EventResultUnavailable {
        season: i32,
        event: String,
        kind: SessionKind,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("malformed result row: {detail}")]
    MalformedResult { detail: String },

    #[error("malformed schedule entry: {detail}")]
    MalformedSchedule { detail: String },

    #[error("invalid fantasy roster: {detail}")]
    InvalidRoster { detail: String },

    #[error("no stored {kind} table for season {season}; run `sync` first")]
    SnapshotMissing { season: i32, kind: TableKind },

    #[error("storage failure")]
    Storage(#[from] sqlx::Error),
}
