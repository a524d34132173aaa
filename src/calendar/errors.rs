use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Origin {origin} is later than the reference time {now}")]
    OriginInFuture {
        origin: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}
