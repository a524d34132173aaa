use thiserror::Error;

use crate::calendar::CalendarError;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Calculator weights sum to {0}, expected 100")]
    InvalidWeights(f64),
}
