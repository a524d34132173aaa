pub mod calculators;
mod errors;
pub mod models;
pub mod service;

pub use errors::RatingError;
pub use models::{RateComponent, RatingBreakdown, SaveMode};
pub use service::{RatingService, RatingServiceBuilder};

use chrono::{DateTime, Utc};

use crate::store::Participation;

/// Weight of each component in the composite rating, out of 100.
pub mod component_weight {
    pub const PLAY_RATE: f64 = 50.0;
    pub const TEAMPLAY_RATE: f64 = 30.0;
    pub const WIN_RATE: f64 = 20.0;
}

/// Computes one rate in [0, 1] from a player's ranked matches in the window.
pub trait RateCalculator: Send + Sync {
    fn component(&self) -> RateComponent;

    fn weight(&self) -> f64;

    fn calculate(&self, participations: &[Participation], context: &RatingContext) -> f64;
}

/// Rating window of one player.
pub struct RatingContext {
    pub tracking_start: DateTime<Utc>,
    pub now: DateTime<Utc>,
    /// Tickets the player could have spent since `tracking_start`.
    pub tickets_available: u32,
}

/// `numerator / denominator`, or 0 when nothing was counted.
pub(crate) fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
