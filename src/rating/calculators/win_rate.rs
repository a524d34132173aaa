use super::super::{component_weight, ratio, RateCalculator, RateComponent, RatingContext};
use crate::store::{Outcome, Participation};

/// Wins over decided matches. Draws and unknown results are left out.
pub struct WinRateCalculator;

impl Default for WinRateCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl WinRateCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl RateCalculator for WinRateCalculator {
    fn component(&self) -> RateComponent {
        RateComponent::WinRate
    }

    fn weight(&self) -> f64 {
        component_weight::WIN_RATE
    }

    fn calculate(&self, participations: &[Participation], _context: &RatingContext) -> f64 {
        let wins = participations
            .iter()
            .filter(|p| p.outcome == Outcome::Win)
            .count();
        let losses = participations
            .iter()
            .filter(|p| p.outcome == Outcome::Loss)
            .count();
        ratio(wins, wins + losses)
    }
}
