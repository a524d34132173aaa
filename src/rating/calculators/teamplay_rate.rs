use super::super::{component_weight, ratio, RateCalculator, RateComponent, RatingContext};
use crate::store::Participation;

/// Share of matches played alongside a clubmate.
pub struct TeamplayRateCalculator;

impl Default for TeamplayRateCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamplayRateCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl RateCalculator for TeamplayRateCalculator {
    fn component(&self) -> RateComponent {
        RateComponent::TeamplayRate
    }

    fn weight(&self) -> f64 {
        component_weight::TEAMPLAY_RATE
    }

    fn calculate(&self, participations: &[Participation], _context: &RatingContext) -> f64 {
        let with_clubmate = participations
            .iter()
            .filter(|p| p.played_with_clubmate)
            .count();
        ratio(with_clubmate, participations.len())
    }
}
