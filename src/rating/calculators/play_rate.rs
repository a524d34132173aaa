use super::super::{component_weight, RateCalculator, RateComponent, RatingContext};
use crate::store::Participation;

/// Tickets spent over tickets the player could have spent, capped at 1.
pub struct PlayRateCalculator;

impl Default for PlayRateCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayRateCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl RateCalculator for PlayRateCalculator {
    fn component(&self) -> RateComponent {
        RateComponent::PlayRate
    }

    fn weight(&self) -> f64 {
        component_weight::PLAY_RATE
    }

    fn calculate(&self, participations: &[Participation], context: &RatingContext) -> f64 {
        if context.tickets_available == 0 {
            return 0.0;
        }
        let spent: i32 = participations
            .iter()
            .map(|p| p.battle_type.ticket_cost())
            .sum();
        (f64::from(spent) / f64::from(context.tickets_available)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BattleType, Outcome};
    use chrono::Utc;

    fn played(battle_type: BattleType) -> Participation {
        Participation {
            outcome: Outcome::Win,
            played_with_clubmate: false,
            battle_type,
            date: Utc::now(),
        }
    }

    fn context(tickets_available: u32) -> RatingContext {
        RatingContext {
            tracking_start: Utc::now(),
            now: Utc::now(),
            tickets_available,
        }
    }

    #[test]
    fn power_matches_cost_two_tickets() {
        let matches = vec![
            played(BattleType::PowerMatch),
            played(BattleType::NormalMatch),
            played(BattleType::NormalMatch),
        ];
        assert_eq!(PlayRateCalculator::new().calculate(&matches, &context(8)), 0.5);
    }

    #[test]
    fn zero_available_is_zero() {
        let matches = vec![played(BattleType::PowerMatch)];
        assert_eq!(PlayRateCalculator::new().calculate(&matches, &context(0)), 0.0);
    }

    #[test]
    fn overspending_is_capped() {
        let matches = vec![played(BattleType::PowerMatch); 5];
        assert_eq!(PlayRateCalculator::new().calculate(&matches, &context(4)), 1.0);
    }
}
