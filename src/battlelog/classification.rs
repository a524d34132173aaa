//! Match tier and clubmate inference.
//!
//! The API flags neither power matches nor whether a clubmate was on the
//! team, but both change the trophy reward, so they are read back from the
//! (outcome, trophy change) pair.

use crate::store::{BattleType, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchClass {
    pub battle_type: BattleType,
    pub played_with_clubmate: bool,
}

impl MatchClass {
    const fn new(power: bool, played_with_clubmate: bool) -> Self {
        Self {
            battle_type: if power {
                BattleType::PowerMatch
            } else {
                BattleType::NormalMatch
            },
            played_with_clubmate,
        }
    }

    pub fn is_power_match(&self) -> bool {
        self.battle_type == BattleType::PowerMatch
    }
}

pub fn classify(outcome: Outcome, trophy_change: i32) -> MatchClass {
    match (outcome, trophy_change) {
        (Outcome::Win, 9) => MatchClass::new(true, true),
        (Outcome::Win, 7) => MatchClass::new(true, false),
        (Outcome::Win, 4) => MatchClass::new(false, true),
        (Outcome::Win, 3) => MatchClass::new(false, false),
        (Outcome::Loss, 5) => MatchClass::new(true, true),
        (Outcome::Loss, 3) => MatchClass::new(true, false),
        (Outcome::Loss, 2) => MatchClass::new(false, true),
        (Outcome::Loss, 1) => MatchClass::new(false, false),
        // There are no draws in power matches
        (Outcome::Draw, 3) => MatchClass::new(false, true),
        (Outcome::Draw, 2) => MatchClass::new(false, false),
        _ => MatchClass::new(false, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Outcome::Win, 9, true, true)]
    #[case(Outcome::Win, 7, true, false)]
    #[case(Outcome::Win, 4, false, true)]
    #[case(Outcome::Win, 3, false, false)]
    #[case(Outcome::Loss, 5, true, true)]
    #[case(Outcome::Loss, 3, true, false)]
    #[case(Outcome::Loss, 2, false, true)]
    #[case(Outcome::Loss, 1, false, false)]
    #[case(Outcome::Draw, 3, false, true)]
    #[case(Outcome::Draw, 2, false, false)]
    #[case(Outcome::Win, 100, false, false)]
    #[case(Outcome::Draw, 9, false, false)]
    #[case(Outcome::Unknown, 9, false, false)]
    #[case(Outcome::Loss, -5, false, false)]
    fn trophy_change_table(
        #[case] outcome: Outcome,
        #[case] trophy_change: i32,
        #[case] power: bool,
        #[case] clubmate: bool,
    ) {
        let class = classify(outcome, trophy_change);
        assert_eq!(class.is_power_match(), power);
        assert_eq!(class.played_with_clubmate, clubmate);
    }
}
