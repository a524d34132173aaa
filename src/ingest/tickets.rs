use chrono::{DateTime, Utc};

use crate::calendar::LeagueState;
use crate::store::Participation;

/// Tickets used by matches played at or after `window_start`.
pub fn tickets_spent(participations: &[Participation], window_start: DateTime<Utc>) -> i32 {
    participations
        .iter()
        .filter(|p| p.date >= window_start)
        .map(|p| p.battle_type.ticket_cost())
        .sum()
}

/// Tickets left in the current grant window; 0 whenever no league is running.
pub fn remaining_tickets(league: &LeagueState, participations: &[Participation]) -> i32 {
    match league.window_start {
        Some(window_start) if league.active => {
            let granted = league.tickets_granted_today as i32;
            (granted - tickets_spent(participations, window_start)).max(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BattleType, Outcome};
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 10, d, h, 0, 0).unwrap()
    }

    fn played(battle_type: BattleType, date: DateTime<Utc>) -> Participation {
        Participation {
            outcome: Outcome::Win,
            played_with_clubmate: false,
            battle_type,
            date,
        }
    }

    #[test]
    fn spent_counts_only_current_window() {
        // Sunday grant of 6, window opened at Sunday midnight
        let league = LeagueState::at(at(30, 18));
        let matches = vec![
            played(BattleType::PowerMatch, at(30, 10)),
            played(BattleType::NormalMatch, at(30, 11)),
            played(BattleType::PowerMatch, at(29, 22)),
        ];
        assert_eq!(remaining_tickets(&league, &matches), 3);
    }

    #[test]
    fn overspending_clamps_to_zero() {
        let league = LeagueState::at(at(26, 18));
        let matches = vec![played(BattleType::PowerMatch, at(26, 10)); 3];
        assert_eq!(remaining_tickets(&league, &matches), 0);
    }

    #[test]
    fn inactive_league_has_no_tickets() {
        let league = LeagueState::at(Utc.with_ymd_and_hms(2022, 11, 1, 12, 0, 0).unwrap());
        assert_eq!(remaining_tickets(&league, &[]), 0);
    }
}
