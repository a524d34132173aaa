use chrono::{DateTime, Utc};

use crate::store::{BattleType, Outcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub tag: String,
    pub brawler: Option<String>,
}

/// One ranked team battle as seen by one of its players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBattle {
    pub match_id: String,
    pub player_tag: String,
    pub outcome: Outcome,
    pub trophy_change: i32,
    pub map: Option<String>,
    pub mode: Option<String>,
    pub battle_time: DateTime<Utc>,
    pub is_star_player: bool,
    pub star_player_tag: String, // without the marker
    pub brawler: String,
    pub battle_type: BattleType,
    pub played_with_clubmate: bool,
    pub participants: Vec<Participant>,
    pub winning_team: Option<Vec<String>>,
}
