use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::api::ClubInfo;

/// Players below this many trophies cannot join a club.
pub const CLUB_ELIGIBILITY_TROPHIES: i32 = 900;

/// Name given to players discovered through a roster but not fetched yet.
pub const PLACEHOLDER_PLAYER_NAME: &str = "Not Fetched Yet";

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ClubType {
    #[default]
    Open,
    InviteOnly,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum BattleType {
    #[strum(serialize = "Power Match")]
    #[serde(rename = "Power Match")]
    PowerMatch,
    #[strum(serialize = "Normal Match")]
    #[serde(rename = "Normal Match")]
    NormalMatch,
}

impl BattleType {
    /// Tickets consumed by one match of this type.
    pub fn ticket_cost(self) -> i32 {
        match self {
            BattleType::PowerMatch => 2,
            BattleType::NormalMatch => 1,
        }
    }
}

/// Database model for clubs table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubModel {
    pub club_tag: String,
    pub club_name: String,
    pub club_description: String,
    pub club_type: ClubType,
    pub trophies: i32,
    pub required_trophies: i32,
    pub has_been_searched: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ClubModel {
    pub fn from_info(info: &ClubInfo, now: DateTime<Utc>) -> Self {
        Self {
            club_tag: info.tag.clone(),
            club_name: info.name.clone(),
            club_description: info.description.clone(),
            club_type: info.club_type,
            trophies: info.trophies,
            required_trophies: info.required_trophies,
            has_been_searched: false,
            last_updated: Some(now),
        }
    }
}

/// Database model for players table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlayerModel {
    pub player_tag: String,
    pub player_name: String,
    pub trophy_count: i32,
    pub club_tag: Option<String>,
    pub level: i32,
    pub total_3v3_wins: i32,
    pub solo_wins: i32,
    pub duo_wins: i32,
    pub total_club_war_trophy_count: i32,
    pub brawlclub_rating: f64,
    pub club_league_winrate: f64,
    pub club_league_playrate: f64,
    pub club_league_teamplay_rate: f64,
    pub tracking_start: DateTime<Utc>, // Origin of the rating window, never moved
    pub last_updated: Option<DateTime<Utc>>,
    pub has_been_searched: bool,
    pub number_of_available_tickets: i32,
}

impl PlayerModel {
    /// Blank player whose rating window starts at `now`.
    pub fn new(player_tag: String, now: DateTime<Utc>) -> Self {
        Self {
            player_tag,
            player_name: PLACEHOLDER_PLAYER_NAME.to_string(),
            trophy_count: 0,
            club_tag: None,
            level: 0,
            total_3v3_wins: 0,
            solo_wins: 0,
            duo_wins: 0,
            total_club_war_trophy_count: 0,
            brawlclub_rating: 0.0,
            club_league_winrate: 0.0,
            club_league_playrate: 0.0,
            club_league_teamplay_rate: 0.0,
            tracking_start: now,
            last_updated: None,
            has_been_searched: false,
            number_of_available_tickets: 0,
        }
    }

    /// Only club members above the trophy floor get a club league rating.
    pub fn is_rating_eligible(&self) -> bool {
        self.club_tag.is_some() && self.trophy_count >= CLUB_ELIGIBILITY_TROPHIES
    }

    pub fn history_snapshot(&self, now: DateTime<Utc>) -> PlayerHistoryModel {
        PlayerHistoryModel {
            player_tag: self.player_tag.clone(),
            trophy_count: self.trophy_count,
            total_club_war_trophy_count: self.total_club_war_trophy_count,
            brawlclub_rating: self.brawlclub_rating,
            club_league_winrate: self.club_league_winrate,
            club_league_playrate: self.club_league_playrate,
            club_league_teamplay_rate: self.club_league_teamplay_rate,
            snapshot_date: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BrawlerModel {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MapModel {
    pub id: i64,
    pub name: String,
}

/// A ranked match, shared by every participant. Never updated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchModel {
    pub match_id: String, // <star player tag without #><epoch seconds>
    pub mode: String,
    pub map_id: Option<i64>,
    pub battle_type: BattleType,
    pub date: DateTime<Utc>,
}

/// One player's part in a match, unique per (match, player).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchIssueModel {
    pub match_id: String,
    pub player_tag: String,
    pub brawler_id: i64,
    pub outcome: Outcome,
    pub trophies_won: i32,
    pub is_star_player: bool,
    pub played_with_clubmate: bool,
}

impl MatchIssueModel {
    pub fn key(&self) -> (String, String) {
        (self.match_id.clone(), self.player_tag.clone())
    }
}

/// A match issue joined with the match fields the rating and ticket
/// computations read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participation {
    pub outcome: Outcome,
    pub played_with_clubmate: bool,
    pub battle_type: BattleType,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlayerHistoryModel {
    pub player_tag: String,
    pub trophy_count: i32,
    pub total_club_war_trophy_count: i32,
    pub brawlclub_rating: f64,
    pub club_league_winrate: f64,
    pub club_league_playrate: f64,
    pub club_league_teamplay_rate: f64,
    pub snapshot_date: DateTime<Utc>,
}

/// A club with aggregates over the players referencing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClubStanding {
    pub club: ClubModel,
    pub member_count: usize,
    pub average_rating: f64,
    pub total_member_trophies: i64,
}
