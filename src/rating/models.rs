use serde::{Deserialize, Serialize};

use crate::store::PlayerModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateComponent {
    WinRate,
    TeamplayRate,
    PlayRate,
}

/// The three rates of a player and their weighted sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingBreakdown {
    pub win_rate: f64,
    pub teamplay_rate: f64,
    pub play_rate: f64,
    pub rating: f64,
}

impl RatingBreakdown {
    pub fn set(&mut self, component: RateComponent, value: f64) {
        match component {
            RateComponent::WinRate => self.win_rate = value,
            RateComponent::TeamplayRate => self.teamplay_rate = value,
            RateComponent::PlayRate => self.play_rate = value,
        }
    }

    pub fn apply_to(&self, player: &mut PlayerModel) {
        player.club_league_winrate = self.win_rate;
        player.club_league_teamplay_rate = self.teamplay_rate;
        player.club_league_playrate = self.play_rate;
        player.brawlclub_rating = self.rating;
    }
}

/// Whether a computed rating is written straight away or left to the caller's
/// bulk update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Immediate,
    Deferred,
}
