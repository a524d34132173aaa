use chrono::{DateTime, Utc};

use crate::api::PlayerProfile;
use crate::store::PlayerModel;

/// Assembles the new state of one stored player before the batch writes it.
#[derive(Debug, Clone)]
pub struct PlayerUpdateBuilder {
    player: PlayerModel,
}

impl PlayerUpdateBuilder {
    pub fn from_stored(player: PlayerModel) -> Self {
        Self { player }
    }

    /// Copies the profile fields. `club_tag` is the club as it is known to
    /// the store, which may differ from the profile's when the club could not
    /// be resolved.
    pub fn profile(mut self, profile: &PlayerProfile, club_tag: Option<String>) -> Self {
        self.player.player_name = profile.name.clone();
        self.player.trophy_count = profile.trophies;
        self.player.level = profile.exp_level;
        self.player.total_3v3_wins = profile.three_vs_three_victories;
        self.player.solo_wins = profile.solo_victories;
        self.player.duo_wins = profile.duo_victories;
        self.player.club_tag = club_tag;
        self
    }

    pub fn tickets(mut self, remaining: i32) -> Self {
        self.player.number_of_available_tickets = remaining;
        self
    }

    pub fn build(mut self, now: DateTime<Utc>) -> PlayerModel {
        self.player.last_updated = Some(now);
        self.player
    }
}
