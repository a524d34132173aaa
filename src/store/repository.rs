use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use super::models::{
    BrawlerModel, ClubModel, ClubStanding, MapModel, MatchIssueModel, MatchModel, Participation,
    PlayerHistoryModel, PlayerModel,
};
use crate::shared::AppError;

/// Trait for player repository operations
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    async fn get_player(&self, player_tag: &str) -> Result<Option<PlayerModel>, AppError>;
    async fn get_players(&self, player_tags: &[String]) -> Result<Vec<PlayerModel>, AppError>;
    async fn list_players(&self) -> Result<Vec<PlayerModel>, AppError>;
    async fn existing_player_tags(&self, player_tags: &[String])
        -> Result<HashSet<String>, AppError>;

    /// Inserts new players. A tag that already exists is an integrity error.
    async fn create_players(&self, players: &[PlayerModel]) -> Result<u64, AppError>;

    /// Writes every mutable column of the given players in one call.
    /// `tracking_start` is never overwritten.
    async fn bulk_update_players(&self, players: &[PlayerModel]) -> Result<u64, AppError>;

    async fn reset_all_tickets(&self) -> Result<u64, AppError>;

    /// Sets the ticket counter of players not updated since `updated_before`.
    async fn replenish_tickets(
        &self,
        updated_before: DateTime<Utc>,
        tickets: i32,
    ) -> Result<u64, AppError>;

    /// Players last updated at or before `updated_before` (or never), ordered
    /// by rating desc then last update asc, never-updated first.
    async fn stale_player_tags(
        &self,
        updated_before: DateTime<Utc>,
        require_tickets: bool,
    ) -> Result<Vec<String>, AppError>;

    async fn club_members(&self, club_tag: &str) -> Result<Vec<PlayerModel>, AppError>;

    /// Nulls the club of stored members of `club_tag` that are not in `roster`.
    async fn detach_former_members(
        &self,
        club_tag: &str,
        roster: &[String],
    ) -> Result<u64, AppError>;

    async fn top_players(&self, limit: usize, offset: usize) -> Result<Vec<PlayerModel>, AppError>;
    async fn mark_player_searched(&self, player_tag: &str) -> Result<(), AppError>;
}

/// Trait for club repository operations
#[async_trait]
pub trait ClubRepository: Send + Sync {
    async fn get_club(&self, club_tag: &str) -> Result<Option<ClubModel>, AppError>;
    async fn list_club_tags(&self) -> Result<Vec<String>, AppError>;
    async fn existing_club_tags(&self, club_tags: &[String]) -> Result<HashSet<String>, AppError>;
    async fn create_clubs(&self, clubs: &[ClubModel]) -> Result<u64, AppError>;

    /// Inserts or refreshes a club; returns true when it was created.
    async fn upsert_club(&self, club: &ClubModel) -> Result<bool, AppError>;

    /// Deletes a club; its members keep existing with no club.
    async fn delete_club(&self, club_tag: &str) -> Result<(), AppError>;

    async fn club_standings(&self) -> Result<Vec<ClubStanding>, AppError>;
    async fn mark_club_searched(&self, club_tag: &str) -> Result<(), AppError>;
}

/// Trait for brawler and map lookup tables
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn list_brawlers(&self) -> Result<Vec<BrawlerModel>, AppError>;
    async fn get_or_create_brawler(&self, name: &str) -> Result<BrawlerModel, AppError>;
    async fn list_maps(&self) -> Result<Vec<MapModel>, AppError>;
    async fn get_or_create_map(&self, name: &str) -> Result<MapModel, AppError>;
}

/// Trait for match and match issue operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn existing_match_ids(&self, match_ids: &[String]) -> Result<HashSet<String>, AppError>;

    /// Inserts new matches. An id that already exists is an integrity error.
    async fn create_matches(&self, matches: &[MatchModel]) -> Result<u64, AppError>;

    async fn existing_issue_keys(
        &self,
        keys: &[(String, String)],
    ) -> Result<HashSet<(String, String)>, AppError>;

    /// Inserts new issues. A (match, player) pair that already exists is an
    /// integrity error, as is a reference to a missing match.
    async fn create_match_issues(&self, issues: &[MatchIssueModel]) -> Result<u64, AppError>;

    /// Issues of each player in matches played at or after `since`.
    async fn participations_since(
        &self,
        player_tags: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Participation>>, AppError>;
}

/// Trait for player history snapshots
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn create_history(&self, snapshots: &[PlayerHistoryModel]) -> Result<u64, AppError>;

    /// Last `limit` snapshots of a player, oldest first.
    async fn recent_history(
        &self,
        player_tag: &str,
        limit: usize,
    ) -> Result<Vec<PlayerHistoryModel>, AppError>;
}

/// Everything the core needs from persistence.
pub trait Store:
    PlayerRepository + ClubRepository + ReferenceRepository + MatchRepository + HistoryRepository
{
}

impl<T> Store for T where
    T: PlayerRepository + ClubRepository + ReferenceRepository + MatchRepository + HistoryRepository
{
}
