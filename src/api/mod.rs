//! Access to the game's public API.

mod client;
mod errors;
pub mod fanout;
pub mod memory;
pub mod models;

use async_trait::async_trait;
use tracing::{debug, instrument};

pub use client::{BrawlStarsClient, CredentialPool};
pub use errors::ApiError;
pub use fanout::PlayerSnapshot;
pub use memory::InMemoryGameApi;
pub use models::{BattleEntry, BattleLog, ClubInfo, ClubMembers, PlayerProfile};

/// Read operations the pipeline needs from the game API.
///
/// Every method resolves to `Ok(None)` when the entity does not exist.
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn player_profile(&self, player_tag: &str) -> Result<Option<PlayerProfile>, ApiError>;
    async fn battle_log(&self, player_tag: &str) -> Result<Option<BattleLog>, ApiError>;
    async fn club_info(&self, club_tag: &str) -> Result<Option<ClubInfo>, ApiError>;
    async fn club_members(&self, club_tag: &str) -> Result<Option<ClubMembers>, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Player,
    Club,
    Unknown,
}

/// Works out what a tag refers to.
///
/// Players and clubs share one tag namespace, so a tag may resolve as both;
/// the player wins. A player is detected through the battle log endpoint.
#[instrument(skip(api))]
pub async fn classify_tag(api: &dyn GameApi, tag: &str) -> Result<TagKind, ApiError> {
    if api.battle_log(tag).await?.is_some() {
        debug!(tag = %tag, "Tag resolved as a player");
        return Ok(TagKind::Player);
    }
    if api.club_info(tag).await?.is_some() {
        debug!(tag = %tag, "Tag resolved as a club");
        return Ok(TagKind::Club);
    }
    Ok(TagKind::Unknown)
}
