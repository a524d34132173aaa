use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{
    models::{BattleLog, ClubInfo, ClubMember, ClubMembers, PlayerProfile},
    ApiError, GameApi,
};

/// Scripted implementation of [`GameApi`] for development and testing
///
/// Responses are served from in-memory maps. Tags registered with
/// [`InMemoryGameApi::fail_tag`] answer every request with a transport error.
#[derive(Default)]
pub struct InMemoryGameApi {
    profiles: Mutex<HashMap<String, PlayerProfile>>,
    battle_logs: Mutex<HashMap<String, BattleLog>>,
    clubs: Mutex<HashMap<String, ClubInfo>>,
    members: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl InMemoryGameApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: PlayerProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.tag.clone(), profile);
    }

    pub fn insert_battle_log(&self, player_tag: &str, log: BattleLog) {
        self.battle_logs
            .lock()
            .unwrap()
            .insert(player_tag.to_string(), log);
    }

    pub fn insert_club(&self, club: ClubInfo) {
        self.clubs.lock().unwrap().insert(club.tag.clone(), club);
    }

    pub fn insert_members(&self, club_tag: &str, member_tags: Vec<String>) {
        self.members
            .lock()
            .unwrap()
            .insert(club_tag.to_string(), member_tags);
    }

    pub fn fail_tag(&self, tag: &str) {
        self.failing.lock().unwrap().insert(tag.to_string());
    }

    /// Number of requests made for an endpoint, e.g. `"club_info"`.
    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, endpoint: &str, tag: &str) -> Result<(), ApiError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default() += 1;

        if self.failing.lock().unwrap().contains(tag) {
            return Err(ApiError::Transport {
                url: format!("memory://{endpoint}/{tag}"),
                message: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GameApi for InMemoryGameApi {
    async fn player_profile(&self, player_tag: &str) -> Result<Option<PlayerProfile>, ApiError> {
        self.record("player_profile", player_tag)?;
        Ok(self.profiles.lock().unwrap().get(player_tag).cloned())
    }

    async fn battle_log(&self, player_tag: &str) -> Result<Option<BattleLog>, ApiError> {
        self.record("battle_log", player_tag)?;
        Ok(self.battle_logs.lock().unwrap().get(player_tag).cloned())
    }

    async fn club_info(&self, club_tag: &str) -> Result<Option<ClubInfo>, ApiError> {
        self.record("club_info", club_tag)?;
        Ok(self.clubs.lock().unwrap().get(club_tag).cloned())
    }

    async fn club_members(&self, club_tag: &str) -> Result<Option<ClubMembers>, ApiError> {
        self.record("club_members", club_tag)?;
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(club_tag)
            .map(|tags| ClubMembers {
                items: tags
                    .iter()
                    .map(|tag| ClubMember {
                        tag: tag.clone(),
                        name: String::new(),
                    })
                    .collect(),
            }))
    }
}
