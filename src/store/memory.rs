use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, error, instrument};

use super::models::{
    BrawlerModel, ClubModel, ClubStanding, MapModel, MatchIssueModel, MatchModel, Participation,
    PlayerHistoryModel, PlayerModel,
};
use super::repository::{
    ClubRepository, HistoryRepository, MatchRepository, PlayerRepository, ReferenceRepository,
};
use crate::shared::AppError;

#[derive(Default)]
struct State {
    players: BTreeMap<String, PlayerModel>,
    clubs: BTreeMap<String, ClubModel>,
    brawlers: Vec<BrawlerModel>,
    maps: Vec<MapModel>,
    matches: HashMap<String, MatchModel>,
    issues: Vec<MatchIssueModel>,
    issue_keys: HashSet<(String, String)>,
    history: Vec<PlayerHistoryModel>,
}

fn conflict(message: String) -> AppError {
    error!(%message, "Integrity conflict reached the store");
    AppError::DatabaseError(message)
}

/// In-memory implementation of every repository trait for development and testing
///
/// Enforces the same natural-key constraints as the Postgres schema, so a
/// duplicate insert fails here exactly as it would in production. Data is lost
/// when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_count(&self) -> usize {
        self.state.lock().unwrap().matches.len()
    }

    pub fn match_issue_count(&self) -> usize {
        self.state.lock().unwrap().issues.len()
    }

    pub fn club_count(&self) -> usize {
        self.state.lock().unwrap().clubs.len()
    }

    pub fn player_count(&self) -> usize {
        self.state.lock().unwrap().players.len()
    }

    pub fn brawler_count(&self) -> usize {
        self.state.lock().unwrap().brawlers.len()
    }

    pub fn map_count(&self) -> usize {
        self.state.lock().unwrap().maps.len()
    }

    pub fn history_count(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    pub fn get_match(&self, match_id: &str) -> Option<MatchModel> {
        self.state.lock().unwrap().matches.get(match_id).cloned()
    }

    pub fn issues_for(&self, player_tag: &str) -> Vec<MatchIssueModel> {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .filter(|issue| issue.player_tag == player_tag)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PlayerRepository for InMemoryStore {
    async fn get_player(&self, player_tag: &str) -> Result<Option<PlayerModel>, AppError> {
        Ok(self.state.lock().unwrap().players.get(player_tag).cloned())
    }

    async fn get_players(&self, player_tags: &[String]) -> Result<Vec<PlayerModel>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(player_tags
            .iter()
            .filter_map(|tag| state.players.get(tag).cloned())
            .collect())
    }

    async fn list_players(&self) -> Result<Vec<PlayerModel>, AppError> {
        Ok(self.state.lock().unwrap().players.values().cloned().collect())
    }

    async fn existing_player_tags(
        &self,
        player_tags: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(player_tags
            .iter()
            .filter(|tag| state.players.contains_key(*tag))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, players), fields(count = players.len()))]
    async fn create_players(&self, players: &[PlayerModel]) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(dup) = players
            .iter()
            .find(|player| state.players.contains_key(&player.player_tag))
        {
            return Err(conflict(format!("Player {} already exists", dup.player_tag)));
        }
        for player in players {
            state
                .players
                .insert(player.player_tag.clone(), player.clone());
        }
        debug!("Players created in memory");
        Ok(players.len() as u64)
    }

    #[instrument(skip(self, players), fields(count = players.len()))]
    async fn bulk_update_players(&self, players: &[PlayerModel]) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for player in players {
            if let Some(stored) = state.players.get_mut(&player.player_tag) {
                let tracking_start = stored.tracking_start;
                *stored = player.clone();
                stored.tracking_start = tracking_start;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn reset_all_tickets(&self) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        for player in state.players.values_mut() {
            player.number_of_available_tickets = 0;
        }
        Ok(state.players.len() as u64)
    }

    async fn replenish_tickets(
        &self,
        updated_before: DateTime<Utc>,
        tickets: i32,
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for player in state.players.values_mut() {
            if player.last_updated.map_or(true, |at| at < updated_before) {
                player.number_of_available_tickets = tickets;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn stale_player_tags(
        &self,
        updated_before: DateTime<Utc>,
        require_tickets: bool,
    ) -> Result<Vec<String>, AppError> {
        let state = self.state.lock().unwrap();
        let mut stale: Vec<&PlayerModel> = state
            .players
            .values()
            .filter(|player| player.last_updated.map_or(true, |at| at <= updated_before))
            .filter(|player| !require_tickets || player.number_of_available_tickets > 0)
            .collect();

        stale.sort_by(|a, b| {
            b.brawlclub_rating
                .total_cmp(&a.brawlclub_rating)
                .then(a.last_updated.cmp(&b.last_updated))
        });

        Ok(stale.into_iter().map(|p| p.player_tag.clone()).collect())
    }

    async fn club_members(&self, club_tag: &str) -> Result<Vec<PlayerModel>, AppError> {
        let state = self.state.lock().unwrap();
        let mut members: Vec<PlayerModel> = state
            .players
            .values()
            .filter(|player| player.club_tag.as_deref() == Some(club_tag))
            .cloned()
            .collect();
        members.sort_by(|a, b| b.brawlclub_rating.total_cmp(&a.brawlclub_rating));
        Ok(members)
    }

    async fn detach_former_members(
        &self,
        club_tag: &str,
        roster: &[String],
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        let mut detached = 0;
        for player in state.players.values_mut() {
            if player.club_tag.as_deref() == Some(club_tag) && !roster.contains(&player.player_tag)
            {
                player.club_tag = None;
                detached += 1;
            }
        }
        Ok(detached)
    }

    async fn top_players(&self, limit: usize, offset: usize) -> Result<Vec<PlayerModel>, AppError> {
        let state = self.state.lock().unwrap();
        let mut players: Vec<&PlayerModel> = state.players.values().collect();
        players.sort_by(|a, b| {
            b.brawlclub_rating
                .total_cmp(&a.brawlclub_rating)
                .then(b.trophy_count.cmp(&a.trophy_count))
        });
        Ok(players
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_player_searched(&self, player_tag: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        match state.players.get_mut(player_tag) {
            Some(player) => {
                player.has_been_searched = true;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Player {player_tag}"))),
        }
    }
}

#[async_trait]
impl ClubRepository for InMemoryStore {
    async fn get_club(&self, club_tag: &str) -> Result<Option<ClubModel>, AppError> {
        Ok(self.state.lock().unwrap().clubs.get(club_tag).cloned())
    }

    async fn list_club_tags(&self) -> Result<Vec<String>, AppError> {
        Ok(self.state.lock().unwrap().clubs.keys().cloned().collect())
    }

    async fn existing_club_tags(&self, club_tags: &[String]) -> Result<HashSet<String>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(club_tags
            .iter()
            .filter(|tag| state.clubs.contains_key(*tag))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, clubs), fields(count = clubs.len()))]
    async fn create_clubs(&self, clubs: &[ClubModel]) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        let mut seen = HashSet::new();
        for club in clubs {
            if state.clubs.contains_key(&club.club_tag) || !seen.insert(&club.club_tag) {
                return Err(conflict(format!("Club {} already exists", club.club_tag)));
            }
        }
        for club in clubs {
            state.clubs.insert(club.club_tag.clone(), club.clone());
        }
        Ok(clubs.len() as u64)
    }

    async fn upsert_club(&self, club: &ClubModel) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let created = match state.clubs.get_mut(&club.club_tag) {
            Some(stored) => {
                let has_been_searched = stored.has_been_searched;
                *stored = club.clone();
                stored.has_been_searched |= has_been_searched;
                false
            }
            None => {
                state.clubs.insert(club.club_tag.clone(), club.clone());
                true
            }
        };
        Ok(created)
    }

    async fn delete_club(&self, club_tag: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state.clubs.remove(club_tag).is_none() {
            return Err(AppError::NotFound(format!("Club {club_tag}")));
        }
        for player in state.players.values_mut() {
            if player.club_tag.as_deref() == Some(club_tag) {
                player.club_tag = None;
            }
        }
        Ok(())
    }

    async fn club_standings(&self) -> Result<Vec<ClubStanding>, AppError> {
        let state = self.state.lock().unwrap();
        let mut members: HashMap<&str, Vec<&PlayerModel>> = HashMap::new();
        for player in state.players.values() {
            if let Some(club_tag) = player.club_tag.as_deref() {
                members.entry(club_tag).or_default().push(player);
            }
        }

        Ok(state
            .clubs
            .values()
            .map(|club| {
                let roster = members
                    .get(club.club_tag.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let rating_sum: f64 = roster.iter().map(|p| p.brawlclub_rating).sum();
                ClubStanding {
                    club: club.clone(),
                    member_count: roster.len(),
                    average_rating: if roster.is_empty() {
                        0.0
                    } else {
                        rating_sum / roster.len() as f64
                    },
                    total_member_trophies: roster.iter().map(|p| i64::from(p.trophy_count)).sum(),
                }
            })
            .collect())
    }

    async fn mark_club_searched(&self, club_tag: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        match state.clubs.get_mut(club_tag) {
            Some(club) => {
                club.has_been_searched = true;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Club {club_tag}"))),
        }
    }
}

#[async_trait]
impl ReferenceRepository for InMemoryStore {
    async fn list_brawlers(&self) -> Result<Vec<BrawlerModel>, AppError> {
        Ok(self.state.lock().unwrap().brawlers.clone())
    }

    async fn get_or_create_brawler(&self, name: &str) -> Result<BrawlerModel, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(brawler) = state.brawlers.iter().find(|b| b.name == name) {
            return Ok(brawler.clone());
        }
        let brawler = BrawlerModel {
            id: state.brawlers.len() as i64 + 1,
            name: name.to_string(),
        };
        state.brawlers.push(brawler.clone());
        Ok(brawler)
    }

    async fn list_maps(&self) -> Result<Vec<MapModel>, AppError> {
        Ok(self.state.lock().unwrap().maps.clone())
    }

    async fn get_or_create_map(&self, name: &str) -> Result<MapModel, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(map) = state.maps.iter().find(|m| m.name == name) {
            return Ok(map.clone());
        }
        let map = MapModel {
            id: state.maps.len() as i64 + 1,
            name: name.to_string(),
        };
        state.maps.push(map.clone());
        Ok(map)
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn existing_match_ids(&self, match_ids: &[String]) -> Result<HashSet<String>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(match_ids
            .iter()
            .filter(|id| state.matches.contains_key(*id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, matches), fields(count = matches.len()))]
    async fn create_matches(&self, matches: &[MatchModel]) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        let mut seen = HashSet::new();
        for new_match in matches {
            if state.matches.contains_key(&new_match.match_id) || !seen.insert(&new_match.match_id)
            {
                return Err(conflict(format!(
                    "Match {} already exists",
                    new_match.match_id
                )));
            }
        }
        for new_match in matches {
            state
                .matches
                .insert(new_match.match_id.clone(), new_match.clone());
        }
        Ok(matches.len() as u64)
    }

    async fn existing_issue_keys(
        &self,
        keys: &[(String, String)],
    ) -> Result<HashSet<(String, String)>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(keys
            .iter()
            .filter(|key| state.issue_keys.contains(*key))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, issues), fields(count = issues.len()))]
    async fn create_match_issues(&self, issues: &[MatchIssueModel]) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        let mut seen = HashSet::new();
        for issue in issues {
            let key = issue.key();
            if state.issue_keys.contains(&key) || !seen.insert(key) {
                return Err(conflict(format!(
                    "Issue of {} in match {} already exists",
                    issue.player_tag, issue.match_id
                )));
            }
            if !state.matches.contains_key(&issue.match_id) {
                return Err(conflict(format!("Match {} does not exist", issue.match_id)));
            }
            if !state.players.contains_key(&issue.player_tag) {
                return Err(conflict(format!(
                    "Player {} does not exist",
                    issue.player_tag
                )));
            }
        }
        for issue in issues {
            state.issue_keys.insert(issue.key());
            state.issues.push(issue.clone());
        }
        Ok(issues.len() as u64)
    }

    async fn participations_since(
        &self,
        player_tags: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Participation>>, AppError> {
        let state = self.state.lock().unwrap();
        let wanted: HashSet<&String> = player_tags.iter().collect();
        let mut by_player: HashMap<String, Vec<Participation>> = HashMap::new();

        for issue in state.issues.iter().filter(|i| wanted.contains(&i.player_tag)) {
            let Some(played) = state.matches.get(&issue.match_id) else {
                continue;
            };
            if played.date < since {
                continue;
            }
            by_player
                .entry(issue.player_tag.clone())
                .or_default()
                .push(Participation {
                    outcome: issue.outcome,
                    played_with_clubmate: issue.played_with_clubmate,
                    battle_type: played.battle_type,
                    date: played.date,
                });
        }

        Ok(by_player)
    }
}

#[async_trait]
impl HistoryRepository for InMemoryStore {
    async fn create_history(&self, snapshots: &[PlayerHistoryModel]) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        state.history.extend_from_slice(snapshots);
        Ok(snapshots.len() as u64)
    }

    async fn recent_history(
        &self,
        player_tag: &str,
        limit: usize,
    ) -> Result<Vec<PlayerHistoryModel>, AppError> {
        let state = self.state.lock().unwrap();
        let mut snapshots: Vec<PlayerHistoryModel> = state
            .history
            .iter()
            .filter(|snapshot| snapshot.player_tag == player_tag)
            .cloned()
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.snapshot_date);
        let skip = snapshots.len().saturating_sub(limit);
        Ok(snapshots.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BattleType, Outcome};
    use chrono::Duration;

    fn player(tag: &str) -> PlayerModel {
        PlayerModel::new(tag.to_string(), Utc::now() - Duration::days(30))
    }

    fn a_match(id: &str, date: DateTime<Utc>) -> MatchModel {
        MatchModel {
            match_id: id.to_string(),
            mode: "gemGrab".to_string(),
            map_id: None,
            battle_type: BattleType::NormalMatch,
            date,
        }
    }

    fn issue(match_id: &str, player_tag: &str) -> MatchIssueModel {
        MatchIssueModel {
            match_id: match_id.to_string(),
            player_tag: player_tag.to_string(),
            brawler_id: 1,
            outcome: Outcome::Win,
            trophies_won: 3,
            is_star_player: false,
            played_with_clubmate: false,
        }
    }

    #[tokio::test]
    async fn duplicate_player_is_rejected() {
        let store = InMemoryStore::new();
        store.create_players(&[player("#A")]).await.unwrap();

        let result = store.create_players(&[player("#A")]).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(store.player_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_issue_pair_is_rejected() {
        let store = InMemoryStore::new();
        store.create_players(&[player("#A")]).await.unwrap();
        store
            .create_matches(&[a_match("A1", Utc::now())])
            .await
            .unwrap();
        store.create_match_issues(&[issue("A1", "#A")]).await.unwrap();

        let result = store.create_match_issues(&[issue("A1", "#A")]).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(store.match_issue_count(), 1);
    }

    #[tokio::test]
    async fn bulk_update_keeps_tracking_start() {
        let store = InMemoryStore::new();
        let original = player("#A");
        store.create_players(&[original.clone()]).await.unwrap();

        let mut changed = original.clone();
        changed.tracking_start = Utc::now();
        changed.trophy_count = 1234;
        store.bulk_update_players(&[changed]).await.unwrap();

        let stored = store.get_player("#A").await.unwrap().unwrap();
        assert_eq!(stored.trophy_count, 1234);
        assert_eq!(stored.tracking_start, original.tracking_start);
    }

    #[tokio::test]
    async fn deleting_club_nulls_member_reference() {
        let store = InMemoryStore::new();
        let club = ClubModel {
            club_tag: "#C".into(),
            club_name: "C".into(),
            club_description: String::new(),
            club_type: Default::default(),
            trophies: 0,
            required_trophies: 0,
            has_been_searched: false,
            last_updated: None,
        };
        store.create_clubs(&[club]).await.unwrap();
        let mut member = player("#A");
        member.club_tag = Some("#C".into());
        store.create_players(&[member]).await.unwrap();

        store.delete_club("#C").await.unwrap();

        let stored = store.get_player("#A").await.unwrap().unwrap();
        assert_eq!(stored.club_tag, None);
    }

    #[tokio::test]
    async fn club_members_come_best_rated_first() {
        let store = InMemoryStore::new();
        let members: Vec<PlayerModel> = [("#A", 10.0), ("#B", 80.0), ("#C", 45.0), ("#D", 99.0)]
            .into_iter()
            .map(|(tag, rating)| {
                let mut member = player(tag);
                member.club_tag = Some(if tag == "#D" { "#OTHER" } else { "#CLUB" }.into());
                member.brawlclub_rating = rating;
                member
            })
            .collect();
        store.create_players(&members).await.unwrap();

        let tags: Vec<String> = store
            .club_members("#CLUB")
            .await
            .unwrap()
            .into_iter()
            .map(|member| member.player_tag)
            .collect();
        assert_eq!(tags, vec!["#B", "#C", "#A"]);
    }

    #[tokio::test]
    async fn participations_respect_since() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.create_players(&[player("#A")]).await.unwrap();
        store
            .create_matches(&[
                a_match("OLD", now - Duration::days(10)),
                a_match("NEW", now - Duration::hours(1)),
            ])
            .await
            .unwrap();
        store
            .create_match_issues(&[issue("OLD", "#A"), issue("NEW", "#A")])
            .await
            .unwrap();

        let found = store
            .participations_since(&["#A".to_string()], now - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(found["#A"].len(), 1);
    }

    #[tokio::test]
    async fn recent_history_returns_latest_in_order() {
        let store = InMemoryStore::new();
        let start = Utc::now();
        let snapshots: Vec<PlayerHistoryModel> = (0..10)
            .map(|i| player("#A").history_snapshot(start + Duration::hours(i)))
            .collect();
        store.create_history(&snapshots).await.unwrap();

        let recent = store.recent_history("#A", 8).await.unwrap();
        assert_eq!(recent.len(), 8);
        assert_eq!(recent[0].snapshot_date, start + Duration::hours(2));
        assert_eq!(recent[7].snapshot_date, start + Duration::hours(9));
    }
}
