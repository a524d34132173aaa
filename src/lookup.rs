//! Read side: leaderboards, club finder and entity search.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::api::{classify_tag, GameApi, TagKind};
use crate::ingest::IngestionService;
use crate::shared::{AppError, AppState};
use crate::store::{ClubModel, ClubStanding, ClubType, PlayerModel, Store};
use crate::tag;

/// Clubs need this many members to appear on the club leaderboard.
pub const LEADERBOARD_MIN_MEMBERS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Club finder filters. A filter left as `None` matches every club.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubFilter {
    pub max_trophies: Option<i32>,
    pub club_type: Option<ClubType>,
    pub min_members: Option<usize>,
    pub max_members: Option<usize>,
}

impl ClubFilter {
    /// Builds a filter from raw query values. A value that does not parse
    /// disables its filter instead of failing the query.
    pub fn from_raw(
        max_trophies: Option<&str>,
        club_type: Option<&str>,
        min_members: Option<&str>,
        max_members: Option<&str>,
    ) -> Self {
        Self {
            max_trophies: lenient("max_trophies", max_trophies),
            club_type: lenient("type", club_type),
            min_members: lenient("min_members", min_members),
            max_members: lenient("max_members", max_members),
        }
    }

    pub fn matches(&self, standing: &ClubStanding) -> bool {
        self.max_trophies
            .map_or(true, |max| standing.club.required_trophies <= max)
            && self
                .club_type
                .map_or(true, |kind| standing.club.club_type == kind)
            && self
                .min_members
                .map_or(true, |min| standing.member_count >= min)
            && self
                .max_members
                .map_or(true, |max| standing.member_count <= max)
    }
}

fn lenient<T: FromStr>(name: &str, raw: Option<&str>) -> Option<T> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(filter = name, value = %raw, "Ignoring unparseable filter");
            None
        }
    }
}

fn by_rating_then(
    a: &ClubStanding,
    b: &ClubStanding,
    tie_break: impl Fn(&ClubStanding) -> i64,
) -> Ordering {
    b.average_rating
        .total_cmp(&a.average_rating)
        .then_with(|| tie_break(b).cmp(&tie_break(a)))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Player(PlayerModel),
    Club(ClubModel),
}

pub struct LookupService {
    store: Arc<dyn Store>,
    api: Arc<dyn GameApi>,
    ingestion: Arc<IngestionService>,
}

impl LookupService {
    pub fn new(state: &AppState, ingestion: Arc<IngestionService>) -> Self {
        Self {
            store: state.store.clone(),
            api: state.api.clone(),
            ingestion,
        }
    }

    pub async fn top_players(&self, page: Page) -> Result<Vec<PlayerModel>, AppError> {
        self.store.top_players(page.limit, page.offset).await
    }

    /// Full clubs ranked by average member rating, then club trophies.
    pub async fn top_clubs(&self, page: Page) -> Result<Vec<ClubStanding>, AppError> {
        let mut standings: Vec<ClubStanding> = self
            .store
            .club_standings()
            .await?
            .into_iter()
            .filter(|s| s.member_count >= LEADERBOARD_MIN_MEMBERS)
            .collect();
        standings.sort_by(|a, b| by_rating_then(a, b, |s| i64::from(s.club.trophies)));
        Ok(standings
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }

    /// Clubs matching `filter`, ranked by average member rating, then the
    /// trophies of their members.
    pub async fn find_clubs(&self, filter: &ClubFilter) -> Result<Vec<ClubStanding>, AppError> {
        let mut standings: Vec<ClubStanding> = self
            .store
            .club_standings()
            .await?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        standings.sort_by(|a, b| by_rating_then(a, b, |s| s.total_member_trophies));
        Ok(standings)
    }

    pub async fn club_members(&self, raw_tag: &str) -> Result<Vec<PlayerModel>, AppError> {
        let club_tag = tag::normalize(raw_tag)?;
        if self.store.get_club(&club_tag).await?.is_none() {
            return Err(AppError::NotFound(format!("Club {club_tag}")));
        }
        self.store.club_members(&club_tag).await
    }

    /// Resolves a tag to a stored player or club, fetching it from the API
    /// when it is not stored yet.
    #[instrument(skip(self))]
    pub async fn search(&self, raw_tag: &str, now: DateTime<Utc>) -> Result<SearchResult, AppError> {
        let tag = tag::normalize(raw_tag)?;

        if let Some(player) = self.store.get_player(&tag).await? {
            return self.player_found(player).await;
        }
        if let Some(club) = self.store.get_club(&tag).await? {
            return self.club_found(club).await;
        }

        match classify_tag(self.api.as_ref(), &tag).await? {
            TagKind::Player => {
                info!(tag = %tag, "Tracking new player from search");
                let player = self.ingestion.ingest_player(&tag, now).await?;
                self.player_found(player).await
            }
            TagKind::Club => {
                info!(tag = %tag, "Tracking new club from search");
                let club = self.ingestion.ingest_club_members(&tag, now).await?;
                self.club_found(club).await
            }
            TagKind::Unknown => Err(AppError::NotFound(format!("Tag {tag}"))),
        }
    }

    async fn player_found(&self, mut player: PlayerModel) -> Result<SearchResult, AppError> {
        if !player.has_been_searched {
            self.store.mark_player_searched(&player.player_tag).await?;
            player.has_been_searched = true;
        }
        Ok(SearchResult::Player(player))
    }

    async fn club_found(&self, mut club: ClubModel) -> Result<SearchResult, AppError> {
        if !club.has_been_searched {
            self.store.mark_club_searched(&club.club_tag).await?;
            club.has_been_searched = true;
        }
        Ok(SearchResult::Club(club))
    }
}
