use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::{
    builder::PlayerUpdateBuilder,
    cache::ReferenceCache,
    materialize::materialize_battles,
    tickets::remaining_tickets,
};
use crate::api::fanout::{fetch_clubs, fetch_member_tags, fetch_player_snapshots};
use crate::api::GameApi;
use crate::battlelog::{parse_battle_log, ParsedBattle};
use crate::calendar::LeagueState;
use crate::config::{Config, MAX_BATCH_SIZE};
use crate::rating::RatingService;
use crate::shared::{AppError, AppState};
use crate::store::{ClubModel, PlayerModel, Store};
use crate::tag;

/// Clubs asked for their rosters in one go during discovery.
const DISCOVERY_CHUNK: usize = 999;

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub batch_size: usize,
    pub max_in_flight: usize,
    pub batch_timeout: Duration,
    pub stale_after: chrono::Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_in_flight: 100,
            batch_timeout: Duration::from_secs(3600),
            stale_after: chrono::Duration::hours(8),
        }
    }
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            max_in_flight: config.max_in_flight,
            batch_timeout: config.batch_timeout,
            stale_after: config.stale_after,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub fetched: usize,
    pub clubs_created: u64,
    pub players_created: u64,
    pub matches_created: u64,
    pub issues_created: u64,
    pub players_rated: usize,
    pub players_updated: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub league_active: bool,
    pub candidates: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub players_updated: u64,
}

pub struct IngestionService {
    store: Arc<dyn Store>,
    api: Arc<dyn GameApi>,
    rating: Arc<RatingService>,
    settings: IngestSettings,
}

impl IngestionService {
    pub fn new(state: &AppState, rating: Arc<RatingService>, settings: IngestSettings) -> Self {
        Self {
            store: state.store.clone(),
            api: state.api.clone(),
            rating,
            settings,
        }
    }

    /// Refreshes a batch of players from the API.
    ///
    /// Players whose profile cannot be fetched are left out. The whole batch
    /// fails if it runs past the batch timeout.
    #[instrument(skip(self, player_tags), fields(count = player_tags.len()))]
    pub async fn ingest_batch(
        &self,
        player_tags: &[String],
        now: DateTime<Utc>,
    ) -> Result<BatchReport, AppError> {
        self.timed_batch(player_tags, now, false).await
    }

    async fn timed_batch(
        &self,
        player_tags: &[String],
        now: DateTime<Utc>,
        refresh_clubs: bool,
    ) -> Result<BatchReport, AppError> {
        let timeout = self.settings.batch_timeout;
        tokio::time::timeout(timeout, self.run_batch(player_tags, now, refresh_clubs))
            .await
            .map_err(|_| {
                error!(timeout_secs = timeout.as_secs(), "Batch timed out");
                AppError::Timeout(timeout.as_secs())
            })?
    }

    async fn run_batch(
        &self,
        player_tags: &[String],
        now: DateTime<Utc>,
        refresh_clubs: bool,
    ) -> Result<BatchReport, AppError> {
        let store = self.store.as_ref();
        let tags: Vec<String> = player_tags
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut report = BatchReport {
            requested: tags.len(),
            ..BatchReport::default()
        };

        let snapshots =
            fetch_player_snapshots(self.api.as_ref(), &tags, self.settings.max_in_flight).await;
        report.fetched = snapshots.len();
        if snapshots.is_empty() {
            info!("No player could be fetched in this batch");
            return Ok(report);
        }
        let fetched_tags: Vec<String> = tags
            .iter()
            .filter(|t| snapshots.contains_key(*t))
            .cloned()
            .collect();

        // Clubs referenced by several players are fetched and created once
        let referenced_clubs: Vec<String> = snapshots
            .values()
            .filter_map(|s| s.profile.club_tag().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (known_clubs, clubs_created) = self
            .ensure_clubs(&referenced_clubs, now, refresh_clubs)
            .await?;
        report.clubs_created = clubs_created;

        report.players_created = self.ensure_players(&fetched_tags, now).await?;

        let battles: Vec<ParsedBattle> = fetched_tags
            .iter()
            .flat_map(|t| parse_battle_log(t, &snapshots[t].battle_log))
            .collect();
        let mut cache = ReferenceCache::load(store).await?;
        let materialized = materialize_battles(store, &mut cache, &battles).await?;
        report.matches_created = materialized.matches_created;
        report.issues_created = materialized.issues_created;

        let league = LeagueState::at(now);
        let mut window_matches = match league.window_start {
            Some(window_start) if league.active => {
                store.participations_since(&fetched_tags, window_start).await?
            }
            _ => HashMap::new(),
        };

        let mut updated: Vec<PlayerModel> = store
            .get_players(&fetched_tags)
            .await?
            .into_iter()
            .map(|stored| {
                let snapshot = &snapshots[&stored.player_tag];
                let club_tag = snapshot
                    .profile
                    .club_tag()
                    .filter(|club| known_clubs.contains(*club))
                    .map(str::to_string);
                let played = window_matches
                    .remove(&stored.player_tag)
                    .unwrap_or_default();
                PlayerUpdateBuilder::from_stored(stored)
                    .profile(&snapshot.profile, club_tag)
                    .tickets(remaining_tickets(&league, &played))
                    .build(now)
            })
            .collect();

        if league.active {
            report.players_rated = self.rating.rate_players(&mut updated, now).await?;
        }

        report.players_updated = store.bulk_update_players(&updated).await?;

        info!(
            requested = report.requested,
            fetched = report.fetched,
            matches_created = report.matches_created,
            issues_created = report.issues_created,
            players_updated = report.players_updated,
            "Batch ingested"
        );
        Ok(report)
    }

    /// Creates the clubs of `club_tags` that are not stored yet, and with
    /// `refresh` also rewrites the stored ones from club-info. Returns the
    /// tags now present in the store and how many were created.
    async fn ensure_clubs(
        &self,
        club_tags: &[String],
        now: DateTime<Utc>,
        refresh: bool,
    ) -> Result<(HashSet<String>, u64), AppError> {
        let mut known = self.store.existing_club_tags(club_tags).await?;
        let wanted: Vec<String> = club_tags
            .iter()
            .filter(|t| refresh || !known.contains(*t))
            .cloned()
            .collect();
        if wanted.is_empty() {
            return Ok((known, 0));
        }

        let fetched = fetch_clubs(self.api.as_ref(), &wanted, self.settings.max_in_flight).await;
        let (refreshed, created): (Vec<ClubModel>, Vec<ClubModel>) = wanted
            .iter()
            .filter_map(|t| fetched.get(t))
            .map(|info| ClubModel::from_info(info, now))
            .partition(|club| known.contains(&club.club_tag));
        for club_tag in wanted
            .iter()
            .filter(|t| !fetched.contains_key(*t) && !known.contains(*t))
        {
            warn!(club_tag = %club_tag, "Club could not be fetched, members keep no club");
        }

        for club in &refreshed {
            self.store.upsert_club(club).await?;
        }
        let created_count = self.store.create_clubs(&created).await?;
        known.extend(created.into_iter().map(|c| c.club_tag));
        Ok((known, created_count))
    }

    /// Creates blank rows for players not stored yet, tracked from `now`.
    async fn ensure_players(
        &self,
        player_tags: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let existing = self.store.existing_player_tags(player_tags).await?;
        let new_players: Vec<PlayerModel> = player_tags
            .iter()
            .filter(|t| !existing.contains(*t))
            .map(|t| PlayerModel::new(t.clone(), now))
            .collect();
        if new_players.is_empty() {
            return Ok(0);
        }
        debug!(count = new_players.len(), "Creating new players");
        self.store.create_players(&new_players).await
    }

    /// Scheduled sweep over every stored player due for a refresh.
    ///
    /// Outside a league everyone's tickets are zeroed and, unless forced,
    /// nobody is refreshed. During a league, players not seen since the
    /// current grant get today's tickets, then stale players with tickets
    /// left are refreshed, best rated first.
    #[instrument(skip(self))]
    pub async fn update_all(&self, now: DateTime<Utc>, force: bool) -> Result<SweepReport, AppError> {
        let league = LeagueState::at(now);
        let mut report = SweepReport {
            league_active: league.active,
            ..SweepReport::default()
        };

        match league.window_start {
            Some(window_start) if league.active => {
                let replenished = self
                    .store
                    .replenish_tickets(window_start, league.tickets_granted_today as i32)
                    .await?;
                debug!(replenished, "Tickets granted for the current window");
            }
            _ => {
                self.store.reset_all_tickets().await?;
                debug!("No league running, tickets reset");
            }
        }

        let updated_before = if force {
            now
        } else {
            now - self.settings.stale_after
        };
        let candidates = self
            .store
            .stale_player_tags(updated_before, !force)
            .await?;
        report.candidates = candidates.len();
        info!(
            candidates = candidates.len(),
            league_active = league.active,
            force,
            "Starting sweep"
        );

        for batch in candidates.chunks(self.settings.batch_size.max(1)) {
            report.batches += 1;
            match self.ingest_batch(batch, now).await {
                Ok(batch_report) => report.players_updated += batch_report.players_updated,
                Err(err) => {
                    // Retried wholesale on the next sweep
                    error!(error = %err, batch = report.batches, "Batch failed");
                    report.failed_batches += 1;
                }
            }
        }

        Ok(report)
    }

    /// Refreshes one player, adding them to the store if needed.
    #[instrument(skip(self))]
    pub async fn ingest_player(
        &self,
        raw_tag: &str,
        now: DateTime<Utc>,
    ) -> Result<PlayerModel, AppError> {
        let player_tag = tag::normalize(raw_tag)?;

        let report = self
            .timed_batch(std::slice::from_ref(&player_tag), now, true)
            .await?;
        if report.fetched == 0 {
            return Err(AppError::NotFound(format!("Player {player_tag}")));
        }

        self.store
            .get_player(&player_tag)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {player_tag}")))
    }

    /// Refreshes a club and its whole roster. Stored players who left the
    /// club lose their club reference.
    #[instrument(skip(self))]
    pub async fn ingest_club_members(
        &self,
        raw_tag: &str,
        now: DateTime<Utc>,
    ) -> Result<ClubModel, AppError> {
        let club_tag = tag::normalize(raw_tag)?;

        let info = self
            .api
            .club_info(&club_tag)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Club {club_tag}")))?;
        let club = ClubModel::from_info(&info, now);
        self.store.upsert_club(&club).await?;

        let roster: Vec<String> = self
            .api
            .club_members(&club_tag)
            .await?
            .map(|members| members.items.into_iter().map(|m| m.tag).collect())
            .unwrap_or_default();

        self.ensure_players(&roster, now).await?;
        let detached = self
            .store
            .detach_former_members(&club_tag, &roster)
            .await?;
        if detached > 0 {
            info!(club_tag = %club_tag, detached, "Former members detached");
        }

        for batch in roster.chunks(self.settings.batch_size.max(1)) {
            self.ingest_batch(batch, now).await?;
        }

        Ok(club)
    }

    /// Adds every member of every stored club who is not stored yet.
    #[instrument(skip(self))]
    pub async fn discover_new_players(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let club_tags = self.store.list_club_tags().await?;
        let mut created = 0;

        for chunk in club_tags.chunks(DISCOVERY_CHUNK) {
            let rosters =
                fetch_member_tags(self.api.as_ref(), chunk, self.settings.max_in_flight).await;

            let mut member_club: HashMap<String, String> = HashMap::new();
            for (club_tag, members) in rosters {
                for member in members {
                    member_club.insert(member, club_tag.clone());
                }
            }
            let tags: Vec<String> = member_club.keys().cloned().collect();
            let existing = self.store.existing_player_tags(&tags).await?;

            let new_players: Vec<PlayerModel> = member_club
                .into_iter()
                .filter(|(member, _)| !existing.contains(member))
                .map(|(member, club_tag)| {
                    let mut player = PlayerModel::new(member, now);
                    player.club_tag = Some(club_tag);
                    player
                })
                .collect();

            if !new_players.is_empty() {
                created += self.store.create_players(&new_players).await?;
            }
        }

        info!(created, "Player discovery finished");
        Ok(created)
    }
}
