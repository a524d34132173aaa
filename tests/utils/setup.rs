use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use brawlclub::{
    api::{BattleLog, ClubInfo, PlayerProfile},
    AppState, InMemoryGameApi, InMemoryStore, IngestSettings, IngestionService, LookupService,
    RatingService,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// Wednesday evening of an active league week.
pub fn league_evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 10, 26, 20, 0, 0).unwrap()
}

/// Tuesday between two leagues.
pub fn off_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 11, 1, 12, 0, 0).unwrap()
}

pub struct TestSetup {
    pub store: Arc<InMemoryStore>,
    pub api: Arc<InMemoryGameApi>,
    pub rating: Arc<RatingService>,
    pub ingestion: Arc<IngestionService>,
    pub lookup: LookupService,
}

pub struct TestSetupBuilder {
    api: InMemoryGameApi,
    settings: IngestSettings,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            api: InMemoryGameApi::new(),
            settings: IngestSettings::default(),
        }
    }

    pub fn with_player(self, profile: PlayerProfile, log: BattleLog) -> Self {
        self.api.insert_battle_log(&profile.tag, log);
        self.api.insert_profile(profile);
        self
    }

    pub fn with_club(self, club: ClubInfo, members: &[&str]) -> Self {
        self.api.insert_members(
            &club.tag,
            members.iter().map(|m| m.to_string()).collect(),
        );
        self.api.insert_club(club);
        self
    }

    pub fn with_failing(self, tag: &str) -> Self {
        self.api.fail_tag(tag);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.settings.batch_size = batch_size;
        self
    }

    pub fn build(self) -> TestSetup {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(self.api);
        let state = AppState::new(store.clone(), api.clone());

        let rating = Arc::new(RatingService::builder(store.clone()).build().unwrap());
        let ingestion = Arc::new(IngestionService::new(
            &state,
            rating.clone(),
            self.settings,
        ));
        let lookup = LookupService::new(&state, ingestion.clone());

        TestSetup {
            store,
            api,
            rating,
            ingestion,
            lookup,
        }
    }
}
