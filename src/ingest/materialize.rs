use std::collections::HashSet;
use tracing::{debug, instrument};

use super::cache::ReferenceCache;
use crate::battlelog::ParsedBattle;
use crate::shared::AppError;
use crate::store::{MatchIssueModel, MatchModel, Store};

const UNKNOWN_MODE: &str = "unknown";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeReport {
    pub matches_created: u64,
    pub issues_created: u64,
    pub issues_skipped: usize,
}

/// Stages matches and issues for a batch of parsed battles, skipping what
/// the store or the batch already holds, then writes them in two steps.
pub struct MatchMaterializer<'a> {
    store: &'a dyn Store,
    cache: &'a mut ReferenceCache,
    known_matches: HashSet<String>,
    known_issues: HashSet<(String, String)>,
    matches: Vec<MatchModel>,
    issues: Vec<MatchIssueModel>,
    skipped: usize,
}

impl<'a> MatchMaterializer<'a> {
    /// Seeds the dedup sets with what the store already has for `battles`.
    pub async fn prepare(
        store: &'a dyn Store,
        cache: &'a mut ReferenceCache,
        battles: &[ParsedBattle],
    ) -> Result<Self, AppError> {
        let match_ids: Vec<String> = battles
            .iter()
            .map(|b| b.match_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let issue_keys: Vec<(String, String)> = battles
            .iter()
            .map(|b| (b.match_id.clone(), b.player_tag.clone()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let known_matches = store.existing_match_ids(&match_ids).await?;
        let known_issues = store.existing_issue_keys(&issue_keys).await?;

        Ok(Self {
            store,
            cache,
            known_matches,
            known_issues,
            matches: Vec::new(),
            issues: Vec::new(),
            skipped: 0,
        })
    }

    pub async fn stage(&mut self, battle: &ParsedBattle) -> Result<(), AppError> {
        if !self.known_matches.contains(&battle.match_id) {
            let map_id = match battle.map.as_deref() {
                Some(name) => Some(self.cache.map_id(self.store, name).await?),
                None => None,
            };
            self.matches.push(MatchModel {
                match_id: battle.match_id.clone(),
                mode: battle
                    .mode
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_MODE.to_string()),
                map_id,
                battle_type: battle.battle_type,
                date: battle.battle_time,
            });
            self.known_matches.insert(battle.match_id.clone());
        }

        let key = (battle.match_id.clone(), battle.player_tag.clone());
        if self.known_issues.contains(&key) {
            self.skipped += 1;
            return Ok(());
        }

        let brawler_id = self.cache.brawler_id(self.store, &battle.brawler).await?;
        self.issues.push(MatchIssueModel {
            match_id: battle.match_id.clone(),
            player_tag: battle.player_tag.clone(),
            brawler_id,
            outcome: battle.outcome,
            trophies_won: battle.trophy_change,
            is_star_player: battle.is_star_player,
            played_with_clubmate: battle.played_with_clubmate,
        });
        self.known_issues.insert(key);
        Ok(())
    }

    /// Inserts the staged matches, then the issues referencing them.
    #[instrument(skip_all)]
    pub async fn flush(self) -> Result<MaterializeReport, AppError> {
        let matches_created = self.store.create_matches(&self.matches).await?;
        let issues_created = self.store.create_match_issues(&self.issues).await?;

        debug!(
            matches_created,
            issues_created,
            issues_skipped = self.skipped,
            "Battles materialized"
        );

        Ok(MaterializeReport {
            matches_created,
            issues_created,
            issues_skipped: self.skipped,
        })
    }
}

/// Stages and writes every battle of a batch.
pub async fn materialize_battles(
    store: &dyn Store,
    cache: &mut ReferenceCache,
    battles: &[ParsedBattle],
) -> Result<MaterializeReport, AppError> {
    let mut materializer = MatchMaterializer::prepare(store, cache, battles).await?;
    for battle in battles {
        materializer.stage(battle).await?;
    }
    materializer.flush().await
}
