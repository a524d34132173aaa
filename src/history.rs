//! Player history snapshots.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::shared::AppError;
use crate::store::{PlayerHistoryModel, PlayerModel, Store};
use crate::tag;

/// Snapshots shown on a player's area graph.
pub const AREA_GRAPH_POINTS: usize = 8;

const SNAPSHOT_BATCH: usize = 1000;

pub struct HistoryService {
    store: Arc<dyn Store>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends one snapshot per stored player, taken at `now`.
    #[instrument(skip(self))]
    pub async fn snapshot_all_players(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let players = self.store.list_players().await?;
        let mut written = 0;

        for batch in players.chunks(SNAPSHOT_BATCH) {
            let snapshots: Vec<PlayerHistoryModel> = batch
                .iter()
                .map(|player: &PlayerModel| player.history_snapshot(now))
                .collect();
            written += self.store.create_history(&snapshots).await?;
        }

        info!(written, "Player history snapshots taken");
        Ok(written)
    }

    /// Latest snapshots of a player, oldest first.
    pub async fn area_graph(&self, raw_tag: &str) -> Result<Vec<PlayerHistoryModel>, AppError> {
        let player_tag = tag::normalize(raw_tag)?;
        if self.store.get_player(&player_tag).await?.is_none() {
            return Err(AppError::NotFound(format!("Player {player_tag}")));
        }
        self.store
            .recent_history(&player_tag, AREA_GRAPH_POINTS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, PlayerRepository};
    use chrono::Duration;

    #[tokio::test]
    async fn area_graph_shows_last_points_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let start = Utc::now();
        let mut player = PlayerModel::new("#GRAPH".into(), start);
        store.create_players(&[player.clone()]).await.unwrap();
        let history = HistoryService::new(store.clone());

        for day in 0..10 {
            player.trophy_count = 1000 + day;
            store.bulk_update_players(&[player.clone()]).await.unwrap();
            history
                .snapshot_all_players(start + Duration::days(day as i64))
                .await
                .unwrap();
        }

        let graph = history.area_graph("graph").await.unwrap();
        assert_eq!(graph.len(), AREA_GRAPH_POINTS);
        assert_eq!(graph.first().unwrap().trophy_count, 1002);
        assert_eq!(graph.last().unwrap().trophy_count, 1009);
        assert!(graph
            .windows(2)
            .all(|pair| pair[0].snapshot_date < pair[1].snapshot_date));
    }

    #[tokio::test]
    async fn area_graph_of_unknown_player_is_not_found() {
        let history = HistoryService::new(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            history.area_graph("#NOBODY").await,
            Err(AppError::NotFound(_))
        ));
    }
}
