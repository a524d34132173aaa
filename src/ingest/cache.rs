use std::collections::HashMap;
use tracing::debug;

use crate::shared::AppError;
use crate::store::Store;

/// Brawler and map ids for the duration of one batch.
///
/// Loaded once when the batch starts. A name missing from the snapshot is
/// created in the store and added here, so later lookups in the same batch
/// hit the cache.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    brawlers: HashMap<String, i64>,
    maps: HashMap<String, i64>,
}

impl ReferenceCache {
    pub async fn load(store: &dyn Store) -> Result<Self, AppError> {
        let brawlers = store
            .list_brawlers()
            .await?
            .into_iter()
            .map(|b| (b.name, b.id))
            .collect();
        let maps = store
            .list_maps()
            .await?
            .into_iter()
            .map(|m| (m.name, m.id))
            .collect();
        Ok(Self { brawlers, maps })
    }

    pub async fn brawler_id(&mut self, store: &dyn Store, name: &str) -> Result<i64, AppError> {
        if let Some(id) = self.brawlers.get(name) {
            return Ok(*id);
        }
        let brawler = store.get_or_create_brawler(name).await?;
        debug!(brawler = %name, id = brawler.id, "Brawler added to cache");
        self.brawlers.insert(brawler.name, brawler.id);
        Ok(brawler.id)
    }

    pub async fn map_id(&mut self, store: &dyn Store, name: &str) -> Result<i64, AppError> {
        if let Some(id) = self.maps.get(name) {
            return Ok(*id);
        }
        let map = store.get_or_create_map(name).await?;
        debug!(map = %name, id = map.id, "Map added to cache");
        self.maps.insert(map.name, map.id);
        Ok(map.id)
    }

    pub fn len(&self) -> usize {
        self.brawlers.len() + self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, ReferenceRepository};

    #[tokio::test]
    async fn miss_creates_once_and_is_remembered() {
        let store = InMemoryStore::new();
        store.get_or_create_brawler("SHELLY").await.unwrap();

        let mut cache = ReferenceCache::load(&store).await.unwrap();
        assert_eq!(cache.len(), 1);

        let colt = cache.brawler_id(&store, "COLT").await.unwrap();
        let again = cache.brawler_id(&store, "COLT").await.unwrap();
        assert_eq!(colt, again);
        assert_eq!(store.brawler_count(), 2);

        let map = cache.map_id(&store, "Hard Rock Mine").await.unwrap();
        assert_eq!(cache.map_id(&store, "Hard Rock Mine").await.unwrap(), map);
        assert_eq!(store.map_count(), 1);
        assert_eq!(cache.len(), 3);
    }
}
