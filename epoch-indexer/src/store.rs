//! Write-back cache over the entity store, scoped to one invocation.
//!
//! Executors never touch the [`EntityStore`] directly: every read is
//! memoized here (absence included, so the store is asked about any id
//! at most once) and every write is staged until [`StoreCache::commit`].
//! Dropping the cache without committing is the rollback path.

use std::collections::HashMap;

use log::trace;

use crate::entities::{epoch_id, Entity, EntityKind, Epoch, Network, NetworkEpochBlockNumber};
use crate::interface::{EntityStore, StoreError};

#[derive(Debug)]
struct Slot {
    /// `None` memoizes store absence.
    entity: Option<Entity>,
    dirty: bool,
}

/// The staging layer between executors and the [`EntityStore`].
pub struct StoreCache<'a> {
    store: &'a mut dyn EntityStore,
    slots: HashMap<EntityKind, HashMap<String, Slot>>,
}

impl std::fmt::Debug for StoreCache<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCache").field("slots", &self.slots).finish_non_exhaustive()
    }
}

impl<'a> StoreCache<'a> {
    /// Opens a cache over `store` for one invocation.
    pub fn new(store: &'a mut dyn EntityStore) -> Self {
        Self {
            store,
            slots: HashMap::new(),
        }
    }

    /// Cached load. Asks the store once per id and memoizes the answer,
    /// hit or miss.
    pub fn get(&mut self, kind: EntityKind, id: &str) -> Result<Option<Entity>, StoreError> {
        if let Some(slot) = self.slots.get(&kind).and_then(|slots| slots.get(id)) {
            return Ok(slot.entity.clone());
        }
        let loaded = self.store.load(kind, id)?;
        self.slots.entry(kind).or_default().insert(
            id.to_owned(),
            Slot {
                entity: loaded.clone(),
                dirty: false,
            },
        );
        Ok(loaded)
    }

    /// True iff the cache or the backing store holds `id`.
    pub fn has(&mut self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(kind, id)?.is_some())
    }

    /// Stages `entity` for write-back under `id`.
    pub fn set(&mut self, id: String, entity: Entity) {
        self.slots.entry(entity.kind()).or_default().insert(
            id,
            Slot {
                entity: Some(entity),
                dirty: true,
            },
        );
    }

    /// Get-or-create for [`Network`]: a missing id yields a
    /// default-initialized network staged dirty.
    pub fn network(&mut self, id: &str) -> Result<Network, StoreError> {
        match self.get(EntityKind::Network, id)? {
            Some(entity) => entity
                .into_network()
                .map_err(|other| unexpected_kind(EntityKind::Network, id, &other)),
            None => {
                let network = Network {
                    id: id.to_owned(),
                    ..Default::default()
                };
                self.set(id.to_owned(), Entity::Network(network.clone()));
                Ok(network)
            }
        }
    }

    /// Get-or-create for [`Epoch`], keyed by epoch number.
    pub fn epoch(&mut self, number: u64) -> Result<Epoch, StoreError> {
        let id = epoch_id(number);
        match self.get(EntityKind::Epoch, &id)? {
            Some(entity) => entity
                .into_epoch()
                .map_err(|other| unexpected_kind(EntityKind::Epoch, &id, &other)),
            None => {
                let epoch = Epoch {
                    id: id.clone(),
                    epoch_number: number,
                };
                self.set(id, Entity::Epoch(epoch.clone()));
                Ok(epoch)
            }
        }
    }

    /// Plain lookup for [`NetworkEpochBlockNumber`]; never creates.
    pub fn block_number(&mut self, id: &str) -> Result<Option<NetworkEpochBlockNumber>, StoreError> {
        match self.get(EntityKind::NetworkEpochBlockNumber, id)? {
            Some(entity) => entity
                .into_block_number()
                .map(Some)
                .map_err(|other| unexpected_kind(EntityKind::NetworkEpochBlockNumber, id, &other)),
            None => Ok(None),
        }
    }

    /// Writes every dirty slot to the backing store.
    pub fn commit(self) -> Result<(), StoreError> {
        let Self { store, slots } = self;
        for (kind, slots) in slots {
            for (id, slot) in slots {
                if slot.dirty {
                    let entity = slot.entity.expect("staged writes always hold an entity");
                    trace!("committing {kind:?} {id}");
                    store.save(id, entity)?;
                }
            }
        }
        Ok(())
    }

    /// Drops every staged write.
    pub fn discard(self) {
        let dirty = self
            .slots
            .values()
            .flat_map(HashMap::values)
            .filter(|slot| slot.dirty)
            .count();
        trace!("discarding {dirty} staged writes");
    }
}

pub(crate) fn unexpected_kind(expected: EntityKind, id: &str, got: &Entity) -> StoreError {
    StoreError(anyhow::anyhow!(
        "expected {expected:?} under id {id}, found {:?}",
        got.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::GlobalState;
    use crate::testing::MemoryStore;

    #[test]
    fn absence_is_memoized() {
        let mut store = MemoryStore::default();
        let mut cache = StoreCache::new(&mut store);

        assert!(!cache.has(EntityKind::Network, "eth").unwrap());
        assert!(!cache.has(EntityKind::Network, "eth").unwrap());
        assert!(cache.get(EntityKind::Network, "eth").unwrap().is_none());
        drop(cache);
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn only_dirty_slots_are_committed() {
        let mut store = MemoryStore::default();
        store.insert(
            "0".to_owned(),
            Entity::GlobalState(GlobalState {
                id: "0".to_owned(),
                network_count: 3,
                ..Default::default()
            }),
        );

        let mut cache = StoreCache::new(&mut store);
        cache.get(EntityKind::GlobalState, "0").unwrap();
        let network = cache.network("eth").unwrap();
        assert_eq!(network.id, "eth");
        cache.commit().unwrap();

        // The clean GlobalState read was not rewritten; the created
        // network was.
        assert_eq!(store.save_count(), 1);
        assert!(store.get(EntityKind::Network, "eth").is_some());
    }

    #[test]
    fn discard_reaches_the_store_never() {
        let mut store = MemoryStore::default();
        let mut cache = StoreCache::new(&mut store);
        cache.network("eth").unwrap();
        cache.epoch(1).unwrap();
        cache.discard();
        assert!(store.is_empty());
    }

    #[test]
    fn get_or_create_returns_the_staged_copy() {
        let mut store = MemoryStore::default();
        let mut cache = StoreCache::new(&mut store);

        let mut network = cache.network("eth").unwrap();
        network.alias = Some("ethereum".to_owned());
        cache.set(network.id.clone(), Entity::Network(network));

        let reread = cache.network("eth").unwrap();
        assert_eq!(reread.alias.as_deref(), Some("ethereum"));
    }
}
