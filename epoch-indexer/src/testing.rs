//! Test doubles for the store seam, shared by this crate's tests and
//! local harnesses.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::entities::{Entity, EntityKind};
use crate::interface::{EntityStore, StoreError};

/// In-memory [`EntityStore`].
///
/// Point lookups only, like the real thing; counters expose how often
/// the seam was crossed so cache behavior can be asserted.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entities: BTreeMap<(EntityKind, String), Entity>,
    loads: Cell<usize>,
    saves: usize,
    /// When set, every operation fails; simulates a store outage.
    pub fail: bool,
}

impl MemoryStore {
    /// Direct fixture access, bypassing the load counter.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.entities.get(&(kind, id.to_owned()))
    }

    /// Direct fixture insertion, bypassing the save counter.
    pub fn insert(&mut self, id: String, entity: Entity) {
        self.entities.insert((entity.kind(), id), entity);
    }

    /// How many entities are stored.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// How many times [`EntityStore::load`] was called.
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }

    /// How many times [`EntityStore::save`] was called.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// A deterministic rendering of everything stored, minus the given
    /// kinds. Two stores holding the same entities render identically,
    /// which is what rollback tests compare.
    pub fn snapshot_excluding(&self, exclude: &[EntityKind]) -> String {
        self.entities
            .iter()
            .filter(|((kind, _), _)| !exclude.contains(kind))
            .map(|(key, entity)| format!("{key:?} => {entity:?}\n"))
            .collect()
    }

    /// Ids of all stored entities of `kind`, in key order.
    pub fn ids_of(&self, kind: EntityKind) -> Vec<String> {
        self.entities
            .keys()
            .filter(|(stored_kind, _)| *stored_kind == kind)
            .map(|(_, id)| id.clone())
            .collect()
    }
}

impl EntityStore for MemoryStore {
    fn load(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>, StoreError> {
        if self.fail {
            return Err(StoreError(anyhow::anyhow!("store outage")));
        }
        self.loads.set(self.loads.get() + 1);
        Ok(self.entities.get(&(kind, id.to_owned())).cloned())
    }

    fn save(&mut self, id: String, entity: Entity) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError(anyhow::anyhow!("store outage")));
        }
        self.saves += 1;
        self.entities.insert((entity.kind(), id), entity);
        Ok(())
    }
}
