//! Entity ids and storage

use crate::MirrorError;
use crate::Result;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of a simulation entity
///
/// Handed out in order and never reused within a run, so a recorded id always
/// names the same entity when the run is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    pub fn new(id: u32) -> Self {
        EntityId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live entities of a run, kept densely in spawn order
///
/// Every pass over the entities walks the dense vector, so update order is
/// spawn order on every machine. The `FxHashMap` only maps ids to slots.
#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    slots: Vec<(EntityId, T)>,
    index: FxHashMap<EntityId, usize>,
    next_id: u32,
}

impl<T> EntityStore<T> {
    pub fn new() -> Self {
        EntityStore {
            slots: Vec::new(),
            index: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Reserve the next unused id
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add `entity` under `id`, replacing any entity already there
    ///
    /// The viewer inserts recorded ids, so the counter moves past them.
    pub fn insert(&mut self, id: EntityId, entity: T) {
        match self.index.get(&id) {
            Some(&slot) => self.slots[slot].1 = entity,
            None => {
                self.index.insert(id, self.slots.len());
                self.slots.push((id, entity));
            }
        }
        self.next_id = self.next_id.max(id.as_u32() + 1);
    }

    pub fn get(&self, id: EntityId) -> Result<&T> {
        self.index
            .get(&id)
            .map(|&slot| &self.slots[slot].1)
            .ok_or(MirrorError::EntityNotFound(id.as_u32()))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut T> {
        match self.index.get(&id) {
            Some(&slot) => Ok(&mut self.slots[slot].1),
            None => Err(MirrorError::EntityNotFound(id.as_u32())),
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Ids in spawn order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots.iter().map(|(id, entity)| (*id, entity))
    }

    /// Take out every entity `keep` rejects, preserving spawn order on both sides
    ///
    /// `keep` is called once per entity. Slots before the first rejected
    /// entity are left in place, so a tick that culls nothing costs one scan.
    pub fn drain_filter<F>(&mut self, mut keep: F) -> Vec<(EntityId, T)>
    where
        F: FnMut(&T) -> bool,
    {
        let Some(first) = self.slots.iter().position(|(_, e)| !keep(e)) else {
            return Vec::new();
        };

        let mut tail = self.slots.split_off(first).into_iter();
        let mut removed: Vec<(EntityId, T)> = tail.next().into_iter().collect();
        for (id, entity) in tail {
            if keep(&entity) {
                self.slots.push((id, entity));
            } else {
                removed.push((id, entity));
            }
        }

        for (id, _) in &removed {
            self.index.remove(id);
        }
        for (slot, (id, _)) in self.slots.iter().enumerate().skip(first) {
            self.index.insert(*id, slot);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
