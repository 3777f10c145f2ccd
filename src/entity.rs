use std::collections::BTreeSet;

use macroquad::prelude::*;
use serde::Serialize;

use crate::genome::Genome;

/// Opaque entity handle. Ids are handed out in increasing order and never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct EntityId(pub u64);

/// Index into the configured category list.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct CategoryId(pub u16);

impl CategoryId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How an entity came into existence.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Origin {
    Seed,
    Spawned,
    Offspring,
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub category: CategoryId,
    pub genome: Genome,
    pub energy: f32,
    pub max_energy: f32,
    pub age: f32,
    pub lifespan: f32,
    pub generation: u32,
    pub parent: Option<EntityId>,
    pub origin: Origin,
    pub mutant: bool,
    pub alive: bool,
    pub offspring_count: u32,
    pub tick_born: u64,
    /// Ids in range and above the connection threshold this tick. Reporting only.
    pub connections: BTreeSet<EntityId>,
}

impl Entity {
    /// Build a fresh generation-1 entity. The id is assigned by [`Population::spawn`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pos: Vec2,
        velocity: Vec2,
        category: CategoryId,
        genome: Genome,
        energy: f32,
        max_energy: f32,
        lifespan: f32,
        origin: Origin,
        tick: u64,
    ) -> Self {
        Self {
            id: EntityId(0),
            pos,
            velocity,
            category,
            genome,
            energy: energy.min(max_energy),
            max_energy,
            age: 0.0,
            lifespan,
            generation: 1,
            parent: None,
            origin,
            mutant: false,
            alive: true,
            offspring_count: 0,
            tick_born: tick,
            connections: BTreeSet::new(),
        }
    }

    /// Energy as a fraction of capacity, in [0, 1].
    pub fn energy_factor(&self) -> f32 {
        if self.max_energy > 0.0 {
            (self.energy / self.max_energy).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn should_die(&self) -> bool {
        self.energy <= 0.0 || self.age > self.lifespan
    }
}

/// Why an entity left the population.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum DeathCause {
    Starved,
    OldAge,
}

/// Capped entity storage, kept sorted by id.
///
/// Only the engine and the lifecycle pass hold `&mut` access.
pub struct Population {
    entities: Vec<Entity>,
    next_id: u64,
    cap: usize,
}

impl Population {
    pub fn new(cap: usize) -> Self {
        Self {
            entities: Vec::with_capacity(cap),
            next_id: 1,
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entities.len() >= self.cap
    }

    pub fn free_slots(&self) -> usize {
        self.cap.saturating_sub(self.entities.len())
    }

    /// Insert an entity and assign its id. Refused once the cap is reached.
    pub fn spawn(&mut self, mut entity: Entity) -> Option<EntityId> {
        if self.is_full() {
            return None;
        }
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        // Monotonic ids keep the vector sorted.
        self.entities.push(entity);
        Some(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|idx| &self.entities[idx])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(move |idx| &mut self.entities[idx])
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn as_mut_slice(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Remove entities flagged dead. Returns `(id, cause)` in id order.
    pub fn sweep_dead(&mut self) -> Vec<(EntityId, DeathCause)> {
        let mut removed = Vec::new();
        self.entities.retain(|e| {
            if e.alive {
                return true;
            }
            let cause = if e.energy <= 0.0 {
                DeathCause::Starved
            } else {
                DeathCause::OldAge
            };
            removed.push((e.id, cause));
            false
        });
        removed
    }

    /// Iterate over all live entities in id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.alive)
    }
}

#[cfg(test)]
pub(crate) fn test_entity(pos: Vec2, category: u16) -> Entity {
    Entity::new(
        pos,
        vec2(1.0, 0.0),
        CategoryId(category),
        Genome::default(),
        50.0,
        100.0,
        60.0,
        Origin::Seed,
        0,
    )
}
