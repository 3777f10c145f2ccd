use std::collections::BTreeSet;

use macroquad::prelude::*;
use serde::Serialize;

use crate::entity::{CategoryId, EntityId, Origin, Population};
use crate::forces::Connection;
use crate::genome::Genome;
use crate::world::Bounds;

/// Serde-friendly stand-in for `Vec2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Point {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        vec2(p.x, p.y)
    }
}

impl Point {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub position: Point,
    pub velocity: Point,
    pub category: CategoryId,
    pub energy: f32,
    pub age: f32,
    pub lifespan: f32,
    pub generation: u32,
    pub parent: Option<EntityId>,
    pub origin: Origin,
    pub mutant: bool,
    pub genome: Genome,
}

/// Counters for one tick, or summed over the engine's lifetime.
///
/// Saturation (refused replications/spawns) is routine, not an error, and
/// shows up here instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub births: u64,
    pub spawned: u64,
    pub deaths_starved: u64,
    pub deaths_old_age: u64,
    pub refused_replications: u64,
    pub refused_spawns: u64,
    pub mutations: u64,
    pub coalesced_inputs: u64,
    pub clamped_frames: u64,
    pub clamped_forces: u64,
    pub clamped_speeds: u64,
    pub non_finite_repairs: u64,
}

impl Diagnostics {
    pub fn accumulate(&mut self, other: &Diagnostics) {
        self.births += other.births;
        self.spawned += other.spawned;
        self.deaths_starved += other.deaths_starved;
        self.deaths_old_age += other.deaths_old_age;
        self.refused_replications += other.refused_replications;
        self.refused_spawns += other.refused_spawns;
        self.mutations += other.mutations;
        self.coalesced_inputs += other.coalesced_inputs;
        self.clamped_frames += other.clamped_frames;
        self.clamped_forces += other.clamped_forces;
        self.clamped_speeds += other.clamped_speeds;
        self.non_finite_repairs += other.non_finite_repairs;
    }

    pub fn deaths(&self) -> u64 {
        self.deaths_starved + self.deaths_old_age
    }

    pub fn saturated(&self) -> bool {
        self.refused_replications > 0 || self.refused_spawns > 0
    }
}

/// Read-only view of the simulation after a tick. The only thing a renderer sees.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub elapsed: f64,
    pub bounds: Bounds,
    pub population_cap: usize,
    pub max_energy: f32,
    pub entities: Vec<EntityView>,
    pub connections: Vec<Connection>,
    pub active_injections: usize,
    /// Counters for the tick that produced this snapshot.
    pub diagnostics: Diagnostics,
    pub totals: Diagnostics,
}

impl Snapshot {
    /// Copy the live population. Connections touching entities that are no
    /// longer present are dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn capture(
        pop: &Population,
        connections: &[Connection],
        bounds: Bounds,
        max_energy: f32,
        tick: u64,
        elapsed: f64,
        active_injections: usize,
        diagnostics: Diagnostics,
        totals: Diagnostics,
    ) -> Self {
        let entities: Vec<EntityView> = pop
            .iter_alive()
            .map(|e| EntityView {
                id: e.id,
                position: e.pos.into(),
                velocity: e.velocity.into(),
                category: e.category,
                energy: e.energy,
                age: e.age,
                lifespan: e.lifespan,
                generation: e.generation,
                parent: e.parent,
                origin: e.origin,
                mutant: e.mutant,
                genome: e.genome.clone(),
            })
            .collect();
        let present: BTreeSet<EntityId> = entities.iter().map(|e| e.id).collect();
        let connections = connections
            .iter()
            .filter(|c| present.contains(&c.a) && present.contains(&c.b))
            .copied()
            .collect();

        Self {
            tick,
            elapsed,
            bounds,
            population_cap: pop.cap(),
            max_energy,
            entities,
            connections,
            active_injections,
            diagnostics,
            totals,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityView> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.entities[idx])
    }

    pub fn count_category(&self, category: CategoryId) -> usize {
        self.entities.iter().filter(|e| e.category == category).count()
    }

    /// True when every numeric field is finite. A false result is a defect.
    pub fn is_finite(&self) -> bool {
        self.entities.iter().all(|e| {
            e.position.is_finite()
                && e.velocity.is_finite()
                && e.energy.is_finite()
                && e.age.is_finite()
                && e.lifespan.is_finite()
        }) && self.connections.iter().all(|c| c.affinity.is_finite())
    }

    /// Stable binary encoding, used to compare runs byte for byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_entity;

    #[test]
    fn capture_drops_connections_to_missing_entities() {
        let mut pop = Population::new(4);
        let a = pop.spawn(test_entity(vec2(1.0, 1.0), 0)).unwrap();
        let b = pop.spawn(test_entity(vec2(2.0, 1.0), 1)).unwrap();
        let links = [
            Connection {
                a,
                b,
                affinity: 0.9,
            },
            Connection {
                a,
                b: EntityId(99),
                affinity: 0.9,
            },
        ];

        let snap = Snapshot::capture(
            &pop,
            &links,
            Bounds::new(10.0, 10.0),
            100.0,
            3,
            0.05,
            0,
            Diagnostics::default(),
            Diagnostics::default(),
        );
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.connections.len(), 1);
        assert_eq!(snap.entity(b).unwrap().category, CategoryId(1));
        assert_eq!(snap.count_category(CategoryId(0)), 1);
        assert!(snap.is_finite());
        assert!(!snap.to_bytes().unwrap().is_empty());
    }

    #[test]
    fn diagnostics_accumulate() {
        let mut total = Diagnostics::default();
        let tick = Diagnostics {
            births: 2,
            deaths_starved: 1,
            deaths_old_age: 1,
            refused_spawns: 3,
            ..Diagnostics::default()
        };
        total.accumulate(&tick);
        total.accumulate(&tick);
        assert_eq!(total.births, 4);
        assert_eq!(total.deaths(), 4);
        assert!(total.saturated());
    }
}
