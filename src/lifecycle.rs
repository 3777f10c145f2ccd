use ::rand::Rng;
use macroquad::prelude::*;

use crate::config::{EngineConfig, FeedPoint};
use crate::entity::{CategoryId, DeathCause, Entity, EntityId, Origin, Population};
use crate::genome::Genome;
use crate::physics;
use crate::world::Bounds;

/// Result of one lifecycle pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LifecycleReport {
    pub offspring: Vec<EntityId>,
    pub removed: Vec<(EntityId, DeathCause)>,
    /// Replications refused because the population cap was reached.
    pub refused: u32,
    pub mutations: u32,
}

/// Pending birth record, collected before any entity is inserted.
struct Birth {
    parent: EntityId,
    pos: Vec2,
    velocity: Vec2,
    category: CategoryId,
    genome: Genome,
    energy: f32,
    max_energy: f32,
    lifespan: f32,
    generation: u32,
    mutant: bool,
}

/// Age, feed, cull and replicate the population. Removal happens before
/// replication, so the same tick's survivors decide who may reproduce.
pub fn advance(
    pop: &mut Population,
    config: &EngineConfig,
    bounds: &Bounds,
    rng: &mut impl Rng,
    dt: f32,
    tick: u64,
) -> LifecycleReport {
    deduct_metabolism(pop.as_mut_slice(), config.decay_rate, dt);
    feed_from_points(pop.as_mut_slice(), &config.feed_points, dt);
    reward_interactions(pop.as_mut_slice(), config.life.interaction_energy_gain, dt);
    kill_expired(pop.as_mut_slice());

    let removed = pop.sweep_dead();
    let mut report = LifecycleReport {
        removed,
        ..LifecycleReport::default()
    };

    let births = collect_births(pop, config, bounds, rng, &mut report);
    for birth in births {
        if let Some(parent) = pop.get_mut(birth.parent) {
            parent.energy -= config.life.replication_cost;
            parent.offspring_count += 1;
        }

        let mut child = Entity::new(
            birth.pos,
            birth.velocity,
            birth.category,
            birth.genome,
            birth.energy,
            birth.max_energy,
            birth.lifespan,
            Origin::Offspring,
            tick,
        );
        child.generation = birth.generation;
        child.parent = Some(birth.parent);
        child.mutant = birth.mutant;

        // Capacity was reserved in collect_births, so this cannot be refused.
        if let Some(id) = pop.spawn(child) {
            report.offspring.push(id);
        } else {
            report.refused += 1;
        }
    }

    report
}

/// Age every entity and burn `decay_rate` energy per second.
pub fn deduct_metabolism(entities: &mut [Entity], decay_rate: f32, dt: f32) {
    for entity in entities.iter_mut() {
        entity.age += dt;
        entity.energy -= decay_rate * dt;
    }
}

/// Entities inside a feed point's radius gain its strength per second, up to their cap.
pub fn feed_from_points(entities: &mut [Entity], feed_points: &[FeedPoint], dt: f32) {
    if feed_points.is_empty() {
        return;
    }
    // Runs before the starvation check, so a tick's feed offsets its decay.
    for entity in entities.iter_mut() {
        for feed in feed_points {
            let d_sq = entity.pos.distance_squared(vec2(feed.x, feed.y));
            if d_sq <= feed.radius * feed.radius {
                entity.energy = (entity.energy + feed.strength * dt).min(entity.max_energy);
            }
        }
    }
}

/// Each connection made this tick is worth `gain` energy per second.
pub fn reward_interactions(entities: &mut [Entity], gain: f32, dt: f32) {
    if gain <= 0.0 {
        return;
    }
    for entity in entities.iter_mut() {
        if entity.connections.is_empty() {
            continue;
        }
        let bonus = gain * entity.connections.len() as f32 * dt;
        entity.energy = (entity.energy + bonus).min(entity.max_energy);
    }
}

/// Flag entities with no energy or past their lifespan.
pub fn kill_expired(entities: &mut [Entity]) {
    for entity in entities.iter_mut() {
        if entity.should_die() {
            entity.alive = false;
        }
    }
}

fn collect_births(
    pop: &Population,
    config: &EngineConfig,
    bounds: &Bounds,
    rng: &mut impl Rng,
    report: &mut LifecycleReport,
) -> Vec<Birth> {
    let life = &config.life;
    let mutant_category = life
        .mutant_category
        .as_deref()
        .and_then(|tag| config.category_index(tag))
        .map(|idx| CategoryId(idx as u16));

    let mut births = Vec::new();

    // Id order makes the refused set deterministic.
    for parent in pop.iter_alive() {
        if parent.energy <= life.replication_threshold {
            continue;
        }
        if rng.gen::<f32>() >= life.replication_chance {
            continue;
        }
        if pop.count() + births.len() >= pop.cap() {
            report.refused += 1;
            continue;
        }

        let (genome, mutated) =
            parent
                .genome
                .replicate(config.mutation_rate, life.trait_alphabet.len(), rng);
        let category = match (mutated, mutant_category) {
            (true, Some(tag)) => tag,
            _ => parent.category,
        };
        if mutated {
            report.mutations += 1;
        }

        let offset = Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU)) * life.spawn_offset;
        let kick_speed = rng.gen_range(config.physics.min_speed..config.physics.max_speed) * 0.5;
        let kick = Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU)) * kick_speed;
        let (velocity, _) =
            physics::enforce_speed(parent.velocity * 0.5 + kick, parent.id, &config.physics);

        births.push(Birth {
            parent: parent.id,
            pos: bounds.clamp(parent.pos + offset),
            velocity,
            category,
            genome,
            energy: (parent.energy * config.child_energy_fraction).min(parent.max_energy),
            max_energy: parent.max_energy,
            lifespan: parent.lifespan * config.offspring_lifespan_factor,
            generation: parent.generation + 1,
            mutant: mutated,
        });
    }

    births
}
