use std::collections::BTreeMap;

use macroquad::prelude::*;
use noise::{NoiseFn, Perlin};
use serde::Serialize;

use crate::compatibility::CompatibilityModel;
use crate::config::EngineConfig;
use crate::entity::{Entity, EntityId};
use crate::input::ForceInjection;
use crate::spatial_hash::SpatialHash;

/// A pair linked this tick. Reporting state for the renderer only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Connection {
    pub a: EntityId,
    pub b: EntityId,
    pub affinity: f32,
}

/// Output of one force pass.
#[derive(Debug, Default)]
pub struct ForceReport {
    pub forces: BTreeMap<EntityId, Vec2>,
    pub connections: Vec<Connection>,
    /// Forces whose magnitude exceeded `max_force`.
    pub clamped: u32,
    /// Forces that came out NaN/∞ and were zeroed.
    pub non_finite: u32,
}

impl ForceReport {
    pub fn force_on(&self, id: EntityId) -> Vec2 {
        self.forces.get(&id).copied().unwrap_or(Vec2::ZERO)
    }
}

/// Smooth, bounded drift sampled from Perlin noise over (x, y, t).
pub struct DriftField {
    perlin: Perlin,
    amplitude: f32,
    frequency: f64,
}

impl DriftField {
    pub fn new(seed: u32, amplitude: f32, frequency: f32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            amplitude,
            frequency: frequency as f64,
        }
    }

    /// Drift force at `pos`; magnitude never exceeds the amplitude.
    pub fn sample(&self, pos: Vec2, time: f32) -> Vec2 {
        if self.amplitude <= 0.0 {
            return Vec2::ZERO;
        }
        let x = pos.x as f64 * self.frequency;
        let y = pos.y as f64 * self.frequency;
        let t = time as f64 * 0.25;
        let vx = self.perlin.get([x, y, t]) as f32;
        let vy = self.perlin.get([x + 31.7, y + 47.3, t]) as f32;
        let v = vec2(vx, vy);
        if !v.is_finite() {
            return Vec2::ZERO;
        }
        v.clamp_length_max(1.0) * self.amplitude
    }
}

/// Net force on every live entity for this tick.
///
/// Pair forces follow `affinity * e_a * e_b / max(d², ε)` along the line
/// between the two entities. Connections are recorded alongside but never
/// feed back into the forces.
pub fn compute_forces(
    entities: &[Entity],
    model: &CompatibilityModel,
    spatial: &SpatialHash,
    config: &EngineConfig,
    injections: &[ForceInjection],
    drift: Option<&DriftField>,
    time: f32,
) -> ForceReport {
    let phys = &config.physics;
    let radius = config.interaction_radius;
    let mut accum = vec![Vec2::ZERO; entities.len()];
    let mut connections = Vec::new();

    for (idx_a, a) in entities.iter().enumerate() {
        if !a.alive {
            continue;
        }
        let neighbors = spatial.query_radius_excluding(a.pos, radius, idx_a as u32, entities);
        for idx_b in neighbors {
            let idx_b = idx_b as usize;
            // Each unordered pair is handled once, from its lower index.
            if idx_b <= idx_a {
                continue;
            }
            let b = &entities[idx_b];
            let delta = b.pos - a.pos;
            let dist_sq = delta.length_squared();
            let dir = if dist_sq > 1e-12 {
                delta / dist_sq.sqrt()
            } else {
                coincident_direction(a.id, b.id)
            };

            let pull_a = model.affinity(a.category, b.category);
            let pull_b = model.affinity(b.category, a.category);
            let magnitude =
                phys.force_scale * a.energy_factor() * b.energy_factor() / dist_sq.max(phys.softening);

            accum[idx_a] += dir * (pull_a * magnitude);
            accum[idx_b] -= dir * (pull_b * magnitude);

            let mutual = 0.5 * (pull_a + pull_b);
            if mutual >= config.connection_threshold && mutual > 0.0 {
                connections.push(Connection {
                    a: a.id,
                    b: b.id,
                    affinity: mutual,
                });
            }
        }
    }

    for injection in injections {
        for (idx, e) in entities.iter().enumerate() {
            if e.alive {
                accum[idx] += injection.force_at(e.pos);
            }
        }
    }

    if let Some(drift) = drift {
        for (idx, e) in entities.iter().enumerate() {
            if e.alive {
                accum[idx] += drift.sample(e.pos, time);
            }
        }
    }

    let mut report = ForceReport {
        connections,
        ..ForceReport::default()
    };
    for (e, mut force) in entities.iter().zip(accum) {
        if !e.alive {
            continue;
        }
        if !force.is_finite() {
            force = Vec2::ZERO;
            report.non_finite += 1;
        } else if force.length_squared() > phys.max_force * phys.max_force {
            force = force.clamp_length_max(phys.max_force);
            report.clamped += 1;
        }
        report.forces.insert(e.id, force);
    }
    report
}

/// Replace each entity's connection set with this tick's report.
pub fn record_connections(entities: &mut [Entity], connections: &[Connection]) {
    for e in entities.iter_mut() {
        e.connections.clear();
    }
    for c in connections {
        for (from, to) in [(c.a, c.b), (c.b, c.a)] {
            if let Ok(idx) = entities.binary_search_by_key(&from, |e| e.id) {
                entities[idx].connections.insert(to);
            }
        }
    }
}

/// Stable separation axis for two entities sitting on the same point.
fn coincident_direction(a: EntityId, b: EntityId) -> Vec2 {
    let angle = (a.0.wrapping_mul(7919) ^ b.0.wrapping_mul(104_729)) % 360;
    Vec2::from_angle((angle as f32).to_radians())
}
