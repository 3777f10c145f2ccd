use macroquad::prelude::*;

use crate::config::PhysicsConfig;
use crate::entity::{Entity, EntityId};
use crate::forces::ForceReport;
use crate::world::Bounds;

/// Speeds are kept strictly below `max_speed` by this factor.
const MAX_SPEED_MARGIN: f32 = 0.999;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegrationReport {
    pub speed_clamps: u32,
    pub non_finite: u32,
    pub wall_hits: u32,
}

/// Explicit Euler step: `v += F·dt; v *= damping; p += v·dt`, then wall bounce.
///
/// Stable only for small `dt`; the clock clamps `dt` before it gets here.
/// Speeds end in `[min_speed, max_speed)`, positions inside `bounds`, and any
/// non-finite state is replaced rather than propagated.
pub fn integrate(
    entities: &mut [Entity],
    forces: &ForceReport,
    bounds: &Bounds,
    physics: &PhysicsConfig,
    dt: f32,
) -> IntegrationReport {
    let mut report = IntegrationReport::default();

    for entity in entities.iter_mut().filter(|e| e.alive) {
        let force = forces.force_on(entity.id);
        let mut vel = (entity.velocity + force * dt) * physics.damping;

        if !vel.is_finite() {
            vel = Vec2::ZERO;
            report.non_finite += 1;
        }
        let (v, clamped) = enforce_speed(vel, entity.id, physics);
        vel = v;
        report.speed_clamps += clamped as u32;

        let mut pos = entity.pos + vel * dt;
        if !pos.is_finite() {
            pos = bounds.clamp(entity.pos);
            report.non_finite += 1;
        }

        if bounds.reflect(&mut pos, &mut vel, physics.boundary_restitution) {
            report.wall_hits += 1;
            // Restitution can drop the speed under the floor.
            vel = enforce_speed(vel, entity.id, physics).0;
        }

        entity.pos = pos;
        entity.velocity = vel;
    }

    report
}

/// Clamp speed into `[min_speed, max_speed)`. Returns the new velocity and whether it changed.
pub fn enforce_speed(vel: Vec2, id: EntityId, physics: &PhysicsConfig) -> (Vec2, bool) {
    let speed = vel.length();
    let ceiling = physics.max_speed * MAX_SPEED_MARGIN;
    if speed >= ceiling {
        (vel / speed * ceiling, true)
    } else if speed < physics.min_speed {
        let dir = if speed > 1e-6 {
            vel / speed
        } else {
            // Deterministic heading for a stalled entity.
            Vec2::from_angle((id.0 % 360) as f32 * std::f32::consts::PI / 180.0)
        };
        (dir * physics.min_speed, true)
    } else {
        (vel, false)
    }
}
