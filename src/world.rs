use macroquad::prelude::*;
use serde::Serialize;

use crate::config::BoundsConfig;

/// Closed simulation rectangle `[0, width] × [0, height]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl From<BoundsConfig> for Bounds {
    fn from(b: BoundsConfig) -> Self {
        Self::new(b.width, b.height)
    }
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        (0.0..=self.width).contains(&pos.x) && (0.0..=self.height).contains(&pos.y)
    }

    pub fn clamp(&self, pos: Vec2) -> Vec2 {
        vec2(pos.x.clamp(0.0, self.width), pos.y.clamp(0.0, self.height))
    }

    /// Bounce `pos`/`vel` off the walls.
    ///
    /// The overshoot is mirrored back inside and the normal velocity component
    /// is reversed and scaled by `restitution`. Returns true if a wall was hit.
    pub fn reflect(&self, pos: &mut Vec2, vel: &mut Vec2, restitution: f32) -> bool {
        let hit_x = reflect_axis(&mut pos.x, &mut vel.x, self.width, restitution);
        let hit_y = reflect_axis(&mut pos.y, &mut vel.y, self.height, restitution);
        // A mirrored overshoot larger than the box still needs a hard clamp.
        *pos = self.clamp(*pos);
        hit_x || hit_y
    }
}

fn reflect_axis(p: &mut f32, v: &mut f32, max: f32, restitution: f32) -> bool {
    if *p < 0.0 {
        *p = -*p;
        *v = v.abs() * restitution;
        true
    } else if *p > max {
        *p = 2.0 * max - *p;
        *v = -v.abs() * restitution;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_mirrors_position_and_damps_normal_velocity() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut pos = vec2(-4.0, 50.0);
        let mut vel = vec2(-10.0, 3.0);

        assert!(bounds.reflect(&mut pos, &mut vel, 0.8));
        assert_eq!(pos, vec2(4.0, 50.0));
        assert!((vel.x - 8.0).abs() < 1e-6);
        assert_eq!(vel.y, 3.0);
    }

    #[test]
    fn reflect_clamps_huge_overshoot() {
        let bounds = Bounds::new(100.0, 50.0);
        let mut pos = vec2(350.0, -400.0);
        let mut vel = vec2(500.0, -500.0);

        bounds.reflect(&mut pos, &mut vel, 0.8);
        assert!(bounds.contains(pos));
        assert!(vel.x < 0.0 && vel.y > 0.0);
    }

    #[test]
    fn inside_points_are_untouched() {
        let bounds = Bounds::new(10.0, 10.0);
        let mut pos = vec2(10.0, 0.0);
        let mut vel = vec2(1.0, -1.0);
        assert!(!bounds.reflect(&mut pos, &mut vel, 0.5));
        assert_eq!(vel, vec2(1.0, -1.0));
    }
}
