// Pointer events become spawns or painted impulses, one per interval, latest event wins.

use ::rand::distributions::{Distribution, WeightedIndex};
use ::rand::Rng;
use macroquad::prelude::*;

use crate::config::{CategoryWeighting, InputConfig, InputMode};
use crate::entity::CategoryId;

/// Painted impulses weaker than this are dropped.
const SPENT_STRENGTH: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Position in simulation coordinates.
    pub position: Vec2,
}

impl PointerEvent {
    pub fn down(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Down,
            position: vec2(x, y),
        }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Move,
            position: vec2(x, y),
        }
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Up,
            position: vec2(x, y),
        }
    }
}

/// Ask the engine for one new entity. Still subject to the population cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    pub position: Vec2,
    pub velocity: Vec2,
    pub category: CategoryId,
}

/// Transient brush impulse applied to every entity inside `radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceInjection {
    pub center: Vec2,
    pub radius: f32,
    pub strength: f32,
    /// Unit stroke direction, or zero for a radial push away from `center`.
    pub direction: Vec2,
}

impl ForceInjection {
    /// Force contributed at `pos`, falling off linearly to zero at the brush edge.
    pub fn force_at(&self, pos: Vec2) -> Vec2 {
        let offset = pos - self.center;
        let dist = offset.length();
        if dist > self.radius {
            return Vec2::ZERO;
        }
        let falloff = 1.0 - dist / self.radius;
        if self.direction != Vec2::ZERO {
            self.direction * (self.strength * falloff)
        } else if dist > 1e-6 {
            offset / dist * (self.strength * falloff)
        } else {
            Vec2::ZERO
        }
    }

    pub fn decay(&mut self, rate: f32, dt: f32) {
        self.strength *= (-rate * dt).exp();
    }

    pub fn is_spent(&self) -> bool {
        self.strength.abs() < SPENT_STRENGTH
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputAction {
    Spawn(SpawnRequest),
    Inject(ForceInjection),
}

pub struct InputCoupler {
    config: InputConfig,
    category_count: usize,
    window_start_ms: Option<f64>,
    pending: Option<(Vec2, Vec2)>,
    last_sample: Option<(Vec2, f64)>,
    last_velocity: Vec2,
    pressed: bool,
    /// Events overwritten inside a rate-limit window.
    pub coalesced: u64,
}

impl InputCoupler {
    pub fn new(config: &InputConfig, category_count: usize) -> Self {
        Self {
            config: config.clone(),
            category_count,
            window_start_ms: None,
            pending: None,
            last_sample: None,
            last_velocity: Vec2::ZERO,
            pressed: false,
            coalesced: 0,
        }
    }

    /// Feed one pointer event stamped at `now_ms`.
    ///
    /// `Down` always counts; `Move` only counts while the pointer is pressed.
    pub fn on_pointer_event(
        &mut self,
        event: &PointerEvent,
        now_ms: f64,
        rng: &mut impl Rng,
    ) -> Option<InputAction> {
        match event.kind {
            PointerKind::Up => {
                self.pressed = false;
                self.last_sample = None;
                self.last_velocity = Vec2::ZERO;
                return None;
            }
            PointerKind::Down => {
                self.pressed = true;
                self.last_sample = None;
                self.last_velocity = Vec2::ZERO;
            }
            PointerKind::Move if !self.pressed => return None,
            PointerKind::Move => {}
        }

        let velocity = self.track_velocity(event.position, now_ms);

        if self.window_open(now_ms) {
            if self.pending.is_some() {
                self.coalesced += 1;
            }
            self.pending = Some((event.position, velocity));
            return None;
        }

        self.window_start_ms = Some(now_ms);
        if self.pending.take().is_some() {
            self.coalesced += 1;
        }
        Some(self.make_action(event.position, velocity, rng))
    }

    /// Release the coalesced event once its window has elapsed.
    pub fn flush(&mut self, now_ms: f64, rng: &mut impl Rng) -> Option<InputAction> {
        if self.window_open(now_ms) {
            return None;
        }
        let (position, velocity) = self.pending.take()?;
        self.window_start_ms = Some(now_ms);
        Some(self.make_action(position, velocity, rng))
    }

    fn window_open(&self, now_ms: f64) -> bool {
        match self.window_start_ms {
            Some(start) => now_ms - start < self.config.interval_ms as f64,
            None => false,
        }
    }

    fn track_velocity(&mut self, position: Vec2, now_ms: f64) -> Vec2 {
        if let Some((prev, t)) = self.last_sample {
            let elapsed_s = ((now_ms - t) / 1000.0) as f32;
            if elapsed_s > 0.0 {
                self.last_velocity = (position - prev) / elapsed_s;
            }
        }
        self.last_sample = Some((position, now_ms));
        self.last_velocity
    }

    fn make_action(&self, position: Vec2, velocity: Vec2, rng: &mut impl Rng) -> InputAction {
        match self.config.mode {
            InputMode::Spawn => InputAction::Spawn(SpawnRequest {
                position,
                velocity: velocity * self.config.spawn_speed_scale,
                category: self.choose_category(velocity.length(), rng),
            }),
            InputMode::Paint => InputAction::Inject(ForceInjection {
                center: position,
                radius: self.config.brush_radius,
                strength: self.config.brush_strength,
                direction: velocity.normalize_or_zero(),
            }),
        }
    }

    fn choose_category(&self, pointer_speed: f32, rng: &mut impl Rng) -> CategoryId {
        let n = self.category_count.max(1);
        if n == 1 {
            return CategoryId(0);
        }
        match self.config.weighting {
            CategoryWeighting::Uniform => CategoryId(rng.gen_range(0..n) as u16),
            CategoryWeighting::Velocity => {
                let energy = (pointer_speed / self.config.energetic_speed).clamp(0.0, 1.0);
                let weights: Vec<f32> = (0..n)
                    .map(|i| {
                        let slot = i as f32 / (n - 1) as f32;
                        1.0 / (1.0 + 16.0 * (slot - energy).powi(2))
                    })
                    .collect();
                match WeightedIndex::new(&weights) {
                    Ok(dist) => CategoryId(dist.sample(rng) as u16),
                    Err(_) => CategoryId(rng.gen_range(0..n) as u16),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn coupler(mode: InputMode, interval_ms: f32) -> InputCoupler {
        let config = InputConfig {
            mode,
            interval_ms,
            ..InputConfig::default()
        };
        InputCoupler::new(&config, 3)
    }

    #[test]
    fn events_inside_window_are_coalesced_to_latest() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut c = coupler(InputMode::Spawn, 100.0);

        assert!(c.on_pointer_event(&PointerEvent::down(10.0, 10.0), 0.0, &mut rng).is_some());
        for i in 1..10 {
            let e = PointerEvent::moved(10.0 + i as f32, 10.0);
            assert!(c.on_pointer_event(&e, i as f64 * 5.0, &mut rng).is_none());
        }
        assert_eq!(c.coalesced, 8);
        assert!(c.flush(50.0, &mut rng).is_none(), "window still open");

        match c.flush(100.0, &mut rng) {
            Some(InputAction::Spawn(req)) => assert_eq!(req.position, vec2(19.0, 10.0)),
            other => panic!("expected spawn, got {other:?}"),
        }
        assert!(c.flush(500.0, &mut rng).is_none());
    }

    #[test]
    fn hover_without_press_is_ignored() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut c = coupler(InputMode::Spawn, 0.0);
        assert!(c.on_pointer_event(&PointerEvent::moved(1.0, 1.0), 0.0, &mut rng).is_none());
        assert!(c.on_pointer_event(&PointerEvent::down(1.0, 1.0), 1.0, &mut rng).is_some());
        assert!(c.on_pointer_event(&PointerEvent::moved(2.0, 1.0), 2.0, &mut rng).is_some());
        assert!(c.on_pointer_event(&PointerEvent::up(2.0, 1.0), 3.0, &mut rng).is_none());
        assert!(c.on_pointer_event(&PointerEvent::moved(3.0, 1.0), 4.0, &mut rng).is_none());
    }

    #[test]
    fn paint_mode_emits_directional_injection() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut c = coupler(InputMode::Paint, 0.0);
        c.on_pointer_event(&PointerEvent::down(0.0, 0.0), 0.0, &mut rng);
        match c.on_pointer_event(&PointerEvent::moved(10.0, 0.0), 10.0, &mut rng) {
            Some(InputAction::Inject(inj)) => {
                assert_eq!(inj.center, vec2(10.0, 0.0));
                assert!((inj.direction - Vec2::X).length() < 1e-5);
                assert!(inj.force_at(vec2(10.0, 0.0)).x > 0.0);
                assert_eq!(inj.force_at(vec2(1000.0, 0.0)), Vec2::ZERO);
            }
            other => panic!("expected injection, got {other:?}"),
        }
    }

    #[test]
    fn velocity_weighting_prefers_energetic_categories_for_fast_strokes() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let config = InputConfig {
            weighting: CategoryWeighting::Velocity,
            ..InputConfig::default()
        };
        let c = InputCoupler::new(&config, 3);
        let fast = (0..500)
            .filter(|_| c.choose_category(10_000.0, &mut rng) == CategoryId(2))
            .count();
        let slow = (0..500)
            .filter(|_| c.choose_category(0.0, &mut rng) == CategoryId(2))
            .count();
        assert!(fast > slow * 3, "fast={fast} slow={slow}");
    }

    #[test]
    fn injection_decays_until_spent() {
        let mut inj = ForceInjection {
            center: Vec2::ZERO,
            radius: 10.0,
            strength: 100.0,
            direction: Vec2::ZERO,
        };
        let mut steps = 0;
        while !inj.is_spent() {
            inj.decay(3.0, 0.1);
            steps += 1;
            assert!(steps < 1000);
        }
        assert!(steps > 10);
    }
}
