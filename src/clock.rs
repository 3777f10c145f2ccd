use tracing::debug;

/// Tick counter and simulated time.
///
/// Every raw frame delta goes through [`SimulationClock::advance`], which
/// clamps it to `max_dt` so a stalled or backgrounded frame cannot blow up the
/// Euler integrator.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationClock {
    max_dt: f32,
    tick: u64,
    elapsed: f64,
    /// Frames whose delta was clamped or rejected.
    pub clamped: u64,
}

impl SimulationClock {
    pub fn new(max_dt: f32) -> Self {
        Self {
            max_dt,
            tick: 0,
            elapsed: 0.0,
            clamped: 0,
        }
    }

    /// Consume one frame delta and return the step actually simulated.
    ///
    /// Negative or non-finite deltas become a zero step.
    pub fn advance(&mut self, raw_dt: f32) -> f32 {
        let dt = if !raw_dt.is_finite() || raw_dt < 0.0 {
            self.clamped += 1;
            debug!(raw_dt, "rejected frame delta");
            0.0
        } else if raw_dt > self.max_dt {
            self.clamped += 1;
            debug!(raw_dt, max_dt = self.max_dt, "clamped frame delta");
            self.max_dt
        } else {
            raw_dt
        };
        self.tick += 1;
        self.elapsed += dt as f64;
        dt
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since init.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_steps_are_clamped() {
        let mut clock = SimulationClock::new(0.05);
        assert_eq!(clock.advance(0.016), 0.016);
        assert_eq!(clock.advance(3.0), 0.05);
        assert_eq!(clock.clamped, 1);
        assert_eq!(clock.tick(), 2);
        assert!((clock.elapsed() - 0.066).abs() < 1e-6);
    }

    #[test]
    fn invalid_steps_become_zero() {
        let mut clock = SimulationClock::new(0.05);
        assert_eq!(clock.advance(f32::NAN), 0.0);
        assert_eq!(clock.advance(-1.0), 0.0);
        assert_eq!(clock.advance(f32::INFINITY), 0.0);
        assert_eq!(clock.clamped, 3);
        assert_eq!(clock.elapsed(), 0.0);
    }
}
