// Rolling statistics for population tracking and graph display.

use crate::snapshot::Snapshot;

pub const DEFAULT_HISTORY: usize = 300;
pub const DEFAULT_SAMPLE_INTERVAL: u32 = 10;

/// Fixed-capacity history of one metric.
#[derive(Clone, Debug)]
pub struct RingBuffer {
    data: Vec<f32>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn push(&mut self, value: f32) {
        let cap = self.capacity();
        self.data[self.head] = value;
        self.head = (self.head + 1) % cap;
        self.len = (self.len + 1).min(cap);
    }

    /// Oldest sample first.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        let cap = self.capacity();
        let start = if self.len < cap { 0 } else { self.head };
        (0..self.len).map(move |i| self.data[(start + i) % cap])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        let cap = self.capacity();
        Some(self.data[(self.head + cap - 1) % cap])
    }

    pub fn max(&self) -> f32 {
        self.iter().fold(0.0, f32::max)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

/// Sampled every `sample_interval` ticks from published snapshots. Births and
/// deaths are summed over the interval, the rest are point samples.
#[derive(Clone, Debug)]
pub struct PopulationStats {
    pub population: RingBuffer,
    pub avg_energy: RingBuffer,
    pub avg_generation: RingBuffer,
    pub connections: RingBuffer,
    pub mutants: RingBuffer,
    pub births: RingBuffer,
    pub deaths: RingBuffer,
    /// One history per category, indexed by `CategoryId`.
    pub per_category: Vec<RingBuffer>,
    pub max_generation: u32,
    pub sample_interval: u32,
    births_pending: u64,
    deaths_pending: u64,
    tick_counter: u32,
}

impl PopulationStats {
    pub fn new(capacity: usize, category_count: usize) -> Self {
        Self {
            population: RingBuffer::new(capacity),
            avg_energy: RingBuffer::new(capacity),
            avg_generation: RingBuffer::new(capacity),
            connections: RingBuffer::new(capacity),
            mutants: RingBuffer::new(capacity),
            births: RingBuffer::new(capacity),
            deaths: RingBuffer::new(capacity),
            per_category: (0..category_count).map(|_| RingBuffer::new(capacity)).collect(),
            max_generation: 0,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            births_pending: 0,
            deaths_pending: 0,
            tick_counter: 0,
        }
    }

    pub fn record(&mut self, snapshot: &Snapshot) {
        let diag = &snapshot.diagnostics;
        self.births_pending += diag.births + diag.spawned;
        self.deaths_pending += diag.deaths();
        if let Some(top) = snapshot.entities.iter().map(|e| e.generation).max() {
            self.max_generation = self.max_generation.max(top);
        }

        self.tick_counter += 1;
        if self.tick_counter % self.sample_interval.max(1) != 0 {
            return;
        }

        let n = snapshot.len();
        let (energy_sum, gen_sum, mutants) =
            snapshot
                .entities
                .iter()
                .fold((0.0f32, 0.0f32, 0usize), |(e, g, m), v| {
                    (e + v.energy, g + v.generation as f32, m + v.mutant as usize)
                });
        let denom = n.max(1) as f32;

        self.population.push(n as f32);
        self.avg_energy.push(energy_sum / denom);
        self.avg_generation.push(gen_sum / denom);
        self.connections.push(snapshot.connections.len() as f32);
        self.mutants.push(mutants as f32);
        self.births.push(self.births_pending as f32);
        self.deaths.push(self.deaths_pending as f32);

        let mut counts = vec![0usize; self.per_category.len()];
        for view in &snapshot.entities {
            if let Some(slot) = counts.get_mut(view.category.index()) {
                *slot += 1;
            }
        }
        for (buf, count) in self.per_category.iter_mut().zip(counts) {
            buf.push(count as f32);
        }

        self.births_pending = 0;
        self.deaths_pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{test_entity, Population};
    use crate::snapshot::Diagnostics;
    use crate::world::Bounds;
    use macroquad::prelude::vec2;

    fn snapshot(pop: &Population, births: u64, starved: u64) -> Snapshot {
        Snapshot::capture(
            pop,
            &[],
            Bounds::new(100.0, 100.0),
            100.0,
            0,
            0.0,
            0,
            Diagnostics {
                births,
                deaths_starved: starved,
                ..Diagnostics::default()
            },
            Diagnostics::default(),
        )
    }

    #[test]
    fn ring_buffer_iterates_in_insertion_order_after_wrap() {
        let mut buf = RingBuffer::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            buf.push(v);
        }
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(buf.last(), Some(4.0));
        assert_eq!(buf.max(), 4.0);
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn births_and_deaths_sum_between_samples() {
        let mut pop = Population::new(8);
        pop.spawn(test_entity(vec2(1.0, 1.0), 0));
        pop.spawn(test_entity(vec2(2.0, 2.0), 1));
        pop.spawn(test_entity(vec2(3.0, 3.0), 1));

        let mut stats = PopulationStats::new(8, 2);
        stats.sample_interval = 2;
        stats.record(&snapshot(&pop, 3, 1));
        assert!(stats.births.is_empty());
        stats.record(&snapshot(&pop, 2, 4));

        assert_eq!(stats.births.iter().collect::<Vec<_>>(), vec![5.0]);
        assert_eq!(stats.deaths.iter().collect::<Vec<_>>(), vec![5.0]);
        assert_eq!(stats.population.last(), Some(3.0));
        assert_eq!(stats.avg_energy.last(), Some(50.0));
        assert_eq!(stats.per_category[0].last(), Some(1.0));
        assert_eq!(stats.per_category[1].last(), Some(2.0));
        assert_eq!(stats.max_generation, 1);
    }
}
