// Engine facade. Uninitialized -> Running -> Disposed, and init restarts clean from any state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ::rand::{Rng, SeedableRng};
use macroquad::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::clock::SimulationClock;
use crate::compatibility::CompatibilityModel;
use crate::config::{EngineConfig, InputMode};
use crate::entity::{CategoryId, DeathCause, Entity, EntityId, Origin, Population};
use crate::error::{ConfigError, EngineError};
use crate::forces::{self, Connection, DriftField};
use crate::genome::Genome;
use crate::input::{ForceInjection, InputAction, InputCoupler, PointerEvent, SpawnRequest};
use crate::lifecycle;
use crate::physics;
use crate::snapshot::{Diagnostics, Snapshot};
use crate::spatial_hash::SpatialHash;
use crate::stats::{PopulationStats, DEFAULT_HISTORY};
use crate::world::Bounds;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Running,
    Disposed,
}

impl EngineState {
    pub fn name(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Running => "running",
            EngineState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Initial population mix, keyed by category tag. Opaque numbers supplied by
/// the host (for example counts derived from profile activity).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub counts: BTreeMap<String, u32>,
}

impl SeedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: impl Into<String>, count: u32) -> Self {
        *self.counts.entry(category.into()).or_insert(0) += count;
        self
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for SeedStats {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SeedStats::new(), |seed, (tag, n)| seed.with(tag, n))
    }
}

/// Per-category seed counts in config order, scaled to fit `cap`.
///
/// Scaling keeps proportions using largest remainders; ties go to the
/// category declared first.
pub fn allocate_seed(
    config: &EngineConfig,
    seed: &SeedStats,
    cap: usize,
) -> Result<Vec<usize>, ConfigError> {
    if let Some(unknown) = seed
        .counts
        .keys()
        .find(|tag| config.category_index(tag).is_none())
    {
        return Err(ConfigError::UnknownSeedCategory(unknown.clone()));
    }

    let wanted: Vec<u64> = config
        .categories
        .iter()
        .map(|tag| seed.counts.get(tag).copied().unwrap_or(0) as u64)
        .collect();
    let total: u64 = wanted.iter().sum();
    let cap = cap as u64;
    if total <= cap {
        return Ok(wanted.into_iter().map(|n| n as usize).collect());
    }

    let mut counts: Vec<u64> = wanted.iter().map(|&n| n * cap / total).collect();
    let mut by_remainder: Vec<usize> = (0..wanted.len()).collect();
    by_remainder.sort_by_key(|&i| std::cmp::Reverse(wanted[i] * cap % total));

    let leftover = cap - counts.iter().sum::<u64>();
    for &i in by_remainder.iter().take(leftover as usize) {
        counts[i] += 1;
    }
    Ok(counts.into_iter().map(|n| n as usize).collect())
}

/// Everything that exists only while the engine is running.
struct Simulation {
    config: EngineConfig,
    model: CompatibilityModel,
    bounds: Bounds,
    population: Population,
    spatial: SpatialHash,
    drift: Option<DriftField>,
    coupler: InputCoupler,
    clock: SimulationClock,
    rng: ChaCha8Rng,
    injections: Vec<ForceInjection>,
    queued_spawns: Vec<SpawnRequest>,
    queued_injections: Vec<ForceInjection>,
    coalesced_seen: u64,
    connections: Vec<Connection>,
    totals: Diagnostics,
    stats: PopulationStats,
    snapshot: Arc<Snapshot>,
}

#[derive(Default)]
pub struct Engine {
    sim: Option<Simulation>,
    disposed: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EngineState {
        match (&self.sim, self.disposed) {
            (Some(_), _) => EngineState::Running,
            (None, true) => EngineState::Disposed,
            (None, false) => EngineState::Uninitialized,
        }
    }

    /// Validate `config`, build the model and seed the population.
    ///
    /// Valid from any state; a running simulation is replaced by a clean one.
    /// On error the previous state is left untouched.
    pub fn init(
        &mut self,
        config: EngineConfig,
        seed: &SeedStats,
        mut rng: ChaCha8Rng,
    ) -> Result<Arc<Snapshot>, EngineError> {
        config.validate()?;
        let model = CompatibilityModel::from_config(&config)?;
        let counts = allocate_seed(&config, seed, config.population_cap)?;

        let bounds = Bounds::from(config.bounds);
        let mut population = Population::new(config.population_cap);
        for (idx, &count) in counts.iter().enumerate() {
            for _ in 0..count {
                let entity = seed_entity(&config, &bounds, CategoryId(idx as u16), &mut rng);
                population.spawn(entity);
            }
        }

        let drift = (config.physics.noise_amplitude > 0.0).then(|| {
            DriftField::new(
                rng.gen(),
                config.physics.noise_amplitude,
                config.physics.noise_frequency,
            )
        });

        let spatial = SpatialHash::new(&bounds, config.interaction_radius);
        let coupler = InputCoupler::new(&config.input, config.categories.len());
        let clock = SimulationClock::new(config.max_dt);
        let stats = PopulationStats::new(DEFAULT_HISTORY, config.categories.len());
        let snapshot = Arc::new(Snapshot::capture(
            &population,
            &[],
            bounds,
            config.life.max_energy,
            0,
            0.0,
            0,
            Diagnostics::default(),
            Diagnostics::default(),
        ));

        info!(
            categories = config.categories.len(),
            population = population.count(),
            cap = config.population_cap,
            seeded = seed.total(),
            "engine initialised"
        );

        self.sim = Some(Simulation {
            config,
            model,
            bounds,
            population,
            spatial,
            drift,
            coupler,
            clock,
            rng,
            injections: Vec::new(),
            queued_spawns: Vec::new(),
            queued_injections: Vec::new(),
            coalesced_seen: 0,
            connections: Vec::new(),
            totals: Diagnostics::default(),
            stats,
            snapshot: Arc::clone(&snapshot),
        });
        self.disposed = false;
        Ok(snapshot)
    }

    /// [`Engine::init`] with a fresh `ChaCha8Rng` from `rng_seed`.
    pub fn init_seeded(
        &mut self,
        config: EngineConfig,
        seed: &SeedStats,
        rng_seed: u64,
    ) -> Result<Arc<Snapshot>, EngineError> {
        self.init(config, seed, ChaCha8Rng::seed_from_u64(rng_seed))
    }

    /// Advance one frame and publish a new snapshot.
    pub fn tick(&mut self, dt: f32) -> Result<Arc<Snapshot>, EngineError> {
        let state = self.state();
        let sim = self.sim.as_mut().ok_or(EngineError::InvalidState {
            operation: "tick",
            state: state.name(),
        })?;
        Ok(sim.step(dt))
    }

    /// Feed one pointer event. Anything it produces is merged at the end of
    /// the next tick.
    pub fn handle_input(&mut self, event: PointerEvent) -> Result<(), EngineError> {
        let state = self.state();
        let sim = self.sim.as_mut().ok_or(EngineError::InvalidState {
            operation: "handle_input",
            state: state.name(),
        })?;
        if !event.position.is_finite() {
            debug!(?event, "dropped pointer event with non-finite position");
            return Ok(());
        }
        let now_ms = sim.clock.elapsed_ms();
        if let Some(action) = sim.coupler.on_pointer_event(&event, now_ms, &mut sim.rng) {
            sim.queue(action);
        }
        Ok(())
    }

    /// Switch between spawning and painting. Pending coalesced input is dropped.
    pub fn set_input_mode(&mut self, mode: InputMode) -> Result<(), EngineError> {
        let state = self.state();
        let sim = self.sim.as_mut().ok_or(EngineError::InvalidState {
            operation: "set_input_mode",
            state: state.name(),
        })?;
        if sim.config.input.mode != mode {
            sim.config.input.mode = mode;
            sim.coupler = InputCoupler::new(&sim.config.input, sim.config.categories.len());
            sim.coalesced_seen = 0;
        }
        Ok(())
    }

    /// Latest published snapshot, if running.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.sim.as_ref().map(|sim| Arc::clone(&sim.snapshot))
    }

    pub fn stats(&self) -> Option<&PopulationStats> {
        self.sim.as_ref().map(|sim| &sim.stats)
    }

    pub fn config(&self) -> Option<&EngineConfig> {
        self.sim.as_ref().map(|sim| &sim.config)
    }

    /// Stop the simulation and drop every entity and pending event. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(sim) = self.sim.take() {
            info!(
                ticks = sim.clock.tick(),
                population = sim.population.count(),
                births = sim.totals.births,
                deaths = sim.totals.deaths(),
                "engine disposed"
            );
        }
        self.disposed = true;
    }
}

impl Simulation {
    fn step(&mut self, raw_dt: f32) -> Arc<Snapshot> {
        let mut diag = Diagnostics::default();

        let clamped_before = self.clock.clamped;
        let dt = self.clock.advance(raw_dt);
        diag.clamped_frames = self.clock.clamped - clamped_before;
        let tick = self.clock.tick();
        let time = self.clock.elapsed() as f32;

        self.spatial.rebuild(self.population.as_slice());
        let force_report = forces::compute_forces(
            self.population.as_slice(),
            &self.model,
            &self.spatial,
            &self.config,
            &self.injections,
            self.drift.as_ref(),
            time,
        );
        forces::record_connections(self.population.as_mut_slice(), &force_report.connections);
        let motion = physics::integrate(
            self.population.as_mut_slice(),
            &force_report,
            &self.bounds,
            &self.config.physics,
            dt,
        );

        let decay = self.config.input.impulse_decay;
        for injection in &mut self.injections {
            injection.decay(decay, dt);
        }
        self.injections.retain(|i| !i.is_spent());

        let life = lifecycle::advance(
            &mut self.population,
            &self.config,
            &self.bounds,
            &mut self.rng,
            dt,
            tick,
        );

        if let Some(action) = self.coupler.flush(self.clock.elapsed_ms(), &mut self.rng) {
            self.queue(action);
        }
        self.merge_queued(&mut diag, tick);

        diag.births = life.offspring.len() as u64;
        diag.refused_replications = life.refused as u64;
        diag.mutations = life.mutations as u64;
        for (_, cause) in &life.removed {
            match cause {
                DeathCause::Starved => diag.deaths_starved += 1,
                DeathCause::OldAge => diag.deaths_old_age += 1,
            }
        }
        diag.coalesced_inputs = self.coupler.coalesced - self.coalesced_seen;
        self.coalesced_seen = self.coupler.coalesced;
        diag.clamped_forces = force_report.clamped as u64;
        diag.clamped_speeds = motion.speed_clamps as u64;
        diag.non_finite_repairs = (force_report.non_finite + motion.non_finite) as u64;

        if diag.non_finite_repairs > 0 {
            warn!(tick, repairs = diag.non_finite_repairs, "repaired non-finite motion state");
        }
        if diag.saturated() {
            debug!(
                tick,
                refused_replications = diag.refused_replications,
                refused_spawns = diag.refused_spawns,
                "population at cap"
            );
        }

        self.totals.accumulate(&diag);
        self.connections = force_report.connections;

        let snapshot = Snapshot::capture(
            &self.population,
            &self.connections,
            self.bounds,
            self.config.life.max_energy,
            tick,
            self.clock.elapsed(),
            self.injections.len(),
            diag,
            self.totals,
        );
        if !snapshot.is_finite() {
            warn!(tick, "published snapshot contains non-finite values");
        }
        self.stats.record(&snapshot);
        self.snapshot = Arc::new(snapshot);
        Arc::clone(&self.snapshot)
    }

    fn queue(&mut self, action: InputAction) {
        match action {
            InputAction::Spawn(req) => self.queued_spawns.push(req),
            InputAction::Inject(inj) => self.queued_injections.push(inj),
        }
    }

    /// Admit queued spawns and injections so they first act on the next tick.
    fn merge_queued(&mut self, diag: &mut Diagnostics, tick: u64) {
        self.injections.append(&mut self.queued_injections);

        for req in std::mem::take(&mut self.queued_spawns) {
            if self.population.is_full() || !self.model.contains(req.category) {
                diag.refused_spawns += 1;
                continue;
            }
            let category = req.category;
            let (velocity, _) =
                physics::enforce_speed(req.velocity, EntityId(tick), &self.config.physics);
            let life = &self.config.life;
            let genome = Genome::random(life.genome_length, life.trait_alphabet.len(), &mut self.rng);
            let entity = Entity::new(
                self.bounds.clamp(req.position),
                velocity,
                category,
                genome,
                life.initial_energy,
                life.max_energy,
                life.lifespan,
                Origin::Spawned,
                tick,
            );
            if self.population.spawn(entity).is_some() {
                diag.spawned += 1;
            } else {
                diag.refused_spawns += 1;
            }
        }
    }
}

fn seed_entity(
    config: &EngineConfig,
    bounds: &Bounds,
    category: CategoryId,
    rng: &mut ChaCha8Rng,
) -> Entity {
    let pos = vec2(
        rng.gen_range(0.0..bounds.width),
        rng.gen_range(0.0..bounds.height),
    );
    let phys = &config.physics;
    let speed = rng.gen_range(phys.min_speed..phys.max_speed) * 0.5;
    let velocity = Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU)) * speed;
    let (velocity, _) = physics::enforce_speed(velocity, EntityId(0), phys);
    let life = &config.life;
    let genome = Genome::random(life.genome_length, life.trait_alphabet.len(), rng);
    Entity::new(
        pos,
        velocity,
        category,
        genome,
        life.initial_energy,
        life.max_energy,
        life.lifespan,
        Origin::Seed,
        0,
    )
}
