// All tunable simulation defaults in one place.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// World
pub const DEFAULT_WIDTH: f32 = 800.0;
pub const DEFAULT_HEIGHT: f32 = 600.0;

// Population
pub const DEFAULT_POPULATION_CAP: usize = 50;
pub const MAX_POPULATION_CAP: usize = 10_000;
pub const MAX_GENOME_LENGTH: usize = 8;
pub const DEFAULT_GENOME_LENGTH: usize = 5;
// Trait ids are stored as u8.
pub const MAX_TRAIT_ALPHABET: usize = 256;

// Timing
pub const DEFAULT_MAX_DT: f32 = 0.05;

// Forces
pub const DEFAULT_INTERACTION_RADIUS: f32 = 80.0;
// Upper bound on neighbour grid cells, (width / radius) * (height / radius).
pub const MAX_GRID_CELLS: usize = 65_536;
pub const DEFAULT_CONNECTION_THRESHOLD: f32 = 0.5;
pub const DEFAULT_FORCE_SCALE: f32 = 20_000.0;
pub const DEFAULT_SOFTENING: f32 = 100.0;
pub const DEFAULT_MAX_FORCE: f32 = 400.0;
pub const DEFAULT_NOISE_AMPLITUDE: f32 = 15.0;
pub const DEFAULT_NOISE_FREQUENCY: f32 = 0.01;

// Motion
pub const DEFAULT_DAMPING: f32 = 0.98;
pub const DEFAULT_BOUNDARY_RESTITUTION: f32 = 0.8;
pub const DEFAULT_MIN_SPEED: f32 = 2.0;
pub const DEFAULT_MAX_SPEED: f32 = 120.0;

// Energy and lifecycle
pub const DEFAULT_INITIAL_ENERGY: f32 = 60.0;
pub const DEFAULT_MAX_ENERGY: f32 = 100.0;
pub const DEFAULT_DECAY_RATE: f32 = 1.0;
pub const DEFAULT_LIFESPAN: f32 = 60.0;
pub const DEFAULT_REPLICATION_THRESHOLD: f32 = 80.0;
pub const DEFAULT_REPLICATION_COST: f32 = 30.0;
pub const DEFAULT_REPLICATION_CHANCE: f32 = 0.02;
pub const DEFAULT_CHILD_ENERGY_FRACTION: f32 = 0.6;
pub const DEFAULT_OFFSPRING_LIFESPAN_FACTOR: f32 = 0.8;
pub const DEFAULT_SPAWN_OFFSET: f32 = 12.0;
pub const DEFAULT_MUTATION_RATE: f32 = 0.1;

// Input
pub const DEFAULT_INPUT_INTERVAL_MS: f32 = 120.0;
pub const DEFAULT_ENERGETIC_SPEED: f32 = 600.0;
pub const DEFAULT_SPAWN_SPEED_SCALE: f32 = 0.1;
pub const DEFAULT_BRUSH_RADIUS: f32 = 80.0;
pub const DEFAULT_BRUSH_STRENGTH: f32 = 300.0;
pub const DEFAULT_IMPULSE_DECAY: f32 = 3.0;

/// One cell of the compatibility table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffinityEntry {
    pub a: String,
    pub b: String,
    pub affinity: f32,
}

impl AffinityEntry {
    pub fn new(a: impl Into<String>, b: impl Into<String>, affinity: f32) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            affinity,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// A fixed "energy well": entities inside `radius` gain `strength` energy per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedPoint {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub strength: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    /// Per-step velocity multiplier in (0, 1].
    pub damping: f32,
    /// Fraction of the normal velocity kept after bouncing off a wall.
    pub boundary_restitution: f32,
    pub force_scale: f32,
    /// Lower bound on the squared pair distance (ε).
    pub softening: f32,
    pub max_force: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub noise_amplitude: f32,
    pub noise_frequency: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            boundary_restitution: DEFAULT_BOUNDARY_RESTITUTION,
            force_scale: DEFAULT_FORCE_SCALE,
            softening: DEFAULT_SOFTENING,
            max_force: DEFAULT_MAX_FORCE,
            min_speed: DEFAULT_MIN_SPEED,
            max_speed: DEFAULT_MAX_SPEED,
            noise_amplitude: DEFAULT_NOISE_AMPLITUDE,
            noise_frequency: DEFAULT_NOISE_FREQUENCY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeConfig {
    pub initial_energy: f32,
    pub max_energy: f32,
    pub lifespan: f32,
    pub replication_threshold: f32,
    pub replication_cost: f32,
    /// Per-tick probability that an eligible entity actually replicates.
    pub replication_chance: f32,
    pub spawn_offset: f32,
    /// Energy per second gained for each active connection.
    pub interaction_energy_gain: f32,
    pub genome_length: usize,
    pub trait_alphabet: Vec<String>,
    /// Category a mutated offspring is retagged to, if any.
    pub mutant_category: Option<String>,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            initial_energy: DEFAULT_INITIAL_ENERGY,
            max_energy: DEFAULT_MAX_ENERGY,
            lifespan: DEFAULT_LIFESPAN,
            replication_threshold: DEFAULT_REPLICATION_THRESHOLD,
            replication_cost: DEFAULT_REPLICATION_COST,
            replication_chance: DEFAULT_REPLICATION_CHANCE,
            spawn_offset: DEFAULT_SPAWN_OFFSET,
            interaction_energy_gain: 0.0,
            genome_length: DEFAULT_GENOME_LENGTH,
            trait_alphabet: ["A", "C", "G", "T"].iter().map(|s| s.to_string()).collect(),
            mutant_category: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputMode {
    /// Pointer activity spawns new entities.
    Spawn,
    /// Pointer activity paints transient force impulses.
    Paint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryWeighting {
    Uniform,
    /// Faster pointer movement favours categories later in the category list.
    Velocity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputConfig {
    pub mode: InputMode,
    pub interval_ms: f32,
    pub weighting: CategoryWeighting,
    /// Pointer speed (units/s) treated as maximally energetic.
    pub energetic_speed: f32,
    /// Fraction of pointer velocity handed to a spawned entity.
    pub spawn_speed_scale: f32,
    pub brush_radius: f32,
    pub brush_strength: f32,
    /// Exponential decay rate (1/s) of painted impulses.
    pub impulse_decay: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mode: InputMode::Spawn,
            interval_ms: DEFAULT_INPUT_INTERVAL_MS,
            weighting: CategoryWeighting::Uniform,
            energetic_speed: DEFAULT_ENERGETIC_SPEED,
            spawn_speed_scale: DEFAULT_SPAWN_SPEED_SCALE,
            brush_radius: DEFAULT_BRUSH_RADIUS,
            brush_strength: DEFAULT_BRUSH_STRENGTH,
            impulse_decay: DEFAULT_IMPULSE_DECAY,
        }
    }
}

/// Complete per-widget engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub categories: Vec<String>,
    pub compatibility: Vec<AffinityEntry>,
    /// When false, `(a, b)` also defines `(b, a)`.
    pub directional: bool,
    pub bounds: BoundsConfig,
    pub population_cap: usize,
    pub decay_rate: f32,
    pub mutation_rate: f32,
    pub child_energy_fraction: f32,
    pub offspring_lifespan_factor: f32,
    pub interaction_radius: f32,
    pub connection_threshold: f32,
    pub max_dt: f32,
    pub physics: PhysicsConfig,
    pub life: LifeConfig,
    pub feed_points: Vec<FeedPoint>,
    pub input: InputConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            compatibility: Vec::new(),
            directional: false,
            bounds: BoundsConfig::default(),
            population_cap: DEFAULT_POPULATION_CAP,
            decay_rate: DEFAULT_DECAY_RATE,
            mutation_rate: DEFAULT_MUTATION_RATE,
            child_energy_fraction: DEFAULT_CHILD_ENERGY_FRACTION,
            offspring_lifespan_factor: DEFAULT_OFFSPRING_LIFESPAN_FACTOR,
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
            connection_threshold: DEFAULT_CONNECTION_THRESHOLD,
            max_dt: DEFAULT_MAX_DT,
            physics: PhysicsConfig::default(),
            life: LifeConfig::default(),
            feed_points: Vec::new(),
            input: InputConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Config with the given categories and compatibility table; everything else default.
    pub fn with_categories<S: Into<String>>(
        categories: impl IntoIterator<Item = S>,
        compatibility: Vec<AffinityEntry>,
    ) -> Self {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            compatibility,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn category_index(&self, tag: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == tag)
    }

    /// Check every scalar parameter and category reference.
    ///
    /// Compatibility completeness is checked when the model is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::EmptyCategories);
        }
        for (i, tag) in self.categories.iter().enumerate() {
            if self.categories[..i].contains(tag) {
                return Err(ConfigError::DuplicateCategory(tag.clone()));
            }
        }
        if self.population_cap == 0 {
            return Err(ConfigError::NonPositiveCap);
        }
        if self.population_cap > MAX_POPULATION_CAP {
            return Err(ConfigError::invalid(
                "populationCap",
                format!("must be at most {MAX_POPULATION_CAP}"),
            ));
        }

        positive("bounds.width", self.bounds.width)?;
        positive("bounds.height", self.bounds.height)?;
        non_negative("decayRate", self.decay_rate)?;
        unit_closed("mutationRate", self.mutation_rate)?;
        unit_open("childEnergyFraction", self.child_energy_fraction)?;
        unit_open("offspringLifespanFactor", self.offspring_lifespan_factor)?;
        positive("interactionRadius", self.interaction_radius)?;
        let cols = (f64::from(self.bounds.width) / f64::from(self.interaction_radius)).ceil();
        let rows = (f64::from(self.bounds.height) / f64::from(self.interaction_radius)).ceil();
        if cols * rows > MAX_GRID_CELLS as f64 {
            return Err(ConfigError::invalid(
                "interactionRadius",
                format!("too small for the bounds, grid would need {cols}x{rows} cells"),
            ));
        }
        if !(-1.0..=1.0).contains(&self.connection_threshold) {
            return Err(ConfigError::invalid(
                "connectionThreshold",
                "must lie in [-1, 1]",
            ));
        }
        positive("maxDt", self.max_dt)?;

        let p = &self.physics;
        if !(p.damping > 0.0 && p.damping <= 1.0) {
            return Err(ConfigError::invalid("physics.damping", "must lie in (0, 1]"));
        }
        unit_closed("physics.boundaryRestitution", p.boundary_restitution)?;
        non_negative("physics.forceScale", p.force_scale)?;
        positive("physics.softening", p.softening)?;
        positive("physics.maxForce", p.max_force)?;
        positive("physics.minSpeed", p.min_speed)?;
        positive("physics.maxSpeed", p.max_speed)?;
        if p.min_speed >= p.max_speed {
            return Err(ConfigError::invalid(
                "physics.minSpeed",
                "must be below physics.maxSpeed",
            ));
        }
        non_negative("physics.noiseAmplitude", p.noise_amplitude)?;
        non_negative("physics.noiseFrequency", p.noise_frequency)?;

        let l = &self.life;
        positive("life.maxEnergy", l.max_energy)?;
        positive("life.initialEnergy", l.initial_energy)?;
        if l.initial_energy > l.max_energy {
            return Err(ConfigError::invalid(
                "life.initialEnergy",
                "must not exceed life.maxEnergy",
            ));
        }
        positive("life.lifespan", l.lifespan)?;
        non_negative("life.replicationCost", l.replication_cost)?;
        if l.replication_threshold <= l.replication_cost {
            return Err(ConfigError::invalid(
                "life.replicationThreshold",
                "must exceed life.replicationCost so parents survive replication",
            ));
        }
        unit_closed("life.replicationChance", l.replication_chance)?;
        non_negative("life.spawnOffset", l.spawn_offset)?;
        non_negative("life.interactionEnergyGain", l.interaction_energy_gain)?;
        if l.genome_length > MAX_GENOME_LENGTH {
            return Err(ConfigError::invalid(
                "life.genomeLength",
                format!("must be at most {MAX_GENOME_LENGTH}"),
            ));
        }
        if l.trait_alphabet.len() > MAX_TRAIT_ALPHABET {
            return Err(ConfigError::invalid(
                "life.traitAlphabet",
                format!("must have at most {MAX_TRAIT_ALPHABET} symbols"),
            ));
        }
        if l.genome_length > 0 && l.trait_alphabet.is_empty() {
            return Err(ConfigError::invalid(
                "life.traitAlphabet",
                "must be non-empty when genomes are enabled",
            ));
        }
        if let Some(ref mutant) = l.mutant_category {
            if self.category_index(mutant).is_none() {
                return Err(ConfigError::UnknownCategory(mutant.clone()));
            }
        }

        for feed in &self.feed_points {
            finite("feedPoints.x", feed.x)?;
            finite("feedPoints.y", feed.y)?;
            positive("feedPoints.radius", feed.radius)?;
            non_negative("feedPoints.strength", feed.strength)?;
        }

        let i = &self.input;
        non_negative("input.intervalMs", i.interval_ms)?;
        positive("input.energeticSpeed", i.energetic_speed)?;
        non_negative("input.spawnSpeedScale", i.spawn_speed_scale)?;
        positive("input.brushRadius", i.brush_radius)?;
        non_negative("input.brushStrength", i.brush_strength)?;
        non_negative("input.impulseDecay", i.impulse_decay)?;

        Ok(())
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, "must be finite"))
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must be positive, got {value}")))
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must be non-negative, got {value}")))
    }
}

fn unit_closed(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must lie in [0, 1], got {value}")))
    }
}

fn unit_open(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must lie in (0, 1), got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_category() -> EngineConfig {
        EngineConfig::with_categories(
            ["A", "B"],
            vec![
                AffinityEntry::new("A", "A", 0.9),
                AffinityEntry::new("A", "B", -0.5),
                AffinityEntry::new("B", "B", 0.9),
            ],
        )
    }

    #[test]
    fn defaults_with_categories_validate() {
        assert!(two_category().validate().is_ok());
    }

    #[test]
    fn empty_categories_and_zero_cap_are_rejected() {
        let empty = EngineConfig::default();
        assert!(matches!(empty.validate(), Err(ConfigError::EmptyCategories)));

        let mut zero_cap = two_category();
        zero_cap.population_cap = 0;
        assert!(matches!(zero_cap.validate(), Err(ConfigError::NonPositiveCap)));
    }

    #[test]
    fn tiny_radius_and_huge_cap_are_rejected() {
        let mut tiny = two_category();
        tiny.interaction_radius = 0.001;
        assert!(matches!(
            tiny.validate(),
            Err(ConfigError::InvalidParameter { name: "interactionRadius", .. })
        ));

        let mut huge = two_category();
        huge.population_cap = usize::MAX;
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::InvalidParameter { name: "populationCap", .. })
        ));

        let mut edge = two_category();
        edge.bounds.width = 256.0;
        edge.bounds.height = 256.0;
        edge.interaction_radius = 1.0;
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn oversized_trait_alphabet_is_rejected() {
        let mut config = two_category();
        config.life.trait_alphabet = (0..MAX_TRAIT_ALPHABET).map(|i| i.to_string()).collect();
        assert!(config.validate().is_ok());

        config.life.trait_alphabet.push("overflow".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "life.traitAlphabet", .. })
        ));
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let mut config = two_category();
        config.categories.push("A".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCategory(tag)) if tag == "A"
        ));
    }

    #[test]
    fn unknown_mutant_category_is_rejected() {
        let mut config = two_category();
        config.life.mutant_category = Some("Z".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::UnknownCategory(_))));
    }

    #[test]
    fn replication_threshold_must_cover_cost() {
        let mut config = two_category();
        config.life.replication_threshold = 10.0;
        config.life.replication_cost = 10.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "life.replicationThreshold", .. })
        ));
    }

    #[test]
    fn json_uses_camel_case_and_fills_defaults() {
        let json = r#"{
            "categories": ["A", "B"],
            "compatibility": [
                {"a": "A", "b": "A", "affinity": 0.9},
                {"a": "A", "b": "B", "affinity": -0.5},
                {"a": "B", "b": "B", "affinity": 0.9}
            ],
            "populationCap": 10,
            "interactionRadius": 50,
            "input": {"mode": "paint"}
        }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.population_cap, 10);
        assert_eq!(config.interaction_radius, 50.0);
        assert_eq!(config.input.mode, InputMode::Paint);
        assert_eq!(config.input.interval_ms, DEFAULT_INPUT_INTERVAL_MS);
        assert_eq!(config.max_dt, DEFAULT_MAX_DT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
