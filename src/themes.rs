use macroquad::prelude::*;

use crate::config::{AffinityEntry, CategoryWeighting, EngineConfig, FeedPoint, InputMode};
use crate::engine::SeedStats;
use crate::renderer::{Glyph, Palette};

/// Most seed entities a single profile statistic can contribute.
const MAX_SEED_PER_STAT: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    VirusEvolution,
    EmotionCanvas,
    CircusDimension,
    StarForge,
    NeuralDreamWeaver,
}

/// Public activity counts for one profile. Only used to size the seed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub repositories: u32,
    pub commits: u32,
    pub stars: u32,
    pub followers: u32,
    pub languages: u32,
}

impl ProfileStats {
    fn values(&self) -> [u32; 5] {
        [
            self.repositories,
            self.commits,
            self.stars,
            self.followers,
            self.languages,
        ]
    }
}

/// Log-scaled share: 1 for an idle stat, growing slowly up to the per-stat ceiling.
fn seed_share(value: u32) -> u32 {
    let scaled = (value as f32 + 1.0).log2().round() as u32;
    1 + scaled.min(MAX_SEED_PER_STAT - 1)
}

impl Theme {
    pub const ALL: [Self; 5] = [
        Self::VirusEvolution,
        Self::EmotionCanvas,
        Self::CircusDimension,
        Self::StarForge,
        Self::NeuralDreamWeaver,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::VirusEvolution => "Virus Evolution",
            Self::EmotionCanvas => "Emotion Canvas",
            Self::CircusDimension => "Circus Dimension",
            Self::StarForge => "Star Forge",
            Self::NeuralDreamWeaver => "Neural Dream Weaver",
        }
    }

    pub fn parse_cli(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "virus" | "virus-evolution" => Some(Self::VirusEvolution),
            "emotion" | "emotions" | "emotion-canvas" => Some(Self::EmotionCanvas),
            "circus" | "circus-dimension" => Some(Self::CircusDimension),
            "star" | "stars" | "star-forge" => Some(Self::StarForge),
            "neural" | "dream" | "neural-dream-weaver" => Some(Self::NeuralDreamWeaver),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn config(self) -> EngineConfig {
        match self {
            Self::VirusEvolution => virus_config(),
            Self::EmotionCanvas => emotion_config(),
            Self::CircusDimension => circus_config(),
            Self::StarForge => star_config(),
            Self::NeuralDreamWeaver => neural_config(),
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::VirusEvolution => Palette {
                background: Color::new(0.03, 0.05, 0.04, 1.0),
                link: Color::new(0.5, 1.0, 0.6, 0.4),
                mutant: Color::new(1.0, 0.2, 0.8, 1.0),
                categories: vec![
                    Color::new(0.3, 0.9, 0.4, 1.0),
                    Color::new(0.95, 0.35, 0.3, 1.0),
                    Color::new(0.3, 0.6, 1.0, 1.0),
                    Color::new(0.95, 0.8, 0.25, 1.0),
                    Color::new(0.7, 0.4, 0.95, 1.0),
                    Color::new(1.0, 0.2, 0.8, 1.0),
                ],
                glyph: Glyph::Ring,
                glow: true,
                ..Palette::default()
            },
            Self::EmotionCanvas => Palette {
                background: Color::new(0.97, 0.95, 0.9, 1.0),
                border: Color::new(0.8, 0.75, 0.7, 1.0),
                link: Color::new(0.3, 0.3, 0.35, 0.3),
                categories: vec![
                    Color::new(1.0, 0.85, 0.1, 1.0),
                    Color::new(0.45, 0.8, 0.3, 1.0),
                    Color::new(0.1, 0.55, 0.35, 1.0),
                    Color::new(0.2, 0.7, 0.9, 1.0),
                    Color::new(0.2, 0.3, 0.8, 1.0),
                    Color::new(0.6, 0.3, 0.7, 1.0),
                    Color::new(0.9, 0.15, 0.15, 1.0),
                    Color::new(1.0, 0.55, 0.1, 1.0),
                ],
                base_radius: 5.0,
                energy_radius: 7.0,
                ..Palette::default()
            },
            Self::CircusDimension => Palette {
                background: Color::new(0.12, 0.02, 0.06, 1.0),
                border: Color::new(0.9, 0.75, 0.2, 1.0),
                link: Color::new(1.0, 0.9, 0.5, 0.5),
                categories: vec![
                    Color::new(0.95, 0.3, 0.45, 1.0),
                    Color::new(1.0, 0.85, 0.2, 1.0),
                    Color::new(0.3, 0.85, 0.95, 1.0),
                    Color::new(1.0, 0.55, 0.15, 1.0),
                    Color::new(0.75, 0.45, 1.0, 1.0),
                ],
                glyph: Glyph::Diamond,
                energy_bars: true,
                ..Palette::default()
            },
            Self::StarForge => Palette {
                background: Color::new(0.0, 0.0, 0.02, 1.0),
                border: Color::new(0.1, 0.1, 0.2, 1.0),
                link: Color::new(1.0, 0.9, 0.7, 0.25),
                categories: vec![
                    Color::new(0.7, 0.85, 1.0, 1.0),
                    Color::new(1.0, 0.95, 0.75, 1.0),
                    Color::new(1.0, 0.6, 0.3, 1.0),
                    Color::new(0.75, 0.3, 0.25, 1.0),
                ],
                base_radius: 2.0,
                energy_radius: 5.0,
                glow: true,
                ..Palette::default()
            },
            Self::NeuralDreamWeaver => Palette {
                background: Color::new(0.04, 0.02, 0.1, 1.0),
                link: Color::new(0.7, 0.5, 1.0, 0.6),
                categories: vec![
                    Color::new(0.55, 0.45, 1.0, 1.0),
                    Color::new(0.3, 0.95, 0.9, 1.0),
                    Color::new(0.95, 0.5, 0.85, 1.0),
                    Color::new(1.0, 1.0, 1.0, 1.0),
                ],
                glyph: Glyph::Dart,
                glow: true,
                ..Palette::default()
            },
        }
    }

    /// Initial category mix for a profile. Every non-mutant category gets at
    /// least one entity; the engine scales the total down to its cap.
    pub fn seed_from_profile(self, profile: &ProfileStats) -> SeedStats {
        let config = self.config();
        let stats = profile.values();
        config
            .categories
            .iter()
            .filter(|tag| config.life.mutant_category.as_deref() != Some(tag.as_str()))
            .enumerate()
            .map(|(i, tag)| (tag.clone(), seed_share(stats[i % stats.len()])))
            .collect()
    }
}

/// Every pair the model needs: unordered pairs for symmetric models, ordered
/// pairs for directional ones.
fn affinity_table(
    categories: &[&str],
    directional: bool,
    affinity: impl Fn(usize, usize) -> f32,
) -> Vec<AffinityEntry> {
    let mut entries = Vec::new();
    for (i, a) in categories.iter().enumerate() {
        for (j, b) in categories.iter().enumerate() {
            if directional || j >= i {
                entries.push(AffinityEntry::new(*a, *b, affinity(i, j)));
            }
        }
    }
    entries
}

fn themed(categories: &[&str], directional: bool, affinity: impl Fn(usize, usize) -> f32) -> EngineConfig {
    let mut config = EngineConfig::with_categories(
        categories.iter().copied(),
        affinity_table(categories, directional, affinity),
    );
    config.directional = directional;
    config
}

fn virus_config() -> EngineConfig {
    const TYPES: [&str; 6] = ["Rhino", "Corona", "Phage", "Retro", "Prion", "Mutant"];
    const MUTANT: usize = 5;
    let mut config = themed(&TYPES, false, |a, b| match (a, b) {
        (MUTANT, MUTANT) => 0.4,
        (MUTANT, _) | (_, MUTANT) => 0.2,
        _ if a == b => 0.6,
        _ => -0.3,
    });
    config.population_cap = 80;
    config.mutation_rate = 0.15;
    config.life.replication_chance = 0.03;
    config.life.mutant_category = Some("Mutant".to_string());
    config
}

fn emotion_config() -> EngineConfig {
    const EMOTIONS: [&str; 8] = [
        "Joy",
        "Trust",
        "Fear",
        "Surprise",
        "Sadness",
        "Disgust",
        "Anger",
        "Anticipation",
    ];
    // Plutchik wheel: neighbours attract, opposites repel.
    let mut config = themed(&EMOTIONS, false, |a, b| {
        let gap = (a as i32 - b as i32).rem_euclid(8);
        match gap.min(8 - gap) {
            0 => 0.7,
            1 => 0.5,
            4 => -0.8,
            _ => 0.0,
        }
    });
    config.population_cap = 120;
    config.physics.noise_amplitude = 25.0;
    config.input.weighting = CategoryWeighting::Velocity;
    config.input.interval_ms = 80.0;
    config
}

fn circus_config() -> EngineConfig {
    const ACTS: [&str; 5] = ["Acrobat", "Clown", "Juggler", "Lion", "Ringmaster"];
    const ACROBAT: usize = 0;
    const CLOWN: usize = 1;
    const LION: usize = 3;
    const RINGMASTER: usize = 4;
    // Lions chase acrobats, acrobats flee; everyone drifts toward the ringmaster.
    let mut config = themed(&ACTS, true, |a, b| match (a, b) {
        (LION, ACROBAT) => 0.8,
        (ACROBAT, LION) => -0.9,
        (CLOWN, LION) => -0.4,
        (_, RINGMASTER) if a != RINGMASTER => 0.5,
        (RINGMASTER, _) => 0.1,
        _ if a == b => 0.6,
        _ => 0.0,
    });
    config.population_cap = 60;
    config.physics.max_speed = 180.0;
    config.physics.boundary_restitution = 1.0;
    config.life.lifespan = 45.0;
    config
}

fn star_config() -> EngineConfig {
    const ELEMENTS: [&str; 4] = ["Hydrogen", "Helium", "Carbon", "Iron"];
    const IRON: usize = 3;
    let mut config = themed(&ELEMENTS, false, |a, b| match (a, b) {
        (IRON, IRON) => -0.2,
        (IRON, _) | (_, IRON) => 0.1,
        _ if a == b => 0.5,
        _ => 0.3,
    });
    config.population_cap = 150;
    config.physics.damping = 0.995;
    config.physics.noise_amplitude = 5.0;
    config.life.lifespan = 90.0;
    config.input.mode = InputMode::Paint;
    config.feed_points = vec![
        FeedPoint {
            x: 200.0,
            y: 200.0,
            radius: 90.0,
            strength: 4.0,
        },
        FeedPoint {
            x: 600.0,
            y: 400.0,
            radius: 90.0,
            strength: 4.0,
        },
    ];
    config
}

fn neural_config() -> EngineConfig {
    const CELLS: [&str; 4] = ["Neuron", "Synapse", "Glia", "Dream"];
    const NEURON: usize = 0;
    const SYNAPSE: usize = 1;
    const DREAM: usize = 3;
    let mut config = themed(&CELLS, false, |a, b| match (a, b) {
        (NEURON, SYNAPSE) | (SYNAPSE, NEURON) => 0.9,
        (DREAM, DREAM) => -0.5,
        (DREAM, _) | (_, DREAM) => 0.4,
        _ if a == b => 0.2,
        _ => 0.3,
    });
    config.population_cap = 100;
    config.connection_threshold = 0.35;
    config.interaction_radius = 110.0;
    config.life.interaction_energy_gain = 0.5;
    config.input.mode = InputMode::Paint;
    config.input.brush_radius = 120.0;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::CompatibilityModel;
    use crate::engine::Engine;
    use crate::entity::CategoryId;

    #[test]
    fn every_preset_is_a_valid_engine_config() {
        for theme in Theme::ALL {
            let config = theme.config();
            config.validate().unwrap();
            let model = CompatibilityModel::from_config(&config).unwrap();
            assert_eq!(model.len(), config.categories.len(), "{}", theme.label());
            assert!(
                theme.palette().categories.len() >= config.categories.len(),
                "{} palette too short",
                theme.label()
            );
        }
    }

    #[test]
    fn circus_model_is_directional() {
        let config = Theme::CircusDimension.config();
        let model = CompatibilityModel::from_config(&config).unwrap();
        let lion = CategoryId(3);
        let acrobat = CategoryId(0);
        assert!(model.affinity(lion, acrobat) > 0.0);
        assert!(model.affinity(acrobat, lion) < 0.0);
    }

    #[test]
    fn profile_seeds_every_ordinary_category() {
        let profile = ProfileStats {
            repositories: 40,
            commits: 2000,
            stars: 0,
            followers: 3,
            languages: 6,
        };
        let seed = Theme::VirusEvolution.seed_from_profile(&profile);
        assert_eq!(seed.counts.len(), 5);
        assert!(!seed.counts.contains_key("Mutant"));
        assert_eq!(seed.counts["Phage"], 1);
        assert_eq!(seed.counts["Corona"], MAX_SEED_PER_STAT);
        assert!(seed.counts["Rhino"] > seed.counts["Retro"]);

        let idle = Theme::EmotionCanvas.seed_from_profile(&ProfileStats::default());
        assert_eq!(idle.total(), 8);
    }

    #[test]
    fn presets_start_from_profile_seeds() {
        let profile = ProfileStats {
            repositories: 12,
            commits: 300,
            stars: 25,
            followers: 9,
            languages: 4,
        };
        for theme in Theme::ALL {
            let mut engine = Engine::new();
            let snap = engine
                .init_seeded(theme.config(), &theme.seed_from_profile(&profile), 1)
                .unwrap();
            assert!(!snap.is_empty());
            assert!(snap.len() <= snap.population_cap);
            engine.tick(0.016).unwrap();
        }
    }

    #[test]
    fn cli_names_parse() {
        assert_eq!(Theme::parse_cli("star_forge"), Some(Theme::StarForge));
        assert_eq!(Theme::parse_cli("Neural Dream Weaver"), Some(Theme::NeuralDreamWeaver));
        assert_eq!(Theme::parse_cli("bogus"), None);
        assert_eq!(Theme::NeuralDreamWeaver.next(), Theme::VirusEvolution);
    }
}
