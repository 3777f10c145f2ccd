use crate::config::EngineConfig;
use crate::entity::CategoryId;
use crate::error::ConfigError;

/// Dense category × category affinity table, immutable for an engine's lifetime.
///
/// `affinity(a, b)` is the signed pull `a` feels toward `b`: positive attracts
/// and can form connections, negative repels, zero is neutral.
#[derive(Clone, Debug, PartialEq)]
pub struct CompatibilityModel {
    n: usize,
    table: Vec<f32>,
    directional: bool,
}

impl CompatibilityModel {
    /// Build the table from config, failing on any gap or inconsistency.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let n = config.categories.len();
        if n == 0 {
            return Err(ConfigError::EmptyCategories);
        }
        let mut table: Vec<Option<f32>> = vec![None; n * n];

        for entry in &config.compatibility {
            let i = config
                .category_index(&entry.a)
                .ok_or_else(|| ConfigError::UnknownCategory(entry.a.clone()))?;
            let j = config
                .category_index(&entry.b)
                .ok_or_else(|| ConfigError::UnknownCategory(entry.b.clone()))?;
            if !entry.affinity.is_finite() || !(-1.0..=1.0).contains(&entry.affinity) {
                return Err(ConfigError::AffinityOutOfRange {
                    a: entry.a.clone(),
                    b: entry.b.clone(),
                    value: entry.affinity,
                });
            }

            set_cell(&mut table, n, i, j, entry.affinity, config)?;
            if !config.directional {
                set_cell(&mut table, n, j, i, entry.affinity, config)?;
            }
        }

        let mut dense = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                match table[i * n + j] {
                    Some(v) => dense.push(v),
                    None => {
                        return Err(ConfigError::MissingAffinity {
                            a: config.categories[i].clone(),
                            b: config.categories[j].clone(),
                        })
                    }
                }
            }
        }

        Ok(Self {
            n,
            table: dense,
            directional: config.directional,
        })
    }

    /// Number of categories in the model's domain.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn contains(&self, category: CategoryId) -> bool {
        category.index() < self.n
    }

    pub fn is_directional(&self) -> bool {
        self.directional
    }

    pub fn affinity(&self, a: CategoryId, b: CategoryId) -> f32 {
        self.table[a.index() * self.n + b.index()]
    }
}

fn set_cell(
    table: &mut [Option<f32>],
    n: usize,
    i: usize,
    j: usize,
    value: f32,
    config: &EngineConfig,
) -> Result<(), ConfigError> {
    let cell = &mut table[i * n + j];
    match *cell {
        Some(existing) if (existing - value).abs() > f32::EPSILON => {
            Err(ConfigError::ConflictingAffinity {
                a: config.categories[i].clone(),
                b: config.categories[j].clone(),
                first: existing,
                second: value,
            })
        }
        _ => {
            *cell = Some(value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AffinityEntry;

    fn config(entries: Vec<AffinityEntry>, directional: bool) -> EngineConfig {
        let mut c = EngineConfig::with_categories(["A", "B"], entries);
        c.directional = directional;
        c
    }

    #[test]
    fn symmetric_entries_fill_both_cells() {
        let model = CompatibilityModel::from_config(&config(
            vec![
                AffinityEntry::new("A", "A", 0.9),
                AffinityEntry::new("A", "B", -0.5),
                AffinityEntry::new("B", "B", 0.9),
            ],
            false,
        ))
        .unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.affinity(CategoryId(0), CategoryId(1)), -0.5);
        assert_eq!(model.affinity(CategoryId(1), CategoryId(0)), -0.5);
        assert_eq!(model.affinity(CategoryId(1), CategoryId(1)), 0.9);
    }

    #[test]
    fn missing_entry_fails_fast() {
        let err = CompatibilityModel::from_config(&config(
            vec![
                AffinityEntry::new("A", "A", 0.9),
                AffinityEntry::new("A", "B", -0.5),
            ],
            false,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingAffinity { ref a, ref b } if a == "B" && b == "B"));
    }

    #[test]
    fn directional_model_needs_both_directions() {
        let err = CompatibilityModel::from_config(&config(
            vec![
                AffinityEntry::new("A", "A", 0.2),
                AffinityEntry::new("A", "B", 0.7),
                AffinityEntry::new("B", "B", 0.2),
            ],
            true,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingAffinity { .. }));

        let model = CompatibilityModel::from_config(&config(
            vec![
                AffinityEntry::new("A", "A", 0.2),
                AffinityEntry::new("A", "B", 0.7),
                AffinityEntry::new("B", "A", -0.7),
                AffinityEntry::new("B", "B", 0.2),
            ],
            true,
        ))
        .unwrap();
        assert!(model.is_directional());
        assert_eq!(model.affinity(CategoryId(0), CategoryId(1)), 0.7);
        assert_eq!(model.affinity(CategoryId(1), CategoryId(0)), -0.7);
    }

    #[test]
    fn conflicting_symmetric_entries_are_rejected() {
        let err = CompatibilityModel::from_config(&config(
            vec![
                AffinityEntry::new("A", "A", 0.9),
                AffinityEntry::new("A", "B", -0.5),
                AffinityEntry::new("B", "A", 0.5),
                AffinityEntry::new("B", "B", 0.9),
            ],
            false,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingAffinity { .. }));
    }

    #[test]
    fn out_of_range_and_unknown_tags_are_rejected() {
        let err = CompatibilityModel::from_config(&config(
            vec![AffinityEntry::new("A", "A", 1.5)],
            false,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::AffinityOutOfRange { .. }));

        let err = CompatibilityModel::from_config(&config(
            vec![AffinityEntry::new("A", "Q", 0.1)],
            false,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCategory(ref t) if t == "Q"));
    }
}
