use thiserror::Error;

/// Problems found while loading or validating an [`EngineConfig`](crate::config::EngineConfig).
///
/// All of these are fatal at `init`: the engine stays in its previous state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("category set is empty")]
    EmptyCategories,
    #[error("category `{0}` is declared more than once")]
    DuplicateCategory(String),
    #[error("population cap must be positive")]
    NonPositiveCap,
    #[error("compatibility entry missing for ({a}, {b})")]
    MissingAffinity { a: String, b: String },
    #[error("compatibility entry ({a}, {b}) = {value} is outside [-1, 1]")]
    AffinityOutOfRange { a: String, b: String, value: f32 },
    #[error("symmetric model has conflicting entries for ({a}, {b}): {first} vs {second}")]
    ConflictingAffinity {
        a: String,
        b: String,
        first: f32,
        second: f32,
    },
    #[error("`{0}` is not a configured category")]
    UnknownCategory(String),
    #[error("seed references unknown category `{0}`")]
    UnknownSeedCategory(String),
    #[error("invalid value for `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A call was made outside the `Running` state. The call had no effect.
    #[error("`{operation}` called while engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}
