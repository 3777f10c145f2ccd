pub mod clock;
pub mod compatibility;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod forces;
pub mod genome;
pub mod input;
pub mod lifecycle;
pub mod physics;
pub mod renderer;
pub mod snapshot;
pub mod spatial_hash;
pub mod stats;
pub mod themes;
pub mod ui;
pub mod world;

pub use config::EngineConfig;
pub use engine::{Engine, EngineState, SeedStats};
pub use error::{ConfigError, EngineError};
pub use input::PointerEvent;
pub use snapshot::Snapshot;
