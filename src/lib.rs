pub mod components;
pub mod config;
pub mod ecs;
pub mod engine;
pub mod events;
pub mod geometry;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod systems;

pub use config::{ConfigError, EngineConfig};
pub use ecs::{Entity, Priority, Registry, System, SystemBase};
pub use engine::Engine;
