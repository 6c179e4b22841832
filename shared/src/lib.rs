//! Types shared between the simulation core and its callers: 2D geometry,
//! entity kinds and the game data configuration.

pub mod config;
pub mod kind;
pub mod math;

pub use config::{
    BuildingData, ConfigError, EntityData, EntityTypeTable, GameConfig, MapConfig, TurretConfig,
};
pub use kind::EntityKind;
pub use math::{BoundingBox, Vec2};

/// Default number of simulation ticks per second.
pub const DEFAULT_TICK_RATE: u32 = 30;
/// Largest delta time, in seconds, a single tick is allowed to simulate.
pub const MAX_DELTA_TIME: f32 = 1.0 / 20.0;
/// Radius of the circle enclosing a moving entity, in world units.
pub const ACTOR_RADIUS: f32 = 0.5;
/// Half of a building's side, in world units.
pub const BUILDING_HALF_EXTENT: f32 = 0.25;
