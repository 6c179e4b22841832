//! # Game Server Simulation Core
//!
//! This library provides the authoritative simulation of the tower-defense
//! game server. It represents the playable map as a traversability grid,
//! tracks which entities occupy which cells, answers proximity queries,
//! casts line-of-sight rays, moves entities along their paths and runs the
//! turrets' combat logic.
//!
//! ## Core Responsibilities
//!
//! ### Spatial Bookkeeping
//! The [`world::World`] is built once from a rasterized map. Every tile
//! records the ids of the entities whose bounding box overlaps it, so
//! collision and proximity queries only look at a handful of tiles instead
//! of every entity in the game.
//!
//! ### Line of Sight
//! Rays are rasterized over the grid with Bresenham's algorithm and stop at
//! the first cell that cannot be traversed. Anything outside the grid counts
//! as a wall.
//!
//! ### Movement
//! Moving entities follow the waypoints they are given at constant speed.
//! The path search itself happens elsewhere; the core executes whatever
//! path it receives.
//!
//! ### Combat
//! Machine-gun turrets guard their surroundings, lock onto the nearest
//! hostile entity in range and sight, fire at a fixed rate and give up on a
//! target that stays hidden for too long.
//!
//! ## Architecture Design
//!
//! ### Ids, not references
//! Entities are owned by the [`game::GameState`]. The grid and the combat
//! controllers only ever store [`entity::EntityId`]s, and reach entities
//! through the [`entity::Entity`] trait when they need them.
//!
//! ### Single-Threaded Tick
//! One task owns the game state and advances it tick by tick. Other tasks
//! talk to it through [`game_loop::GameCommand`]s, which are applied between
//! ticks, so the core needs no locks.
//!
//! ## Module Organization
//!
//! - `entity`, `entity_set`: the entity capability trait and id sets
//! - `world`: the tile grid and its spatial queries
//! - `raycast`: line rasterization and line-of-sight checks
//! - `movable`: waypoint following
//! - `actor`, `building`: moving entities and their actions, buildings and the turret state machine
//! - `game`, `events`: the authoritative game state and what it reports
//! - `game_loop`: the fixed-rate tokio loop driving the game state
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameState;
//! use server::game_loop::{GameCommand, GameLoop};
//! use server::world::World;
//! use shared::{EntityKind, EntityTypeTable, GameConfig, Vec2};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::default();
//!     let world = World::load("map.png", config.map.scale_factor)?;
//!     let types = Arc::new(EntityTypeTable::from_config(&config)?);
//!     let state = GameState::new(world, types, config.map);
//!
//!     let (cmd_tx, cmd_rx) = mpsc::channel(1000);
//!     let (event_tx, mut event_rx) = mpsc::unbounded_channel();
//!     let game = tokio::spawn(GameLoop::new(state, 30, cmd_rx, event_tx).run());
//!
//!     cmd_tx
//!         .send(GameCommand::PlaceBuilding { kind: EntityKind::MgTurret, pos: Vec2::new(2.5, 2.5) })
//!         .await?;
//!     cmd_tx.send(GameCommand::SpawnEnemy).await?;
//!
//!     if let Some(event) = event_rx.recv().await {
//!         println!("{:?}", event);
//!     }
//!     cmd_tx.send(GameCommand::Shutdown).await?;
//!     game.await?;
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod building;
pub mod entity;
pub mod entity_set;
pub mod events;
pub mod game;
pub mod game_loop;
pub mod movable;
pub mod raycast;
pub mod world;

#[cfg(test)]
pub(crate) mod test_utils;
